//! Id-keyed registries that remember definition order

use std::collections::HashMap;
use std::rc::Rc;

use crate::core::error::{Result, SlatError};
use crate::core::identity::EntityKind;

/// Entities of one kind, keyed by id, iterated in registration order.
///
/// Redefining an id replaces the entity in place, so it keeps the position
/// of its first definition.
#[derive(Debug)]
pub struct Registry<T> {
    kind: EntityKind,
    entries: Vec<(String, Rc<T>)>,
    index: HashMap<String, usize>,
}

impl<T> Registry<T> {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Register an entity; returns true if it replaced an earlier definition
    pub fn insert(&mut self, id: impl Into<String>, value: Rc<T>) -> bool {
        let id = id.into();
        match self.index.get(&id) {
            Some(&pos) => {
                self.entries[pos].1 = value;
                true
            }
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, value));
                false
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Rc<T>> {
        self.index.get(id).map(|&pos| Rc::clone(&self.entries[pos].1))
    }

    /// Look up an id, failing with an undefined-reference error
    pub fn lookup(&self, id: &str) -> Result<Rc<T>> {
        self.get(id).ok_or_else(|| SlatError::UndefinedReference {
            kind: self.kind,
            id: id.to_string(),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<T>)> {
        self.entries.iter().map(|(id, v)| (id.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_missing_is_undefined_reference() {
        let reg: Registry<u32> = Registry::new(EntityKind::Edp);
        match reg.lookup("EDP_1") {
            Err(SlatError::UndefinedReference { kind, id }) => {
                assert_eq!(kind, EntityKind::Edp);
                assert_eq!(id, "EDP_1");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_redefinition_keeps_position() {
        let mut reg = Registry::new(EntityKind::Recorder);
        assert!(!reg.insert("a", Rc::new(1)));
        assert!(!reg.insert("b", Rc::new(2)));
        assert!(reg.insert("a", Rc::new(3)));

        let order: Vec<(&str, u32)> = reg.iter().map(|(id, v)| (id, **v)).collect();
        assert_eq!(order, vec![("a", 3), ("b", 2)]);
        assert_eq!(reg.len(), 2);
    }
}
