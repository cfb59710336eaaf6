//! Entity kinds known to a SLAT session

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::SlatError;

/// The kinds of entity a script can define and refer to by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Deterministic function
    DetFn,
    /// Probabilistic (log-normal) function
    ProbFn,
    /// Intensity measure
    Im,
    /// Engineering demand parameter
    Edp,
    /// Fragility function
    FragFn,
    /// Cost or delay function
    LossFn,
    /// Component group
    CompGroup,
    /// Structure
    Structure,
    /// Recorder
    Recorder,
}

impl EntityKind {
    /// The keyword used for this kind in scripts
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::DetFn => "detfn",
            EntityKind::ProbFn => "probfn",
            EntityKind::Im => "im",
            EntityKind::Edp => "edp",
            EntityKind::FragFn => "fragfn",
            EntityKind::LossFn => "lossfn",
            EntityKind::CompGroup => "compgroup",
            EntityKind::Structure => "structure",
            EntityKind::Recorder => "recorder",
        }
    }

    /// All kinds, in dependency order
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::DetFn,
            EntityKind::ProbFn,
            EntityKind::Im,
            EntityKind::Edp,
            EntityKind::FragFn,
            EntityKind::LossFn,
            EntityKind::CompGroup,
            EntityKind::Structure,
            EntityKind::Recorder,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = SlatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        EntityKind::all()
            .iter()
            .find(|k| k.as_str() == lower)
            .copied()
            .ok_or_else(|| {
                let valid: Vec<&str> = EntityKind::all().iter().map(|k| k.as_str()).collect();
                SlatError::invalid("entity kind", s, &valid)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip_through_str() {
        for kind in EntityKind::all() {
            let parsed: EntityKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, *kind);
        }
    }

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!("CompGroup".parse::<EntityKind>().unwrap(), EntityKind::CompGroup);
        assert!("building".parse::<EntityKind>().is_err());
    }
}
