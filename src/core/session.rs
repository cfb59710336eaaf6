//! Interpreter state for one script
//!
//! A session owns one registry per entity kind, the integration settings in
//! effect and the sink that console output goes to. Nothing is global, so two
//! sessions never see each other's definitions.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

use crate::core::config::Config;
use crate::core::error::{Result, SlatError};
use crate::core::identity::EntityKind;
use crate::core::registry::Registry;
use crate::entities::compgroup::ComponentGroup;
use crate::entities::detfn::DetFn;
use crate::entities::edp::DemandParameter;
use crate::entities::fragility::FragilityFn;
use crate::entities::im::IntensityMeasure;
use crate::entities::lossfn::LossFn;
use crate::entities::probfn::ProbFn;
use crate::entities::structure::Structure;
use crate::math::integration::Integrator;
use crate::recorder::{Recorder, TableStyle, Target};

/// One row of a session listing
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EntrySummary {
    pub kind: EntityKind,
    pub id: String,
    pub summary: String,
}

pub struct Session {
    pub detfns: Registry<DetFn>,
    pub probfns: Registry<ProbFn>,
    pub ims: Registry<IntensityMeasure>,
    pub edps: Registry<DemandParameter>,
    pub fragfns: Registry<FragilityFn>,
    pub lossfns: Registry<LossFn>,
    pub compgroups: Registry<ComponentGroup>,
    pub structures: Registry<Structure>,
    pub recorders: Registry<Recorder>,
    integrator: Integrator,
    titles: Vec<String>,
    input_dir: PathBuf,
    output_dir: PathBuf,
    style: TableStyle,
    console: Box<dyn Write>,
}

impl Session {
    /// A session seeded from `config` that prints to stdout
    pub fn new(config: &Config) -> Self {
        Self::with_console(config, Box::new(std::io::stdout()))
    }

    /// A session seeded from `config` that prints to `console`
    pub fn with_console(config: &Config, console: Box<dyn Write>) -> Self {
        Self {
            detfns: Registry::new(EntityKind::DetFn),
            probfns: Registry::new(EntityKind::ProbFn),
            ims: Registry::new(EntityKind::Im),
            edps: Registry::new(EntityKind::Edp),
            fragfns: Registry::new(EntityKind::FragFn),
            lossfns: Registry::new(EntityKind::LossFn),
            compgroups: Registry::new(EntityKind::CompGroup),
            structures: Registry::new(EntityKind::Structure),
            recorders: Registry::new(EntityKind::Recorder),
            integrator: Integrator::new(config.integration()),
            titles: Vec::new(),
            input_dir: config.input_dir(),
            output_dir: config.output_dir(),
            style: config.table_style(),
            console,
        }
    }

    pub fn integrator(&self) -> &Integrator {
        &self.integrator
    }

    pub fn integrator_mut(&mut self) -> &mut Integrator {
        &mut self.integrator
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn add_title(&mut self, title: impl Into<String>) {
        self.titles.push(title.into());
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn style(&self) -> &TableStyle {
        &self.style
    }

    pub fn console(&mut self) -> &mut dyn Write {
        self.console.as_mut()
    }

    /// Kind of the first non-recorder entity registered under `id`
    pub fn kind_of(&self, id: &str) -> Option<EntityKind> {
        [
            (EntityKind::DetFn, self.detfns.contains(id)),
            (EntityKind::ProbFn, self.probfns.contains(id)),
            (EntityKind::Im, self.ims.contains(id)),
            (EntityKind::Edp, self.edps.contains(id)),
            (EntityKind::FragFn, self.fragfns.contains(id)),
            (EntityKind::LossFn, self.lossfns.contains(id)),
            (EntityKind::CompGroup, self.compgroups.contains(id)),
            (EntityKind::Structure, self.structures.contains(id)),
        ]
        .into_iter()
        .find_map(|(kind, found)| found.then_some(kind))
    }

    /// Resolve a recorder target of the given kind
    pub fn target(&self, kind: EntityKind, id: &str) -> Result<Target> {
        Ok(match kind {
            EntityKind::DetFn => Target::DetFn(self.detfns.lookup(id)?),
            EntityKind::ProbFn => Target::ProbFn(self.probfns.lookup(id)?),
            EntityKind::Im => Target::Im(self.ims.lookup(id)?),
            EntityKind::Edp => Target::Edp(self.edps.lookup(id)?),
            EntityKind::CompGroup => Target::CompGroup(self.compgroups.lookup(id)?),
            EntityKind::Structure => Target::Structure(self.structures.lookup(id)?),
            EntityKind::FragFn | EntityKind::LossFn | EntityKind::Recorder => {
                return Err(SlatError::invalid(
                    "recorder target kind",
                    kind,
                    &["detfn", "probfn", "im", "edp", "compgroup", "structure"],
                ))
            }
        })
    }

    /// Human-readable description of one entity
    pub fn describe(&self, kind: EntityKind, id: &str) -> Result<String> {
        Ok(match kind {
            EntityKind::DetFn => self.detfns.lookup(id)?.to_string(),
            EntityKind::ProbFn => self.probfns.lookup(id)?.to_string(),
            EntityKind::Im => self.ims.lookup(id)?.to_string(),
            EntityKind::Edp => self.edps.lookup(id)?.to_string(),
            EntityKind::FragFn => self.fragfns.lookup(id)?.to_string(),
            EntityKind::LossFn => self.lossfns.lookup(id)?.to_string(),
            EntityKind::CompGroup => self.compgroups.lookup(id)?.to_string(),
            EntityKind::Structure => self.structures.lookup(id)?.to_string(),
            EntityKind::Recorder => format!("{}: {}", id, self.recorders.lookup(id)?),
        })
    }

    /// Every registered entity, grouped by kind in dependency order
    pub fn entries(&self) -> Vec<EntrySummary> {
        fn collect<T: std::fmt::Display>(out: &mut Vec<EntrySummary>, registry: &Registry<T>) {
            for (id, value) in registry.iter() {
                let text = value.to_string();
                let summary = text.lines().next().unwrap_or_default().to_string();
                out.push(EntrySummary {
                    kind: registry.kind(),
                    id: id.to_string(),
                    summary,
                });
            }
        }
        let mut out = Vec::new();
        collect(&mut out, &self.detfns);
        collect(&mut out, &self.probfns);
        collect(&mut out, &self.ims);
        collect(&mut out, &self.edps);
        collect(&mut out, &self.fragfns);
        collect(&mut out, &self.lossfns);
        collect(&mut out, &self.compgroups);
        collect(&mut out, &self.structures);
        collect(&mut out, &self.recorders);
        out
    }

    /// Run every recorder in registration order
    pub fn analyze(&mut self) -> Result<()> {
        debug!(recorders = self.recorders.len(), "analyze");
        for (_, recorder) in self.recorders.iter() {
            recorder.run(&self.integrator, &self.style, self.console.as_mut())?;
        }
        Ok(())
    }

    /// Register a recorder, replacing any earlier one with the same id
    pub fn add_recorder(&mut self, recorder: Recorder) {
        let id = recorder.id().to_string();
        if self.recorders.insert(id.clone(), Rc::new(recorder)) {
            debug!(id = %id, "recorder redefined");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::detfn::{DetFnKind, DetFnParams};
    use crate::recorder::{RecorderKind, RecorderOptions};
    use std::cell::RefCell;

    /// Console sink whose contents the test can read back
    #[derive(Clone, Default)]
    struct Capture(Rc<RefCell<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn session() -> (Session, Capture) {
        let capture = Capture::default();
        let session = Session::with_console(&Config::default(), Box::new(capture.clone()));
        (session, capture)
    }

    fn linear(session: &mut Session) {
        let f = DetFn::new(
            Some("F".into()),
            DetFnKind::Linear,
            DetFnParams::Table {
                x: vec![0.0, 1.0, 2.0],
                y: vec![0.0, 10.0, 20.0],
            },
        )
        .unwrap();
        let f = Rc::new(f);
        session.detfns.insert("F", Rc::clone(&f));
        session.ims.insert("IM_1", Rc::new(IntensityMeasure::new("IM_1", f)));
    }

    #[test]
    fn test_sessions_are_independent() {
        let (mut a, _) = session();
        let (b, _) = session();
        linear(&mut a);
        assert_eq!(a.kind_of("IM_1"), Some(EntityKind::Im));
        assert_eq!(b.kind_of("IM_1"), None);
    }

    #[test]
    fn test_target_lookup_reports_undefined() {
        let (s, _) = session();
        assert!(matches!(
            s.target(EntityKind::Im, "NOPE"),
            Err(SlatError::UndefinedReference { kind: EntityKind::Im, .. })
        ));
    }

    #[test]
    fn test_analyze_writes_to_console() {
        let (mut s, capture) = session();
        linear(&mut s);
        let target = s.target(EntityKind::Im, "IM_1").unwrap();
        let recorder = Recorder::new(
            "R",
            RecorderKind::ImRate,
            target,
            RecorderOptions::default(),
            None,
            Some(vec![0.0, 1.0, 2.0]),
        )
        .unwrap();
        s.add_recorder(recorder);
        s.analyze().unwrap();

        let text = String::from_utf8(capture.0.borrow().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], format!("{:>15}{:>15}", "2.0", "20.0"));
    }

    #[test]
    fn test_entries_in_dependency_order() {
        let (mut s, _) = session();
        linear(&mut s);
        let kinds: Vec<EntityKind> = s.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntityKind::DetFn, EntityKind::Im]);
        assert!(s.describe(EntityKind::Im, "IM_1").unwrap().starts_with("IM_1"));
    }
}
