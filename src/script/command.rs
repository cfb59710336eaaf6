//! Script command model
//!
//! A script is a YAML list. Each entry is a single-key map naming the
//! command, with the command's parameters as its value:
//!
//! ```yaml
//! - detfn: {id: HAZARD, type: hyperbolic, parameters: [1221, 29.8, 62.2]}
//! - im: {id: IM_1, function: HAZARD}
//! - recorder: {id: R1, kind: imrate, target: IM_1, at: {log: [0.01, 3, 20]}}
//! - analyze
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::core::error::{Result, SlatError};
use crate::core::identity::EntityKind;
use crate::math::range::{frange, linrange, logrange};
use crate::recorder::{ColumnSpec, RecorderKind, StructCostMode};
use crate::yaml::diagnostics::ScriptError;

/// A parsed script
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub name: String,
    pub commands: Vec<Command>,
}

impl Script {
    /// Parse script text; `name` labels diagnostics
    pub fn parse(source: &str, name: &str) -> std::result::Result<Self, ScriptError> {
        let commands: Vec<Command> = if source.trim().is_empty() {
            Vec::new()
        } else {
            serde_yml::from_str::<Option<Vec<Command>>>(source)
                .map_err(|e| ScriptError::from_serde_error(&e, source, name))?
                .unwrap_or_default()
        };
        Ok(Self {
            name: name.to_string(),
            commands,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| SlatError::io(path, e))?;
        Ok(Self::parse(&source, &path.display().to_string())?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Title(String),
    Print(PrintArgs),
    DetFn(DetFnArgs),
    ProbFn(ProbFnArgs),
    Im(ImArgs),
    Collapse(CurveArgs),
    Demolition(CurveArgs),
    Edp(EdpArgs),
    FragFn(FragFnArgs),
    LossFn(LossFnArgs),
    CompGroup(CompGroupArgs),
    Structure(StructureArgs),
    RebuildCost(StructureCostArgs),
    DemolitionCost(StructureCostArgs),
    ImportProbFn(ImportArgs),
    ImportImFn(ImportArgs),
    Integration(IntegrationArgs),
    IntStats(IntStatsAction),
    Recorder(RecorderArgs),
    Analyze,
}

impl Command {
    /// The command keyword
    pub fn name(&self) -> &'static str {
        match self {
            Command::Title(_) => "title",
            Command::Print(_) => "print",
            Command::DetFn(_) => "detfn",
            Command::ProbFn(_) => "probfn",
            Command::Im(_) => "im",
            Command::Collapse(_) => "collapse",
            Command::Demolition(_) => "demolition",
            Command::Edp(_) => "edp",
            Command::FragFn(_) => "fragfn",
            Command::LossFn(_) => "lossfn",
            Command::CompGroup(_) => "compgroup",
            Command::Structure(_) => "structure",
            Command::RebuildCost(_) => "rebuildcost",
            Command::DemolitionCost(_) => "demolitioncost",
            Command::ImportProbFn(_) => "importprobfn",
            Command::ImportImFn(_) => "importimfn",
            Command::Integration(_) => "integration",
            Command::IntStats(_) => "intstats",
            Command::Recorder(_) => "recorder",
            Command::Analyze => "analyze",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrintArgs {
    pub message: Option<String>,
    pub title: bool,
    pub entity: Option<EntityRef>,
    pub filename: Option<String>,
    pub append: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetFnArgs {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parameters: Option<Vec<f64>>,
    #[serde(default)]
    pub x: Option<Vec<f64>>,
    #[serde(default)]
    pub y: Option<Vec<f64>>,
}

/// A function reference with the distribution parameter it supplies
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleFn {
    pub function: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbFnArgs {
    pub id: String,
    #[serde(rename = "type", default = "lognormal")]
    pub kind: String,
    pub mu: RoleFn,
    pub sigma: RoleFn,
}

fn lognormal() -> String {
    "lognormal".to_string()
}

fn simple() -> String {
    "simple".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImArgs {
    pub id: String,
    pub function: String,
}

/// Collapse or demolition curve of an IM
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurveArgs {
    pub im: String,
    pub mu: f64,
    pub sigma: f64,
    #[serde(default)]
    pub mu_role: Option<String>,
    #[serde(default)]
    pub sigma_role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdpArgs {
    pub id: String,
    pub im: String,
    pub function: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FragFnArgs {
    pub id: String,
    #[serde(default)]
    pub mu_role: Option<String>,
    #[serde(default)]
    pub sigma_role: Option<String>,
    pub states: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LossFnArgs {
    pub id: String,
    #[serde(rename = "type", default = "simple")]
    pub kind: String,
    #[serde(default)]
    pub mu_role: Option<String>,
    #[serde(default)]
    pub sigma_role: Option<String>,
    /// `null` entries mean no loss in that state
    pub states: Vec<Option<Vec<f64>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompGroupArgs {
    pub id: String,
    pub edp: String,
    pub fragfn: String,
    pub cost: String,
    #[serde(default)]
    pub delay: Option<String>,
    pub count: u32,
    #[serde(default)]
    pub cost_factor: Option<f64>,
    #[serde(default)]
    pub delay_factor: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureArgs {
    pub id: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureCostArgs {
    pub structure: String,
    pub mu: f64,
    pub sigma: f64,
    #[serde(default)]
    pub mu_role: Option<String>,
    #[serde(default)]
    pub sigma_role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportArgs {
    pub id: String,
    pub file: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrationArgs {
    pub method: Option<String>,
    pub tolerance: Option<f64>,
    pub max_evals: Option<u32>,
    pub search: Option<String>,
    pub search_limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntStatsAction {
    Print,
    Reset,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecorderArgs {
    pub id: String,
    pub kind: RecorderKind,
    pub target: String,
    #[serde(default)]
    pub at: Option<GridSpec>,
    #[serde(default)]
    pub columns: Option<Vec<ColumnSpec>>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub discount_rate: Option<f64>,
    #[serde(default, alias = "normalize")]
    pub normalise: bool,
    #[serde(default)]
    pub structcost: Option<StructCostMode>,
}

/// Evaluation grid of a recorder
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GridSpec {
    /// `[start, step, end]`
    Range(Vec<f64>),
    Linear { linear: (f64, f64, usize) },
    Log { log: (f64, f64, usize) },
    Values { values: Vec<f64> },
}

impl GridSpec {
    /// Expand to the grid points; `context` names the owner in errors
    pub fn resolve(&self, context: &str) -> Result<Vec<f64>> {
        match self {
            GridSpec::Range(v) => match v.as_slice() {
                [start, step, end] => Ok(frange(*start, *end, *step).iter().collect()),
                _ => Err(SlatError::shape(format!("grid of {}", context), 3, v.len())),
            },
            GridSpec::Linear { linear: (start, end, n) } => linrange(*start, *end, *n),
            GridSpec::Log { log: (start, end, n) } => logrange(*start, *end, *n),
            GridSpec::Values { values } => Ok(values.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_list() {
        let source = r#"
- title: Example
- detfn: {id: F, type: linear, x: [0, 1, 2], y: [0, 10, 20]}
- im: {id: IM_1, function: F}
- recorder: {id: R, kind: imrate, target: IM_1, at: [0, 1, 2]}
- intstats: print
- analyze
"#;
        let script = Script::parse(source, "example.yaml").unwrap();
        let names: Vec<&str> = script.commands.iter().map(Command::name).collect();
        assert_eq!(names, vec!["title", "detfn", "im", "recorder", "intstats", "analyze"]);
        match &script.commands[3] {
            Command::Recorder(r) => {
                assert_eq!(r.kind, RecorderKind::ImRate);
                assert_eq!(r.at, Some(GridSpec::Range(vec![0.0, 1.0, 2.0])));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_script_has_no_commands() {
        assert!(Script::parse("", "empty.yaml").unwrap().commands.is_empty());
        assert!(Script::parse("# nothing\n", "empty.yaml").unwrap().commands.is_empty());
    }

    #[test]
    fn test_unknown_command_is_syntax_error() {
        let err = Script::parse("- frobnicate: {id: X}\n", "bad.yaml").unwrap_err();
        assert!(err.message().contains("frobnicate"));
    }

    #[test]
    fn test_grid_forms() {
        let range = GridSpec::Range(vec![0.0, 0.5, 2.0]).resolve("R").unwrap();
        assert_eq!(range, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        let lin: GridSpec = serde_yml::from_str("{linear: [0, 1, 3]}").unwrap();
        assert_eq!(lin.resolve("R").unwrap(), vec![0.0, 0.5, 1.0]);
        let log: GridSpec = serde_yml::from_str("{log: [1, 100, 3]}").unwrap();
        let points = log.resolve("R").unwrap();
        assert!((points[1] - 10.0).abs() < 1e-9);
        let values: GridSpec = serde_yml::from_str("{values: [0.3, 0.1]}").unwrap();
        assert_eq!(values.resolve("R").unwrap(), vec![0.3, 0.1]);
    }

    #[test]
    fn test_range_needs_three_values() {
        assert!(matches!(
            GridSpec::Range(vec![0.0, 1.0]).resolve("R"),
            Err(SlatError::ShapeMismatch { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn test_lossfn_null_states() {
        let args: LossFnArgs = serde_yml::from_str("{id: C, states: [[0.03, 0.4], null]}").unwrap();
        assert_eq!(args.kind, "simple");
        assert_eq!(args.states, vec![Some(vec![0.03, 0.4]), None]);
    }
}
