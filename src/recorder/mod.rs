//! Recorders: named output tasks bound to one entity
//!
//! A recorder is constructed and validated when its command runs, then
//! generates its table when the script reaches `analyze`. The kind decides
//! which entity it accepts, whether it needs a grid, how the x column is
//! labeled and which value columns it produces.

pub mod generate;
pub mod sink;

pub use sink::{format_value, Cell, Destination, Table, TableFormat, TableStyle};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::rc::Rc;
use tracing::{info, warn};

use crate::core::error::{Result, SlatError};
use crate::core::identity::EntityKind;
use crate::entities::compgroup::ComponentGroup;
use crate::entities::detfn::DetFn;
use crate::entities::edp::DemandParameter;
use crate::entities::im::IntensityMeasure;
use crate::entities::probfn::ProbFn;
use crate::entities::structure::Structure;
use crate::math::integration::Integrator;
use crate::math::lognormal::LogNormalDist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderKind {
    DetFn,
    ProbFn,
    ImRate,
    Collapse,
    CollRate,
    EdpIm,
    EdpRate,
    DsEdp,
    DsIm,
    DsRate,
    #[serde(alias = "lossedp")]
    CostEdp,
    #[serde(alias = "lossim")]
    CostIm,
    DelayEdp,
    DelayIm,
    CostRate,
    AnnCost,
    StructCost,
    Pdf,
    TotalCost,
    Deagg,
}

impl RecorderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderKind::DetFn => "detfn",
            RecorderKind::ProbFn => "probfn",
            RecorderKind::ImRate => "imrate",
            RecorderKind::Collapse => "collapse",
            RecorderKind::CollRate => "collrate",
            RecorderKind::EdpIm => "edpim",
            RecorderKind::EdpRate => "edprate",
            RecorderKind::DsEdp => "dsedp",
            RecorderKind::DsIm => "dsim",
            RecorderKind::DsRate => "dsrate",
            RecorderKind::CostEdp => "costedp",
            RecorderKind::CostIm => "costim",
            RecorderKind::DelayEdp => "delayedp",
            RecorderKind::DelayIm => "delayim",
            RecorderKind::CostRate => "costrate",
            RecorderKind::AnnCost => "anncost",
            RecorderKind::StructCost => "structcost",
            RecorderKind::Pdf => "pdf",
            RecorderKind::TotalCost => "totalcost",
            RecorderKind::Deagg => "deagg",
        }
    }

    /// Entity kind the recorder must be bound to
    pub fn target_kind(&self) -> EntityKind {
        match self {
            RecorderKind::DetFn => EntityKind::DetFn,
            RecorderKind::ProbFn => EntityKind::ProbFn,
            RecorderKind::ImRate | RecorderKind::Collapse | RecorderKind::CollRate => EntityKind::Im,
            RecorderKind::EdpIm | RecorderKind::EdpRate => EntityKind::Edp,
            RecorderKind::DsEdp
            | RecorderKind::DsIm
            | RecorderKind::DsRate
            | RecorderKind::CostEdp
            | RecorderKind::CostIm
            | RecorderKind::DelayEdp
            | RecorderKind::DelayIm
            | RecorderKind::CostRate
            | RecorderKind::AnnCost => EntityKind::CompGroup,
            RecorderKind::StructCost | RecorderKind::Pdf | RecorderKind::TotalCost | RecorderKind::Deagg => {
                EntityKind::Structure
            }
        }
    }

    /// Whether the recorder evaluates over a grid
    pub fn requires_grid(&self, mode: StructCostMode) -> bool {
        match self {
            RecorderKind::CollRate | RecorderKind::DsRate | RecorderKind::AnnCost => false,
            RecorderKind::StructCost => mode != StructCostMode::Annual,
            _ => true,
        }
    }

    /// Default columns for kinds whose value columns are chosen by the user,
    /// or `None` for kinds with fixed columns
    pub fn default_columns(&self, mode: StructCostMode) -> Option<&'static [Column]> {
        const MEAN_SD_LN: &[Column] = &[Column::MeanX, Column::SdLnX];
        const MEAN: &[Column] = &[Column::MeanX];
        match self {
            RecorderKind::ProbFn
            | RecorderKind::EdpIm
            | RecorderKind::CostEdp
            | RecorderKind::CostIm
            | RecorderKind::DelayEdp
            | RecorderKind::DelayIm
            | RecorderKind::TotalCost => Some(MEAN_SD_LN),
            RecorderKind::StructCost => match mode {
                StructCostMode::Npv => None,
                _ => Some(MEAN),
            },
            _ => None,
        }
    }
}

impl fmt::Display for RecorderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a `structcost` recorder reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructCostMode {
    /// Annual loss distribution, one row
    #[default]
    Annual,
    /// Cost split by repair, demolition and collapse over IM
    #[serde(alias = "by_fate")]
    ByFate,
    /// Cost of the groups sharing each EDP, over IM
    #[serde(alias = "by_edp")]
    ByEdp,
    /// Cost of the groups sharing each fragility function, over IM
    #[serde(alias = "by_frag")]
    ByFrag,
    /// Discounted expected loss over a grid of years
    Npv,
}

/// A column selector as written in a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    Probability(f64),
    Name(String),
}

/// A value column over a log-normal distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Column {
    MeanX,
    MeanLnX,
    MedianX,
    SdX,
    SdLnX,
    /// Value exceeded with the given probability
    Exceedance(f64),
}

impl Column {
    pub fn parse(spec: &ColumnSpec, recorder: &str) -> Result<Self> {
        let bad = |column: String| SlatError::Column {
            recorder: recorder.to_string(),
            column,
        };
        match spec {
            ColumnSpec::Probability(p) if (0.0..=1.0).contains(p) => Ok(Column::Exceedance(*p)),
            ColumnSpec::Probability(p) => Err(bad(p.to_string())),
            ColumnSpec::Name(name) => match name.trim().to_lowercase().as_str() {
                "mean_x" | "mean(x)" => Ok(Column::MeanX),
                "mean_ln_x" | "mean(ln(x))" | "mean(ln x)" => Ok(Column::MeanLnX),
                "median_x" | "median(x)" => Ok(Column::MedianX),
                "sd_x" | "sd(x)" => Ok(Column::SdX),
                "sd_ln_x" | "sd(ln(x))" | "sd(ln x)" => Ok(Column::SdLnX),
                other => other
                    .parse::<f64>()
                    .ok()
                    .filter(|p| (0.0..=1.0).contains(p))
                    .map(Column::Exceedance)
                    .ok_or_else(|| bad(name.clone())),
            },
        }
    }

    pub fn label(&self) -> String {
        match self {
            Column::MeanX => "mean_x".to_string(),
            Column::MeanLnX => "mean_ln_x".to_string(),
            Column::MedianX => "median_x".to_string(),
            Column::SdX => "sd_x".to_string(),
            Column::SdLnX => "sd_ln_x".to_string(),
            Column::Exceedance(p) => p.to_string(),
        }
    }

    pub fn select(&self, dist: &LogNormalDist) -> f64 {
        match self {
            Column::MeanX => dist.mean(),
            Column::MeanLnX => dist.mean_ln(),
            Column::MedianX => dist.median(),
            Column::SdX => dist.sd(),
            Column::SdLnX => dist.sd_ln(),
            Column::Exceedance(p) => dist.x_at_exceedence(*p),
        }
    }
}

/// The entity a recorder reports on
#[derive(Debug, Clone)]
pub enum Target {
    DetFn(Rc<DetFn>),
    ProbFn(Rc<ProbFn>),
    Im(Rc<IntensityMeasure>),
    Edp(Rc<DemandParameter>),
    CompGroup(Rc<ComponentGroup>),
    Structure(Rc<Structure>),
}

impl Target {
    pub fn kind(&self) -> EntityKind {
        match self {
            Target::DetFn(_) => EntityKind::DetFn,
            Target::ProbFn(_) => EntityKind::ProbFn,
            Target::Im(_) => EntityKind::Im,
            Target::Edp(_) => EntityKind::Edp,
            Target::CompGroup(_) => EntityKind::CompGroup,
            Target::Structure(_) => EntityKind::Structure,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Target::DetFn(f) => f.id().unwrap_or("<anonymous>"),
            Target::ProbFn(f) => f.id(),
            Target::Im(im) => im.id(),
            Target::Edp(edp) => edp.id(),
            Target::CompGroup(g) => g.id(),
            Target::Structure(s) => s.id(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecorderOptions {
    pub destination: Destination,
    pub discount_rate: Option<f64>,
    pub normalise: bool,
    pub structcost: Option<StructCostMode>,
}

#[derive(Debug)]
pub struct Recorder {
    id: String,
    kind: RecorderKind,
    target: Target,
    mode: StructCostMode,
    options: RecorderOptions,
    columns: Vec<Column>,
    grid: Vec<f64>,
}

impl Recorder {
    /// Validate and build a recorder. Grid and columns that the kind does
    /// not use are dropped with a warning.
    pub fn new(
        id: impl Into<String>,
        kind: RecorderKind,
        target: Target,
        options: RecorderOptions,
        columns: Option<Vec<ColumnSpec>>,
        grid: Option<Vec<f64>>,
    ) -> Result<Self> {
        let id = id.into();
        let expected = kind.target_kind();
        if target.kind() != expected {
            return Err(SlatError::TargetMismatch {
                recorder: id,
                kind: kind.to_string(),
                target: target.id().to_string(),
                expected,
                found: target.kind(),
            });
        }

        let mode = if kind == RecorderKind::StructCost {
            options.structcost.unwrap_or_default()
        } else {
            StructCostMode::Annual
        };

        let grid = match (kind.requires_grid(mode), grid) {
            (true, Some(g)) => g,
            (true, None) => {
                return Err(SlatError::MissingGrid {
                    recorder: id,
                    kind: kind.to_string(),
                })
            }
            (false, Some(_)) => {
                warn!(recorder = %id, kind = %kind, "grid ignored: this kind produces a single row");
                Vec::new()
            }
            (false, None) => Vec::new(),
        };

        if kind == RecorderKind::StructCost && mode == StructCostMode::Npv && options.discount_rate.is_none() {
            return Err(SlatError::MissingOption {
                recorder: id,
                option: "discount_rate".to_string(),
            });
        }

        let columns = match (kind.default_columns(mode), columns) {
            (Some(_), Some(specs)) if !specs.is_empty() => specs
                .iter()
                .map(|s| Column::parse(s, &id))
                .collect::<Result<Vec<_>>>()?,
            (Some(defaults), _) => defaults.to_vec(),
            (None, Some(specs)) => {
                if !specs.is_empty() {
                    warn!(recorder = %id, kind = %kind, "columns ignored: this kind has fixed columns");
                }
                Vec::new()
            }
            (None, None) => Vec::new(),
        };

        Ok(Self {
            id,
            kind,
            target,
            mode,
            options,
            columns,
            grid,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> RecorderKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    pub fn destination(&self) -> &Destination {
        &self.options.destination
    }

    /// Generate the table and write it to the recorder's destination
    pub fn run(&self, integrator: &Integrator, style: &TableStyle, console: &mut dyn Write) -> Result<()> {
        info!(recorder = %self.id, kind = %self.kind, target = %self.target.id(), "running recorder");
        let table = self.generate(integrator)?;
        self.options.destination.write_table(&table, style, console)
    }
}

impl fmt::Display for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} '{}'", self.kind, self.target.kind(), self.target.id())?;
        if self.kind == RecorderKind::StructCost {
            write!(f, " ({:?})", self.mode)?;
        }
        if !self.grid.is_empty() {
            write!(f, ", {} points", self.grid.len())?;
        }
        if let Destination::File { path, append } = &self.options.destination {
            write!(f, ", {} {}", if *append { "appending to" } else { "writing" }, path.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::compgroup::tests::{drift, group, hazard};
    use crate::entities::detfn::{DetFnKind, DetFnParams};

    fn im_target() -> Target {
        let f = DetFn::new(None, DetFnKind::Linear, DetFnParams::Table {
            x: vec![0.0, 1.0, 2.0],
            y: vec![0.0, 10.0, 20.0],
        })
        .unwrap();
        Target::Im(Rc::new(IntensityMeasure::new("IM_1", Rc::new(f))))
    }

    #[test]
    fn test_kind_names_parse_with_aliases() {
        let k: RecorderKind = serde_json::from_str("\"lossedp\"").unwrap();
        assert_eq!(k, RecorderKind::CostEdp);
        let k: RecorderKind = serde_json::from_str("\"structcost\"").unwrap();
        assert_eq!(k.as_str(), "structcost");
        let m: StructCostMode = serde_json::from_str("\"by-fate\"").unwrap();
        assert_eq!(m, StructCostMode::ByFate);
    }

    #[test]
    fn test_column_parsing() {
        let name = |s: &str| ColumnSpec::Name(s.to_string());
        assert_eq!(Column::parse(&name("mean_x"), "R").unwrap(), Column::MeanX);
        assert_eq!(Column::parse(&name("SD_LN_X"), "R").unwrap(), Column::SdLnX);
        assert_eq!(Column::parse(&ColumnSpec::Probability(0.16), "R").unwrap(), Column::Exceedance(0.16));
        assert_eq!(Column::parse(&name("0.5"), "R").unwrap(), Column::Exceedance(0.5));
        assert!(matches!(Column::parse(&name("variance"), "R"), Err(SlatError::Column { .. })));
        assert!(matches!(Column::parse(&ColumnSpec::Probability(1.5), "R"), Err(SlatError::Column { .. })));
    }

    #[test]
    fn test_target_kind_must_match() {
        let err = Recorder::new("R", RecorderKind::EdpIm, im_target(), RecorderOptions::default(), None, Some(vec![1.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            SlatError::TargetMismatch {
                expected: EntityKind::Edp,
                found: EntityKind::Im,
                ..
            }
        ));
    }

    #[test]
    fn test_grid_required_for_grid_kinds() {
        let err = Recorder::new("R", RecorderKind::ImRate, im_target(), RecorderOptions::default(), None, None)
            .unwrap_err();
        assert!(matches!(err, SlatError::MissingGrid { .. }));

        let r = Recorder::new("R", RecorderKind::CollRate, im_target(), RecorderOptions::default(), None, Some(vec![1.0]))
            .unwrap();
        assert!(r.grid().is_empty());
    }

    #[test]
    fn test_generic_columns_default_and_fixed_columns_ignored() {
        let im = hazard("IM");
        let edp = drift("EDP", Rc::clone(&im));
        let r = Recorder::new("R", RecorderKind::EdpIm, Target::Edp(edp), RecorderOptions::default(), None, Some(vec![0.5]))
            .unwrap();
        assert_eq!(r.columns(), &[Column::MeanX, Column::SdLnX]);

        let r = Recorder::new(
            "R",
            RecorderKind::ImRate,
            Target::Im(im),
            RecorderOptions::default(),
            Some(vec![ColumnSpec::Name("mean_x".into())]),
            Some(vec![0.5]),
        )
        .unwrap();
        assert!(r.columns().is_empty());
    }

    #[test]
    fn test_npv_requires_discount_rate() {
        let im = hazard("IM");
        let s = Structure::new("BLDG");
        s.add_comp_group(Rc::new(group("CG", drift("EDP", im), 2))).unwrap();
        let options = RecorderOptions {
            structcost: Some(StructCostMode::Npv),
            ..Default::default()
        };
        let err = Recorder::new("R", RecorderKind::StructCost, Target::Structure(Rc::new(s)), options, None, Some(vec![10.0]))
            .unwrap_err();
        assert!(matches!(err, SlatError::MissingOption { .. }));
    }
}
