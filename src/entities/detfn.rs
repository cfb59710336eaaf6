//! Deterministic functions of one variable
//!
//! A [`DetFn`] is either a closed-form curve (power law, hyperbolic) or an
//! interpolation table (linear, log-log). Interpolated kinds clamp to the
//! first and last y value outside the tabulated x range, and their
//! derivative is zero there.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Result, SlatError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetFnKind {
    #[serde(alias = "power law", alias = "powerlaw")]
    PowerLaw,
    Hyperbolic,
    #[serde(alias = "log-log")]
    LogLog,
    Linear,
}

impl DetFnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetFnKind::PowerLaw => "power-law",
            DetFnKind::Hyperbolic => "hyperbolic",
            DetFnKind::LogLog => "loglog",
            DetFnKind::Linear => "linear",
        }
    }

    pub fn is_interpolated(&self) -> bool {
        matches!(self, DetFnKind::LogLog | DetFnKind::Linear)
    }
}

impl fmt::Display for DetFnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DetFnKind {
    type Err = SlatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "power-law" | "power law" | "powerlaw" | "power_law" => Ok(DetFnKind::PowerLaw),
            "hyperbolic" => Ok(DetFnKind::Hyperbolic),
            "loglog" | "log-log" => Ok(DetFnKind::LogLog),
            "linear" => Ok(DetFnKind::Linear),
            _ => Err(SlatError::invalid(
                "function type",
                s,
                &["power-law", "hyperbolic", "loglog", "linear"],
            )),
        }
    }
}

/// Parameters as given in a script: a flat vector or an (x, y) table
#[derive(Debug, Clone, PartialEq)]
pub enum DetFnParams {
    Formula(Vec<f64>),
    Table { x: Vec<f64>, y: Vec<f64> },
}

/// A validated interpolation table
#[derive(Debug, Clone, PartialEq)]
struct Table {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Table {
    fn new(kind: DetFnKind, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(SlatError::shape(format!("{} x/y table", kind), x.len(), y.len()));
        }
        if x.is_empty() {
            return Err(SlatError::shape(format!("{} x/y table", kind), 1, 0));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SlatError::invalid(
                format!("{} x values", kind),
                format!("{:?}", x),
                &["strictly increasing numbers"],
            ));
        }
        if kind == DetFnKind::LogLog && x.iter().chain(y.iter()).any(|v| !(*v > 0.0)) {
            return Err(SlatError::invalid(
                "loglog table",
                "a non-positive value",
                &["positive x and y values"],
            ));
        }
        Ok(Self { x, y })
    }

    /// Index `i` of the segment [x[i], x[i+1]] containing `v`, if inside
    fn segment(&self, v: f64) -> Option<usize> {
        let n = self.x.len();
        if n < 2 || v < self.x[0] || v > self.x[n - 1] {
            return None;
        }
        let upper = self.x.partition_point(|&xi| xi <= v);
        Some(upper.saturating_sub(1).min(n - 2))
    }

    fn clamped(&self, v: f64) -> Option<f64> {
        let n = self.x.len();
        if v <= self.x[0] {
            Some(self.y[0])
        } else if v >= self.x[n - 1] {
            Some(self.y[n - 1])
        } else {
            None
        }
    }

    fn linear(&self, v: f64) -> f64 {
        if let Some(y) = self.clamped(v) {
            return y;
        }
        match self.segment(v) {
            Some(i) => {
                let t = (v - self.x[i]) / (self.x[i + 1] - self.x[i]);
                self.y[i] + t * (self.y[i + 1] - self.y[i])
            }
            None => f64::NAN,
        }
    }

    fn linear_slope(&self, v: f64) -> f64 {
        if v < self.x[0] || v >= self.x[self.x.len() - 1] {
            return 0.0;
        }
        match self.segment(v) {
            Some(i) => (self.y[i + 1] - self.y[i]) / (self.x[i + 1] - self.x[i]),
            None => 0.0,
        }
    }

    fn loglog(&self, v: f64) -> f64 {
        if let Some(y) = self.clamped(v) {
            return y;
        }
        match self.segment(v) {
            Some(i) => {
                let slope = self.log_slope(i);
                (self.y[i].ln() + slope * (v.ln() - self.x[i].ln())).exp()
            }
            None => f64::NAN,
        }
    }

    fn loglog_slope(&self, v: f64) -> f64 {
        if v < self.x[0] || v >= self.x[self.x.len() - 1] {
            return 0.0;
        }
        match self.segment(v) {
            Some(i) => self.loglog(v) * self.log_slope(i) / v,
            None => 0.0,
        }
    }

    fn log_slope(&self, i: usize) -> f64 {
        (self.y[i + 1].ln() - self.y[i].ln()) / (self.x[i + 1].ln() - self.x[i].ln())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Curve {
    PowerLaw { a: f64, b: f64 },
    Hyperbolic { v_asy: f64, im_asy: f64, alpha: f64 },
    LogLog(Table),
    Linear(Table),
}

/// A deterministic function of one variable
#[derive(Debug, Clone, PartialEq)]
pub struct DetFn {
    id: Option<String>,
    kind: DetFnKind,
    curve: Curve,
}

impl DetFn {
    pub fn new(id: Option<String>, kind: DetFnKind, params: DetFnParams) -> Result<Self> {
        let curve = match (kind, params) {
            (DetFnKind::PowerLaw, DetFnParams::Formula(p)) => match p.as_slice() {
                [a, b] => Curve::PowerLaw { a: *a, b: *b },
                _ => return Err(SlatError::shape("power-law parameters [a, b]", 2, p.len())),
            },
            (DetFnKind::Hyperbolic, DetFnParams::Formula(p)) => match p.as_slice() {
                [v_asy, im_asy, alpha] => Curve::Hyperbolic {
                    v_asy: *v_asy,
                    im_asy: *im_asy,
                    alpha: *alpha,
                },
                _ => {
                    return Err(SlatError::shape(
                        "hyperbolic parameters [v_asy, im_asy, alpha]",
                        3,
                        p.len(),
                    ))
                }
            },
            (DetFnKind::LogLog, DetFnParams::Table { x, y }) => {
                Curve::LogLog(Table::new(kind, x, y)?)
            }
            (DetFnKind::Linear, DetFnParams::Table { x, y }) => {
                Curve::Linear(Table::new(kind, x, y)?)
            }
            (kind, _) => {
                let expected = if kind.is_interpolated() {
                    "x and y tables"
                } else {
                    "a parameter list"
                };
                return Err(SlatError::invalid(
                    format!("parameters for {} function", kind),
                    "wrong parameter form",
                    &[expected],
                ));
            }
        };
        Ok(Self { id, kind, curve })
    }

    pub fn linear(id: Option<String>, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        Self::new(id, DetFnKind::Linear, DetFnParams::Table { x, y })
    }

    pub fn loglog(id: Option<String>, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        Self::new(id, DetFnKind::LogLog, DetFnParams::Table { x, y })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn kind(&self) -> DetFnKind {
        self.kind
    }

    pub fn value_at(&self, x: f64) -> f64 {
        match &self.curve {
            Curve::PowerLaw { a, b } => a * x.powf(*b),
            Curve::Hyperbolic {
                v_asy,
                im_asy,
                alpha,
            } => {
                if x < *im_asy {
                    v_asy * (alpha / (x / im_asy).ln()).exp()
                } else {
                    0.0
                }
            }
            Curve::LogLog(table) => table.loglog(x),
            Curve::Linear(table) => table.linear(x),
        }
    }

    pub fn derivative_at(&self, x: f64) -> f64 {
        match &self.curve {
            Curve::PowerLaw { a, b } => {
                if *b == 0.0 {
                    0.0
                } else {
                    a * b * x.powf(b - 1.0)
                }
            }
            Curve::Hyperbolic { im_asy, alpha, .. } => {
                if x <= 0.0 || x >= *im_asy {
                    return 0.0;
                }
                let ln = (x / im_asy).ln();
                self.value_at(x) * (-alpha / (ln * ln)) / x
            }
            Curve::LogLog(table) => table.loglog_slope(x),
            Curve::Linear(table) => table.linear_slope(x),
        }
    }
}

impl fmt::Display for DetFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.id.as_deref().unwrap_or("<anonymous>");
        match &self.curve {
            Curve::PowerLaw { a, b } => write!(f, "{}: power-law {} * x^{}", name, a, b),
            Curve::Hyperbolic {
                v_asy,
                im_asy,
                alpha,
            } => write!(
                f,
                "{}: hyperbolic v_asy={}, im_asy={}, alpha={}",
                name, v_asy, im_asy, alpha
            ),
            Curve::LogLog(t) | Curve::Linear(t) => write!(
                f,
                "{}: {} over {} points on [{}, {}]",
                name,
                self.kind,
                t.x.len(),
                t.x[0],
                t.x[t.x.len() - 1]
            ),
        }
    }
}
