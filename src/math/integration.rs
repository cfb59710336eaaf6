//! Numerical integration over [0, inf)
//!
//! Integrals are evaluated with MAQ, a modified adaptive Simpson quadrature.
//! The half line is mapped onto (0, 1] with `x = 1/t - 1`. A search phase
//! first locates a point where the integrand is not negligible, so that the
//! adaptive phase does not accept an all-zero first estimate of a narrow peak.
//!
//! Settings live in an [`IntegrationConfig`] held by an [`Integrator`], which
//! every derived quantity that integrates receives by reference.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::core::error::{Result, SlatError};

/// Integration algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationMethod {
    /// Modified adaptive quadrature
    #[default]
    Maq,
}

impl FromStr for IntegrationMethod {
    type Err = SlatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "maq" => Ok(IntegrationMethod::Maq),
            _ => Err(SlatError::invalid("integration method", s, &["maq"])),
        }
    }
}

/// Order in which the search phase probes the transformed domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMethod {
    /// Successively finer subdivisions, left to right in t
    #[serde(alias = "binary_subdivision")]
    Binary,
    /// Successively finer subdivisions, starting near x = 0
    #[serde(alias = "reverse_binary_subdivision")]
    ReverseBinary,
    /// Spend half the budget on x <= 1 before looking further out
    #[serde(alias = "low_first_reverse_binary_subdivision")]
    LowFirst,
    /// Bit-reversed order within each subdivision level
    Scattered,
    /// Geometric steps outward from x = 1
    #[default]
    Directed,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Binary => "binary",
            SearchMethod::ReverseBinary => "reverse-binary",
            SearchMethod::LowFirst => "low-first",
            SearchMethod::Scattered => "scattered",
            SearchMethod::Directed => "directed",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SearchMethod {
    type Err = SlatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "binary" | "binary-subdivision" => Ok(SearchMethod::Binary),
            "reverse-binary" | "reverse-binary-subdivision" => Ok(SearchMethod::ReverseBinary),
            "low-first" | "low-first-reverse-binary-subdivision" => Ok(SearchMethod::LowFirst),
            "scattered" => Ok(SearchMethod::Scattered),
            "directed" => Ok(SearchMethod::Directed),
            _ => Err(SlatError::invalid(
                "search method",
                s,
                &["binary", "reverse-binary", "low-first", "scattered", "directed"],
            )),
        }
    }
}

/// Settings in effect for every integral evaluated through an [`Integrator`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub method: IntegrationMethod,
    pub search: SearchMethod,
    pub tolerance: f64,
    /// Maximum number of region refinements before giving up
    pub max_evals: u32,
    /// Maximum number of probes in the search phase
    pub search_limit: u32,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::Maq,
            search: SearchMethod::Directed,
            tolerance: 1e-6,
            max_evals: 1024,
            search_limit: 1024,
        }
    }
}

impl IntegrationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(SlatError::invalid(
                "integration tolerance",
                self.tolerance,
                &["a positive number"],
            ));
        }
        if self.max_evals == 0 {
            return Err(SlatError::invalid("max_evals", 0, &["a positive integer"]));
        }
        if self.search_limit == 0 {
            return Err(SlatError::invalid("search_limit", 0, &["a positive integer"]));
        }
        Ok(())
    }
}

/// Running counters over all integrals evaluated by one integrator
#[derive(Debug, Default, Clone)]
pub struct IntegrationStats {
    calls: Cell<u64>,
    successes: Cell<u64>,
    failures: Cell<u64>,
    nans: Cell<u64>,
    evaluations: Cell<u64>,
}

/// A point-in-time copy of [`IntegrationStats`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub nans: u64,
    pub evaluations: u64,
}

impl IntegrationStats {
    fn record(&self, result: &MaqResult) {
        bump(&self.calls, 1);
        if result.successful {
            bump(&self.successes, 1);
        } else {
            bump(&self.failures, 1);
        }
        if result.integral.is_nan() {
            bump(&self.nans, 1);
        }
        bump(&self.evaluations, result.evaluations);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            calls: self.calls.get(),
            successes: self.successes.get(),
            failures: self.failures.get(),
            nans: self.nans.get(),
            evaluations: self.evaluations.get(),
        }
    }

    pub fn reset(&self) {
        for c in [
            &self.calls,
            &self.successes,
            &self.failures,
            &self.nans,
            &self.evaluations,
        ] {
            c.set(0);
        }
    }
}

fn bump(cell: &Cell<u64>, by: u64) {
    cell.set(cell.get().saturating_add(by));
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Integration statistics")?;
        writeln!(f, "  calls:       {}", self.calls)?;
        writeln!(f, "  successes:   {}", self.successes)?;
        writeln!(f, "  failures:    {}", self.failures)?;
        writeln!(f, "  nan results: {}", self.nans)?;
        write!(f, "  evaluations: {}", self.evaluations)
    }
}

/// Outcome of one MAQ integration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaqResult {
    pub integral: f64,
    pub successful: bool,
    pub evaluations: u64,
}

/// Integrates functions on [0, inf) with the current settings
#[derive(Debug, Default, Clone)]
pub struct Integrator {
    config: IntegrationConfig,
    stats: IntegrationStats,
}

impl Integrator {
    pub fn new(config: IntegrationConfig) -> Self {
        Self {
            config,
            stats: IntegrationStats::default(),
        }
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: IntegrationConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn stats(&self) -> &IntegrationStats {
        &self.stats
    }

    /// Integrate `f` over [0, inf); NaN if the integration does not converge
    pub fn integrate(&self, f: impl Fn(f64) -> f64) -> f64 {
        let result = self.maq(f);
        if !result.successful {
            warn!(
                evaluations = result.evaluations,
                tolerance = self.config.tolerance,
                "integration did not converge"
            );
        }
        result.integral
    }

    /// Integrate `f` over [0, inf) and report how it went
    pub fn maq(&self, f: impl Fn(f64) -> f64) -> MaqResult {
        let result = match self.config.method {
            IntegrationMethod::Maq => Maq::new(&self.config, &f).run(),
        };
        self.stats.record(&result);
        result
    }
}

/// `x = 1/t - 1`, with t = 0 at infinity
fn x_from_t(t: f64) -> f64 {
    1.0 / t - 1.0
}

fn t_from_x(x: f64) -> f64 {
    1.0 / (1.0 + x)
}

fn simpson(a: f64, b: f64, fa: f64, fc: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fc + fb)
}

struct Region {
    a: f64,
    b: f64,
    fa: f64,
    fc: f64,
    fb: f64,
    estimate: f64,
}

enum Search {
    Found(f64),
    Empty,
    Failed,
}

struct Maq<'a, F: Fn(f64) -> f64> {
    config: &'a IntegrationConfig,
    f: &'a F,
    evaluations: u64,
}

impl<'a, F: Fn(f64) -> f64> Maq<'a, F> {
    fn new(config: &'a IntegrationConfig, f: &'a F) -> Self {
        Self {
            config,
            f,
            evaluations: 0,
        }
    }

    /// The transformed integrand on (0, 1]
    fn g(&mut self, t: f64) -> f64 {
        self.evaluations += 1;
        if t <= 0.0 {
            return 0.0;
        }
        (self.f)(x_from_t(t)) / (t * t)
    }

    fn outcome(&self, integral: f64, successful: bool) -> MaqResult {
        MaqResult {
            integral,
            successful,
            evaluations: self.evaluations,
        }
    }

    fn run(mut self) -> MaqResult {
        let split = match self.search() {
            Search::Found(t) => t,
            Search::Empty => return self.outcome(0.0, true),
            Search::Failed => return self.outcome(f64::NAN, false),
        };

        let mut stack = Vec::new();
        let bounds: Vec<(f64, f64)> = if split > 0.0 && split < 1.0 {
            vec![(0.0, split), (split, 1.0)]
        } else {
            vec![(0.0, 1.0)]
        };
        for (a, b) in bounds {
            match self.region(a, b) {
                Some(r) => stack.push(r),
                None => return self.outcome(f64::NAN, false),
            }
        }

        let tolerance = self.config.tolerance;
        let mut total = 0.0;
        let mut refinements: u32 = 0;
        while let Some(r) = stack.pop() {
            refinements += 1;
            if refinements > self.config.max_evals {
                return self.outcome(f64::NAN, false);
            }

            let c = (r.a + r.b) / 2.0;
            let fd = self.g((r.a + c) / 2.0);
            let fe = self.g((c + r.b) / 2.0);
            if fd.is_nan() || fe.is_nan() {
                return self.outcome(f64::NAN, false);
            }
            let left = Region {
                a: r.a,
                b: c,
                fa: r.fa,
                fc: fd,
                fb: r.fc,
                estimate: simpson(r.a, c, r.fa, fd, r.fc),
            };
            let right = Region {
                a: c,
                b: r.b,
                fa: r.fc,
                fc: fe,
                fb: r.fb,
                estimate: simpson(c, r.b, r.fc, fe, r.fb),
            };

            let refined = left.estimate + right.estimate;
            let error = (refined - r.estimate).abs();
            if error <= (tolerance * refined).abs() || error <= (tolerance * total).abs() {
                total += refined + (refined - r.estimate) / 15.0;
            } else if left.estimate.abs() > right.estimate.abs() {
                stack.push(right);
                stack.push(left);
            } else {
                stack.push(left);
                stack.push(right);
            }
        }
        self.outcome(total, true)
    }

    fn region(&mut self, a: f64, b: f64) -> Option<Region> {
        let fa = self.g(a);
        let fb = self.g(b);
        let fc = self.g((a + b) / 2.0);
        if fa.is_nan() || fb.is_nan() || fc.is_nan() {
            return None;
        }
        Some(Region {
            a,
            b,
            fa,
            fc,
            fb,
            estimate: simpson(a, b, fa, fc, fb),
        })
    }

    fn search(&mut self) -> Search {
        let probes = std::iter::once(1.0)
            .chain(std::iter::once(0.5))
            .chain(probe_points(self.config.search, self.config.search_limit));
        for t in probes.take(self.config.search_limit as usize + 2) {
            let value = self.g(t);
            if value.is_nan() {
                return Search::Failed;
            }
            if value.abs() > f64::EPSILON {
                return Search::Found(t);
            }
        }
        Search::Empty
    }
}

/// Probe locations in t for the search phase, after t = 1 and t = 0.5
pub fn probe_points(method: SearchMethod, limit: u32) -> Vec<f64> {
    let limit = limit as usize;
    let mut points = Vec::with_capacity(limit);
    match method {
        SearchMethod::Binary => {
            subdivide(limit, &mut points, |i, n| Some(i as f64 / n as f64));
        }
        SearchMethod::ReverseBinary => {
            subdivide(limit, &mut points, |i, n| Some(1.0 - i as f64 / n as f64));
        }
        SearchMethod::LowFirst => {
            let low_budget = limit / 2;
            subdivide(low_budget, &mut points, |i, n| {
                let t = 1.0 - i as f64 / n as f64;
                (t > 0.5).then_some(t)
            });
            let mut high = Vec::new();
            subdivide(limit - points.len(), &mut high, |i, n| {
                let t = i as f64 / n as f64;
                (t < 0.5).then_some(t)
            });
            points.extend(high);
        }
        SearchMethod::Scattered => {
            let mut level: u32 = 1;
            while points.len() < limit && level < 52 {
                let n = 1u64 << (level + 1);
                let half = n / 2;
                for k in 0..half {
                    if points.len() >= limit {
                        break;
                    }
                    let i = 2 * reverse_bits(k, level) + 1;
                    points.push(i as f64 / n as f64);
                }
                level += 1;
            }
        }
        SearchMethod::Directed => {
            let mut k: i32 = 1;
            while points.len() < limit && k < 1000 {
                let scale = 2f64.powi(k);
                points.push(t_from_x(scale));
                if points.len() < limit {
                    points.push(t_from_x(1.0 / scale));
                }
                k += 1;
            }
        }
    }
    points
}

/// Odd points of successively finer uniform subdivisions, mapped by `pick`
fn subdivide(limit: usize, points: &mut Vec<f64>, pick: impl Fn(u64, u64) -> Option<f64>) {
    let start = points.len();
    let mut n: u64 = 4;
    while points.len() - start < limit && n < (1u64 << 52) {
        let mut i = 1;
        while i < n {
            if points.len() - start >= limit {
                return;
            }
            if let Some(t) = pick(i, n) {
                points.push(t);
            }
            i += 2;
        }
        n *= 2;
    }
}

fn reverse_bits(k: u64, bits: u32) -> u64 {
    if bits == 0 {
        return 0;
    }
    k.reverse_bits() >> (64 - bits)
}
