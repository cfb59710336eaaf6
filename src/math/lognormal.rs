//! Log-normal distributions and their parameterizations
//!
//! A distribution is stored as `(mu_ln, sigma_ln)`, the mean and standard
//! deviation of `ln X`. Every other parameterization is converted on the way
//! in. `mu_ln = -inf` is the degenerate distribution at zero, which is what a
//! zero-cost damage state or a zero-probability adjustment produces.

use serde::{Deserialize, Serialize};
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{PI, SQRT_2};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Result, SlatError};
use crate::math::integration::Integrator;

/// Which location parameter a value describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuType {
    #[serde(alias = "mean(x)")]
    MeanX,
    #[serde(alias = "median(x)")]
    MedianX,
    #[serde(alias = "mean(ln(x))", alias = "mean_ln")]
    MeanLnX,
}

/// Which dispersion parameter a value describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigmaType {
    #[serde(alias = "sd(x)")]
    SdX,
    #[serde(alias = "sd(ln(x))", alias = "sd_ln")]
    SdLnX,
}

impl MuType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MuType::MeanX => "mean_x",
            MuType::MedianX => "median_x",
            MuType::MeanLnX => "mean_ln_x",
        }
    }
}

impl SigmaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigmaType::SdX => "sd_x",
            SigmaType::SdLnX => "sd_ln_x",
        }
    }
}

impl fmt::Display for MuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for SigmaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MuType {
    type Err = SlatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mean_x" | "mean(x)" => Ok(MuType::MeanX),
            "median_x" | "median(x)" => Ok(MuType::MedianX),
            "mean_ln_x" | "mean(ln(x))" | "mean_ln" => Ok(MuType::MeanLnX),
            _ => Err(SlatError::invalid(
                "location parameter",
                s,
                &["mean_x", "median_x", "mean_ln_x"],
            )),
        }
    }
}

impl FromStr for SigmaType {
    type Err = SlatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sd_x" | "sd(x)" => Ok(SigmaType::SdX),
            "sd_ln_x" | "sd(ln(x))" | "sd_ln" => Ok(SigmaType::SdLnX),
            _ => Err(SlatError::invalid(
                "dispersion parameter",
                s,
                &["sd_x", "sd_ln_x"],
            )),
        }
    }
}

/// Standard normal CDF
fn phi(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// Standard normal survival function
fn phi_upper(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// Standard normal quantile, for 0 < p < 1
fn phi_inv(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogNormalDist {
    mu_ln: f64,
    sigma_ln: f64,
}

impl LogNormalDist {
    pub fn from_mu_ln_sigma_ln(mu_ln: f64, sigma_ln: f64) -> Self {
        Self { mu_ln, sigma_ln }
    }

    pub fn from_median_sigma_ln(median: f64, sigma_ln: f64) -> Self {
        Self::from_mu_ln_sigma_ln(median.ln(), sigma_ln)
    }

    pub fn from_mean_sigma_ln(mean: f64, sigma_ln: f64) -> Self {
        Self::from_mu_ln_sigma_ln(mean.ln() - sigma_ln * sigma_ln / 2.0, sigma_ln)
    }

    pub fn from_mean_sd(mean: f64, sd: f64) -> Self {
        let sigma_ln = if mean == 0.0 {
            0.0
        } else {
            (sd * sd / (mean * mean)).ln_1p().sqrt()
        };
        Self::from_mean_sigma_ln(mean, sigma_ln)
    }

    /// Median and standard deviation of X.
    ///
    /// With u = exp(sigma_ln^2), sd^2 = median^2 * u * (u - 1), so u is the
    /// positive root of that quadratic.
    pub fn from_median_sd(median: f64, sd: f64) -> Self {
        if median == 0.0 {
            return Self::zero();
        }
        let r = sd / median;
        let u = (1.0 + (1.0 + 4.0 * r * r).sqrt()) / 2.0;
        Self::from_median_sigma_ln(median, u.ln().sqrt())
    }

    /// Build from any of the six supported parameter-role combinations
    pub fn from_parameters(mu: f64, mu_type: MuType, sigma: f64, sigma_type: SigmaType) -> Self {
        match (mu_type, sigma_type) {
            (MuType::MeanLnX, SigmaType::SdLnX) => Self::from_mu_ln_sigma_ln(mu, sigma),
            (MuType::MedianX, SigmaType::SdLnX) => Self::from_median_sigma_ln(mu, sigma),
            (MuType::MeanX, SigmaType::SdLnX) => Self::from_mean_sigma_ln(mu, sigma),
            (MuType::MeanX, SigmaType::SdX) => Self::from_mean_sd(mu, sigma),
            (MuType::MedianX, SigmaType::SdX) => Self::from_median_sd(mu, sigma),
            (MuType::MeanLnX, SigmaType::SdX) => Self::from_median_sd(mu.exp(), sigma),
        }
    }

    /// The point mass at zero
    pub fn zero() -> Self {
        Self {
            mu_ln: f64::NEG_INFINITY,
            sigma_ln: 0.0,
        }
    }

    pub fn mean_ln(&self) -> f64 {
        self.mu_ln
    }

    pub fn sd_ln(&self) -> f64 {
        self.sigma_ln
    }

    pub fn median(&self) -> f64 {
        self.mu_ln.exp()
    }

    pub fn mean(&self) -> f64 {
        if self.mu_ln == f64::NEG_INFINITY {
            0.0
        } else {
            (self.mu_ln + self.sigma_ln * self.sigma_ln / 2.0).exp()
        }
    }

    pub fn sd(&self) -> f64 {
        if self.mu_ln == f64::NEG_INFINITY {
            0.0
        } else {
            self.mean() * (self.sigma_ln * self.sigma_ln).exp_m1().sqrt()
        }
    }

    /// True when all probability sits on the median
    pub fn is_degenerate(&self) -> bool {
        self.sigma_ln == 0.0 || self.mu_ln == f64::NEG_INFINITY
    }

    /// P(X <= x)
    pub fn p_at_most(&self, x: f64) -> f64 {
        if self.mu_ln.is_nan() || x.is_nan() {
            return 0.0;
        }
        if self.is_degenerate() {
            return if x >= self.median() { 1.0 } else { 0.0 };
        }
        if x <= 0.0 {
            return 0.0;
        }
        phi((x.ln() - self.mu_ln) / self.sigma_ln).max(0.0)
    }

    /// P(X > x)
    pub fn p_at_least(&self, x: f64) -> f64 {
        if self.mu_ln.is_nan() || x.is_nan() {
            return 0.0;
        }
        if self.is_degenerate() {
            return if x < self.median() { 1.0 } else { 0.0 };
        }
        if x <= 0.0 {
            return 1.0;
        }
        phi_upper((x.ln() - self.mu_ln) / self.sigma_ln).max(0.0)
    }

    /// Probability density; zero for a degenerate distribution
    pub fn pdf(&self, x: f64) -> f64 {
        if self.is_degenerate() || !(x > 0.0) {
            return 0.0;
        }
        let z = (x.ln() - self.mu_ln) / self.sigma_ln;
        (-0.5 * z * z).exp() / (x * self.sigma_ln * (2.0 * PI).sqrt())
    }

    /// The x for which P(X <= x) = p
    pub fn quantile(&self, p: f64) -> f64 {
        if p.is_nan() {
            return f64::NAN;
        }
        if p <= 0.0 {
            return 0.0;
        }
        if p >= 1.0 {
            return f64::INFINITY;
        }
        if self.is_degenerate() {
            return self.median();
        }
        (self.mu_ln + self.sigma_ln * phi_inv(p)).exp().max(0.0)
    }

    /// The x for which P(X > x) = p
    pub fn x_at_exceedence(&self, p: f64) -> f64 {
        self.quantile(1.0 - p)
    }

    /// Multiply the mean by `factor`, keeping the dispersion
    pub fn scale(&self, factor: f64) -> Self {
        Self::from_mean_sigma_ln(factor * self.mean(), self.sigma_ln)
    }

    /// Sum of independent distributions, moment matched
    pub fn add<'a>(dists: impl IntoIterator<Item = &'a LogNormalDist>) -> Self {
        let (mean, variance) = dists.into_iter().fold((0.0, 0.0), |(m, v), d| {
            let sd = d.sd();
            (m + d.mean(), v + sd * sd)
        });
        Self::from_mean_sd(mean, variance.sqrt())
    }

    /// Weighted mixture, moment matched. Weights need not sum to one; the
    /// remainder is treated as a point mass at zero.
    pub fn mixture(parts: impl IntoIterator<Item = (LogNormalDist, f64)>) -> Self {
        let (mean, second) = parts.into_iter().fold((0.0, 0.0), |(m, s), (d, w)| {
            let mean = d.mean();
            let sd = d.sd();
            (m + w * mean, s + w * (mean * mean + sd * sd))
        });
        let variance = (second - mean * mean).abs();
        Self::from_mean_sd(mean, variance.sqrt())
    }

    /// Weighted mixture of parallel slices
    pub fn add_weighted(dists: &[LogNormalDist], weights: &[f64]) -> Result<Self> {
        if dists.len() != weights.len() {
            return Err(SlatError::shape(
                "weighted distribution sum",
                dists.len(),
                weights.len(),
            ));
        }
        Ok(Self::mixture(dists.iter().copied().zip(weights.iter().copied())))
    }

    /// E[f(X)]
    pub fn expect(&self, integrator: &Integrator, f: impl Fn(f64) -> f64) -> f64 {
        if self.is_degenerate() {
            return f(self.median());
        }
        integrator.integrate(|x| {
            let density = self.pdf(x);
            if density == 0.0 {
                0.0
            } else {
                f(x) * density
            }
        })
    }
}

impl fmt::Display for LogNormalDist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lognormal(mean_x={}, sd_ln_x={})",
            self.mean(),
            self.sd_ln()
        )
    }
}
