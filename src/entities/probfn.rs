//! Log-normal functions whose parameters vary with an input variable

use std::fmt;
use std::rc::Rc;

use crate::entities::detfn::DetFn;
use crate::math::lognormal::{LogNormalDist, MuType, SigmaType};

/// A log-normal distribution of Y given x, with location and dispersion
/// each given by a deterministic function of x.
#[derive(Debug, Clone)]
pub struct ProbFn {
    id: String,
    mu: (MuType, Rc<DetFn>),
    sigma: (SigmaType, Rc<DetFn>),
}

impl ProbFn {
    pub fn new(
        id: impl Into<String>,
        mu_type: MuType,
        mu_fn: Rc<DetFn>,
        sigma_type: SigmaType,
        sigma_fn: Rc<DetFn>,
    ) -> Self {
        Self {
            id: id.into(),
            mu: (mu_type, mu_fn),
            sigma: (sigma_type, sigma_fn),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mu_type(&self) -> MuType {
        self.mu.0
    }

    pub fn sigma_type(&self) -> SigmaType {
        self.sigma.0
    }

    /// The distribution of Y at `x`
    pub fn distribution(&self, x: f64) -> LogNormalDist {
        LogNormalDist::from_parameters(
            self.mu.1.value_at(x),
            self.mu.0,
            self.sigma.1.value_at(x),
            self.sigma.0,
        )
    }

    pub fn mean(&self, x: f64) -> f64 {
        self.distribution(x).mean()
    }

    pub fn mean_ln(&self, x: f64) -> f64 {
        self.distribution(x).mean_ln()
    }

    pub fn median(&self, x: f64) -> f64 {
        self.distribution(x).median()
    }

    pub fn sd(&self, x: f64) -> f64 {
        self.distribution(x).sd()
    }

    pub fn sd_ln(&self, x: f64) -> f64 {
        self.distribution(x).sd_ln()
    }

    /// The y for which P(Y > y | x) = p
    pub fn x_at_exceedence(&self, x: f64, p: f64) -> f64 {
        self.distribution(x).x_at_exceedence(p)
    }

    /// P(Y > y | x)
    pub fn p_exceeds(&self, x: f64, y: f64) -> f64 {
        self.distribution(x).p_at_least(y)
    }
}

impl fmt::Display for ProbFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: lognormal, {} from {}, {} from {}",
            self.id,
            self.mu.0,
            self.mu.1.id().unwrap_or("<anonymous>"),
            self.sigma.0,
            self.sigma.1.id().unwrap_or("<anonymous>")
        )
    }
}
