//! Intensity measures: hazard curves with optional collapse and demolition

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::core::error::{Result, SlatError};
use crate::entities::detfn::DetFn;
use crate::math::integration::Integrator;
use crate::math::lognormal::LogNormalDist;

/// Probabilities of the three mutually exclusive outcomes at one IM level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fates {
    pub repair: f64,
    pub demolition: f64,
    pub collapse: f64,
}

/// An intensity measure: annual rate of exceedance as a function of IM level
#[derive(Debug)]
pub struct IntensityMeasure {
    id: String,
    rate: Rc<DetFn>,
    collapse: Cell<Option<LogNormalDist>>,
    demolition: Cell<Option<LogNormalDist>>,
}

impl IntensityMeasure {
    pub fn new(id: impl Into<String>, rate: Rc<DetFn>) -> Self {
        Self {
            id: id.into(),
            rate,
            collapse: Cell::new(None),
            demolition: Cell::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rate_function(&self) -> &Rc<DetFn> {
        &self.rate
    }

    /// Annual rate of exceeding `x`
    pub fn lambda(&self, x: f64) -> f64 {
        self.rate.value_at(x)
    }

    pub fn derivative_at(&self, x: f64) -> f64 {
        self.rate.derivative_at(x)
    }

    /// |d lambda / d im|, the hazard density used to integrate over IM
    pub fn hazard_density(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        self.derivative_at(x).abs()
    }

    pub fn set_collapse(&self, dist: LogNormalDist) -> Result<()> {
        set_once(&self.collapse, dist, "collapse", &self.id)
    }

    pub fn set_demolition(&self, dist: LogNormalDist) -> Result<()> {
        set_once(&self.demolition, dist, "demolition", &self.id)
    }

    pub fn collapse(&self) -> Option<LogNormalDist> {
        self.collapse.get()
    }

    pub fn demolition(&self) -> Option<LogNormalDist> {
        self.demolition.get()
    }

    /// P(collapse | IM = x)
    pub fn p_collapse(&self, x: f64) -> Result<f64> {
        let dist = self.collapse.get().ok_or_else(|| self.not_configured("collapse"))?;
        Ok(dist.p_at_most(x))
    }

    /// P(demolition without collapse | IM = x)
    pub fn p_demolition(&self, x: f64) -> Result<f64> {
        if self.demolition.get().is_none() {
            return Err(self.not_configured("demolition"));
        }
        Ok(self.fates(x).demolition)
    }

    /// Fate probabilities, treating unset curves as impossible outcomes
    pub fn fates(&self, x: f64) -> Fates {
        let collapse = self.collapse.get().map_or(0.0, |d| d.p_at_most(x));
        let demolition = self
            .demolition
            .get()
            .map_or(0.0, |d| (d.p_at_most(x) - collapse).max(0.0));
        Fates {
            repair: 1.0 - (demolition + collapse),
            demolition,
            collapse,
        }
    }

    pub fn p_repair(&self, x: f64) -> f64 {
        self.fates(x).repair
    }

    /// Annual rate of collapse
    pub fn collapse_rate(&self, integrator: &Integrator) -> Result<f64> {
        let dist = self.collapse.get().ok_or_else(|| self.not_configured("collapse"))?;
        Ok(integrator.integrate(|x| self.hazard_density(x) * dist.p_at_most(x)))
    }

    /// Annual rate of demolition
    pub fn demolition_rate(&self, integrator: &Integrator) -> Result<f64> {
        if self.demolition.get().is_none() {
            return Err(self.not_configured("demolition"));
        }
        Ok(integrator.integrate(|x| self.hazard_density(x) * self.fates(x).demolition))
    }

    fn not_configured(&self, what: &str) -> SlatError {
        SlatError::NotConfigured {
            what: what.to_string(),
            id: self.id.clone(),
        }
    }
}

fn set_once(
    slot: &Cell<Option<LogNormalDist>>,
    dist: LogNormalDist,
    what: &str,
    id: &str,
) -> Result<()> {
    if slot.get().is_some() {
        return Err(SlatError::AlreadyConfigured {
            what: what.to_string(),
            id: id.to_string(),
        });
    }
    slot.set(Some(dist));
    Ok(())
}

impl fmt::Display for IntensityMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: rate from {}", self.id, self.rate.id().unwrap_or("<anonymous>"))?;
        if let Some(c) = self.collapse.get() {
            write!(f, ", collapse {}", c)?;
        }
        if let Some(d) = self.demolition.get() {
            write!(f, ", demolition {}", d)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::detfn::{DetFnKind, DetFnParams};
    use crate::math::integration::IntegrationConfig;

    fn hazard() -> IntensityMeasure {
        let f = DetFn::new(
            Some("IM_FUNC".into()),
            DetFnKind::Hyperbolic,
            DetFnParams::Formula(vec![1221.0, 29.8, 62.2]),
        )
        .unwrap();
        IntensityMeasure::new("IM_1", Rc::new(f))
    }

    #[test]
    fn test_lambda_is_non_increasing() {
        let im = hazard();
        let values: Vec<f64> = (1..40).map(|k| im.lambda(k as f64 * 0.05)).collect();
        assert!(values.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_unset_curves_are_state_errors() {
        let im = hazard();
        assert!(matches!(im.p_collapse(0.5), Err(SlatError::NotConfigured { .. })));
        assert!(matches!(im.p_demolition(0.5), Err(SlatError::NotConfigured { .. })));
        let integrator = Integrator::new(IntegrationConfig::default());
        assert!(im.collapse_rate(&integrator).is_err());
        assert!(im.demolition_rate(&integrator).is_err());
        assert_eq!(im.p_repair(0.5), 1.0);
    }

    #[test]
    fn test_collapse_is_set_once() {
        let im = hazard();
        im.set_collapse(LogNormalDist::from_median_sigma_ln(1.2, 0.47)).unwrap();
        let again = im.set_collapse(LogNormalDist::from_median_sigma_ln(1.0, 0.4));
        assert!(matches!(again, Err(SlatError::AlreadyConfigured { .. })));
        assert!((im.p_collapse(1.2).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_fates_partition_unity() {
        let im = hazard();
        im.set_collapse(LogNormalDist::from_median_sigma_ln(1.2, 0.47)).unwrap();
        im.set_demolition(LogNormalDist::from_median_sigma_ln(0.9, 0.5)).unwrap();
        for x in [0.1, 0.5, 0.9, 1.5, 3.0] {
            let f = im.fates(x);
            assert!(f.demolition >= 0.0 && f.collapse >= 0.0 && f.repair >= 0.0);
            assert!((f.repair + f.demolition + f.collapse - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_collapse_rate_bounded_by_hazard() {
        let im = hazard();
        im.set_collapse(LogNormalDist::from_median_sigma_ln(1.2, 0.47)).unwrap();
        let integrator = Integrator::new(IntegrationConfig::default());
        let rate = im.collapse_rate(&integrator).unwrap();
        assert!(rate > 0.0);
        assert!(rate < im.lambda(0.01));
    }
}
