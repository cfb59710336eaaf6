//! Component groups: identical components sharing demand, fragility and loss
//!
//! Losses compose in a fixed order: the fragility function gives damage-state
//! probabilities at a demand level, the loss function turns those into a loss
//! distribution for the group, and integrating over the demand distribution at
//! an IM level gives the loss as a function of IM. Integrating that against
//! the hazard gives annual quantities.

use std::fmt;
use std::rc::Rc;

use crate::core::error::{Result, SlatError};
use crate::entities::edp::DemandParameter;
use crate::entities::fragility::{exact_states, FragilityFn};
use crate::entities::im::IntensityMeasure;
use crate::entities::lossfn::LossFn;
use crate::math::integration::Integrator;
use crate::math::lognormal::LogNormalDist;

/// Present-value factor for `years` of a unit annual loss at continuous
/// discount `rate`
pub fn discount_factor(years: f64, rate: f64) -> f64 {
    if rate == 0.0 {
        years
    } else {
        (1.0 - (-rate * years).exp()) / rate
    }
}

#[derive(Debug)]
pub struct ComponentGroup {
    id: String,
    edp: Rc<DemandParameter>,
    fragility: Rc<FragilityFn>,
    cost: Rc<LossFn>,
    delay: Option<Rc<LossFn>>,
    count: u32,
    cost_factor: f64,
    delay_factor: f64,
}

impl ComponentGroup {
    /// Fails with a shape mismatch unless the fragility, cost and delay
    /// functions all have the same number of damage states
    pub fn new(
        id: impl Into<String>,
        edp: Rc<DemandParameter>,
        fragility: Rc<FragilityFn>,
        cost: Rc<LossFn>,
        delay: Option<Rc<LossFn>>,
        count: u32,
    ) -> Result<Self> {
        let id = id.into();
        let n = fragility.size();
        if cost.size() != n {
            return Err(SlatError::shape(
                format!("cost function '{}' of component group '{}'", cost.id(), id),
                n,
                cost.size(),
            ));
        }
        if let Some(d) = &delay {
            if d.size() != n {
                return Err(SlatError::shape(
                    format!("delay function '{}' of component group '{}'", d.id(), id),
                    n,
                    d.size(),
                ));
            }
        }
        if count == 0 {
            return Err(SlatError::invalid(
                format!("count of component group '{}'", id),
                count,
                &["a positive integer"],
            ));
        }
        Ok(Self {
            id,
            edp,
            fragility,
            cost,
            delay,
            count,
            cost_factor: 1.0,
            delay_factor: 1.0,
        })
    }

    /// Scale expected cost and delay by constant factors
    pub fn with_factors(mut self, cost_factor: f64, delay_factor: f64) -> Result<Self> {
        for (name, factor) in [("cost_factor", cost_factor), ("delay_factor", delay_factor)] {
            if !(factor > 0.0 && factor.is_finite()) {
                return Err(SlatError::invalid(
                    format!("{} of component group '{}'", name, self.id),
                    factor,
                    &["a positive number"],
                ));
            }
        }
        self.cost_factor = cost_factor;
        self.delay_factor = delay_factor;
        Ok(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn edp(&self) -> &Rc<DemandParameter> {
        &self.edp
    }

    pub fn im(&self) -> &Rc<IntensityMeasure> {
        self.edp.im()
    }

    pub fn fragility(&self) -> &Rc<FragilityFn> {
        &self.fragility
    }

    pub fn cost(&self) -> &Rc<LossFn> {
        &self.cost
    }

    pub fn delay(&self) -> Option<&Rc<LossFn>> {
        self.delay.as_ref()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Number of damage states
    pub fn size(&self) -> usize {
        self.fragility.size()
    }

    fn delay_fn(&self) -> Result<&Rc<LossFn>> {
        self.delay.as_ref().ok_or_else(|| SlatError::NotConfigured {
            what: "delay function".to_string(),
            id: self.id.clone(),
        })
    }

    /// Group cost distribution at demand `edp`
    pub fn cost_dist_edp(&self, edp: f64) -> LogNormalDist {
        self.cost.loss_given(
            &self.fragility.p_highest(edp),
            self.count as f64 * self.cost_factor,
        )
    }

    pub fn e_cost_edp(&self, edp: f64) -> f64 {
        self.cost_dist_edp(edp).mean()
    }

    pub fn sd_ln_cost_edp(&self, edp: f64) -> f64 {
        self.cost_dist_edp(edp).sd_ln()
    }

    /// Group delay distribution at demand `edp`
    pub fn delay_dist_edp(&self, edp: f64) -> Result<LogNormalDist> {
        let delay = self.delay_fn()?;
        Ok(delay.loss_given(
            &self.fragility.p_highest(edp),
            self.count as f64 * self.delay_factor,
        ))
    }

    pub fn e_delay_edp(&self, edp: f64) -> Result<f64> {
        Ok(self.delay_dist_edp(edp)?.mean())
    }

    pub fn sd_ln_delay_edp(&self, edp: f64) -> Result<f64> {
        Ok(self.delay_dist_edp(edp)?.sd_ln())
    }

    /// Moment-match a demand-conditional loss over the demand at `im`
    fn loss_dist_im(
        &self,
        im: f64,
        integrator: &Integrator,
        at_edp: impl Fn(f64) -> LogNormalDist,
    ) -> LogNormalDist {
        let demand = self.edp.distribution(im);
        let mean = demand.expect(integrator, |e| at_edp(e).mean());
        let second = demand.expect(integrator, |e| {
            let d = at_edp(e);
            let (m, s) = (d.mean(), d.sd());
            m * m + s * s
        });
        let mut sd = (second - mean * mean).sqrt();
        if sd.is_nan() {
            sd = 0.0;
        }
        LogNormalDist::from_mean_sd(mean, sd)
    }

    /// Group cost distribution at IM level `im`
    pub fn cost_dist_im(&self, im: f64, integrator: &Integrator) -> LogNormalDist {
        self.loss_dist_im(im, integrator, |e| self.cost_dist_edp(e))
    }

    pub fn e_cost_im(&self, im: f64, integrator: &Integrator) -> f64 {
        let demand = self.edp.distribution(im);
        demand.expect(integrator, |e| self.e_cost_edp(e))
    }

    pub fn sd_ln_cost_im(&self, im: f64, integrator: &Integrator) -> f64 {
        self.cost_dist_im(im, integrator).sd_ln()
    }

    /// Group delay distribution at IM level `im`
    pub fn delay_dist_im(&self, im: f64, integrator: &Integrator) -> Result<LogNormalDist> {
        let delay = self.delay_fn()?;
        let count = self.count as f64 * self.delay_factor;
        Ok(self.loss_dist_im(im, integrator, |e| {
            delay.loss_given(&self.fragility.p_highest(e), count)
        }))
    }

    pub fn e_delay_im(&self, im: f64, integrator: &Integrator) -> Result<f64> {
        Ok(self.delay_dist_im(im, integrator)?.mean())
    }

    pub fn sd_ln_delay_im(&self, im: f64, integrator: &Integrator) -> Result<f64> {
        Ok(self.delay_dist_im(im, integrator)?.sd_ln())
    }

    /// P(DS >= i | IM = im) for each state
    pub fn p_exceeded_im(&self, im: f64, integrator: &Integrator) -> Vec<f64> {
        let demand = self.edp.distribution(im);
        let mut bound = 1.0f64;
        self.fragility
            .onsets()
            .iter()
            .map(|onset| {
                let p = demand.expect(integrator, |e| onset.p_at_most(e));
                bound = bound.min(p);
                bound
            })
            .collect()
    }

    /// P(DS = i | IM = im): the highest state reached, per state
    pub fn p_ds_im(&self, im: f64, integrator: &Integrator) -> Vec<f64> {
        exact_states(&self.p_exceeded_im(im, integrator))
    }

    /// P(DS = state | IM = im) for a single state, as given by [`Self::p_ds_im`]
    fn p_state_im(&self, state: usize, im: f64, integrator: &Integrator) -> f64 {
        self.p_ds_im(im, integrator).get(state).copied().unwrap_or(0.0)
    }

    /// Expected annual occurrences of each damage state
    pub fn rate(&self, integrator: &Integrator) -> Vec<f64> {
        let im = self.im();
        (0..self.size())
            .map(|state| {
                integrator.integrate(|x| {
                    let density = im.hazard_density(x);
                    if density == 0.0 {
                        0.0
                    } else {
                        density * self.p_state_im(state, x, integrator)
                    }
                })
            })
            .collect()
    }

    /// Expected annual loss
    pub fn e_annual_cost(&self, integrator: &Integrator) -> f64 {
        let im = self.im();
        integrator.integrate(|x| {
            let density = im.hazard_density(x);
            if density == 0.0 {
                0.0
            } else {
                density * self.e_cost_im(x, integrator)
            }
        })
    }

    /// Expected present value of losses over `years` at discount `rate`
    pub fn e_cost(&self, years: f64, rate: f64, integrator: &Integrator) -> f64 {
        discount_factor(years, rate) * self.e_annual_cost(integrator)
    }

    /// Annual rate of the group loss exceeding `cost`
    pub fn lambda_cost(&self, cost: f64, integrator: &Integrator) -> f64 {
        let im = self.im();
        integrator.integrate(|x| {
            let density = im.hazard_density(x);
            if density == 0.0 {
                0.0
            } else {
                density * self.cost_dist_im(x, integrator).p_at_least(cost)
            }
        })
    }
}

impl fmt::Display for ComponentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} x (edp {}, fragility {}, cost {}",
            self.id,
            self.count,
            self.edp.id(),
            self.fragility.id(),
            self.cost.id()
        )?;
        if let Some(d) = &self.delay {
            write!(f, ", delay {}", d.id())?;
        }
        write!(f, ")")
    }
}
