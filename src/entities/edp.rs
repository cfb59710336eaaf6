//! Engineering demand parameters conditioned on an intensity measure

use std::fmt;
use std::rc::Rc;

use crate::entities::im::IntensityMeasure;
use crate::entities::probfn::ProbFn;
use crate::math::integration::Integrator;
use crate::math::lognormal::LogNormalDist;

/// A demand whose distribution given the IM is a [`ProbFn`]
#[derive(Debug)]
pub struct DemandParameter {
    id: String,
    im: Rc<IntensityMeasure>,
    demand: Rc<ProbFn>,
}

impl DemandParameter {
    pub fn new(id: impl Into<String>, im: Rc<IntensityMeasure>, demand: Rc<ProbFn>) -> Self {
        Self {
            id: id.into(),
            im,
            demand,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn im(&self) -> &Rc<IntensityMeasure> {
        &self.im
    }

    pub fn demand(&self) -> &Rc<ProbFn> {
        &self.demand
    }

    /// Distribution of the demand at IM level `im`
    pub fn distribution(&self, im: f64) -> LogNormalDist {
        self.demand.distribution(im)
    }

    pub fn mean(&self, im: f64) -> f64 {
        self.demand.mean(im)
    }

    pub fn mean_ln(&self, im: f64) -> f64 {
        self.demand.mean_ln(im)
    }

    pub fn median(&self, im: f64) -> f64 {
        self.demand.median(im)
    }

    pub fn sd(&self, im: f64) -> f64 {
        self.demand.sd(im)
    }

    pub fn sd_ln(&self, im: f64) -> f64 {
        self.demand.sd_ln(im)
    }

    pub fn x_at_exceedence(&self, im: f64, p: f64) -> f64 {
        self.demand.x_at_exceedence(im, p)
    }

    /// Annual rate of the demand exceeding `y`.
    ///
    /// Collapse and demolition count as exceeding every demand level; with
    /// neither configured this is the plain compound of hazard and demand.
    pub fn lambda(&self, y: f64, integrator: &Integrator) -> f64 {
        integrator.integrate(|im| {
            let density = self.im.hazard_density(im);
            if density == 0.0 {
                return 0.0;
            }
            let repair = self.im.p_repair(im);
            let p = self.demand.p_exceeds(im, y) * repair + (1.0 - repair);
            p * density
        })
    }
}

impl fmt::Display for DemandParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: demand {} given IM {}", self.id, self.demand.id(), self.im.id())
    }
}
