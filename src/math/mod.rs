//! Numeric leaf layer: ranges, log-normal distributions and integration

pub mod integration;
pub mod lognormal;
pub mod range;

pub use integration::{IntegrationConfig, Integrator, SearchMethod};
pub use lognormal::{LogNormalDist, MuType, SigmaType};
pub use range::{frange, linrange, logrange};
