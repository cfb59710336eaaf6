//! Entity type definitions
//!
//! SLAT models seismic loss with the following entity types, each depending
//! only on the ones listed before it:
//!
//! - [`DetFn`] - Deterministic functions of one variable
//! - [`ProbFn`] - Log-normal distributions whose parameters are DetFns
//! - [`IntensityMeasure`] - Hazard curves with optional collapse and demolition
//! - [`DemandParameter`] - Structural response conditional on an IM
//! - [`FragilityFn`] - Damage-state onset distributions over demand
//! - [`LossFn`] - Per damage-state cost or delay distributions
//! - [`ComponentGroup`] - Identical components sharing demand, fragility and loss
//! - [`Structure`] - Component groups combined into one building

pub mod compgroup;
pub mod detfn;
pub mod edp;
pub mod fragility;
pub mod im;
pub mod lossfn;
pub mod probfn;
pub mod structure;

pub use compgroup::ComponentGroup;
pub use detfn::DetFn;
pub use edp::DemandParameter;
pub use fragility::FragilityFn;
pub use im::IntensityMeasure;
pub use lossfn::LossFn;
pub use probfn::ProbFn;
pub use structure::Structure;
