//! SLAT: Seismic Loss Assessment Tool
//!
//! Runs loss-analysis scripts: a script defines hazard curves, demand models,
//! fragility and loss functions, groups of components and structures, then
//! attaches recorders that tabulate derived quantities to the console or to
//! files.

pub mod cli;
pub mod core;
pub mod entities;
pub mod math;
pub mod recorder;
pub mod script;
pub mod yaml;
