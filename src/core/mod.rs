//! Core module - fundamental types and utilities

pub mod config;
pub mod error;
pub mod identity;
pub mod registry;
pub mod session;

pub use config::Config;
pub use error::{Result, SlatError};
pub use identity::EntityKind;
pub use registry::Registry;
pub use session::Session;
