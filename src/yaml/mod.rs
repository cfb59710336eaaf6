//! YAML handling for scripts

pub mod diagnostics;

pub use diagnostics::ScriptError;
