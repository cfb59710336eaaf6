//! Scripts: parsing and executing command lists

pub mod command;
pub mod import;
pub mod interpreter;

pub use command::{Command, Script};
pub use interpreter::{execute, run, Mode};
