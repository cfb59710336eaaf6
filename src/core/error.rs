//! Error taxonomy for script execution and numeric evaluation

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::identity::EntityKind;
use crate::yaml::diagnostics::ScriptError;

/// Every failure a SLAT script can raise
#[derive(Debug, Error, Diagnostic)]
pub enum SlatError {
    /// An id was referenced before it was defined
    #[error("undefined {kind} '{id}'")]
    #[diagnostic(
        code(slat::definition::undefined),
        help("define the {kind} before any command that refers to it")
    )]
    UndefinedReference { kind: EntityKind, id: String },

    /// Two sequences that must agree in length do not
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    #[diagnostic(code(slat::shape))]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    /// A component group's IM differs from the one its structure already uses
    #[error("structure '{structure}' uses IM '{expected}', but group '{group}' uses IM '{found}'")]
    #[diagnostic(
        code(slat::structure::inconsistent_im),
        help("all component groups of a structure must be driven by the same IM")
    )]
    InconsistentIm {
        structure: String,
        group: String,
        expected: String,
        found: String,
    },

    /// A recorder kind that evaluates over a grid was given none
    #[error("recorder '{recorder}' of kind '{kind}' requires an evaluation grid ('at')")]
    #[diagnostic(code(slat::recorder::missing_grid))]
    MissingGrid { recorder: String, kind: String },

    /// A required option is absent
    #[error("recorder '{recorder}' requires option '{option}'")]
    #[diagnostic(code(slat::recorder::missing_option))]
    MissingOption { recorder: String, option: String },

    /// The recorder kind cannot be applied to the entity it names
    #[error("recorder '{recorder}' of kind '{kind}' needs a {expected} target, but '{target}' is a {found}")]
    #[diagnostic(code(slat::recorder::target))]
    TargetMismatch {
        recorder: String,
        kind: String,
        target: String,
        expected: EntityKind,
        found: EntityKind,
    },

    /// An optional part of an entity was used before it was set
    #[error("{what} is not configured for '{id}'")]
    #[diagnostic(code(slat::state::not_configured))]
    NotConfigured { what: String, id: String },

    /// A set-once part of an entity was set twice
    #[error("{what} is already configured for '{id}'")]
    #[diagnostic(code(slat::state::already_configured))]
    AlreadyConfigured { what: String, id: String },

    /// A structure was asked for IM-dependent results before any group was added
    #[error("structure '{id}' has no component groups")]
    #[diagnostic(code(slat::structure::empty))]
    NoComponentGroups { id: String },

    /// An enum-like tag or parameter value is not recognized
    #[error("invalid {what}: '{value}'")]
    #[diagnostic(code(slat::value), help("valid values: {valid}"))]
    InvalidValue {
        what: String,
        value: String,
        valid: String,
    },

    /// A numeric argument is outside the domain of the operation
    #[error("{message}")]
    #[diagnostic(code(slat::domain))]
    Domain { message: String },

    /// A recorder column selector is not recognized
    #[error("recorder '{recorder}' has an unrecognized column '{column}'")]
    #[diagnostic(
        code(slat::recorder::column),
        help("use mean_x, mean_ln_x, median_x, sd_x, sd_ln_x or an exceedance probability")
    )]
    Column { recorder: String, column: String },

    /// A file could not be read or written
    #[error("cannot access '{path}'")]
    #[diagnostic(code(slat::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output could not be written to the console or an in-memory sink
    #[error("failed to write output")]
    #[diagnostic(code(slat::io::write))]
    Write(#[from] std::io::Error),

    /// CSV or JSON encoding of a table failed
    #[error("failed to encode table: {0}")]
    #[diagnostic(code(slat::io::encode))]
    Encode(String),

    /// A script could not be parsed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Script(#[from] ScriptError),

    /// A command failed; wraps the underlying error with its position
    #[error("command #{index} ({command}) failed")]
    #[diagnostic(code(slat::command))]
    InCommand {
        index: usize,
        command: &'static str,
        #[source]
        #[diagnostic_source]
        source: CommandCause,
    },
}

/// The error a failed command raised, keeping its code and help visible
#[derive(Debug, Error, Diagnostic)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct CommandCause(Box<SlatError>);

impl SlatError {
    /// Wrap `source` with the position and name of the command that raised it
    pub fn in_command(index: usize, command: &'static str, source: SlatError) -> Self {
        SlatError::InCommand {
            index,
            command,
            source: CommandCause(Box::new(source)),
        }
    }

    /// Shorthand for a [`SlatError::ShapeMismatch`]
    pub fn shape(context: impl Into<String>, expected: usize, found: usize) -> Self {
        SlatError::ShapeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }

    /// Shorthand for a [`SlatError::InvalidValue`]
    pub fn invalid(what: impl Into<String>, value: impl ToString, valid: &[&str]) -> Self {
        SlatError::InvalidValue {
            what: what.into(),
            value: value.to_string(),
            valid: valid.join(", "),
        }
    }

    /// Shorthand for a [`SlatError::Domain`]
    pub fn domain(message: impl Into<String>) -> Self {
        SlatError::Domain {
            message: message.into(),
        }
    }

    /// Attach a file path to an IO error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SlatError::Io {
            path: path.into(),
            source,
        }
    }

    /// The innermost error, skipping command wrappers
    pub fn root(&self) -> &SlatError {
        match self {
            SlatError::InCommand { source, .. } => source.0.root(),
            other => other,
        }
    }
}

impl From<csv::Error> for SlatError {
    fn from(err: csv::Error) -> Self {
        SlatError::Encode(err.to_string())
    }
}

impl From<serde_json::Error> for SlatError {
    fn from(err: serde_json::Error) -> Self {
        SlatError::Encode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SlatError>;
