//! Error types for configuration loading and rotation compilation

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a simulator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("runes: unknown rune '{0}'")]
    UnknownRune(String),

    #[error("runes: rune '{name}' is {actual} but listed under {listed}")]
    RuneRarityMismatch {
        name: String,
        actual: String,
        listed: String,
    },

    #[error("runes: rune '{0}' selected more than once")]
    DuplicateRune(String),

    #[error("runes: {rarity} selections exceed limit ({count} > {limit})")]
    RuneLimitExceeded {
        rarity: String,
        count: usize,
        limit: usize,
    },
}

/// Errors raised while loading or compiling a rotation document.
///
/// Every failure is fatal to compilation. Wrapping variants carry the
/// document path and entry position so authors can find the fault.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("failed to read rotation {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rotation {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("rotation import cycle detected at {0}")]
    ImportCycle(PathBuf),

    #[error("{path}: rotation entry {index}: {source}")]
    Entry {
        path: PathBuf,
        index: usize,
        #[source]
        source: Box<RotationError>,
    },

    #[error("macro step {index}: {source}")]
    Step {
        index: usize,
        #[source]
        source: Box<RotationError>,
    },

    #[error("{context}: {source}")]
    Condition {
        context: String,
        #[source]
        source: Box<RotationError>,
    },

    #[error("unknown spell '{0}'")]
    UnknownSpell(String),

    #[error("unknown buff '{0}'")]
    UnknownBuff(String),

    #[error("unknown debuff '{0}'")]
    UnknownDebuff(String),

    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    #[error("unknown item '{0}'")]
    UnknownItem(String),

    #[error("unknown condition '{0}'")]
    UnknownCondition(String),

    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("variable '{0}' not defined")]
    UndefinedVariable(String),

    #[error("invalid value for '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("unsupported action '{0}'")]
    UnsupportedAction(String),

    #[error("{0}")]
    Malformed(String),
}

impl RotationError {
    /// Wrap an error with the `all`/`any`/`not`/`condition N` path it came from.
    pub fn in_condition(self, context: impl Into<String>) -> Self {
        RotationError::Condition {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Top-level error for the library surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rotation(#[from] RotationError),

    #[error("failed to write output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Batch(String),
}

pub type Result<T> = std::result::Result<T, Error>;
