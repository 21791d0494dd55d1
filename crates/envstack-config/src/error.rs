//! Configuration loading and schema errors.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result alias for schema resolution.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while turning files on disk into configuration trees.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported configuration format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("Top level of {path} must be a mapping, found {found}")]
    NotAMapping { path: PathBuf, found: &'static str },
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::Io { .. } => 60,
            ConfigError::Parse { .. } => 61,
            ConfigError::UnsupportedFormat { .. } => 62,
            ConfigError::NotAMapping { .. } => 63,
        }
    }
}

/// Errors raised while coercing merged values through a schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Cannot coerce {found} at '{path}' to {expected}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Invalid value '{value}' at '{path}', expected one of: {allowed}")]
    InvalidChoice {
        path: String,
        value: String,
        allowed: String,
    },

    #[error("No schema value at '{path}'")]
    UnknownPath { path: String },

    #[error("Failed to deserialize '{path}': {message}")]
    Deserialize { path: String, message: String },
}

impl SchemaError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            SchemaError::TypeMismatch { .. } => 70,
            SchemaError::InvalidChoice { .. } => 71,
            SchemaError::UnknownPath { .. } => 72,
            SchemaError::Deserialize { .. } => 73,
        }
    }

    /// The key path the error refers to.
    pub fn path(&self) -> &str {
        match self {
            SchemaError::TypeMismatch { path, .. }
            | SchemaError::InvalidChoice { path, .. }
            | SchemaError::UnknownPath { path }
            | SchemaError::Deserialize { path, .. } => path,
        }
    }
}
