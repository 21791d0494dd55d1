//! Errors raised by the environment stack and its registry.

use envstack_config::{ConfigError, SchemaError};
use thiserror::Error;

/// Result alias for stack operations.
pub type StackResult<T> = Result<T, StackError>;

#[derive(Error, Debug)]
pub enum StackError {
    /// Popping would leave fewer than one layer, or the target size is out of range.
    #[error("Cannot reduce stack of {len} layer(s) to {requested}")]
    StackUnderflow { len: usize, requested: usize },

    #[error("No environment matches the given predicate")]
    EnvironmentNotFound,

    #[error("No registered instance provides {capability}")]
    CapabilityNotFound { capability: &'static str },

    #[error("Client {client} has no schema")]
    SchemaMissing { client: String },

    #[error("Failed to construct {type_name}: {message}")]
    Construction {
        type_name: &'static str,
        message: String,
    },

    /// The current stack is borrowed further up the call chain.
    #[error("The current stack is in use and cannot be read here")]
    StackBusy,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StackError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            StackError::StackUnderflow { .. } => 80,
            StackError::EnvironmentNotFound => 81,
            StackError::CapabilityNotFound { .. } => 82,
            StackError::SchemaMissing { .. } => 83,
            StackError::Construction { .. } => 84,
            StackError::StackBusy => 85,
            StackError::Schema(err) => err.code(),
            StackError::Config(err) => err.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underflow_display() {
        let err = StackError::StackUnderflow {
            len: 1,
            requested: 0,
        };
        assert_eq!(err.to_string(), "Cannot reduce stack of 1 layer(s) to 0");
        assert_eq!(err.code(), 80);
    }

    #[test]
    fn test_wrapped_codes_pass_through() {
        let err: StackError = SchemaError::UnknownPath { path: "a".into() }.into();
        assert_eq!(err.code(), 72);
        assert_eq!(err.to_string(), "No schema value at 'a'");
    }

    #[test]
    fn test_busy_code() {
        assert_eq!(StackError::StackBusy.code(), 85);
    }
}
