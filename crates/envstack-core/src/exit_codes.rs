//! Exit codes for the envstack CLI.
//!
//! Exit code ranges:
//! - 0-1: Outcomes (clean, or settings that fail validation)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors

use crate::error::StackError;

/// Exit codes for envstack operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    /// Merged settings violate a registered schema
    Invalid = 1,

    /// Invalid arguments
    ArgsError = 10,

    /// A configuration source could not be loaded
    ConfigError = 11,

    /// A value does not fit its schema
    SchemaError = 12,

    /// Requested key, layer or capability does not exist
    LookupError = 13,

    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Error code name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::Invalid => "OK_INVALID",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::SchemaError => "ERR_SCHEMA",
            ExitCode::LookupError => "ERR_LOOKUP",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&StackError> for ExitCode {
    fn from(err: &StackError) -> Self {
        use envstack_config::ConfigError as Config;
        match err {
            StackError::Config(Config::Io { .. }) => ExitCode::IoError,
            StackError::Config(_) => ExitCode::ConfigError,
            StackError::Schema(_) | StackError::SchemaMissing { .. } => ExitCode::SchemaError,
            StackError::EnvironmentNotFound | StackError::CapabilityNotFound { .. } => {
                ExitCode::LookupError
            }
            StackError::StackUnderflow { .. } => ExitCode::ArgsError,
            StackError::Construction { .. } | StackError::StackBusy => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
