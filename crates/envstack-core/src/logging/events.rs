//! Event names and levels for structured logging.
//!
//! Library code tags its tracing events with an `event` field taken from
//! [`event_names`]; the JSONL layer reports it as the event name.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Stack mutation
    pub const STACK_PUSHED: &str = "stack.pushed";
    pub const STACK_POPPED: &str = "stack.popped";
    pub const STACK_RESET: &str = "stack.reset";
    pub const STACK_REPLACED: &str = "stack.replaced";
    pub const SETTINGS_MERGED: &str = "stack.settings_merged";

    // Registry
    pub const INSTANCE_CREATED: &str = "registry.instance_created";
    pub const AUTO_REGISTER_SUPPRESSED: &str = "registry.auto_register_suppressed";
    pub const AUTO_REGISTER_SKIPPED: &str = "registry.auto_register_skipped";

    // Config loading
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_ERROR: &str = "config.error";
    pub const CONFIG_INVALID: &str = "config.invalid";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_tracing() {
        assert_eq!(Level::from(tracing::Level::INFO), Level::Info);
        assert_eq!(Level::from(tracing::Level::DEBUG), Level::Debug);
        assert_eq!(Level::from(tracing::Level::WARN), Level::Warn);
        assert_eq!(Level::from(tracing::Level::ERROR), Level::Error);
    }

    #[test]
    fn test_level_serialization() {
        assert_eq!(serde_json::to_string(&Level::Warn).unwrap(), "\"warn\"");
    }
}
