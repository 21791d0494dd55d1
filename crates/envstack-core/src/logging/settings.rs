//! The `logging` section of the merged settings.

use std::rc::Rc;
use std::sync::Arc;

use envstack_config::{Schema, ValueType};
use serde_json::json;

use super::config::{LogConfig, LogFormat, LogLevel};
use crate::capability::{Declaration, Plugin};
use crate::client::{Property, PropertyClient, StackClient, ValueCache};
use crate::error::StackResult;
use crate::stack::EnvironmentStack;

/// Root key of the logging section.
pub const LOGGING_KEY: &str = "logging";

pub const VERBOSITY: Property<String> = Property::new("verbosity");
pub const FORMAT: Property<String> = Property::new("format");
pub const DISABLE: Property<bool> = Property::new("disable");
pub const TIMESTAMPS: Property<bool> = Property::new("timestamps");

/// Stack client reading logging preferences from the merged settings.
///
/// ```yaml
/// logging:
///   verbosity: debug
///   format: jsonl
///   timestamps: false
/// ```
#[derive(Debug)]
pub struct LogSettings {
    schema: Arc<Schema>,
    cache: ValueCache,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSettings {
    pub fn new() -> Self {
        Self {
            schema: Arc::new(Self::schema_definition()),
            cache: ValueCache::new(),
        }
    }

    /// Schema of the `logging` section; defaults mirror [`LogConfig::default`].
    pub fn schema_definition() -> Schema {
        Schema::builder(LOGGING_KEY)
            .leaf_with_default(
                "verbosity",
                ValueType::choice(["trace", "debug", "info", "warn", "error", "off"]),
                json!("info"),
            )
            .leaf_with_default("format", ValueType::choice(["human", "jsonl"]), json!("human"))
            .leaf_with_default("disable", ValueType::Bool, json!(false))
            .leaf_with_default("timestamps", ValueType::Bool, json!(true))
            .build()
    }

    /// `base` refined by the merged settings of `stack`.
    pub fn apply(&self, stack: &mut EnvironmentStack, base: LogConfig) -> StackResult<LogConfig> {
        let verbosity = VERBOSITY.get(self, stack)?;
        let format = FORMAT.get(self, stack)?;
        let mut config = base.with_timestamps(TIMESTAMPS.get(self, stack)?);
        if let Ok(level) = verbosity.parse::<LogLevel>() {
            config = config.with_level(level);
        }
        if let Ok(format) = format.parse::<LogFormat>() {
            config = config.with_format(format);
        }
        if DISABLE.get(self, stack)? {
            config = config.with_level(LogLevel::Off);
        }
        Ok(config)
    }
}

impl Plugin for LogSettings {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration.provides::<dyn StackClient>(|it| it as Rc<dyn StackClient>);
    }
}

impl StackClient for LogSettings {
    fn schema(&self) -> StackResult<Arc<Schema>> {
        Ok(Arc::clone(&self.schema))
    }
}

impl PropertyClient for LogSettings {
    fn value_cache(&self) -> &ValueCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;

    #[test]
    fn test_defaults_keep_base() {
        let mut stack = EnvironmentStack::new();
        let config = LogSettings::new().apply(&mut stack, LogConfig::default()).unwrap();
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_settings_refine_config() {
        let mut stack = EnvironmentStack::new();
        stack
            .push("user")
            .set_value("logging.verbosity", json!("DEBUG"))
            .set_value("logging.format", json!("jsonl"))
            .set_value("logging.timestamps", json!("no"));
        let config = LogSettings::new().apply(&mut stack, LogConfig::default()).unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Jsonl);
        assert!(!config.timestamps);
    }

    #[test]
    fn test_disable_silences() {
        let mut stack = EnvironmentStack::new();
        stack.push("user").set_value("logging.disable", json!(true));
        let config = LogSettings::new().apply(&mut stack, LogConfig::default()).unwrap();
        assert_eq!(config.level, LogLevel::Off);
    }

    #[test]
    fn test_invalid_verbosity() {
        let mut stack = EnvironmentStack::new();
        stack.push("user").set_value("logging.verbosity", json!("LOUD"));
        let err = LogSettings::new()
            .apply(&mut stack, LogConfig::default())
            .unwrap_err();
        assert!(matches!(err, StackError::Schema(_)));
    }

    #[test]
    fn test_registered_settings_contribute_schema() {
        let mut stack = EnvironmentStack::new();
        stack.register_instance(Rc::new(LogSettings::new()));
        let validator = stack.schema_validator().unwrap();
        assert_eq!(validator.len(), 1);
        assert_eq!(validator.iter().next().unwrap().key(), LOGGING_KEY);
    }
}
