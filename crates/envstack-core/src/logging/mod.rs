//! Structured logging for envstack.
//!
//! Two output formats share one filter:
//! - Human: compact console lines on stderr
//! - JSONL: one JSON object per event on stderr, see [`JsonlLayer`]
//!
//! Library code emits plain `tracing` events tagged with an `event` field
//! from [`event_names`]; nothing is printed until a subscriber is installed
//! with [`init_logging`].

pub mod config;
pub mod events;
pub mod layer;
pub mod settings;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level};
pub use layer::JsonlLayer;
pub use settings::LogSettings;

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Build the event filter: `RUST_LOG` when set, otherwise the configured level.
fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("envstack={}", config.level)))
}

/// Install the global subscriber.
///
/// Returns false when a subscriber was already installed.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = build_filter(config);

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
                    .is_ok()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
                    .is_ok()
            }
        }
        LogFormat::Jsonl => tracing_subscriber::registry()
            .with(filter)
            .with(JsonlLayer::stderr())
            .try_init()
            .is_ok(),
    }
}

/// Generate a run ID for correlating the events of one invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("run-{}", &uuid.simple().to_string()[..12])
}
