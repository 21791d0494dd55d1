//! Envstack Core Library
//!
//! Layered configuration with a capability registry:
//! - [`Environment`]: one named layer of settings plus registered objects
//! - [`EnvironmentStack`]: ordered layers with a cached merged view
//! - Capability lookups across layers (newest first)
//! - Schema-typed settings access for stack clients
//! - Structured logging and CLI exit codes
//!
//! The binary entry point is in `main.rs`.

pub mod capability;
pub mod client;
pub mod context;
pub mod environment;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod stack;

pub use capability::{CapabilityId, Construct, Declaration, Entry, Instance, Plugin, PluginType};
pub use client::{Property, PropertyClient, StackClient, ValueCache};
pub use environment::Environment;
pub use error::{StackError, StackResult};
pub use exit_codes::ExitCode;
pub use stack::{may_create, CacheState, EnvironmentStack, LayerReport, StackReport, BASE_LAYER};
