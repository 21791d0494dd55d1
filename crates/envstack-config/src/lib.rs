//! Layered configuration for envstack.
//!
//! This crate provides:
//! - The configuration tree and dotted key paths
//! - The merge engine folding layers with forced-override and null-safety rules
//! - Schemas with typed coercion and an aggregate validator
//! - YAML/JSON/TOML loading and configuration source discovery

pub mod error;
pub mod loader;
pub mod merge;
pub mod resolve;
pub mod schema;
pub mod tree;
pub mod validator;

pub use error::{ConfigError, ConfigResult, SchemaError, SchemaResult};
pub use loader::{load_dir, load_file, ConfigFormat};
pub use merge::{
    fold_layers, fold_layers_with, merge_trees, strip_force_markers, AdditiveResolver,
    ConflictResolver, StackResolver, FORCE_MARKER,
};
pub use resolve::{resolve_sources, LayerSource, ResolveOptions, SourceKind};
pub use schema::{FromTyped, Resolved, Schema, SchemaBuilder, SchemaNode, TypedValue, ValueType};
pub use tree::Tree;
pub use validator::{SchemaValidator, ValidationIssue, ValidationReport};
