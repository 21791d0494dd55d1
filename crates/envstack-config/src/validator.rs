//! Aggregate validation over a set of schemas.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::schema::Schema;
use crate::tree::Tree;

/// An ordered collection of shared schemas, each present at most once.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    schemas: Vec<Arc<Schema>>,
}

/// One problem found while validating settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Root key of the schema reporting the problem.
    pub schema: String,
    /// Full dotted path of the offending value.
    pub path: String,
    pub message: String,
}

/// Outcome of validating settings against every schema.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub schemas_checked: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// A leaf key declared with different types by different schemas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaConflict {
    pub path: String,
    pub types: Vec<String>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `schema` unless the very same schema is already present.
    ///
    /// Returns whether it was appended.
    pub fn append(&mut self, schema: Arc<Schema>) -> bool {
        if self.contains(&schema) {
            return false;
        }
        self.schemas.push(schema);
        true
    }

    /// Identity check; structurally equal but distinct schemas do not match.
    pub fn contains(&self, schema: &Arc<Schema>) -> bool {
        self.schemas.iter().any(|known| Arc::ptr_eq(known, schema))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.iter()
    }

    /// Validate `settings` against every schema, collecting all issues.
    pub fn validate(&self, settings: &Tree) -> ValidationReport {
        let issues = self
            .schemas
            .iter()
            .flat_map(|schema| {
                schema.validate(settings).into_iter().map(move |err| ValidationIssue {
                    schema: schema.key().to_string(),
                    path: err.path().to_string(),
                    message: err.to_string(),
                })
            })
            .collect();
        ValidationReport {
            schemas_checked: self.schemas.len(),
            issues,
        }
    }

    /// Leaf keys declared by more than one schema with different types.
    pub fn conflicts(&self) -> Vec<SchemaConflict> {
        let mut declared: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for schema in &self.schemas {
            for leaf in schema.leaves() {
                let types = declared.entry(leaf.key_path().to_string()).or_default();
                let ty = leaf.value_type().to_string();
                if !types.contains(&ty) {
                    types.push(ty);
                }
            }
        }
        declared
            .into_iter()
            .filter(|(_, types)| types.len() > 1)
            .map(|(path, types)| SchemaConflict { path, types })
            .collect()
    }
}
