//! Schemas describing the expected shape of configuration subtrees.
//!
//! A schema is rooted at a dotted key and describes leaves with a semantic
//! [`ValueType`]. Resolving a schema against merged settings coerces every
//! leaf at once; missing or null leaves fall back to the declared default and
//! then to the zero value of their type.
//!
//! ```ignore
//! let schema = Schema::builder("site")
//!     .leaf("id", ValueType::String)
//!     .compound("root_path", |p| p.leaf("repository", ValueType::Path))
//!     .build();
//! let values = schema.resolve(&settings)?;
//! let repo: PathBuf = values.get_as("root_path.repository")?;
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaResult};
use crate::tree::{get, join_key, split_key, value_kind, Tree};

/// Semantic type of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    String,
    Bool,
    Integer,
    Float,
    /// Filesystem path; a leading `~/` expands to the home directory.
    Path,
    /// One of a fixed set of strings, matched case-insensitively.
    Choice(Vec<String>),
    /// Sequence whose items all coerce to the inner type.
    List(Box<ValueType>),
    /// Any value, passed through untouched.
    Any,
    /// Mapping described by child nodes.
    Compound,
}

impl ValueType {
    /// Convenience constructor for [`ValueType::Choice`].
    pub fn choice<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueType::Choice(allowed.into_iter().map(Into::into).collect())
    }

    /// Convenience constructor for [`ValueType::List`].
    pub fn list(item: ValueType) -> Self {
        ValueType::List(Box::new(item))
    }

    /// Value used when neither settings nor a default provide one.
    pub fn zero(&self) -> TypedValue {
        match self {
            ValueType::String => TypedValue::String(String::new()),
            ValueType::Bool => TypedValue::Bool(false),
            ValueType::Integer => TypedValue::Integer(0),
            ValueType::Float => TypedValue::Float(0.0),
            ValueType::Path => TypedValue::Path(PathBuf::new()),
            ValueType::Choice(allowed) => {
                TypedValue::String(allowed.first().cloned().unwrap_or_default())
            }
            ValueType::List(_) => TypedValue::List(Vec::new()),
            ValueType::Any => TypedValue::Raw(Value::Null),
            ValueType::Compound => TypedValue::Tree(Resolved::default()),
        }
    }

    /// Coerce a raw value found at `path` to this type.
    pub fn coerce(&self, path: &str, raw: &Value) -> SchemaResult<TypedValue> {
        let mismatch = || SchemaError::TypeMismatch {
            path: path.to_string(),
            expected: self.to_string(),
            found: value_kind(raw).to_string(),
        };

        match (self, raw) {
            (ValueType::Any, _) => Ok(TypedValue::Raw(raw.clone())),

            (ValueType::String, Value::String(s)) => Ok(TypedValue::String(s.clone())),
            (ValueType::String, Value::Number(n)) => Ok(TypedValue::String(n.to_string())),
            (ValueType::String, Value::Bool(b)) => Ok(TypedValue::String(b.to_string())),

            (ValueType::Bool, Value::Bool(b)) => Ok(TypedValue::Bool(*b)),
            (ValueType::Bool, Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(TypedValue::Bool(false)),
                Some(1) => Ok(TypedValue::Bool(true)),
                _ => Err(mismatch()),
            },
            (ValueType::Bool, Value::String(s)) => parse_bool(s).map(TypedValue::Bool).ok_or_else(mismatch),

            (ValueType::Integer, Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(whole_i64))
                .map(TypedValue::Integer)
                .ok_or_else(mismatch),
            (ValueType::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(TypedValue::Integer)
                .map_err(|_| mismatch()),

            (ValueType::Float, Value::Number(n)) => {
                n.as_f64().map(TypedValue::Float).ok_or_else(mismatch)
            }
            (ValueType::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(TypedValue::Float)
                .map_err(|_| mismatch()),

            (ValueType::Path, Value::String(s)) => Ok(TypedValue::Path(expand_home(s))),

            (ValueType::Choice(allowed), Value::String(s)) => allowed
                .iter()
                .find(|candidate| candidate.eq_ignore_ascii_case(s))
                .map(|canonical| TypedValue::String(canonical.clone()))
                .ok_or_else(|| SchemaError::InvalidChoice {
                    path: path.to_string(),
                    value: s.clone(),
                    allowed: allowed.join(", "),
                }),

            (ValueType::List(item), Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(idx, value)| item.coerce(&format!("{}[{}]", path, idx), value))
                .collect::<SchemaResult<Vec<_>>>()
                .map(TypedValue::List),

            _ => Err(mismatch()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Float => write!(f, "float"),
            ValueType::Path => write!(f, "path"),
            ValueType::Choice(allowed) => write!(f, "choice({})", allowed.join("|")),
            ValueType::List(item) => write!(f, "list<{}>", item),
            ValueType::Any => write!(f, "any"),
            ValueType::Compound => write!(f, "mapping"),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// `f` as an i64 when it is a whole number inside the i64 range.
fn whole_i64(f: f64) -> Option<i64> {
    // i64::MAX is not representable; 2^63 is the first float above the range.
    const UPPER: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && f >= -UPPER && f < UPPER).then_some(f as i64)
}

fn expand_home(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}

/// A coerced value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    Path(PathBuf),
    List(Vec<TypedValue>),
    Raw(Value),
    Tree(Resolved),
}

impl TypedValue {
    /// Convert back into a plain JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            TypedValue::String(s) => Value::String(s.clone()),
            TypedValue::Bool(b) => Value::Bool(*b),
            TypedValue::Integer(i) => Value::from(*i),
            TypedValue::Float(f) => Value::from(*f),
            TypedValue::Path(p) => Value::String(p.to_string_lossy().into_owned()),
            TypedValue::List(items) => Value::Array(items.iter().map(Self::to_value).collect()),
            TypedValue::Raw(v) => v.clone(),
            TypedValue::Tree(resolved) => Value::Object(resolved.to_tree()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            TypedValue::String(_) => "string",
            TypedValue::Bool(_) => "bool",
            TypedValue::Integer(_) => "integer",
            TypedValue::Float(_) => "float",
            TypedValue::Path(_) => "path",
            TypedValue::List(_) => "list",
            TypedValue::Raw(_) => "any",
            TypedValue::Tree(_) => "mapping",
        }
    }
}

/// Ordered set of resolved values for one schema subtree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolved {
    entries: Vec<(String, TypedValue)>,
}

impl Resolved {
    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the direct children, in schema order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Value at a dotted path relative to this subtree.
    pub fn get(&self, path: &str) -> Option<&TypedValue> {
        let mut parts = split_key(path);
        let first = parts.next()?;
        let mut current = self.child(first)?;
        for part in parts {
            match current {
                TypedValue::Tree(tree) => current = tree.child(part)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Typed value at a dotted path.
    pub fn get_as<T: FromTyped>(&self, path: &str) -> SchemaResult<T> {
        let value = self.get(path).ok_or_else(|| SchemaError::UnknownPath {
            path: path.to_string(),
        })?;
        T::from_typed(path, value)
    }

    /// Plain JSON view of the resolved values.
    pub fn to_tree(&self) -> Tree {
        self.entries
            .iter()
            .map(|(name, value)| (name.clone(), value.to_value()))
            .collect()
    }

    /// Deserialize the resolved values into a caller-defined struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> SchemaResult<T> {
        serde_json::from_value(Value::Object(self.to_tree())).map_err(|e| SchemaError::Deserialize {
            path: String::new(),
            message: e.to_string(),
        })
    }

    fn child(&self, name: &str) -> Option<&TypedValue> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, value)| value)
    }

    fn push(&mut self, name: &str, value: TypedValue) {
        self.entries.push((name.to_string(), value));
    }
}

/// Conversion from a resolved value into a Rust type.
pub trait FromTyped: Sized {
    fn from_typed(path: &str, value: &TypedValue) -> SchemaResult<Self>;
}

fn wrong_kind(path: &str, expected: &str, value: &TypedValue) -> SchemaError {
    SchemaError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: value.kind().to_string(),
    }
}

impl FromTyped for String {
    fn from_typed(path: &str, value: &TypedValue) -> SchemaResult<Self> {
        match value {
            TypedValue::String(s) => Ok(s.clone()),
            TypedValue::Path(p) => Ok(p.to_string_lossy().into_owned()),
            other => Err(wrong_kind(path, "string", other)),
        }
    }
}

impl FromTyped for bool {
    fn from_typed(path: &str, value: &TypedValue) -> SchemaResult<Self> {
        match value {
            TypedValue::Bool(b) => Ok(*b),
            other => Err(wrong_kind(path, "bool", other)),
        }
    }
}

impl FromTyped for i64 {
    fn from_typed(path: &str, value: &TypedValue) -> SchemaResult<Self> {
        match value {
            TypedValue::Integer(i) => Ok(*i),
            other => Err(wrong_kind(path, "integer", other)),
        }
    }
}

impl FromTyped for f64 {
    fn from_typed(path: &str, value: &TypedValue) -> SchemaResult<Self> {
        match value {
            TypedValue::Float(f) => Ok(*f),
            TypedValue::Integer(i) => Ok(*i as f64),
            other => Err(wrong_kind(path, "float", other)),
        }
    }
}

impl FromTyped for PathBuf {
    fn from_typed(path: &str, value: &TypedValue) -> SchemaResult<Self> {
        match value {
            TypedValue::Path(p) => Ok(p.clone()),
            TypedValue::String(s) => Ok(PathBuf::from(s)),
            other => Err(wrong_kind(path, "path", other)),
        }
    }
}

impl FromTyped for Value {
    fn from_typed(_path: &str, value: &TypedValue) -> SchemaResult<Self> {
        Ok(value.to_value())
    }
}

impl FromTyped for Resolved {
    fn from_typed(path: &str, value: &TypedValue) -> SchemaResult<Self> {
        match value {
            TypedValue::Tree(tree) => Ok(tree.clone()),
            other => Err(wrong_kind(path, "mapping", other)),
        }
    }
}

impl<T: FromTyped> FromTyped for Vec<T> {
    fn from_typed(path: &str, value: &TypedValue) -> SchemaResult<Self> {
        match value {
            TypedValue::List(items) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| T::from_typed(&format!("{}[{}]", path, idx), item))
                .collect(),
            other => Err(wrong_kind(path, "list", other)),
        }
    }
}

/// One node of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    name: String,
    key_path: String,
    value_type: ValueType,
    default: Option<Value>,
    children: Vec<SchemaNode>,
}

impl SchemaNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full dotted path of this node in the configuration tree.
    pub fn key_path(&self) -> &str {
        &self.key_path
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn children(&self) -> &[SchemaNode] {
        &self.children
    }

    /// Child node by name.
    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children.iter().find(|child| child.name == name)
    }

    fn resolve(&self, raw: Option<&Value>) -> SchemaResult<TypedValue> {
        if self.value_type == ValueType::Compound {
            let map = self.expect_mapping(raw)?;
            let mut resolved = Resolved::default();
            for child in &self.children {
                let value = child.resolve(map.and_then(|m| m.get(&child.name)))?;
                resolved.push(&child.name, value);
            }
            return Ok(TypedValue::Tree(resolved));
        }

        let raw = match raw {
            None | Some(Value::Null) => self.default.as_ref(),
            Some(value) => Some(value),
        };
        match raw {
            Some(value) => self.value_type.coerce(&self.key_path, value),
            None => Ok(self.value_type.zero()),
        }
    }

    fn check(&self, raw: Option<&Value>, issues: &mut Vec<SchemaError>) {
        if self.value_type == ValueType::Compound {
            match self.expect_mapping(raw) {
                Ok(map) => {
                    for child in &self.children {
                        child.check(map.and_then(|m| m.get(&child.name)), issues);
                    }
                }
                Err(err) => issues.push(err),
            }
            return;
        }
        if let Err(err) = self.resolve(raw) {
            issues.push(err);
        }
    }

    fn expect_mapping<'a>(&self, raw: Option<&'a Value>) -> SchemaResult<Option<&'a Map<String, Value>>> {
        match raw {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(SchemaError::TypeMismatch {
                path: self.key_path.clone(),
                expected: ValueType::Compound.to_string(),
                found: value_kind(other).to_string(),
            }),
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a SchemaNode>) {
        if self.value_type == ValueType::Compound {
            for child in &self.children {
                child.collect_leaves(out);
            }
        } else {
            out.push(self);
        }
    }
}

/// An immutable schema rooted at a fixed key.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    root: SchemaNode,
}

impl Schema {
    /// Start building a schema rooted at `root_key`; `""` addresses the whole tree.
    pub fn builder(root_key: &str) -> SchemaBuilder {
        let key = split_key(root_key).collect::<Vec<_>>().join(".");
        SchemaBuilder {
            name: key.rsplit('.').next().unwrap_or_default().to_string(),
            prefix: key,
            children: Vec::new(),
        }
    }

    /// The root key this schema is bound to.
    pub fn key(&self) -> &str {
        &self.root.key_path
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Node at a dotted path relative to the root key.
    pub fn node(&self, path: &str) -> Option<&SchemaNode> {
        split_key(path).try_fold(&self.root, |node, part| node.child(part))
    }

    /// All leaf nodes, depth first in declaration order.
    pub fn leaves(&self) -> Vec<&SchemaNode> {
        let mut out = Vec::new();
        self.root.collect_leaves(&mut out);
        out
    }

    /// Resolve every node of the schema against merged settings.
    pub fn resolve(&self, settings: &Tree) -> SchemaResult<Resolved> {
        match self.root.resolve(self.raw_root(settings).as_ref())? {
            TypedValue::Tree(resolved) => Ok(resolved),
            other => Err(wrong_kind(self.key(), "mapping", &other)),
        }
    }

    /// Every coercion problem in `settings`, without stopping at the first.
    pub fn validate(&self, settings: &Tree) -> Vec<SchemaError> {
        let mut issues = Vec::new();
        self.root.check(self.raw_root(settings).as_ref(), &mut issues);
        issues
    }

    fn raw_root(&self, settings: &Tree) -> Option<Value> {
        if self.root.key_path.is_empty() {
            Some(Value::Object(settings.clone()))
        } else {
            get(settings, &self.root.key_path).cloned()
        }
    }
}

/// Builder for [`Schema`]. Declaring a name twice replaces the earlier node.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    prefix: String,
    children: Vec<SchemaNode>,
}

impl SchemaBuilder {
    /// Leaf without a default.
    pub fn leaf(self, name: &str, value_type: ValueType) -> Self {
        self.node(name, value_type, None, Vec::new())
    }

    /// Leaf with a default used when the settings have no value.
    pub fn leaf_with_default(self, name: &str, value_type: ValueType, default: Value) -> Self {
        self.node(name, value_type, Some(default), Vec::new())
    }

    /// Nested mapping whose children are declared by `build`.
    pub fn compound<F>(self, name: &str, build: F) -> Self
    where
        F: FnOnce(SchemaBuilder) -> SchemaBuilder,
    {
        let nested = build(SchemaBuilder {
            name: name.to_string(),
            prefix: join_key(&self.prefix, name),
            children: Vec::new(),
        });
        self.node(name, ValueType::Compound, None, nested.children)
    }

    pub fn build(self) -> Schema {
        Schema {
            root: SchemaNode {
                name: self.name,
                key_path: self.prefix,
                value_type: ValueType::Compound,
                default: None,
                children: self.children,
            },
        }
    }

    fn node(
        mut self,
        name: &str,
        value_type: ValueType,
        default: Option<Value>,
        children: Vec<SchemaNode>,
    ) -> Self {
        let node = SchemaNode {
            name: name.to_string(),
            key_path: join_key(&self.prefix, name),
            value_type,
            default,
            children,
        };
        match self.children.iter_mut().find(|child| child.name == name) {
            Some(existing) => *existing = node,
            None => self.children.push(node),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::into_tree;
    use serde::Deserialize;
    use serde_json::json;

    fn site_schema() -> Schema {
        Schema::builder("site")
            .leaf("id", ValueType::String)
            .compound("root_path", |p| p.leaf("repository", ValueType::Path))
            .build()
    }

    fn settings(value: Value) -> Tree {
        into_tree(value).unwrap()
    }

    #[test]
    fn test_key_paths() {
        let schema = site_schema();
        assert_eq!(schema.key(), "site");
        assert_eq!(schema.node("root_path.repository").unwrap().key_path(), "site.root_path.repository");
        assert_eq!(schema.node("id").unwrap().value_type(), &ValueType::String);
        assert!(schema.node("nope").is_none());
    }

    #[test]
    fn test_resolve_missing_uses_zero_values() {
        let resolved = site_schema().resolve(&Tree::new()).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.get_as::<String>("id").unwrap(), "");
        assert_eq!(
            resolved.get_as::<PathBuf>("root_path.repository").unwrap(),
            PathBuf::new()
        );
    }

    #[test]
    fn test_resolve_coerces_values() {
        let schema = Schema::builder("app")
            .leaf("port", ValueType::Integer)
            .leaf("ratio", ValueType::Float)
            .leaf("enabled", ValueType::Bool)
            .leaf("tags", ValueType::list(ValueType::String))
            .build();
        let resolved = schema
            .resolve(&settings(json!({
                "app": {"port": "8080", "ratio": 2, "enabled": "yes", "tags": ["a", 1]}
            })))
            .unwrap();
        assert_eq!(resolved.get_as::<i64>("port").unwrap(), 8080);
        assert_eq!(resolved.get_as::<f64>("ratio").unwrap(), 2.0);
        assert!(resolved.get_as::<bool>("enabled").unwrap());
        assert_eq!(
            resolved.get_as::<Vec<String>>("tags").unwrap(),
            vec!["a".to_string(), "1".to_string()]
        );
    }

    #[test]
    fn test_defaults_apply_to_missing_and_null() {
        let schema = Schema::builder("logging")
            .leaf_with_default("verbosity", ValueType::choice(["DEBUG", "INFO"]), json!("INFO"))
            .leaf_with_default("disable", ValueType::Bool, json!(false))
            .build();
        let resolved = schema
            .resolve(&settings(json!({"logging": {"verbosity": null}})))
            .unwrap();
        assert_eq!(resolved.get_as::<String>("verbosity").unwrap(), "INFO");
        assert!(!resolved.get_as::<bool>("disable").unwrap());
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let schema = Schema::builder("app").leaf("port", ValueType::Integer).build();
        let err = schema
            .resolve(&settings(json!({"app": {"port": "eighty"}})))
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref path, .. } if path == "app.port"));
    }

    #[test]
    fn test_integer_out_of_range_is_rejected() {
        for raw in [json!(1e20), json!(-1e20), json!(u64::MAX), json!(9.223372036854775807e18)] {
            let err = ValueType::Integer.coerce("app.port", &raw).unwrap_err();
            assert!(matches!(err, SchemaError::TypeMismatch { .. }), "{} accepted", raw);
        }
        assert_eq!(
            ValueType::Integer.coerce("app.port", &json!(8080.0)).unwrap(),
            TypedValue::Integer(8080)
        );
        assert_eq!(
            ValueType::Integer.coerce("app.port", &json!(-9.223372036854775808e18)).unwrap(),
            TypedValue::Integer(i64::MIN)
        );
    }

    #[test]
    fn test_compound_mismatch() {
        let err = site_schema()
            .resolve(&settings(json!({"site": "not a mapping"})))
            .unwrap_err();
        assert_eq!(err.path(), "site");
    }

    #[test]
    fn test_choice_is_case_insensitive() {
        let ty = ValueType::choice(["DEBUG", "INFO"]);
        assert_eq!(
            ty.coerce("v", &json!("debug")).unwrap(),
            TypedValue::String("DEBUG".into())
        );
        assert!(matches!(
            ty.coerce("v", &json!("LOUD")),
            Err(SchemaError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_validate_collects_all_issues() {
        let schema = Schema::builder("app")
            .leaf("port", ValueType::Integer)
            .leaf("enabled", ValueType::Bool)
            .build();
        let issues = schema.validate(&settings(json!({"app": {"port": [], "enabled": "maybe"}})));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_root_key_schema() {
        let schema = Schema::builder("")
            .leaf("name", ValueType::String)
            .leaf("version", ValueType::String)
            .build();
        assert_eq!(schema.key(), "");
        let resolved = schema.resolve(&settings(json!({"name": "envstack"}))).unwrap();
        assert_eq!(resolved.get_as::<String>("name").unwrap(), "envstack");
    }

    #[test]
    fn test_nested_root_key() {
        let schema = Schema::builder("a.b").leaf("c", ValueType::Integer).build();
        assert_eq!(schema.key(), "a.b");
        assert_eq!(schema.root().name(), "b");
        let resolved = schema.resolve(&settings(json!({"a": {"b": {"c": 5}}}))).unwrap();
        assert_eq!(resolved.get_as::<i64>("c").unwrap(), 5);
    }

    #[test]
    fn test_deserialize_into_struct() {
        #[derive(Deserialize)]
        struct Site {
            id: String,
            root_path: RootPath,
        }
        #[derive(Deserialize)]
        struct RootPath {
            repository: PathBuf,
        }

        let resolved = site_schema()
            .resolve(&settings(json!({"site": {"id": "x", "root_path": {"repository": "/srv/repo"}}})))
            .unwrap();
        let site: Site = resolved.deserialize().unwrap();
        assert_eq!(site.id, "x");
        assert_eq!(site.root_path.repository, PathBuf::from("/srv/repo"));
    }

    #[test]
    fn test_redeclared_leaf_replaces() {
        let schema = Schema::builder("x")
            .leaf("a", ValueType::String)
            .leaf("a", ValueType::Integer)
            .build();
        assert_eq!(schema.leaves().len(), 1);
        assert_eq!(schema.node("a").unwrap().value_type(), &ValueType::Integer);
    }

    #[test]
    fn test_unknown_path() {
        let resolved = site_schema().resolve(&Tree::new()).unwrap();
        assert!(matches!(
            resolved.get_as::<String>("missing"),
            Err(SchemaError::UnknownPath { .. })
        ));
    }
}
