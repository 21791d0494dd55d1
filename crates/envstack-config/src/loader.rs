//! Reading configuration files into trees.
//!
//! YAML, JSON and TOML are supported, selected by file extension. Every
//! format is normalized to the same JSON value model before merging.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::merge_trees;
use crate::tree::{value_kind, Tree};

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Json => "json",
            ConfigFormat::Toml => "toml",
        }
    }
}

/// Parse `content` in the given format. `origin` only labels errors.
pub fn parse_str(content: &str, format: ConfigFormat, origin: &Path) -> ConfigResult<Tree> {
    let parse_err = |message: String| ConfigError::Parse {
        path: origin.to_path_buf(),
        message,
    };

    let value = match format {
        ConfigFormat::Yaml => {
            if content.trim().is_empty() {
                Value::Null
            } else {
                serde_yaml::from_str::<Value>(content).map_err(|e| parse_err(e.to_string()))?
            }
        }
        ConfigFormat::Json => {
            serde_json::from_str::<Value>(content).map_err(|e| parse_err(e.to_string()))?
        }
        ConfigFormat::Toml => {
            let table = content
                .parse::<toml::Table>()
                .map_err(|e| parse_err(e.to_string()))?;
            toml_to_json(toml::Value::Table(table))
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Tree::new()),
        other => Err(ConfigError::NotAMapping {
            path: origin.to_path_buf(),
            found: value_kind(&other),
        }),
    }
}

/// Load one configuration file.
pub fn load_file(path: &Path) -> ConfigResult<Tree> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tree = parse_str(&content, format, path)?;
    debug!(
        path = %path.display(),
        format = format.name(),
        keys = tree.len(),
        "loaded configuration file"
    );
    Ok(tree)
}

/// List configuration files in a directory, sorted by name.
///
/// A missing or unreadable directory yields no files.
pub fn list_config_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && ConfigFormat::from_path(&path).is_some() {
                files.push(path);
            }
        }
    }

    files.sort();
    files
}

/// Load every configuration file in `dir` and merge them in name order.
///
/// Forced-override markers are kept so the result can be folded further.
pub fn load_dir(dir: &Path) -> ConfigResult<Tree> {
    list_config_files(dir)
        .iter()
        .try_fold(Tree::new(), |merged, path| Ok(merge_trees(merged, &load_file(path)?)))
}

/// Convert a TOML value to the JSON value model.
///
/// Datetimes become strings; non-finite floats become null.
pub fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn origin() -> PathBuf {
        PathBuf::from("test.cfg")
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.YAML")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.ini")), None);
        assert_eq!(ConfigFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_parse_yaml() {
        let tree = parse_str("logging:\n  verbosity: DEBUG\n", ConfigFormat::Yaml, &origin()).unwrap();
        assert_eq!(tree["logging"]["verbosity"], "DEBUG");
    }

    #[test]
    fn test_empty_yaml_is_empty_tree() {
        assert!(parse_str("", ConfigFormat::Yaml, &origin()).unwrap().is_empty());
        assert!(parse_str("# only a comment\n", ConfigFormat::Yaml, &origin())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let tree = parse_str(
            "[site]\nid = \"x\"\nport = 80\nratio = 0.5\n",
            ConfigFormat::Toml,
            &origin(),
        )
        .unwrap();
        assert_eq!(Value::Object(tree), json!({"site": {"id": "x", "port": 80, "ratio": 0.5}}));
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        let err = parse_str("[1, 2]", ConfigFormat::Json, &origin()).unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { found: "sequence", .. }));
    }

    #[test]
    fn test_parse_error_carries_path() {
        let err = parse_str("{broken", ConfigFormat::Json, &origin()).unwrap_err();
        assert_eq!(err.code(), 61);
        assert!(err.to_string().contains("test.cfg"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_file(Path::new("settings.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_list_missing_dir() {
        assert!(list_config_files(Path::new("/nonexistent/envstack/dir")).is_empty());
    }
}
