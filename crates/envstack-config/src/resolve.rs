//! Configuration source discovery.
//!
//! Sources are returned lowest precedence first, so pushing them in order
//! puts the most specific configuration on top of the stack:
//! system dir → XDG config dir → `ENVSTACK_CONFIG_DIR` → CLI directories → CLI files.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::{load_dir, load_file};
use crate::tree::Tree;

/// Where a configuration layer comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Found in /etc/envstack/.
    System,

    /// Found in the XDG config directory.
    XdgConfig,

    /// Named by the ENVSTACK_CONFIG_DIR environment variable.
    Environment,

    /// Directory given on the command line.
    CliDirectory,

    /// File given on the command line.
    CliFile,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::System => write!(f, "system config"),
            SourceKind::XdgConfig => write!(f, "XDG config"),
            SourceKind::Environment => write!(f, "environment variable"),
            SourceKind::CliDirectory => write!(f, "CLI directory"),
            SourceKind::CliFile => write!(f, "CLI file"),
        }
    }
}

/// One discovered configuration source; each becomes one stack layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSource {
    /// Layer name, derived from the kind and path.
    pub name: String,
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl LayerSource {
    fn new(kind: SourceKind, path: PathBuf) -> Self {
        let name = match kind {
            SourceKind::System => "system".to_string(),
            SourceKind::XdgConfig => "user".to_string(),
            SourceKind::Environment => "env".to_string(),
            SourceKind::CliDirectory | SourceKind::CliFile => path.display().to_string(),
        };
        Self { name, path, kind }
    }

    fn is_dir_source(&self) -> bool {
        !matches!(self.kind, SourceKind::CliFile)
    }
}

/// Inputs to source discovery.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Extra directories, in increasing precedence.
    pub dirs: Vec<PathBuf>,
    /// Extra files, in increasing precedence, above all directories.
    pub files: Vec<PathBuf>,
    /// Whether to look in the system, XDG and environment locations.
    pub default_dirs: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            files: Vec::new(),
            default_dirs: true,
        }
    }
}

/// Environment variable naming an additional configuration directory.
pub const ENV_CONFIG_DIR: &str = "ENVSTACK_CONFIG_DIR";

/// Application name for XDG and system directories.
pub const APP_NAME: &str = "envstack";

/// Discover configuration sources, lowest precedence first.
///
/// Default locations are only included when they exist; explicitly given
/// directories and files are always included so that missing ones surface
/// as errors at load time.
pub fn resolve_sources(options: &ResolveOptions) -> Vec<LayerSource> {
    let mut sources = Vec::new();

    if options.default_dirs {
        let system = system_config_dir();
        if config_dir_exists(&system) {
            sources.push(LayerSource::new(SourceKind::System, system));
        }

        if let Some(xdg) = xdg_config_dir() {
            if config_dir_exists(&xdg) {
                sources.push(LayerSource::new(SourceKind::XdgConfig, xdg));
            }
        }

        if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
            let dir = PathBuf::from(dir);
            if config_dir_exists(&dir) {
                sources.push(LayerSource::new(SourceKind::Environment, dir));
            }
        }
    }

    sources.extend(
        options
            .dirs
            .iter()
            .map(|dir| LayerSource::new(SourceKind::CliDirectory, dir.clone())),
    );
    sources.extend(
        options
            .files
            .iter()
            .map(|file| LayerSource::new(SourceKind::CliFile, file.clone())),
    );

    debug!(count = sources.len(), "resolved configuration sources");
    sources
}

/// Load the tree a source contributes.
pub fn load_source(source: &LayerSource) -> ConfigResult<Tree> {
    if source.is_dir_source() {
        if !source.path.is_dir() {
            return Err(ConfigError::Io {
                path: source.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }
        load_dir(&source.path)
    } else {
        load_file(&source.path)
    }
}

/// Get the XDG config directory for envstack.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

/// Check if a config directory exists and is readable.
pub fn config_dir_exists(path: &Path) -> bool {
    path.is_dir() && path.read_dir().is_ok()
}
