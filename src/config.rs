//! Configuration for scrapekeep.
//!
//! Configuration sources (highest priority first):
//! 1. Config file (.scrapekeep/config.yaml)
//! 2. Defaults
//!
//! Config file discovery:
//! - Searches the start directory and its parents for .scrapekeep/config.yaml
//! - Paths in the config file are relative to the project root (the parent
//!   of `.scrapekeep/`)
//!
//! Nothing here is process-global. Callers keep the `ResolvedConfig` they
//! loaded and hand `PipelineOptions` to the pipeline explicitly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_DIR: &str = ".scrapekeep";
pub const CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_METADATA_FILE: &str = "info.json";
pub const DEFAULT_POPULATE_CONCURRENCY: usize = 4;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub pipeline: Option<PipelineConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Output root for materialized items
    pub output: Option<String>,
    /// Cache directory
    pub cache: Option<String>,
    /// Metadata file name written inside each item directory
    pub metadata_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub sample: Option<bool>,
    pub debug: Option<bool>,
    pub populate_concurrency: Option<usize>,
}

/// Options threaded through the collector, materializer and metadata writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Root under which `<UPPERCASE(ID)>/` directories are created
    pub output_root: PathBuf,
    /// Metadata file name inside each item directory
    pub metadata_file: String,
    /// Whether preview samples are fetched and materialized
    pub sample: bool,
    /// Emit per-reference log events at info level
    pub debug: bool,
    /// Maximum in-flight cache population requests per record
    pub populate_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            metadata_file: DEFAULT_METADATA_FILE.to_string(),
            sample: true,
            debug: false,
            populate_concurrency: DEFAULT_POPULATE_CONCURRENCY,
        }
    }
}

impl PipelineOptions {
    /// Defaults with a specific output root
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            ..Default::default()
        }
    }

    pub fn with_sample(mut self, sample: bool) -> Self {
        self.sample = sample;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_metadata_file(mut self, name: impl Into<String>) -> Self {
        self.metadata_file = name.into();
        self
    }

    pub fn with_populate_concurrency(mut self, n: usize) -> Self {
        self.populate_concurrency = n;
        self
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Cache directory for `DiskCache`
    pub cache_dir: PathBuf,
    /// Pipeline options
    pub options: PipelineOptions,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Defaults, with no config file
    pub fn defaults() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            options: PipelineOptions::default(),
            config_file: None,
        }
    }

    /// Discover a config file from `start` upward and resolve it, falling
    /// back to defaults when none is found
    pub fn discover(start: &Path) -> Result<Self> {
        match find_config_file(start) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::defaults()),
        }
    }

    /// Load and resolve a specific config file
    pub fn from_file(config_path: &Path) -> Result<Self> {
        let config = load_config_file(config_path)?;

        // Base directory is the parent of .scrapekeep/ (grandparent of config.yaml)
        let base_dir = config_path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));

        let output_root = config
            .paths
            .output
            .as_deref()
            .map(|p| resolve_path(base_dir, p))
            .unwrap_or_else(|| base_dir.join("output"));

        let cache_dir = config
            .paths
            .cache
            .as_deref()
            .map(|p| resolve_path(base_dir, p))
            .unwrap_or_else(default_cache_dir);

        let metadata_file = config
            .paths
            .metadata_file
            .unwrap_or_else(|| DEFAULT_METADATA_FILE.to_string());

        let pipeline = config.pipeline.as_ref();
        let options = PipelineOptions {
            output_root,
            metadata_file,
            sample: pipeline.and_then(|p| p.sample).unwrap_or(true),
            debug: pipeline.and_then(|p| p.debug).unwrap_or(false),
            populate_concurrency: pipeline
                .and_then(|p| p.populate_concurrency)
                .unwrap_or(DEFAULT_POPULATE_CONCURRENCY),
        };

        Ok(Self {
            cache_dir,
            options,
            config_file: Some(config_path.to_path_buf()),
        })
    }
}

/// Default cache directory (<platform cache dir>/scrapekeep)
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("scrapekeep")
}

/// Find config file by searching `start` and its parents
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
