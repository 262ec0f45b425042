use crate::error::{Error, Result};
use crate::model::DetailLevel;
use crate::output::Format;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the scanned root
pub const CONFIG_FILE: &str = "architectum.toml";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub scan: ScanConfig,
    pub blueprint: BlueprintConfig,
    pub storage: StorageConfig,
}

/// Project metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
}

/// File discovery and extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Extract files on all cores
    pub parallel: bool,
    /// Files larger than this many bytes are skipped
    pub max_file_size: u64,
}

/// Blueprint defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueprintConfig {
    pub detail_level: DetailLevel,
    pub format: Format,
}

/// Where feature versions are stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub directory: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Untitled Project".to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include: vec![
                "**/*.py".to_string(),
                "**/*.js".to_string(),
                "**/*.jsx".to_string(),
                "**/*.mjs".to_string(),
                "**/*.cjs".to_string(),
            ],
            exclude: vec![
                ".git/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/__pycache__/**".to_string(),
                "venv/**".to_string(),
                ".venv/**".to_string(),
                "*.egg-info/**".to_string(),
                "**/*.min.js".to_string(),
            ],
            parallel: true,
            max_file_size: 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".architectum"),
        }
    }
}

impl StorageConfig {
    /// Root of the feature version store
    pub fn features_dir(&self) -> PathBuf {
        self.directory.join("features")
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file, or defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(
        &mut self,
        include: Vec<String>,
        exclude: Vec<String>,
        detail_level: Option<DetailLevel>,
        format: Option<Format>,
        sequential: bool,
    ) {
        if !include.is_empty() {
            self.scan.include = include;
        }

        if !exclude.is_empty() {
            self.scan.exclude.extend(exclude);
        }

        if let Some(level) = detail_level {
            self.blueprint.detail_level = level;
        }

        if let Some(fmt) = format {
            self.blueprint.format = fmt;
        }

        if sequential {
            self.scan.parallel = false;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.scan.include.is_empty() {
            return Err(Error::config_validation("at least one include pattern required"));
        }

        if self.scan.max_file_size == 0 {
            return Err(Error::config_validation("max_file_size must be at least 1 byte"));
        }

        if self.storage.directory.as_os_str().is_empty() {
            return Err(Error::config_validation("storage directory cannot be empty"));
        }

        for pattern in self.scan.include.iter().chain(&self.scan.exclude) {
            glob::Pattern::new(pattern)
                .map_err(|e| Error::config_validation(format!("invalid glob '{}': {}", pattern, e)))?;
        }

        Ok(())
    }
}
