use crate::core::error::{ConfigError, KitError, KitResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for patternkit
/// Searched in order: patternkit.toml, .patternkit.toml, .config/patternkit.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KitConfig {
  #[serde(default)]
  pub store: StoreConfig,
  #[serde(default)]
  pub output: OutputConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

/// Where patterns, toolkits, drafts, and the session are kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
  /// Store directory, relative to the working directory (default: ".patternkit")
  #[serde(default = "default_store_dir")]
  pub dir: PathBuf,
}

fn default_store_dir() -> PathBuf {
  PathBuf::from(".patternkit")
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self { dir: default_store_dir() }
  }
}

/// Generated file settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
  /// Base for relative and `~/` artifact paths (default: the working directory)
  #[serde(default)]
  pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
  /// One of trace, debug, info, warn, error (default: "warn")
  #[serde(default = "default_log_level")]
  pub level: String,
}

fn default_log_level() -> String {
  "warn".to_string()
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
    }
  }
}

pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl KitConfig {
  /// Find config file in search order: patternkit.toml, .patternkit.toml, .config/patternkit.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("patternkit.toml"),
      path.join(".patternkit.toml"),
      path.join(".config").join("patternkit.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Whether any config file exists under `path`
  pub fn exists(path: &Path) -> bool {
    Self::find_config_path(path).is_some()
  }

  /// Load config, falling back to defaults when no file exists
  pub fn load(path: &Path) -> KitResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: KitConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config.validate().map_err(|err| KitError::Message {
      message: err.to_string(),
      context: Some(format!("Invalid configuration in {}", config_path.display())),
      help: err.help_message(),
    })?;

    Ok(config)
  }

  /// Save config to patternkit.toml (default location)
  pub fn save(&self, path: &Path) -> KitResult<()> {
    let config_path = path.join("patternkit.toml");
    let content = toml_edit::ser::to_string_pretty(self).context("Failed to serialize config to TOML")?;
    fs::write(&config_path, content).with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(())
  }

  pub fn validate(&self) -> KitResult<()> {
    if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
      return Err(KitError::Config(ConfigError::InvalidValue {
        field: "logging.level".to_string(),
        value: self.logging.level.clone(),
      }));
    }
    if self.store.dir.as_os_str().is_empty() {
      return Err(KitError::Config(ConfigError::InvalidValue {
        field: "store.dir".to_string(),
        value: String::new(),
      }));
    }
    Ok(())
  }

  /// Absolute store directory for a working directory
  pub fn store_dir(&self, cwd: &Path) -> PathBuf {
    cwd.join(&self.store.dir)
  }

  /// Absolute output root for a working directory
  pub fn output_root(&self, cwd: &Path) -> PathBuf {
    match &self.output.root {
      Some(root) => cwd.join(root),
      None => cwd.to_path_buf(),
    }
  }
}
