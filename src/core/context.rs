//! Unified command context - build once, pass everywhere
//!
//! ```text
//! main.rs:
//!   KitContext::build(cwd) -> &mut KitContext
//!   |
//!   v
//! commands/pattern.rs, toolkit.rs, draft.rs:
//!   fn run_*(ctx: &mut KitContext, ...)
//! ```
//!
//! The current pattern and draft live in [`Session`], which is persisted by the
//! store and threaded through commands explicitly.

use crate::core::config::KitConfig;
use crate::core::error::{ConfigError, KitError, KitResult};
use crate::core::store::Store;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current selections between CLI invocations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  #[serde(default)]
  pub current_pattern: Option<String>,
  #[serde(default)]
  pub current_draft: Option<String>,
}

impl Session {
  pub fn require_pattern(&self) -> KitResult<&str> {
    self
      .current_pattern
      .as_deref()
      .ok_or(KitError::Config(ConfigError::NoCurrentPattern))
  }

  pub fn require_draft(&self) -> KitResult<&str> {
    self
      .current_draft
      .as_deref()
      .ok_or(KitError::Config(ConfigError::NoCurrentDraft))
  }
}

/// Everything a command needs: working directory, config, store, and session
#[derive(Debug, Clone)]
pub struct KitContext {
  /// Working directory (absolute path)
  pub cwd: PathBuf,

  /// patternkit.toml, or defaults
  pub config: KitConfig,

  pub store: Store,

  pub session: Session,
}

impl KitContext {
  /// Load config, open the store, and read the session
  pub fn build(cwd: &Path) -> KitResult<Self> {
    let config = KitConfig::load(cwd)?;
    Self::with_config(cwd, config)
  }

  pub fn with_config(cwd: &Path, config: KitConfig) -> KitResult<Self> {
    let store = Store::new(config.store_dir(cwd));
    let session = store.load_session()?;
    Ok(Self {
      cwd: cwd.to_path_buf(),
      config,
      store,
      session,
    })
  }

  /// Base directory for generated artifacts
  pub fn output_root(&self) -> PathBuf {
    self.config.output_root(&self.cwd)
  }

  pub fn save_session(&self) -> KitResult<()> {
    self.store.save_session(&self.session)
  }
}
