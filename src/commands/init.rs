//! `patternkit init` - write a starter patternkit.toml

use crate::core::config::{KitConfig, LoggingConfig, OutputConfig, StoreConfig};
use crate::core::context::KitContext;
use crate::core::error::{KitError, KitResult};
use std::path::PathBuf;

/// Settings taken from the command line; anything unset keeps its default
#[derive(Debug, Default, Clone)]
pub struct InitOptions {
  pub store_dir: Option<PathBuf>,
  pub output_root: Option<PathBuf>,
  pub log_level: Option<String>,
  pub force: bool,
}

pub fn run_init(ctx: &KitContext, options: InitOptions) -> KitResult<()> {
  if KitConfig::exists(&ctx.cwd) && !options.force {
    return Err(KitError::with_help(
      format!("Configuration already exists in {}", ctx.cwd.display()),
      "Use --force to overwrite it.",
    ));
  }

  let defaults = KitConfig::default();
  let config = KitConfig {
    store: StoreConfig {
      dir: options.store_dir.unwrap_or(defaults.store.dir),
    },
    output: OutputConfig {
      root: options.output_root.or(defaults.output.root),
    },
    logging: LoggingConfig {
      level: options.log_level.unwrap_or(defaults.logging.level),
    },
  };
  config.validate()?;
  config.save(&ctx.cwd)?;

  tracing::debug!(store = %config.store.dir.display(), "wrote configuration");
  println!("Wrote {}", ctx.cwd.join("patternkit.toml").display());
  Ok(())
}
