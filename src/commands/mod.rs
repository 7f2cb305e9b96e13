//! CLI commands for patternkit
//!
//! ## Setup
//! - **init**: write a starter patternkit.toml
//!
//! ## Authoring
//! - **pattern**: create patterns and edit their attributes, elements, templates, and automation
//!
//! ## Releasing
//! - **toolkit**: build versioned toolkit snapshots from the current pattern
//!
//! ## Consuming
//! - **draft**: create drafts from toolkits, fill them in, validate, upgrade, and run automation
//!
//! All commands take the `KitContext` built once per invocation in `main`.

pub mod draft;
pub mod init;
pub mod pattern;
pub mod toolkit;

use crate::core::error::{KitError, KitResult};
use serde::Serialize;

pub use draft::{
  run_draft_add_item, run_draft_clear, run_draft_delete, run_draft_list, run_draft_materialise, run_draft_new,
  run_draft_reset, run_draft_run, run_draft_set, run_draft_switch, run_draft_upgrade, run_draft_validate,
  run_draft_view,
};
pub use init::{InitOptions, run_init};
pub use pattern::{
  run_add_attribute, run_add_cli_command, run_add_element, run_add_launch_point, run_add_template,
  run_add_template_command, run_delete_attribute, run_delete_automation, run_delete_element, run_pattern_create,
  run_pattern_list, run_pattern_switch, run_pattern_view, run_update_attribute, run_update_element,
  run_update_launch_point, run_update_template_command,
};
pub use toolkit::{run_toolkit_build, run_toolkit_list};

/// Print any serializable value as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> KitResult<()> {
  let text =
    serde_json::to_string_pretty(value).map_err(|e| KitError::message(format!("Serialization error: {}", e)))?;
  println!("{}", text);
  Ok(())
}

/// Split a comma separated CLI list, dropping blanks
pub fn split_list(input: &str) -> Vec<String> {
  input
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}
