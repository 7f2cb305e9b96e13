//! Side-effecting collaborators used by automation
//!
//! Each trait has one local implementation here. Tests substitute recording fakes.

use crate::core::error::{KitResult, ResultExt};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// File operations performed by code template commands
pub trait FileSystemWriter {
  fn exists(&self, path: &Path) -> bool;
  fn write(&self, content: &str, path: &Path) -> KitResult<()>;
  fn delete(&self, path: &Path) -> KitResult<()>;
  fn move_file(&self, from: &Path, to: &Path) -> KitResult<()>;
}

/// Renders template text against a configuration
pub trait TemplateEngine {
  fn transform(&self, description: &str, template: &str, data: &Value) -> KitResult<String>;
}

/// Result of spawning an external application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
  pub success: bool,
  pub output: String,
}

/// Spawns external applications for CLI commands
pub trait ApplicationExecutor {
  fn run(&self, application: &str, arguments: &str) -> KitResult<ExecutionOutcome>;
}

// ============================================================================
// Local implementations
// ============================================================================

/// [`FileSystemWriter`] over `std::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

fn ensure_parent(path: &Path) -> KitResult<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {}", parent.display()))?;
  }
  Ok(())
}

impl FileSystemWriter for LocalFileSystem {
  fn exists(&self, path: &Path) -> bool {
    path.is_file()
  }

  fn write(&self, content: &str, path: &Path) -> KitResult<()> {
    ensure_parent(path)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
  }

  fn delete(&self, path: &Path) -> KitResult<()> {
    fs::remove_file(path).with_context(|| format!("Failed to delete {}", path.display()))
  }

  fn move_file(&self, from: &Path, to: &Path) -> KitResult<()> {
    ensure_parent(to)?;
    fs::rename(from, to).with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))
  }
}

/// [`TemplateEngine`] that substitutes `{{Name}}` and `{{Parent.Name}}` placeholders
#[derive(Debug, Default, Clone, Copy)]
pub struct MustacheTemplateEngine;

impl TemplateEngine for MustacheTemplateEngine {
  fn transform(&self, description: &str, template: &str, data: &Value) -> KitResult<String> {
    tracing::trace!(description, "rendering template");
    super::expression::resolve(template, data)
  }
}

/// [`ApplicationExecutor`] over `std::process::Command`
#[derive(Debug, Default, Clone)]
pub struct ProcessExecutor {
  working_dir: Option<PathBuf>,
}

impl ProcessExecutor {
  pub fn new(working_dir: impl Into<PathBuf>) -> Self {
    Self {
      working_dir: Some(working_dir.into()),
    }
  }
}

impl ApplicationExecutor for ProcessExecutor {
  fn run(&self, application: &str, arguments: &str) -> KitResult<ExecutionOutcome> {
    let mut command = Command::new(application);
    command.args(arguments.split_whitespace());
    if let Some(dir) = &self.working_dir {
      command.current_dir(dir);
    }

    let output = command
      .output()
      .with_context(|| format!("Failed to start '{}'", application))?;
    let mut text = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
      if !text.is_empty() {
        text.push('\n');
      }
      text.push_str(stderr.trim_end());
    }

    Ok(ExecutionOutcome {
      success: output.status.success(),
      output: text,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_local_file_system_round_trip() {
    let temp = TempDir::new().unwrap();
    let fs = LocalFileSystem;
    let first = temp.path().join("nested/dir/a.txt");
    let second = temp.path().join("other/b.txt");

    fs.write("hello", &first).unwrap();
    assert!(fs.exists(&first));
    fs.move_file(&first, &second).unwrap();
    assert!(!fs.exists(&first));
    assert_eq!(std::fs::read_to_string(&second).unwrap(), "hello");
    fs.delete(&second).unwrap();
    assert!(!fs.exists(&second));
  }

  #[test]
  fn test_mustache_engine_renders_configuration() {
    let data = serde_json::json!({ "Name": "billing", "Parent": { "Owner": "platform" } });
    let rendered = MustacheTemplateEngine
      .transform("readme", "# {{Name}} by {{ Parent.Owner }}", &data)
      .unwrap();
    assert_eq!(rendered, "# billing by platform");
  }

  #[cfg(unix)]
  #[test]
  fn test_process_executor_reports_exit_status() {
    let executor = ProcessExecutor::default();
    let ok = executor.run("echo", "hello world").unwrap();
    assert!(ok.success);
    assert_eq!(ok.output, "hello world");

    let failed = executor.run("false", "").unwrap();
    assert!(!failed.success);
  }
}
