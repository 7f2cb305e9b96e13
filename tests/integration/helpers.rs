//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scratch working directory with its own store
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    Ok(Self { _root: root, path })
  }

  /// Write a file relative to the workspace, creating parent directories
  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    let full = self.path.join(path);
    if let Some(parent) = full.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(full, content)?;
    Ok(())
  }

  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  /// Run patternkit, failing the test on a non-zero exit
  pub fn run(&self, args: &[&str]) -> Result<Output> {
    run_patternkit(&self.path, args)
  }

  /// Run patternkit and return stdout
  pub fn stdout(&self, args: &[&str]) -> Result<String> {
    let output = self.run(args)?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }

  /// Run patternkit with `--json` output and parse it
  pub fn json(&self, args: &[&str]) -> Result<serde_json::Value> {
    let stdout = self.stdout(args)?;
    serde_json::from_str(&stdout).with_context(|| format!("Output was not JSON:\n{}", stdout))
  }

  /// Run patternkit expecting failure; returns the raw output
  pub fn run_failing(&self, args: &[&str]) -> Result<Output> {
    let output = command(&self.path, args)?;
    if output.status.success() {
      anyhow::bail!(
        "patternkit {} succeeded unexpectedly\nstdout: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout)
      );
    }
    Ok(output)
  }
}

fn command(cwd: &Path, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_patternkit");
  Command::new(bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("PATTERNKIT_LOG")
    .output()
    .context("Failed to run patternkit")
}

/// Run patternkit CLI command
pub fn run_patternkit(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = command(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "patternkit command failed: patternkit {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Pattern `Api` with a required `Name`, a `Services` collection of `Port`s, and
/// a template command generating one file per service; released as 0.1.0
pub fn api_toolkit(workspace: &TestWorkspace) -> Result<()> {
  workspace.write_file("templates/service.rs.tpl", "// service {{Name}} on {{Port}}\n")?;
  workspace.run(&["pattern", "create", "Api"])?;
  workspace.run(&["pattern", "add-attribute", "Name", "--required"])?;
  workspace.run(&["pattern", "add-element", "Services", "--cardinality", "zero-or-many"])?;
  workspace.run(&["pattern", "add-attribute", "Name", "--parent", "{Api.Services}"])?;
  workspace.run(&[
    "pattern",
    "add-attribute",
    "Port",
    "--parent",
    "{Api.Services}",
    "--type",
    "int",
    "--default",
    "8080",
  ])?;
  workspace.run(&[
    "pattern",
    "add-template",
    "Service",
    "templates/service.rs.tpl",
    "--parent",
    "{Api.Services}",
  ])?;
  workspace.run(&[
    "pattern",
    "add-template-command",
    "Generate",
    "--template",
    "Service",
    "--path",
    "gen/{{Name}}.rs",
    "--parent",
    "{Api.Services}",
  ])?;
  workspace.run(&["pattern", "add-launch-point", "Build", "--commands", "Generate"])?;
  workspace.run(&["toolkit", "build"])?;
  Ok(())
}
