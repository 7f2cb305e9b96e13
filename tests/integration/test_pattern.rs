//! Tests for pattern authoring and toolkit builds

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_create_and_view_pattern() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.run(&["pattern", "create", "Api"])?;
  workspace.run(&["pattern", "add-attribute", "Name", "--required"])?;
  workspace.run(&["pattern", "add-element", "Services", "--cardinality", "zero-or-many"])?;

  assert!(workspace.file_exists(".patternkit/patterns/Api/pattern.json"));
  assert!(workspace.file_exists(".patternkit/session.json"));

  let view = workspace.stdout(&["pattern", "view"])?;
  assert!(view.contains("- Name: string [required]"));
  assert!(view.contains("+ Services (zero-or-many)"));
  assert!(view.contains("[non-breaking] Attribute 'Name' was added to 'Api'"));

  let json = workspace.json(&["pattern", "view", "--json"])?;
  assert_eq!(json["root"]["name"], "Api");
  assert_eq!(json["root"]["elements"][0]["name"], "Services");
  Ok(())
}

#[test]
fn test_invalid_names_exit_with_validation_code() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.run(&["pattern", "create", "Api"])?;

  let output = workspace.run_failing(&["pattern", "add-attribute", "Items"])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(String::from_utf8_lossy(&output.stderr).contains("reserved"));

  workspace.run(&["pattern", "add-element", "Db"])?;
  let output = workspace.run_failing(&["pattern", "add-attribute", "Db"])?;
  assert_eq!(output.status.code(), Some(3));
  Ok(())
}

#[test]
fn test_commands_without_a_pattern_explain_how_to_start() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  let output = workspace.run_failing(&["pattern", "view"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("pattern create"));
  Ok(())
}

#[test]
fn test_toolkit_versions_follow_change_severity() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.run(&["pattern", "create", "Api"])?;
  workspace.run(&["pattern", "add-attribute", "Name"])?;

  let first = workspace.json(&["toolkit", "build", "--json"])?;
  assert_eq!(first["version"], "0.1.0");

  workspace.run(&["pattern", "add-attribute", "Owner"])?;
  let second = workspace.json(&["toolkit", "build", "--json"])?;
  assert_eq!(second["version"], "0.2.0");

  workspace.run(&["pattern", "delete-attribute", "Owner"])?;
  let third = workspace.json(&["toolkit", "build", "--json"])?;
  assert_eq!(third["version"], "1.0.0");

  let list = workspace.json(&["toolkit", "list", "--json"])?;
  assert_eq!(list["Api"], serde_json::json!(["0.1.0", "0.2.0", "1.0.0"]));
  Ok(())
}

#[test]
fn test_explicit_version_after_breaking_change_needs_force() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.run(&["pattern", "create", "Api"])?;
  workspace.run(&["pattern", "add-attribute", "Name"])?;
  workspace.run(&["toolkit", "build"])?;
  workspace.run(&["pattern", "update-attribute", "Name", "--rename", "Title"])?;

  let output = workspace.run_failing(&["toolkit", "build", "--version", "0.2.0"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Attribute 'Name' was renamed to 'Title'"));

  let forced = workspace.json(&["toolkit", "build", "--version", "0.2.0", "--force", "--json"])?;
  assert_eq!(forced["version"], "0.2.0");
  assert!(forced["warning"].as_str().unwrap_or_default().contains("renamed"));

  let output = workspace.run_failing(&["toolkit", "build", "--version", "0.1.5"])?;
  assert_eq!(output.status.code(), Some(3));
  Ok(())
}

#[test]
fn test_toolkit_build_requires_template_files() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.write_file("readme.tpl", "# {{Name}}\n")?;
  workspace.run(&["pattern", "create", "Api"])?;
  workspace.run(&["pattern", "add-template", "Readme", "readme.tpl"])?;
  assert!(workspace.file_exists(".patternkit/patterns/Api/templates"));

  let built = workspace.json(&["toolkit", "build", "--json"])?;
  assert_eq!(built["templates"], 1);
  assert_eq!(built["fingerprint"].as_str().map(str::len), Some(64));
  Ok(())
}
