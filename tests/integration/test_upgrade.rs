//! Tests for upgrading drafts to newer toolkit releases

use crate::helpers::*;
use anyhow::Result;

fn draft_with_service(workspace: &TestWorkspace) -> Result<()> {
  api_toolkit(workspace)?;
  workspace.run(&["draft", "new", "Api", "Mine"])?;
  workspace.run(&["draft", "set", "Name=shop"])?;
  workspace.run(&["draft", "add-item", "{Api.Services}", "Name=billing"])?;
  Ok(())
}

#[test]
fn test_minor_upgrade_adds_new_attribute_defaults() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  draft_with_service(&workspace)?;
  workspace.run(&[
    "pattern",
    "add-attribute",
    "Owner",
    "--parent",
    "{Api.Services}",
    "--default",
    "platform",
  ])?;
  workspace.run(&["toolkit", "build"])?;

  let result = workspace.json(&["draft", "upgrade", "--json"])?;
  assert_eq!(result["is_success"], true);
  assert_eq!(result["from"], "0.1.0");
  assert_eq!(result["to"], "0.2.0");
  let changes = result["changes"].as_array().cloned().unwrap_or_default();
  assert!(
    changes
      .iter()
      .any(|c| c["change_type"] == "non_breaking" && c["args"][0] == "Owner")
  );

  let view = workspace.json(&["draft", "view", "--json"])?;
  assert_eq!(view["Name"], "shop");
  assert_eq!(view["Services"]["Items"][0]["Name"], "billing");
  assert_eq!(view["Services"]["Items"][0]["Owner"], "platform");
  Ok(())
}

#[test]
fn test_major_upgrade_requires_force() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  draft_with_service(&workspace)?;
  workspace.run(&["pattern", "delete-element", "{Api.Services}"])?;
  let built = workspace.json(&["toolkit", "build", "--json"])?;
  assert_eq!(built["version"], "1.0.0");

  let output = workspace.run_failing(&["draft", "upgrade"])?;
  assert!(String::from_utf8_lossy(&output.stdout).contains("use --force"));
  let view = workspace.json(&["draft", "view", "--json"])?;
  assert!(view.get("Services").is_some());

  let result = workspace.json(&["draft", "upgrade", "--force", "--json"])?;
  assert_eq!(result["is_success"], true);
  let deletions: Vec<_> = result["changes"]
    .as_array()
    .cloned()
    .unwrap_or_default()
    .into_iter()
    .filter(|c| c["message_template"] == "Element '{0}' was deleted")
    .collect();
  assert_eq!(deletions.len(), 1);

  let view = workspace.json(&["draft", "view", "--json"])?;
  assert!(view.get("Services").is_none());
  assert_eq!(view["Name"], "shop");
  Ok(())
}

#[test]
fn test_upgrade_to_current_version_is_a_no_op() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  draft_with_service(&workspace)?;
  let result = workspace.json(&["draft", "upgrade", "--json"])?;
  assert_eq!(result["is_success"], true);
  assert_eq!(result["changes"][0]["change_type"], "abort");
  Ok(())
}

#[test]
fn test_type_change_resets_incompatible_values() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  draft_with_service(&workspace)?;
  workspace.run(&[
    "pattern",
    "update-attribute",
    "Name",
    "--parent",
    "{Api.Services}",
    "--type",
    "int",
  ])?;
  workspace.run(&["toolkit", "build"])?;

  let result = workspace.json(&["draft", "upgrade", "--force", "--json"])?;
  assert_eq!(result["is_success"], true);
  let type_changes = result["changes"]
    .as_array()
    .cloned()
    .unwrap_or_default()
    .into_iter()
    .filter(|c| {
      c["change_type"] == "breaking" && c["message_template"].as_str().unwrap_or_default().contains("data type")
    })
    .count();
  assert_eq!(type_changes, 1);

  let view = workspace.json(&["draft", "view", "--json"])?;
  assert!(view["Services"]["Items"][0]["Name"].is_null());
  Ok(())
}

#[test]
fn test_upgrade_after_pattern_rename() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  draft_with_service(&workspace)?;
  workspace.run(&["pattern", "update-element", "{Api}", "--rename", "Shop"])?;
  let built = workspace.json(&["toolkit", "build", "--json"])?;
  assert_eq!(built["name"], "Shop");
  assert_eq!(built["version"], "1.0.0");

  let result = workspace.json(&["draft", "upgrade", "--force", "--json"])?;
  assert_eq!(result["is_success"], true);
  assert_eq!(result["to"], "1.0.0");

  let view = workspace.json(&["draft", "view", "--json"])?;
  assert_eq!(view["Name"], "shop");
  assert_eq!(view["Services"]["Items"][0]["Name"], "billing");
  let toolkits = workspace.json(&["toolkit", "list", "--json"])?;
  assert_eq!(toolkits["Shop"].as_array().map(Vec::len), Some(2));
  assert!(toolkits.get("Api").is_none());
  Ok(())
}
