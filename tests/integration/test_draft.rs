//! Tests for drafts: materialisation, properties, validation, and generation

use crate::helpers::*;
use anyhow::Result;

fn first_service_id(workspace: &TestWorkspace) -> Result<String> {
  let view = workspace.json(&["draft", "view", "--json"])?;
  Ok(view["Services"]["Items"][0]["Id"].as_str().unwrap_or_default().to_string())
}

#[test]
fn test_new_draft_has_only_top_level_placeholders() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  api_toolkit(&workspace)?;
  workspace.run(&["draft", "new", "Api", "Mine"])?;

  let view = workspace.json(&["draft", "view", "--json"])?;
  let object = view.as_object().expect("configuration is an object");
  assert!(object.contains_key("Id"));
  assert!(!object.contains_key("Name"));
  assert!(!object.contains_key("Services"));
  Ok(())
}

#[test]
fn test_validate_reports_missing_required_value() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  api_toolkit(&workspace)?;
  workspace.run(&["draft", "new", "Api", "Mine"])?;

  let output = workspace.run_failing(&["draft", "validate"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("{Api.Name}"));
  assert!(stdout.contains("is required"));

  workspace.run(&["draft", "set", "Name=orders"])?;
  let output = workspace.stdout(&["draft", "validate"])?;
  assert!(output.contains("is valid"));
  Ok(())
}

#[test]
fn test_collection_items_get_defaults_and_typed_values() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  api_toolkit(&workspace)?;
  workspace.run(&["draft", "new", "Api", "Mine"])?;
  workspace.run(&["draft", "add-item", "{Api.Services}", "Name=billing"])?;

  let view = workspace.json(&["draft", "view", "--json"])?;
  let item = &view["Services"]["Items"][0];
  assert_eq!(item["Name"], "billing");
  assert_eq!(item["Port"], 8080);

  let id = first_service_id(&workspace)?;
  let expression = format!("{{Api.Services.{}}}", id);
  let output = workspace.run_failing(&["draft", "set", "Port=eighty", "--item", &expression])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(String::from_utf8_lossy(&output.stderr).contains("Port=eighty"));

  workspace.run(&["draft", "set", "Port=9090", "--item", &expression])?;
  let view = workspace.json(&["draft", "view", &expression, "--ancestry", "--json"])?;
  assert_eq!(view["Port"], 9090);
  assert!(view["Parent"]["Id"].is_string());
  assert!(view["Parent"].get("Services").is_none());
  Ok(())
}

#[test]
fn test_delete_and_clear_collection_items() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  api_toolkit(&workspace)?;
  workspace.run(&["draft", "new", "Api", "Mine"])?;
  workspace.run(&["draft", "add-item", "{Api.Services}", "Name=a"])?;
  workspace.run(&["draft", "add-item", "{Api.Services}", "Name=b"])?;

  let id = first_service_id(&workspace)?;
  workspace.run(&["draft", "delete", &format!("{{Api.Services.{}}}", id)])?;
  let view = workspace.json(&["draft", "view", "--json"])?;
  assert_eq!(view["Services"]["Items"].as_array().map(Vec::len), Some(1));
  assert_eq!(view["Services"]["Items"][0]["Name"], "b");

  workspace.run(&["draft", "clear", "{Api.Services}"])?;
  let view = workspace.json(&["draft", "view", "--json"])?;
  assert_eq!(view["Services"]["Items"], serde_json::json!([]));
  Ok(())
}

#[test]
fn test_switch_between_drafts() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  api_toolkit(&workspace)?;
  workspace.run(&["draft", "new", "Api", "One"])?;
  workspace.run(&["draft", "new", "Api", "Two"])?;
  workspace.run(&["draft", "set", "Name=second"])?;
  workspace.run(&["draft", "switch", "One"])?;

  let view = workspace.json(&["draft", "view", "--json"])?;
  assert!(view.get("Name").is_none());
  let list = workspace.json(&["draft", "list", "--json"])?;
  assert_eq!(list, serde_json::json!(["One", "Two"]));
  Ok(())
}
