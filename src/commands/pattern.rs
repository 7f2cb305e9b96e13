//! `patternkit pattern ...` - authoring the current pattern
//!
//! Every mutating command loads the current pattern, applies one schema operation,
//! and saves it back. Parents are addressed with `{Pattern.Element}` expressions and
//! default to the pattern root.

use crate::core::context::KitContext;
use crate::core::error::{KitError, KitResult, ResultExt, SchemaError};
use crate::schema::{AttributeSpec, AttributeUpdate, Element, ElementSpec, ElementUpdate, Pattern, SchemaId};
use std::fs;
use std::path::Path;

/// Load the session's current pattern
pub(crate) fn current_pattern(ctx: &KitContext) -> KitResult<Pattern> {
  let name = ctx.session.require_pattern()?;
  ctx.store.load_pattern(name)
}

/// Parent element id from an optional expression; `None` means the root
fn parent_id(pattern: &Pattern, parent: Option<&str>) -> KitResult<SchemaId> {
  match parent {
    Some(expression) => pattern.resolve_element(expression),
    None => Ok(pattern.id().clone()),
  }
}

fn parent_element<'a>(pattern: &'a Pattern, parent: Option<&str>) -> KitResult<&'a Element> {
  let id = parent_id(pattern, parent)?;
  pattern.find_element(&id).ok_or_else(|| {
    SchemaError::NodeNotFound {
      kind: "element",
      key: id.to_string(),
    }
    .into()
  })
}

fn attribute_id(pattern: &Pattern, parent: Option<&str>, name: &str) -> KitResult<SchemaId> {
  parent_element(pattern, parent)?
    .attribute(name)
    .map(|a| a.id.clone())
    .ok_or_else(|| {
      SchemaError::NodeNotFound {
        kind: "attribute",
        key: name.to_string(),
      }
      .into()
    })
}

fn save(ctx: &KitContext, pattern: &Pattern) -> KitResult<()> {
  ctx.store.save_pattern(pattern)?;
  tracing::debug!(
    pattern = pattern.name(),
    pending = %pattern.version().last_changes(),
    "saved pattern"
  );
  Ok(())
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Create a pattern and make it current
pub fn run_pattern_create(ctx: &mut KitContext, name: &str) -> KitResult<()> {
  if ctx.store.pattern_exists(name) {
    return Err(KitError::with_help(
      format!("A pattern named '{}' already exists", name),
      format!("Run `patternkit pattern switch {}` to edit it.", name),
    ));
  }
  let pattern = Pattern::new(name)?;
  save(ctx, &pattern)?;
  ctx.session.current_pattern = Some(name.to_string());
  ctx.save_session()?;
  println!("Created pattern '{}' ({})", name, pattern.id());
  Ok(())
}

pub fn run_pattern_switch(ctx: &mut KitContext, name: &str) -> KitResult<()> {
  ctx.store.load_pattern(name)?;
  ctx.session.current_pattern = Some(name.to_string());
  ctx.save_session()?;
  println!("Switched to pattern '{}'", name);
  Ok(())
}

pub fn run_pattern_list(ctx: &KitContext, json: bool) -> KitResult<()> {
  let names = ctx.store.list_patterns()?;
  if json {
    return super::print_json(&names);
  }
  let current = ctx.session.current_pattern.as_deref();
  for name in names {
    let marker = if Some(name.as_str()) == current { "*" } else { " " };
    println!("{} {}", marker, name);
  }
  Ok(())
}

/// Print the schema tree and the pending change log
pub fn run_pattern_view(ctx: &KitContext, json: bool) -> KitResult<()> {
  let pattern = current_pattern(ctx)?;
  if json {
    return super::print_json(&pattern);
  }

  let version = pattern.version();
  println!(
    "{} {} (pending: {})",
    pattern.name(),
    version.current(),
    version.last_changes()
  );
  print_element(pattern.root(), 1);
  if !version.change_log().is_empty() {
    println!();
    println!("Changes since {}:", version.current());
    for entry in version.change_log() {
      println!("  [{}] {}", entry.severity, entry.message());
    }
  }
  Ok(())
}

fn print_element(element: &Element, depth: usize) {
  let indent = "  ".repeat(depth);
  for attribute in &element.attributes {
    let mut line = format!("{}- {}: {}", indent, attribute.name, attribute.data_type.name());
    if attribute.is_required {
      line.push_str(" [required]");
    }
    if let Some(default) = &attribute.default_value {
      line.push_str(&format!(" = {}", default));
    }
    if attribute.has_choices() {
      line.push_str(&format!(" ({})", attribute.choices.join("|")));
    }
    println!("{}", line);
  }
  for template in &element.code_templates {
    println!("{}# {} <- {}", indent, template.name, template.original_file_path);
  }
  for automation in &element.automation {
    println!("{}* {} ({})", indent, automation.name, automation.kind_name());
  }
  for child in &element.elements {
    let auto = if child.auto_create { ", auto-create" } else { "" };
    println!("{}+ {} ({}{})", indent, child.name, child.cardinality, auto);
    print_element(child, depth + 1);
  }
}

// ============================================================================
// Attributes and elements
// ============================================================================

pub fn run_add_attribute(ctx: &KitContext, parent: Option<&str>, spec: AttributeSpec) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let parent_id = parent_id(&pattern, parent)?;
  let name = spec.name.clone();
  let id = pattern.add_attribute(&parent_id, spec)?;
  save(ctx, &pattern)?;
  println!("Added attribute '{}' ({})", name, id);
  Ok(())
}

pub fn run_update_attribute(ctx: &KitContext, parent: Option<&str>, name: &str, update: AttributeUpdate) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let id = attribute_id(&pattern, parent, name)?;
  pattern.update_attribute(&id, update)?;
  save(ctx, &pattern)?;
  println!("Updated attribute '{}'", name);
  Ok(())
}

pub fn run_delete_attribute(ctx: &KitContext, parent: Option<&str>, name: &str) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let id = attribute_id(&pattern, parent, name)?;
  pattern.delete_attribute(&id)?;
  save(ctx, &pattern)?;
  println!("Deleted attribute '{}'", name);
  Ok(())
}

pub fn run_add_element(ctx: &KitContext, parent: Option<&str>, spec: ElementSpec) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let parent_id = parent_id(&pattern, parent)?;
  let name = spec.name.clone();
  let id = pattern.add_element(&parent_id, spec)?;
  save(ctx, &pattern)?;
  println!("Added element '{}' ({})", name, id);
  Ok(())
}

/// Update an element; renaming the root also moves the stored pattern
pub fn run_update_element(ctx: &mut KitContext, element: &str, update: ElementUpdate) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let id = pattern.resolve_element(element)?;
  let old_name = pattern.name().to_string();
  pattern.update_element(&id, update)?;

  if pattern.name() != old_name {
    ctx.store.rename_pattern(&old_name, pattern.name())?;
    ctx.session.current_pattern = Some(pattern.name().to_string());
    ctx.save_session()?;
  }
  save(ctx, &pattern)?;
  println!("Updated element {}", element);
  Ok(())
}

pub fn run_delete_element(ctx: &KitContext, element: &str) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let id = pattern.resolve_element(element)?;
  pattern.delete_element(&id)?;
  save(ctx, &pattern)?;
  println!("Deleted element {}", element);
  Ok(())
}

// ============================================================================
// Templates and automation
// ============================================================================

/// Register a code template and store the file's bytes beside the pattern
pub fn run_add_template(ctx: &KitContext, parent: Option<&str>, name: &str, file: &Path) -> KitResult<()> {
  let content = fs::read(file).with_context(|| format!("Failed to read template {}", file.display()))?;
  let mut pattern = current_pattern(ctx)?;
  let parent_id = parent_id(&pattern, parent)?;
  let id = pattern.add_code_template(&parent_id, name, &file.to_string_lossy())?;
  ctx.store.save_template(pattern.name(), &id, &content)?;
  save(ctx, &pattern)?;
  println!("Added code template '{}' ({}, {} bytes)", name, id, content.len());
  Ok(())
}

pub fn run_add_template_command(
  ctx: &KitContext,
  parent: Option<&str>,
  name: &str,
  template: &str,
  path: &str,
  one_off: bool,
) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let parent_id = parent_id(&pattern, parent)?;
  let id = pattern.add_code_template_command(&parent_id, name, template, one_off, path)?;
  save(ctx, &pattern)?;
  println!("Added code template command '{}' ({})", name, id);
  Ok(())
}

pub fn run_update_template_command(
  ctx: &KitContext,
  name: &str,
  one_off: Option<bool>,
  path: Option<String>,
) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let id = automation_id(&pattern, name)?;
  pattern.update_code_template_command(&id, one_off, path)?;
  save(ctx, &pattern)?;
  println!("Updated command '{}'", name);
  Ok(())
}

pub fn run_add_cli_command(
  ctx: &KitContext,
  parent: Option<&str>,
  name: &str,
  application: &str,
  arguments: &str,
) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let parent_id = parent_id(&pattern, parent)?;
  let id = pattern.add_cli_command(&parent_id, name, application, arguments)?;
  save(ctx, &pattern)?;
  println!("Added CLI command '{}' ({})", name, id);
  Ok(())
}

pub fn run_add_launch_point(ctx: &KitContext, parent: Option<&str>, name: &str, commands: &[String]) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let parent_id = parent_id(&pattern, parent)?;
  let id = pattern.add_launch_point(&parent_id, name, commands)?;
  save(ctx, &pattern)?;
  println!("Added launch point '{}' ({})", name, id);
  Ok(())
}

pub fn run_update_launch_point(ctx: &KitContext, name: &str, add: &[String], remove: &[String]) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let id = automation_id(&pattern, name)?;
  pattern.update_launch_point(&id, add, remove)?;
  save(ctx, &pattern)?;
  println!("Updated launch point '{}'", name);
  Ok(())
}

/// Delete a command, launch point, or code template by name or id
pub fn run_delete_automation(ctx: &KitContext, name: &str) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  if let Some(template) = pattern.root().find_code_template(name) {
    let id = template.id.clone();
    pattern.delete_code_template(&id)?;
  } else {
    let id = automation_id(&pattern, name)?;
    pattern.delete_automation(&id)?;
  }
  save(ctx, &pattern)?;
  println!("Deleted '{}'", name);
  Ok(())
}

fn automation_id(pattern: &Pattern, key: &str) -> KitResult<SchemaId> {
  pattern
    .find_automation(key)
    .map(|(_, automation)| automation.id.clone())
    .ok_or_else(|| {
      SchemaError::NodeNotFound {
        kind: "automation",
        key: key.to_string(),
      }
      .into()
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_create_sets_current_pattern() {
    let temp = TempDir::new().unwrap();
    let mut ctx = KitContext::build(temp.path()).unwrap();
    run_pattern_create(&mut ctx, "Api").unwrap();
    assert_eq!(ctx.session.require_pattern().unwrap(), "Api");
    assert!(run_pattern_create(&mut ctx, "Api").is_err());
  }

  #[test]
  fn test_root_rename_moves_stored_pattern() {
    let temp = TempDir::new().unwrap();
    let mut ctx = KitContext::build(temp.path()).unwrap();
    run_pattern_create(&mut ctx, "Api").unwrap();
    run_add_attribute(&ctx, None, AttributeSpec::new("Name", "string")).unwrap();

    let update = ElementUpdate {
      name: Some("Service".to_string()),
      ..Default::default()
    };
    run_update_element(&mut ctx, "{Api}", update).unwrap();

    assert_eq!(ctx.session.require_pattern().unwrap(), "Service");
    assert!(!ctx.store.pattern_exists("Api"));
    let pattern = ctx.store.load_pattern("Service").unwrap();
    assert!(pattern.root().attribute("Name").is_some());
  }

  #[test]
  fn test_nested_attribute_is_addressed_through_parent() {
    let temp = TempDir::new().unwrap();
    let mut ctx = KitContext::build(temp.path()).unwrap();
    run_pattern_create(&mut ctx, "Api").unwrap();
    run_add_element(&ctx, None, ElementSpec::new("Db", crate::schema::Cardinality::ZeroOrOne)).unwrap();
    run_add_attribute(&ctx, Some("{Api.Db}"), AttributeSpec::new("Port", "int")).unwrap();

    assert!(run_delete_attribute(&ctx, None, "Port").is_err());
    run_delete_attribute(&ctx, Some("{Api.Db}"), "Port").unwrap();
    let pattern = ctx.store.load_pattern("Api").unwrap();
    assert!(pattern.root().element("Db").unwrap().attributes.is_empty());
  }
}
