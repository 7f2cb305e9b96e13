//! `patternkit draft ...` - instantiating toolkits and driving generation
//!
//! Items are addressed with `{Pattern.Element.<itemId>.Child}` expressions and
//! default to the draft root. The draft is saved after every mutation, including
//! automation runs, which record artifact links.

use crate::automation::{AutomationContext, LocalFileSystem, MustacheTemplateEngine, ProcessExecutor, run_automation};
use crate::core::context::KitContext;
use crate::core::error::{DraftError, KitError, KitResult};
use crate::draft::{DraftItemId, DraftModel};
use crate::migration::MigrationChangeType;
use crate::schema::ToolkitDefinition;

fn current_draft(ctx: &KitContext) -> KitResult<DraftModel> {
  let name = ctx.session.require_draft()?;
  ctx.store.load_draft(name)
}

fn resolve_item(draft: &DraftModel, expression: Option<&str>) -> KitResult<DraftItemId> {
  match expression {
    Some(expression) => draft.find_by_expression(expression),
    None => Ok(draft.root_id().clone()),
  }
}

/// The exact toolkit release a draft was built from
fn bound_toolkit(ctx: &KitContext, draft: &DraftModel) -> KitResult<ToolkitDefinition> {
  let reference = draft.toolkit();
  ctx.store.load_toolkit_by_id(&reference.id, Some(&reference.version))
}

fn parse_version(version: Option<&str>) -> KitResult<Option<semver::Version>> {
  version.map(crate::version::parse_version).transpose()
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Create a draft from a toolkit release (latest by default) and make it current
pub fn run_draft_new(ctx: &mut KitContext, toolkit: &str, name: &str, version: Option<&str>) -> KitResult<()> {
  if ctx.store.draft_exists(name) {
    return Err(KitError::with_help(
      format!("A draft named '{}' already exists", name),
      format!("Run `patternkit draft switch {}` to use it.", name),
    ));
  }
  let version = parse_version(version)?;
  let toolkit = ctx.store.load_toolkit(toolkit, version.as_ref())?;
  let draft = DraftModel::new(name, &toolkit)?;
  ctx.store.save_draft(&draft)?;
  ctx.session.current_draft = Some(name.to_string());
  ctx.save_session()?;
  println!("Created draft '{}' from {} {}", name, toolkit.name, toolkit.version);
  Ok(())
}

pub fn run_draft_switch(ctx: &mut KitContext, name: &str) -> KitResult<()> {
  ctx.store.load_draft(name)?;
  ctx.session.current_draft = Some(name.to_string());
  ctx.save_session()?;
  println!("Switched to draft '{}'", name);
  Ok(())
}

pub fn run_draft_list(ctx: &KitContext, json: bool) -> KitResult<()> {
  let names = ctx.store.list_drafts()?;
  if json {
    return super::print_json(&names);
  }
  let current = ctx.session.current_draft.as_deref();
  for name in names {
    let marker = if Some(name.as_str()) == current { "*" } else { " " };
    println!("{} {}", marker, name);
  }
  Ok(())
}

/// Print the configuration of an item (the root by default)
pub fn run_draft_view(ctx: &KitContext, item: Option<&str>, ancestry: bool, json: bool) -> KitResult<()> {
  let draft = current_draft(ctx)?;
  let id = resolve_item(&draft, item)?;
  let configuration = draft.get_configuration(&id, ancestry)?;
  if !json {
    let reference = draft.toolkit();
    println!("{} ({} {})", draft.path(&id)?, reference.name, reference.version);
  }
  super::print_json(&configuration)
}

// ============================================================================
// Structure and properties
// ============================================================================

pub fn run_draft_materialise(ctx: &KitContext, item: &str, value: Option<&str>) -> KitResult<()> {
  let mut draft = current_draft(ctx)?;
  let id = draft.find_by_expression(item)?;
  draft.materialise(&id, value)?;
  ctx.store.save_draft(&draft)?;
  println!("Materialised {}", draft.path(&id)?);
  Ok(())
}

pub fn run_draft_add_item(ctx: &KitContext, collection: &str, assignments: &[String]) -> KitResult<()> {
  let mut draft = current_draft(ctx)?;
  let id = draft.find_by_expression(collection)?;
  let item = draft.materialise_collection_item(&id)?;
  if !assignments.is_empty() {
    draft.set_properties(&item, assignments)?;
  }
  ctx.store.save_draft(&draft)?;
  println!("Added item {}", draft.path(&item)?);
  Ok(())
}

pub fn run_draft_set(ctx: &KitContext, item: Option<&str>, assignments: &[String]) -> KitResult<()> {
  let mut draft = current_draft(ctx)?;
  let id = resolve_item(&draft, item)?;
  draft.set_properties(&id, assignments)?;
  ctx.store.save_draft(&draft)?;
  let noun = if assignments.len() == 1 { "property" } else { "properties" };
  println!("Set {} {} on {}", assignments.len(), noun, draft.path(&id)?);
  Ok(())
}

pub fn run_draft_reset(ctx: &KitContext, item: Option<&str>) -> KitResult<()> {
  let mut draft = current_draft(ctx)?;
  let id = resolve_item(&draft, item)?;
  draft.reset_all_properties(&id)?;
  ctx.store.save_draft(&draft)?;
  println!("Reset properties of {}", draft.path(&id)?);
  Ok(())
}

pub fn run_draft_clear(ctx: &KitContext, collection: &str) -> KitResult<()> {
  let mut draft = current_draft(ctx)?;
  let id = draft.find_by_expression(collection)?;
  draft.clear_collection_items(&id)?;
  ctx.store.save_draft(&draft)?;
  println!("Cleared {}", draft.path(&id)?);
  Ok(())
}

/// Delete an element, collection, or collection item from its parent
pub fn run_draft_delete(ctx: &KitContext, item: &str) -> KitResult<()> {
  let mut draft = current_draft(ctx)?;
  let id = draft.find_by_expression(item)?;
  let path = draft.path(&id)?;
  let parent = draft
    .item(&id)?
    .parent
    .clone()
    .ok_or_else(|| DraftError::NotAChild {
      child: id.to_string(),
      id: draft.id().to_string(),
    })?;
  draft.delete(&parent, &id)?;
  ctx.store.save_draft(&draft)?;
  println!("Deleted {}", path);
  Ok(())
}

/// Print validation errors; any error fails the command
pub fn run_draft_validate(ctx: &KitContext, item: Option<&str>, json: bool) -> KitResult<()> {
  let draft = current_draft(ctx)?;
  let id = resolve_item(&draft, item)?;
  let results = draft.validate(&id)?;

  if json {
    super::print_json(&results)?;
  } else if results.is_empty() {
    println!("{} is valid", draft.path(&id)?);
  } else {
    for result in &results {
      println!("{}", result);
    }
  }

  if results.is_empty() {
    Ok(())
  } else {
    Err(KitError::message(format!("Draft '{}' has {} validation error(s)", draft.name(), results.len())))
  }
}

// ============================================================================
// Upgrade and automation
// ============================================================================

/// Migrate the current draft to a newer release of its toolkit
///
/// Releases are found by toolkit id, so renaming the pattern does not strand drafts.
pub fn run_draft_upgrade(ctx: &KitContext, version: Option<&str>, force: bool, json: bool) -> KitResult<()> {
  let mut draft = current_draft(ctx)?;
  let version = parse_version(version)?;
  let toolkit = ctx.store.load_toolkit_by_id(&draft.toolkit().id, version.as_ref())?;
  let result = draft.upgrade(&toolkit, force);
  let migrated = result.is_success && result.of_type(MigrationChangeType::Abort).is_empty();
  if migrated {
    ctx.store.save_draft(&draft)?;
  }

  if json {
    super::print_json(&result)?;
  } else {
    for change in &result.changes {
      if change.path.is_empty() {
        println!("[{}] {}", change.change_type, change.message());
      } else {
        println!("[{}] {}: {}", change.change_type, change.path, change.message());
      }
    }
    if migrated {
      println!("Upgraded '{}' from {} to {}", draft.name(), result.from, result.to);
    }
  }

  if result.is_success {
    Ok(())
  } else {
    Err(KitError::with_help(
      format!("Draft '{}' was not upgraded to {}", draft.name(), result.to),
      "Use --force to accept a major version upgrade.",
    ))
  }
}

/// Run a launch point or command against the current draft
pub fn run_draft_run(ctx: &KitContext, key: &str, on: Option<&str>, json: bool) -> KitResult<()> {
  let mut draft = current_draft(ctx)?;
  let toolkit = bound_toolkit(ctx, &draft)?;
  let from = resolve_item(&draft, on)?;

  let output_root = ctx.output_root();
  let executor = ProcessExecutor::new(&output_root);
  let context = AutomationContext {
    fs: &LocalFileSystem,
    templates: &MustacheTemplateEngine,
    executor: &executor,
    output_root,
  };
  let result = run_automation(&context, &toolkit, &mut draft, key, &from)?;
  ctx.store.save_draft(&draft)?;

  if json {
    super::print_json(&result)?;
  } else {
    for line in &result.log {
      println!("{}", line);
    }
  }

  if result.is_success {
    Ok(())
  } else {
    Err(KitError::message(format!("Automation '{}' failed", result.command_name)))
  }
}
