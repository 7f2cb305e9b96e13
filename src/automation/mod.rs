//! Running pattern automation against a draft
//!
//! A command runs once per materialised draft item bound to the element that owns
//! it. Launch points run each referenced command the same way. A failing target is
//! logged and the run moves on; the overall result is the AND of every target.
//!
//! - `services` - file system, template engine, and process collaborators
//! - `expression` - `{{Element.Attribute}}` resolution
//! - `artifact` - the code template artifact state machine

mod artifact;
pub mod expression;
pub mod services;

pub use services::{
  ApplicationExecutor, ExecutionOutcome, FileSystemWriter, LocalFileSystem, MustacheTemplateEngine, ProcessExecutor,
  TemplateEngine,
};

use crate::core::error::{AutomationError, KitResult};
use crate::draft::{DraftItemId, DraftModel};
use crate::schema::{Automation, AutomationKind, SchemaId, ToolkitDefinition};
use artifact::CodeTemplateRun;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Collaborators and settings for one automation run
pub struct AutomationContext<'a> {
  pub fs: &'a dyn FileSystemWriter,
  pub templates: &'a dyn TemplateEngine,
  pub executor: &'a dyn ApplicationExecutor,
  /// Base for relative and `~/` output paths
  pub output_root: PathBuf,
}

impl AutomationContext<'_> {
  /// Absolute location of a resolved path expression
  pub fn output_path(&self, resolved: &str) -> PathBuf {
    if let Some(rest) = resolved.strip_prefix("~/") {
      return self.output_root.join(rest);
    }
    let path = Path::new(resolved);
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.output_root.join(path)
    }
  }
}

/// Outcome of executing an automation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
  pub command_name: String,
  pub log: Vec<String>,
  pub is_success: bool,
}

/// Find an automation by id or name on the draft's schema and execute it
///
/// Lookup failures are errors; execution failures are reported in the result.
pub fn run_automation(
  context: &AutomationContext<'_>,
  toolkit: &ToolkitDefinition,
  draft: &mut DraftModel,
  key: &str,
  from: &DraftItemId,
) -> KitResult<ExecutionResult> {
  let (_, automation) = draft
    .schema()
    .find_automation(key)
    .ok_or_else(|| AutomationError::NotFound { key: key.to_string() })?;
  let automation = automation.clone();
  draft.item(from)?;
  Ok(automation.execute(context, toolkit, draft, from))
}

/// Execute one command (not a launch point) on its owning items under `from`
pub fn execute_command(
  context: &AutomationContext<'_>,
  toolkit: &ToolkitDefinition,
  draft: &mut DraftModel,
  key: &str,
  from: &DraftItemId,
) -> KitResult<ExecutionResult> {
  let is_launch_point = draft
    .schema()
    .find_automation(key)
    .map(|(_, automation)| automation.is_launch_point())
    .ok_or_else(|| AutomationError::NotFound { key: key.to_string() })?;
  if is_launch_point {
    return Err(
      AutomationError::WrongKind {
        name: key.to_string(),
        expected: "command",
      }
      .into(),
    );
  }
  run_automation(context, toolkit, draft, key, from)
}

impl Automation {
  /// Execute against every matching item at or below `from`
  pub fn execute(
    &self,
    context: &AutomationContext<'_>,
    toolkit: &ToolkitDefinition,
    draft: &mut DraftModel,
    from: &DraftItemId,
  ) -> ExecutionResult {
    let commands = match &self.kind {
      AutomationKind::CommandLaunchPoint { command_ids } => command_ids.clone(),
      _ => vec![self.id.clone()],
    };

    let mut result = ExecutionResult {
      command_name: self.name.clone(),
      log: Vec::new(),
      is_success: true,
    };
    for command_id in &commands {
      run_command(context, toolkit, draft, command_id, from, &mut result);
    }
    tracing::info!(automation = %self.name, success = result.is_success, "executed automation");
    result
  }
}

/// Run one command on each of its targets, isolating failures per target
fn run_command(
  context: &AutomationContext<'_>,
  toolkit: &ToolkitDefinition,
  draft: &mut DraftModel,
  command_id: &SchemaId,
  from: &DraftItemId,
  result: &mut ExecutionResult,
) {
  let resolved = draft
    .schema()
    .find_automation(command_id.as_str())
    .map(|(owner, command)| (owner.id.clone(), command.clone()));
  let Some((owner, command)) = resolved else {
    let error = AutomationError::NotFound {
      key: command_id.to_string(),
    };
    fail(result, command_id, &error.to_string());
    return;
  };

  let targets = match draft.targets(from, &owner) {
    Ok(targets) => targets,
    Err(err) => {
      fail(result, command_id, &err.to_string());
      return;
    }
  };
  if targets.is_empty() {
    result
      .log
      .push(format!("Command {} has no materialised targets", command.name));
  }

  for target in targets {
    match execute_on(context, toolkit, draft, &command, &target) {
      Ok(lines) => result.log.extend(lines),
      Err(err) => fail(result, command_id, &err.to_string()),
    }
  }
}

fn fail(result: &mut ExecutionResult, command_id: &SchemaId, message: &str) {
  tracing::warn!(command = %command_id, error = message, "automation target failed");
  result.log.push(format!("Command {} failed: {}", command_id, message));
  result.is_success = false;
}

fn execute_on(
  context: &AutomationContext<'_>,
  toolkit: &ToolkitDefinition,
  draft: &mut DraftModel,
  command: &Automation,
  target: &DraftItemId,
) -> KitResult<Vec<String>> {
  match &command.kind {
    AutomationKind::CodeTemplateCommand {
      code_template_id,
      is_one_off,
      file_path,
    } => CodeTemplateRun {
      command,
      code_template_id,
      is_one_off: *is_one_off,
      file_path,
    }
    .execute(context, toolkit, draft, target),
    AutomationKind::CliCommand {
      application_name,
      arguments,
    } => {
      let configuration = draft.get_configuration(target, true)?;
      let arguments = expression::resolve(arguments, &configuration)?;
      let outcome = context.executor.run(application_name, &arguments)?;
      if !outcome.success {
        return Err(
          AutomationError::ApplicationFailed {
            application: application_name.clone(),
            output: outcome.output,
          }
          .into(),
        );
      }
      let mut lines = vec![format!("Ran {} {}", application_name, arguments).trim_end().to_string()];
      lines.extend(outcome.output.lines().map(str::to_string));
      Ok(lines)
    }
    AutomationKind::CommandLaunchPoint { .. } => Err(
      AutomationError::WrongKind {
        name: command.name.clone(),
        expected: "command",
      }
      .into(),
    ),
  }
}
