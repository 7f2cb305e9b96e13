//! Automation definitions attached to elements
//!
//! Execution lives in [`crate::automation`]; this module only describes what each
//! variant is configured with.

use super::{SchemaId, validate_name};
use crate::core::error::KitResult;
use serde::{Deserialize, Serialize};

/// Named automation owned by an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Automation {
  pub id: SchemaId,
  pub name: String,
  pub kind: AutomationKind,
}

/// Closed set of automation variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutomationKind {
  /// Render a code template to a path expression
  CodeTemplateCommand {
    code_template_id: SchemaId,
    is_one_off: bool,
    file_path: String,
  },

  /// Spawn an external application
  CliCommand { application_name: String, arguments: String },

  /// Run a list of commands against every matching draft item
  CommandLaunchPoint { command_ids: Vec<SchemaId> },
}

impl Automation {
  pub fn new(name: &str, kind: AutomationKind) -> KitResult<Self> {
    validate_name(name)?;
    Ok(Self {
      id: SchemaId::new(),
      name: name.to_string(),
      kind,
    })
  }

  pub fn is_launch_point(&self) -> bool {
    matches!(self.kind, AutomationKind::CommandLaunchPoint { .. })
  }

  pub fn kind_name(&self) -> &'static str {
    match self.kind {
      AutomationKind::CodeTemplateCommand { .. } => "code template command",
      AutomationKind::CliCommand { .. } => "cli command",
      AutomationKind::CommandLaunchPoint { .. } => "launch point",
    }
  }
}
