//! Idempotent file generation for code template commands
//!
//! The prior [`ArtifactLink`] for a `(command, item)` pair and the files currently
//! on disk decide what happens:
//!
//! | Prior link     | Files                | Normal                        | One-off            |
//! |----------------|----------------------|-------------------------------|--------------------|
//! | none           | target absent        | render, write, link           | render, write, link|
//! | none           | target exists        | render, overwrite, link       | link only          |
//! | same path      | any                  | render, write                 | nothing            |
//! | different path | old absent           | render, write, warn, relink   | render, write, relink |
//! | different path | old present          | delete old, render, write, relink | move, relink   |

use super::AutomationContext;
use crate::core::error::{AutomationError, KitResult};
use crate::draft::{ArtifactLink, DraftItemId, DraftModel};
use crate::schema::{Automation, SchemaId, ToolkitDefinition};
use std::path::Path;

/// Settings of one code template command
pub(crate) struct CodeTemplateRun<'a> {
  pub command: &'a Automation,
  pub code_template_id: &'a SchemaId,
  pub is_one_off: bool,
  pub file_path: &'a str,
}

impl CodeTemplateRun<'_> {
  /// Generate the artifact for one target item, returning log lines
  pub fn execute(
    &self,
    context: &AutomationContext<'_>,
    toolkit: &ToolkitDefinition,
    draft: &mut DraftModel,
    target: &DraftItemId,
  ) -> KitResult<Vec<String>> {
    let configuration = draft.get_configuration(target, true)?;
    let resolved = super::expression::resolve(self.file_path, &configuration)?;
    let path = context.output_path(&resolved);
    let tag = path
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_else(|| resolved.clone());

    let render = || -> KitResult<String> {
      let bytes = toolkit
        .template_content(self.code_template_id)
        .ok_or_else(|| AutomationError::TemplateMissing {
          template_id: self.code_template_id.to_string(),
        })?;
      let text = String::from_utf8(bytes.to_vec())?;
      context
        .templates
        .transform(&format!("{} ({})", self.command.name, tag), &text, &configuration)
    };

    let prior = draft.item(target)?.artifact_link(&self.command.id).cloned();
    let mut log = Vec::new();

    match prior {
      None => {
        if self.is_one_off && context.fs.exists(&path) {
          log.push(format!("Linked existing file {}", path.display()));
        } else {
          context.fs.write(&render()?, &path)?;
          log.push(format!("Generated {}", path.display()));
        }
      }
      Some(link) if link.path == path => {
        if self.is_one_off {
          log.push(format!("Skipped {}, already generated", path.display()));
        } else {
          context.fs.write(&render()?, &path)?;
          log.push(format!("Regenerated {}", path.display()));
        }
      }
      Some(link) => {
        if !context.fs.exists(&link.path) {
          context.fs.write(&render()?, &path)?;
          if !self.is_one_off {
            tracing::warn!(old = %link.path.display(), new = %path.display(), "previous artifact was already removed");
            log.push(format!(
              "Warning: previous file {} no longer exists and could not be deleted",
              link.path.display()
            ));
          }
          log.push(format!("Generated {}", path.display()));
        } else if self.is_one_off {
          context.fs.move_file(&link.path, &path)?;
          log.push(format!("Moved {} to {}", link.path.display(), path.display()));
        } else {
          let content = render()?;
          context.fs.delete(&link.path)?;
          context.fs.write(&content, &path)?;
          log.push(format!("Deleted {}", link.path.display()));
          log.push(format!("Generated {}", path.display()));
        }
      }
    }

    link_artifact(draft, target, &self.command.id, tag, &path)?;
    Ok(log)
  }
}

fn link_artifact(draft: &mut DraftModel, target: &DraftItemId, command_id: &SchemaId, tag: String, path: &Path) -> KitResult<()> {
  let item = draft.items_mut().get_mut(target)?;
  let link = ArtifactLink {
    command_id: command_id.clone(),
    tag,
    path: path.to_path_buf(),
  };
  match item.artifact_links.iter_mut().find(|l| l.command_id == *command_id) {
    Some(existing) => *existing = link,
    None => item.artifact_links.push(link),
  }
  Ok(())
}
