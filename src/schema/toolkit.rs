//! Immutable versioned snapshots of a pattern

use super::{Pattern, SchemaId};
use crate::core::error::{KitResult, SchemaError};
use crate::version::{VersionInstruction, VersionUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A released pattern plus the bytes of its code templates
///
/// Snapshots are deep copies: later edits to the source pattern never reach an
/// existing toolkit. Schema ids are copied verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolkitDefinition {
  pub id: SchemaId,
  pub name: String,
  pub version: semver::Version,
  pub pattern: Pattern,
  #[serde(default)]
  pub code_templates: BTreeMap<SchemaId, Vec<u8>>,
  /// SHA-256 over template ids and bytes, hex encoded
  pub fingerprint: String,
  pub built_at: DateTime<Utc>,
}

/// Result of building a toolkit
#[derive(Debug, Clone)]
pub struct ToolkitBuild {
  pub toolkit: ToolkitDefinition,
  pub warning: Option<String>,
}

impl ToolkitDefinition {
  /// Release `pattern` at the next version and snapshot it
  ///
  /// Every code template in the pattern must have content in `contents`; this is
  /// checked before the version is touched.
  pub fn build(
    pattern: &mut Pattern,
    instruction: &VersionInstruction,
    contents: &BTreeMap<SchemaId, Vec<u8>>,
  ) -> KitResult<ToolkitBuild> {
    let mut code_templates = BTreeMap::new();
    for template in pattern.root().all_code_templates() {
      let bytes = contents.get(&template.id).ok_or_else(|| SchemaError::MissingTemplateContent {
        name: template.name.clone(),
      })?;
      code_templates.insert(template.id.clone(), bytes.clone());
    }

    let VersionUpdate { version, warning } = pattern.update_version(instruction)?;
    let fingerprint = fingerprint(&code_templates);
    tracing::info!(pattern = pattern.name(), %version, %fingerprint, "built toolkit");

    Ok(ToolkitBuild {
      toolkit: ToolkitDefinition {
        id: pattern.id().clone(),
        name: pattern.name().to_string(),
        version,
        pattern: pattern.clone(),
        code_templates,
        fingerprint,
        built_at: Utc::now(),
      },
      warning,
    })
  }

  /// Template bytes by template id
  pub fn template_content(&self, id: &SchemaId) -> Option<&[u8]> {
    self.code_templates.get(id).map(Vec::as_slice)
  }
}

fn fingerprint(templates: &BTreeMap<SchemaId, Vec<u8>>) -> String {
  let mut hasher = Sha256::new();
  for (id, bytes) in templates {
    hasher.update(id.as_str().as_bytes());
    hasher.update(bytes);
  }
  format!("{:x}", hasher.finalize())
}
