//! Pattern schema tree
//!
//! A pattern is a tree of elements. Each element carries attributes (typed scalars),
//! nested elements or collections, code templates, and automation. Every mutation
//! made through [`Pattern`] is classified and registered on the pattern's
//! [`VersionTracker`](crate::version::VersionTracker).
//!
//! - **attribute**: typed scalar definitions with defaults and choices
//! - **automation**: code template commands, CLI commands, launch points
//! - **data_type**: supported scalar types and typed values
//! - **element**: elements, collections and code templates
//! - **pattern**: the root aggregate and its authoring operations
//! - **toolkit**: immutable versioned snapshots of a pattern

pub mod attribute;
pub mod automation;
pub mod data_type;
pub mod element;
pub mod pattern;
pub mod toolkit;

pub use attribute::{Attribute, AttributeSpec, AttributeUpdate};
pub use automation::{Automation, AutomationKind};
pub use data_type::{DataType, ScalarValue};
pub use element::{Cardinality, CodeTemplate, Element, ElementSpec, ElementUpdate, SchemaNode};
pub use pattern::Pattern;
pub use toolkit::ToolkitDefinition;

use crate::core::error::{KitResult, SchemaError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Stable identity of a schema node
///
/// Ids survive renames and are carried verbatim into toolkit snapshots, so two
/// snapshots of the same pattern agree on which node is which.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(String);

impl SchemaId {
  pub fn new() -> Self {
    Self(uuid::Uuid::new_v4().simple().to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Default for SchemaId {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for SchemaId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<&str> for SchemaId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

/// Names that would collide with generated configuration keys
pub const RESERVED_NAMES: &[&str] = &["Id", "Items", "Parent", "DisplayName", "Description", "Schema"];

static IDENTIFIER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,49}$").expect("valid identifier regex"));

/// Check a node name against the identifier grammar and the reserved list
pub fn validate_name(name: &str) -> KitResult<()> {
  if !IDENTIFIER_RE.is_match(name) {
    return Err(SchemaError::InvalidIdentifier { name: name.to_string() }.into());
  }
  if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
    return Err(SchemaError::ReservedName { name: name.to_string() }.into());
  }
  Ok(())
}

/// Split a `{A.B.C}` addressing expression into its segments
pub fn parse_address(expression: &str) -> KitResult<Vec<String>> {
  let trimmed = expression.trim();
  let inner = trimmed
    .strip_prefix('{')
    .and_then(|s| s.strip_suffix('}'))
    .unwrap_or(trimmed);

  let segments: Vec<String> = inner.split('.').map(|s| s.trim().to_string()).collect();
  if segments.iter().any(String::is_empty) {
    return Err(
      SchemaError::InvalidExpression {
        expression: expression.to_string(),
        reason: "empty segment".to_string(),
      }
      .into(),
    );
  }
  Ok(segments)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::KitError;

  #[test]
  fn test_validate_name_grammar() {
    assert!(validate_name("Service").is_ok());
    assert!(validate_name("_private2").is_ok());
    assert!(matches!(
      validate_name("2fast").unwrap_err(),
      KitError::Schema(SchemaError::InvalidIdentifier { .. })
    ));
    assert!(validate_name("has space").is_err());
    assert!(validate_name("").is_err());
    assert!(validate_name(&"a".repeat(51)).is_err());
  }

  #[test]
  fn test_validate_name_reserved() {
    assert!(matches!(
      validate_name("parent").unwrap_err(),
      KitError::Schema(SchemaError::ReservedName { .. })
    ));
    assert!(validate_name("Items").is_err());
  }

  #[test]
  fn test_parse_address() {
    assert_eq!(parse_address("{Api.Endpoint}").unwrap(), vec!["Api", "Endpoint"]);
    assert_eq!(parse_address("Api").unwrap(), vec!["Api"]);
    assert!(parse_address("{Api..Endpoint}").is_err());
  }

  #[test]
  fn test_schema_ids_are_unique() {
    assert_ne!(SchemaId::new(), SchemaId::new());
  }
}
