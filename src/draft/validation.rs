//! Recursive draft validation

use super::{DraftItemId, DraftModel, ItemShape};
use crate::core::error::KitResult;
use crate::schema::{Attribute, Element, SchemaNode};
use serde::Serialize;
use std::fmt;

/// One problem found in a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
  pub path: String,
  pub message: String,
}

impl fmt::Display for ValidationResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.path, self.message)
  }
}

impl DraftModel {
  /// Check `id` and everything below it, in schema order
  pub fn validate(&self, id: &DraftItemId) -> KitResult<Vec<ValidationResult>> {
    let mut results = Vec::new();
    self.validate_item(id, &mut results)?;
    Ok(results)
  }

  fn validate_item(&self, id: &DraftItemId, results: &mut Vec<ValidationResult>) -> KitResult<()> {
    let item = self.items.get(id)?;
    match &item.shape {
      ItemShape::Container(properties) => {
        let element = Self::element_of(&self.schema, item)?;
        for attribute in &element.attributes {
          if let Some(property) = properties.get(&attribute.name) {
            self.validate_attribute(attribute, property, results)?;
          }
        }
        for child in &element.elements {
          if let Some(property) = properties.get(&child.name) {
            self.validate_element(child, property, results)?;
          }
        }
      }
      ItemShape::Collection(items) => {
        for child in items {
          self.validate_item(child, results)?;
        }
      }
      ItemShape::Scalar(_) | ItemShape::Unmaterialised => {
        if let Some(SchemaNode::Attribute(attribute)) = self.schema.find(&item.schema_id) {
          self.validate_attribute(attribute, id, results)?;
        }
      }
    }
    Ok(())
  }

  fn validate_attribute(
    &self,
    attribute: &Attribute,
    id: &DraftItemId,
    results: &mut Vec<ValidationResult>,
  ) -> KitResult<()> {
    let item = self.items.get(id)?;
    match item.scalar() {
      None if attribute.is_required => {
        results.push(ValidationResult {
          path: self.path(id)?,
          message: format!("'{}' is required", attribute.name),
        });
      }
      Some(value) if !attribute.data_type.accepts(value) => {
        results.push(ValidationResult {
          path: self.path(id)?,
          message: format!("value '{}' is not a valid {}", value, attribute.data_type),
        });
      }
      Some(value) if !attribute.is_in_choices(value) => {
        results.push(ValidationResult {
          path: self.path(id)?,
          message: format!("value '{}' is not one of: {}", value, attribute.choices.join(", ")),
        });
      }
      _ => {}
    }
    Ok(())
  }

  fn validate_element(&self, element: &Element, id: &DraftItemId, results: &mut Vec<ValidationResult>) -> KitResult<()> {
    let item = self.items.get(id)?;
    match &item.shape {
      ItemShape::Unmaterialised if element.cardinality.requires_instance() => {
        results.push(ValidationResult {
          path: self.path(id)?,
          message: format!("'{}' requires at least one instance ({})", element.name, element.cardinality),
        });
      }
      ItemShape::Collection(items) if items.is_empty() && element.cardinality.requires_instance() => {
        results.push(ValidationResult {
          path: self.path(id)?,
          message: format!("'{}' requires at least one item ({})", element.name, element.cardinality),
        });
      }
      ItemShape::Collection(items) if !element.is_collection() && items.len() > 1 => {
        results.push(ValidationResult {
          path: self.path(id)?,
          message: format!(
            "'{}' allows a single instance ({}) but has {}",
            element.name,
            element.cardinality,
            items.len()
          ),
        });
      }
      _ => {}
    }
    self.validate_item(id, results)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::{AttributeSpec, Cardinality, ElementSpec, Pattern, ToolkitDefinition};
  use crate::version::VersionInstruction;

  fn draft() -> DraftModel {
    let mut pattern = Pattern::new("Api").unwrap();
    let root = pattern.id().clone();
    pattern
      .add_attribute(&root, AttributeSpec::new("Owner", "string").required())
      .unwrap();
    let services = pattern
      .add_element(&root, ElementSpec::new("Services", Cardinality::OneOrMany))
      .unwrap();
    pattern
      .add_attribute(&services, AttributeSpec::new("Name", "string").required())
      .unwrap();
    pattern
      .add_element(&root, ElementSpec::new("Database", Cardinality::One))
      .unwrap();
    pattern
      .add_element(&root, ElementSpec::new("Cache", Cardinality::ZeroOrOne))
      .unwrap();
    let toolkit = ToolkitDefinition::build(&mut pattern, &VersionInstruction::Auto, &Default::default())
      .unwrap()
      .toolkit;
    DraftModel::new("Mine", &toolkit).unwrap()
  }

  #[test]
  fn test_validate_reports_missing_required_nodes_in_schema_order() {
    let draft = draft();
    let results = draft.validate(draft.root_id()).unwrap();
    let paths: Vec<&str> = results.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["{Api.Owner}", "{Api.Services}", "{Api.Database}"]);
    assert!(results[0].message.contains("is required"));
  }

  #[test]
  fn test_validate_descends_into_collection_items() {
    let mut draft = draft();
    let root = draft.root_id().clone();
    draft.set_properties(&root, &["Owner=me"]).unwrap();
    let ItemShape::Container(properties) = draft.item(&root).unwrap().shape.clone() else {
      panic!("expected container");
    };
    draft.materialise(&properties["Database"], None).unwrap();
    let item = draft.materialise_collection_item(&properties["Services"]).unwrap();

    let results = draft.validate(&root).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, format!("{{Api.Services.{}.Name}}", item));

    draft.set_properties(&item, &["Name=billing"]).unwrap();
    assert!(draft.validate(&root).unwrap().is_empty());
  }

  #[test]
  fn test_validate_empty_one_or_many_collection() {
    let mut draft = draft();
    let root = draft.root_id().clone();
    let ItemShape::Container(properties) = draft.item(&root).unwrap().shape.clone() else {
      panic!("expected container");
    };
    draft.materialise(&properties["Services"], None).unwrap();

    let results = draft.validate(&properties["Services"]).unwrap();
    assert_eq!(results.len(), 0);
    let results = draft.validate(&root).unwrap();
    assert!(results.iter().any(|r| r.message.contains("requires at least one item")));
  }
}
