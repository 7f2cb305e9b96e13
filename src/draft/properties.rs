//! Scalar property reads and writes on draft containers

use super::{DraftItem, DraftItemId, DraftModel, ItemShape};
use crate::core::error::{DraftError, KitResult};
use crate::schema::{Attribute, Element, ScalarValue, SchemaNode};
use std::collections::BTreeMap;

/// A parsed `Name=Value` assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyAssignment {
  pub name: String,
  pub value: String,
}

impl PropertyAssignment {
  /// Split on the first `=`; the name must be non-empty
  pub fn parse(assignment: &str, id: &DraftItemId) -> KitResult<Self> {
    let malformed = || DraftError::MalformedAssignment {
      assignment: assignment.to_string(),
      id: id.to_string(),
    };
    let (name, value) = assignment.split_once('=').ok_or_else(malformed)?;
    let name = name.trim();
    if name.is_empty() {
      return Err(malformed().into());
    }
    Ok(Self {
      name: name.to_string(),
      value: value.to_string(),
    })
  }
}

/// Parse a raw value against an attribute's type and choices
///
/// An empty string clears the value.
pub(crate) fn parse_value(
  attribute: &Attribute,
  raw: &str,
  assignment: &str,
  id: &DraftItemId,
) -> KitResult<Option<ScalarValue>> {
  if raw.is_empty() {
    return Ok(None);
  }
  let value = attribute
    .data_type
    .parse_value(raw)
    .ok_or_else(|| DraftError::IncompatibleValue {
      assignment: assignment.to_string(),
      id: id.to_string(),
      data_type: attribute.data_type.to_string(),
    })?;
  if !attribute.is_in_choices(&value) {
    return Err(
      DraftError::ValueNotInChoices {
        assignment: assignment.to_string(),
        id: id.to_string(),
        choices: attribute.choices.clone(),
      }
      .into(),
    );
  }
  Ok(Some(value))
}

impl DraftModel {
  /// Properties and schema of a materialised container
  fn container<'a>(&'a self, id: &DraftItemId, operation: &'static str) -> KitResult<(&'a BTreeMap<String, DraftItemId>, &'a Element)> {
    let item = self.items.get(id)?;
    match &item.shape {
      ItemShape::Container(properties) => Ok((properties, Self::element_of(&self.schema, item)?)),
      ItemShape::Unmaterialised => Err(DraftError::NotMaterialised { id: id.to_string() }.into()),
      shape => Err(
        DraftError::WrongShape {
          operation,
          id: id.to_string(),
          shape: shape.name(),
        }
        .into(),
      ),
    }
  }

  /// The attribute item behind a container property
  pub fn get_property(&self, id: &DraftItemId, name: &str) -> KitResult<&DraftItem> {
    let (properties, element) = self.container(id, "read properties")?;
    match element.child(name) {
      Some(SchemaNode::Attribute(_)) => {}
      Some(SchemaNode::Element(_)) => {
        return Err(
          DraftError::NotAnAttribute {
            name: name.to_string(),
            id: id.to_string(),
          }
          .into(),
        );
      }
      None => {
        return Err(
          DraftError::PropertyNotFound {
            name: name.to_string(),
            id: id.to_string(),
          }
          .into(),
        );
      }
    }
    let property = properties.get(name).ok_or_else(|| DraftError::PropertyNotFound {
      name: name.to_string(),
      id: id.to_string(),
    })?;
    self.items.get(property)
  }

  /// Current value of a container's attribute, `None` when unset
  pub fn get_value(&self, id: &DraftItemId, name: &str) -> KitResult<Option<&ScalarValue>> {
    Ok(self.get_property(id, name)?.scalar())
  }

  /// Assign several attributes of one container
  ///
  /// Every assignment is checked before any is applied.
  pub fn set_properties<S: AsRef<str>>(&mut self, id: &DraftItemId, assignments: &[S]) -> KitResult<()> {
    let (properties, element) = self.container(id, "set properties")?;

    let mut resolved = Vec::with_capacity(assignments.len());
    for raw in assignments {
      let raw = raw.as_ref();
      let assignment = PropertyAssignment::parse(raw, id)?;
      let attribute = match element.child(&assignment.name) {
        Some(SchemaNode::Attribute(attribute)) => attribute,
        Some(SchemaNode::Element(_)) => {
          return Err(
            DraftError::NotAnAttribute {
              name: assignment.name,
              id: id.to_string(),
            }
            .into(),
          );
        }
        None => {
          return Err(
            DraftError::PropertyNotFound {
              name: assignment.name,
              id: id.to_string(),
            }
            .into(),
          );
        }
      };
      let value = parse_value(attribute, &assignment.value, raw, id)?;
      let property = properties.get(&assignment.name).cloned().ok_or_else(|| DraftError::PropertyNotFound {
        name: assignment.name.clone(),
        id: id.to_string(),
      })?;
      resolved.push((property, value));
    }

    for (property, value) in resolved {
      self.items.get_mut(&property)?.shape = ItemShape::Scalar(value);
    }
    tracing::debug!(item = %id, count = assignments.len(), "set properties");
    Ok(())
  }

  /// Return every attribute of a container to its construction state
  pub fn reset_all_properties(&mut self, id: &DraftItemId) -> KitResult<()> {
    let (properties, element) = self.container(id, "reset properties")?;
    let resets: Vec<(DraftItemId, ItemShape)> = element
      .attributes
      .iter()
      .filter_map(|attribute| {
        let shape = match attribute.default_scalar() {
          Some(value) => ItemShape::Scalar(Some(value)),
          None => ItemShape::Unmaterialised,
        };
        properties.get(&attribute.name).map(|property| (property.clone(), shape))
      })
      .collect();

    for (property, shape) in resets {
      self.items.get_mut(&property)?.shape = shape;
    }
    Ok(())
  }
}
