//! Draft instance documents built against a toolkit snapshot
//!
//! A draft starts with placeholders for the pattern's direct children only. Deeper
//! nodes appear when their owner is materialised.
//!
//! - `item` - item ids, shapes, and the arena that stores them
//! - `properties` - scalar reads and writes on containers
//! - `validation` - recursive completeness and type checks
//! - `configuration` - JSON view of a materialised subtree

pub mod configuration;
pub mod item;
pub mod properties;
pub mod validation;

pub use item::{ArtifactLink, DraftItem, DraftItemId, ItemArena, ItemRole, ItemShape};
pub use properties::PropertyAssignment;
pub use validation::ValidationResult;

use crate::core::error::{DraftError, KitResult, SchemaError};
use crate::schema::{Element, Pattern, SchemaId, SchemaNode, ToolkitDefinition, parse_address, validate_name};
use serde::{Deserialize, Serialize};

/// The toolkit release a draft is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolkitReference {
  pub id: SchemaId,
  pub name: String,
  pub version: semver::Version,
}

impl ToolkitReference {
  pub fn of(toolkit: &ToolkitDefinition) -> Self {
    Self {
      id: toolkit.id.clone(),
      name: toolkit.name.clone(),
      version: toolkit.version.clone(),
    }
  }
}

/// A mutable instance document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftModel {
  id: DraftItemId,
  name: String,
  toolkit: ToolkitReference,
  /// Pattern snapshot of the bound toolkit
  schema: Pattern,
  root: DraftItemId,
  items: ItemArena,
}

impl DraftModel {
  pub fn new(name: &str, toolkit: &ToolkitDefinition) -> KitResult<Self> {
    validate_name(name)?;

    let schema = toolkit.pattern.clone();
    let mut items = ItemArena::default();
    let root = items.insert(
      schema.id().clone(),
      ItemRole::Pattern,
      None,
      ItemShape::Unmaterialised,
    );
    items.fill_container(schema.root(), &root);
    tracing::debug!(draft = name, toolkit = %toolkit.name, version = %toolkit.version, "created draft");

    Ok(Self {
      id: DraftItemId::new(),
      name: name.to_string(),
      toolkit: ToolkitReference::of(toolkit),
      schema,
      root,
      items,
    })
  }

  pub fn id(&self) -> &DraftItemId {
    &self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn toolkit(&self) -> &ToolkitReference {
    &self.toolkit
  }

  pub fn schema(&self) -> &Pattern {
    &self.schema
  }

  pub fn root_id(&self) -> &DraftItemId {
    &self.root
  }

  pub fn items(&self) -> &ItemArena {
    &self.items
  }

  pub(crate) fn items_mut(&mut self) -> &mut ItemArena {
    &mut self.items
  }

  pub fn item(&self, id: &DraftItemId) -> KitResult<&DraftItem> {
    self.items.get(id)
  }

  /// Swap the bound toolkit after a successful migration
  pub(crate) fn rebind(&mut self, toolkit: &ToolkitDefinition) {
    self.schema = toolkit.pattern.clone();
    self.toolkit = ToolkitReference::of(toolkit);
  }

  /// Schema element an element, collection, or collection item is bound to
  pub(crate) fn element_of<'a>(schema: &'a Pattern, item: &DraftItem) -> KitResult<&'a Element> {
    schema.find_element(&item.schema_id).ok_or_else(|| {
      SchemaError::NodeNotFound {
        kind: "element",
        key: item.schema_id.to_string(),
      }
      .into()
    })
  }

  // ============================================================================
  // Materialisation
  // ============================================================================

  /// Populate an unmaterialised node
  ///
  /// Attributes take `value` or their default. Elements become containers and
  /// collections become empty lists; `value` is ignored for both.
  pub fn materialise(&mut self, id: &DraftItemId, value: Option<&str>) -> KitResult<()> {
    let item = self.items.get(id)?;
    if item.is_materialised() {
      return Err(DraftError::AlreadyMaterialised { id: id.to_string() }.into());
    }

    match self.schema.find(&item.schema_id) {
      Some(SchemaNode::Attribute(attribute)) => {
        let value = match value {
          Some(raw) => properties::parse_value(attribute, raw, &format!("{}={}", attribute.name, raw), id)?,
          None => attribute.default_scalar(),
        };
        self.items.get_mut(id)?.shape = ItemShape::Scalar(value);
      }
      Some(SchemaNode::Element(element)) => self.items.materialise_element(element, id),
      None => {
        return Err(
          SchemaError::NodeNotFound {
            kind: "schema node",
            key: item.schema_id.to_string(),
          }
          .into(),
        );
      }
    }
    tracing::debug!(item = %id, "materialised");
    Ok(())
  }

  /// Append a new item to a collection, materialising the collection if needed
  pub fn materialise_collection_item(&mut self, id: &DraftItemId) -> KitResult<DraftItemId> {
    let item = self.items.get(id)?;
    if item.role != ItemRole::Collection {
      return Err(
        DraftError::WrongShape {
          operation: "add a collection item",
          id: id.to_string(),
          shape: item.shape.name(),
        }
        .into(),
      );
    }
    if !item.is_materialised() {
      self.items.get_mut(id)?.shape = ItemShape::Collection(Vec::new());
    }

    let element = Self::element_of(&self.schema, self.items.get(id)?)?;
    let created = self.items.push_collection_item(element, id)?;
    tracing::debug!(collection = %id, item = %created, "added collection item");
    Ok(created)
  }

  // ============================================================================
  // Structural mutators
  // ============================================================================

  /// Remove every item from a collection
  pub fn clear_collection_items(&mut self, id: &DraftItemId) -> KitResult<()> {
    let items = match &self.items.get(id)?.shape {
      ItemShape::Collection(items) => items.clone(),
      shape => {
        return Err(
          DraftError::WrongShape {
            operation: "clear items",
            id: id.to_string(),
            shape: shape.name(),
          }
          .into(),
        );
      }
    };
    for child in &items {
      self.items.remove_subtree(child);
    }
    self.items.get_mut(id)?.shape = ItemShape::Collection(Vec::new());
    Ok(())
  }

  /// Delete a materialised child of `receiver`
  ///
  /// On a container the child element or collection is reset to an unmaterialised
  /// placeholder. On a collection the item is removed from the list.
  pub fn delete(&mut self, receiver: &DraftItemId, child: &DraftItemId) -> KitResult<()> {
    let not_a_child = || DraftError::NotAChild {
      child: child.to_string(),
      id: receiver.to_string(),
    };

    match self.items.get(receiver)?.shape.clone() {
      ItemShape::Container(properties) => {
        let (name, _) = properties.iter().find(|(_, id)| *id == child).ok_or_else(not_a_child)?;
        let target = self.items.get(child)?;
        if target.role == ItemRole::Attribute {
          return Err(
            DraftError::WrongShape {
              operation: "delete",
              id: child.to_string(),
              shape: "an attribute",
            }
            .into(),
          );
        }
        if !target.is_materialised() {
          return Err(DraftError::NotMaterialised { id: child.to_string() }.into());
        }

        let (schema_id, role) = (target.schema_id.clone(), target.role);
        let descendants = self.items.remove_subtree(child).saturating_sub(1);
        let placeholder = self
          .items
          .insert(schema_id, role, Some(receiver.clone()), ItemShape::Unmaterialised);
        if let ItemShape::Container(properties) = &mut self.items.get_mut(receiver)?.shape {
          properties.insert(name.clone(), placeholder);
        }
        tracing::debug!(item = %child, descendants, "deleted element");
      }
      ItemShape::Collection(items) => {
        if !items.contains(child) {
          return Err(not_a_child().into());
        }
        self.items.remove_subtree(child);
        if let ItemShape::Collection(items) = &mut self.items.get_mut(receiver)?.shape {
          items.retain(|id| id != child);
        }
        tracing::debug!(item = %child, "deleted collection item");
      }
      shape => {
        return Err(
          DraftError::WrongShape {
            operation: "delete children",
            id: receiver.to_string(),
            shape: shape.name(),
          }
          .into(),
        );
      }
    }
    Ok(())
  }

  // ============================================================================
  // Navigation
  // ============================================================================

  /// Reassign every item's parent from the tree's child edges
  pub fn populate_ancestry(&mut self) {
    let edges: Vec<(DraftItemId, Vec<DraftItemId>)> = self
      .items
      .values()
      .map(|item| (item.id.clone(), item.child_ids()))
      .collect();

    for item in self.items.values_mut() {
      item.parent = None;
    }
    for (parent, children) in edges {
      for child in children {
        if let Ok(item) = self.items.get_mut(&child) {
          item.parent = Some(parent.clone());
        }
      }
    }
  }

  /// Items from the root down to `id`, inclusive
  pub fn ancestry(&self, id: &DraftItemId) -> KitResult<Vec<&DraftItem>> {
    let mut chain = Vec::new();
    let mut current = Some(self.items.get(id)?);
    while let Some(item) = current {
      chain.push(item);
      current = match &item.parent {
        Some(parent) => Some(self.items.get(parent)?),
        None => None,
      };
    }
    chain.reverse();
    Ok(chain)
  }

  /// Addressing path such as `{Api.Services.<itemId>.Name}`
  pub fn path(&self, id: &DraftItemId) -> KitResult<String> {
    let mut segments = Vec::new();
    for item in self.ancestry(id)? {
      if item.role == ItemRole::CollectionItem {
        segments.push(item.id.to_string());
      } else {
        let name = self
          .schema
          .find(&item.schema_id)
          .map(|node| node.name().to_string())
          .unwrap_or_else(|| item.schema_id.to_string());
        segments.push(name);
      }
    }
    Ok(format!("{{{}}}", segments.join(".")))
  }

  /// Resolve an addressing expression to a draft item
  ///
  /// Segments walk container properties by name and collection items by id. The
  /// first segment must be the pattern name.
  pub fn find_by_expression(&self, expression: &str) -> KitResult<DraftItemId> {
    let segments = parse_address(expression)?;
    let invalid = |reason: String| SchemaError::InvalidExpression {
      expression: expression.to_string(),
      reason,
    };

    if segments[0] != self.schema.name() {
      return Err(invalid(format!("must start with '{}'", self.schema.name())).into());
    }

    let mut current = self.root.clone();
    for segment in &segments[1..] {
      let next = match &self.items.get(&current)?.shape {
        ItemShape::Container(properties) => properties.get(segment).cloned(),
        ItemShape::Collection(items) => items.iter().find(|id| id.as_str() == segment).cloned(),
        _ => None,
      };
      current = next.ok_or_else(|| invalid(format!("'{}' does not resolve", segment)))?;
    }
    Ok(current)
  }

  /// Materialised containers bound to `schema_id` at or below `from`
  ///
  /// Singletons yield one target each and collections yield one per item.
  pub fn targets(&self, from: &DraftItemId, schema_id: &SchemaId) -> KitResult<Vec<DraftItemId>> {
    let mut found = Vec::new();
    let mut stack = vec![from.clone()];
    while let Some(id) = stack.pop() {
      let item = self.items.get(&id)?;
      if item.schema_id == *schema_id && matches!(item.shape, ItemShape::Container(_)) {
        found.push(id.clone());
      }
      let mut children = item.child_ids();
      children.reverse();
      stack.extend(children);
    }
    Ok(found)
  }
}
