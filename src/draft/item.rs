//! Draft items and the id-indexed arena that owns them
//!
//! Items never own each other. Containers and collections hold child ids, and each
//! item holds its parent id. Parent ids are not persisted; they are rebuilt by
//! [`DraftModel::populate_ancestry`](super::DraftModel::populate_ancestry).

use crate::core::error::{DraftError, KitResult};
use crate::schema::{Attribute, Element, ScalarValue, SchemaId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Stable identity of a draft item, independent of its schema id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftItemId(String);

impl DraftItemId {
  pub fn new() -> Self {
    Self(uuid::Uuid::new_v4().simple().to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Default for DraftItemId {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for DraftItemId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<&str> for DraftItemId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

/// What part of the schema an item instantiates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRole {
  Pattern,
  Element,
  Collection,
  CollectionItem,
  Attribute,
}

/// Exactly one of these holds for every item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "value", rename_all = "snake_case")]
pub enum ItemShape {
  Unmaterialised,
  Scalar(Option<ScalarValue>),
  /// Property name to child item; keys are the schema's child names
  Container(BTreeMap<String, DraftItemId>),
  Collection(Vec<DraftItemId>),
}

impl ItemShape {
  pub fn name(&self) -> &'static str {
    match self {
      ItemShape::Unmaterialised => "unmaterialised",
      ItemShape::Scalar(_) => "an attribute",
      ItemShape::Container(_) => "an element",
      ItemShape::Collection(_) => "a collection",
    }
  }
}

/// Last known output of a code template command for one draft item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLink {
  pub command_id: SchemaId,
  /// Generated file name
  pub tag: String,
  pub path: PathBuf,
}

/// One node of a draft's instance tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftItem {
  pub id: DraftItemId,
  pub schema_id: SchemaId,
  pub role: ItemRole,
  #[serde(skip)]
  pub parent: Option<DraftItemId>,
  pub shape: ItemShape,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub artifact_links: Vec<ArtifactLink>,
}

impl DraftItem {
  pub fn is_materialised(&self) -> bool {
    !matches!(self.shape, ItemShape::Unmaterialised)
  }

  /// Child ids in order: container properties, then collection items
  pub fn child_ids(&self) -> Vec<DraftItemId> {
    match &self.shape {
      ItemShape::Container(properties) => properties.values().cloned().collect(),
      ItemShape::Collection(items) => items.clone(),
      _ => Vec::new(),
    }
  }

  pub fn scalar(&self) -> Option<&ScalarValue> {
    match &self.shape {
      ItemShape::Scalar(value) => value.as_ref(),
      _ => None,
    }
  }

  pub fn artifact_link(&self, command_id: &SchemaId) -> Option<&ArtifactLink> {
    self.artifact_links.iter().find(|l| l.command_id == *command_id)
  }
}

/// Flat store of every item in a draft
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemArena {
  items: BTreeMap<DraftItemId, DraftItem>,
}

impl ItemArena {
  pub fn get(&self, id: &DraftItemId) -> KitResult<&DraftItem> {
    self
      .items
      .get(id)
      .ok_or_else(|| DraftError::ItemNotFound { id: id.to_string() }.into())
  }

  pub fn get_mut(&mut self, id: &DraftItemId) -> KitResult<&mut DraftItem> {
    self
      .items
      .get_mut(id)
      .ok_or_else(|| DraftError::ItemNotFound { id: id.to_string() }.into())
  }

  pub fn contains(&self, id: &DraftItemId) -> bool {
    self.items.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn values(&self) -> impl Iterator<Item = &DraftItem> {
    self.items.values()
  }

  pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut DraftItem> {
    self.items.values_mut()
  }

  pub(crate) fn insert(
    &mut self,
    schema_id: SchemaId,
    role: ItemRole,
    parent: Option<DraftItemId>,
    shape: ItemShape,
  ) -> DraftItemId {
    let id = DraftItemId::new();
    self.items.insert(
      id.clone(),
      DraftItem {
        id: id.clone(),
        schema_id,
        role,
        parent,
        shape,
        artifact_links: Vec::new(),
      },
    );
    id
  }

  /// Remove an item and everything below it, returning how many were removed
  pub(crate) fn remove_subtree(&mut self, id: &DraftItemId) -> usize {
    let Some(item) = self.items.remove(id) else {
      return 0;
    };
    1 + item.child_ids().iter().map(|child| self.remove_subtree(child)).sum::<usize>()
  }

  /// Attribute placeholder: a scalar when a default exists, otherwise unmaterialised
  pub(crate) fn attribute_placeholder(&mut self, attribute: &Attribute, parent: &DraftItemId) -> DraftItemId {
    let shape = match attribute.default_scalar() {
      Some(value) => ItemShape::Scalar(Some(value)),
      None => ItemShape::Unmaterialised,
    };
    self.insert(attribute.id.clone(), ItemRole::Attribute, Some(parent.clone()), shape)
  }

  /// Element or collection placeholder, materialised at once when auto-created
  pub(crate) fn element_placeholder(&mut self, element: &Element, parent: &DraftItemId) -> DraftItemId {
    let role = if element.is_collection() {
      ItemRole::Collection
    } else {
      ItemRole::Element
    };
    let id = self.insert(element.id.clone(), role, Some(parent.clone()), ItemShape::Unmaterialised);
    if element.auto_create {
      self.materialise_element(element, &id);
    }
    id
  }

  /// Turn an element-bound item into a populated container or an empty collection
  pub(crate) fn materialise_element(&mut self, element: &Element, id: &DraftItemId) {
    let is_collection = self.items.get(id).is_some_and(|i| i.role == ItemRole::Collection);
    if is_collection {
      if let Some(item) = self.items.get_mut(id) {
        item.shape = ItemShape::Collection(Vec::new());
      }
    } else {
      self.fill_container(element, id);
    }
  }

  /// Replace an item's shape with one property per schema child
  pub(crate) fn fill_container(&mut self, element: &Element, id: &DraftItemId) {
    let mut properties = BTreeMap::new();
    for attribute in &element.attributes {
      properties.insert(attribute.name.clone(), self.attribute_placeholder(attribute, id));
    }
    for child in &element.elements {
      properties.insert(child.name.clone(), self.element_placeholder(child, id));
    }
    if let Some(item) = self.items.get_mut(id) {
      item.shape = ItemShape::Container(properties);
    }
  }

  /// Append a new populated item to a collection
  pub(crate) fn push_collection_item(&mut self, element: &Element, collection: &DraftItemId) -> KitResult<DraftItemId> {
    let id = self.insert(
      element.id.clone(),
      ItemRole::CollectionItem,
      Some(collection.clone()),
      ItemShape::Unmaterialised,
    );
    self.fill_container(element, &id);

    match &mut self.get_mut(collection)?.shape {
      ItemShape::Collection(items) => items.push(id.clone()),
      shape => {
        let shape = shape.name();
        self.remove_subtree(&id);
        return Err(
          DraftError::WrongShape {
            operation: "add a collection item",
            id: collection.to_string(),
            shape,
          }
          .into(),
        );
      }
    }
    Ok(id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::{AttributeSpec, Cardinality, ElementSpec};

  fn element_with_defaults() -> Element {
    let mut element = Element::new(ElementSpec::new("Service", Cardinality::One)).unwrap();
    element
      .attributes
      .push(Attribute::new(AttributeSpec::new("Port", "int").default_value("80")).unwrap());
    element
      .attributes
      .push(Attribute::new(AttributeSpec::new("Host", "string")).unwrap());
    let mut routes = Element::new(ElementSpec::new("Routes", Cardinality::ZeroOrMany).auto_create()).unwrap();
    routes
      .elements
      .push(Element::new(ElementSpec::new("Deep", Cardinality::One)).unwrap());
    element.elements.push(routes);
    element
  }

  #[test]
  fn test_fill_container_applies_defaults_and_auto_create() {
    let element = element_with_defaults();
    let mut arena = ItemArena::default();
    let root = arena.insert(element.id.clone(), ItemRole::Element, None, ItemShape::Unmaterialised);
    arena.fill_container(&element, &root);

    let ItemShape::Container(properties) = &arena.get(&root).unwrap().shape else {
      panic!("expected container");
    };
    let port = arena.get(&properties["Port"]).unwrap();
    assert_eq!(port.shape, ItemShape::Scalar(Some(ScalarValue::Int(80))));
    assert!(!arena.get(&properties["Host"]).unwrap().is_materialised());
    assert_eq!(
      arena.get(&properties["Routes"]).unwrap().shape,
      ItemShape::Collection(Vec::new())
    );
    // root + Port + Host + Routes; nothing below the empty collection
    assert_eq!(arena.len(), 4);
  }

  #[test]
  fn test_remove_subtree_counts_descendants() {
    let element = element_with_defaults();
    let mut arena = ItemArena::default();
    let root = arena.insert(element.id.clone(), ItemRole::Element, None, ItemShape::Unmaterialised);
    arena.fill_container(&element, &root);
    let ItemShape::Container(properties) = arena.get(&root).unwrap().shape.clone() else {
      panic!("expected container");
    };
    let routes = &element.elements[0];
    arena.push_collection_item(routes, &properties["Routes"]).unwrap();
    arena.push_collection_item(routes, &properties["Routes"]).unwrap();

    // collection + 2 items + 1 Deep placeholder each
    assert_eq!(arena.remove_subtree(&properties["Routes"]), 5);
    assert!(!arena.contains(&properties["Routes"]));
  }
}
