//! JSON view of a materialised draft subtree
//!
//! Containers become objects with an `Id` key plus one key per materialised
//! property. Collections become `{ "Id": .., "Items": [..] }`. Unmaterialised
//! children are left out.

use super::{DraftItemId, DraftModel, ItemRole, ItemShape};
use crate::core::error::KitResult;
use serde_json::{Map, Value};

impl DraftModel {
  /// Configuration of `id` and its descendants
  ///
  /// With `include_ancestry`, the result also carries a `Parent` key holding the
  /// scalar properties of each enclosing element up to the pattern.
  pub fn get_configuration(&self, id: &DraftItemId, include_ancestry: bool) -> KitResult<Value> {
    let mut configuration = self.configuration_of(id)?;
    if include_ancestry
      && let Value::Object(map) = &mut configuration
      && let Some(parent) = self.enclosing_container(id)?
    {
      map.insert("Parent".to_string(), self.ancestor_configuration(&parent)?);
    }
    Ok(configuration)
  }

  fn configuration_of(&self, id: &DraftItemId) -> KitResult<Value> {
    let item = self.items.get(id)?;
    Ok(match &item.shape {
      ItemShape::Unmaterialised => Value::Null,
      ItemShape::Scalar(value) => value.as_ref().map(|v| v.to_json()).unwrap_or(Value::Null),
      ItemShape::Container(properties) => {
        let mut map = Map::new();
        map.insert("Id".to_string(), Value::String(id.to_string()));
        for (name, child) in properties {
          if self.items.get(child)?.is_materialised() {
            map.insert(name.clone(), self.configuration_of(child)?);
          }
        }
        Value::Object(map)
      }
      ItemShape::Collection(items) => {
        let mut map = Map::new();
        map.insert("Id".to_string(), Value::String(id.to_string()));
        let items = items
          .iter()
          .map(|child| self.configuration_of(child))
          .collect::<KitResult<Vec<_>>>()?;
        map.insert("Items".to_string(), Value::Array(items));
        Value::Object(map)
      }
    })
  }

  /// Nearest ancestor that is a container, skipping collection nodes
  fn enclosing_container(&self, id: &DraftItemId) -> KitResult<Option<DraftItemId>> {
    let mut current = self.items.get(id)?.parent.clone();
    while let Some(parent) = current {
      let item = self.items.get(&parent)?;
      if item.role != ItemRole::Collection && matches!(item.shape, ItemShape::Container(_)) {
        return Ok(Some(parent));
      }
      current = item.parent.clone();
    }
    Ok(None)
  }

  fn ancestor_configuration(&self, id: &DraftItemId) -> KitResult<Value> {
    let mut map = Map::new();
    map.insert("Id".to_string(), Value::String(id.to_string()));
    if let ItemShape::Container(properties) = &self.items.get(id)?.shape {
      for (name, child) in properties {
        if let ItemShape::Scalar(value) = &self.items.get(child)?.shape {
          map.insert(name.clone(), value.as_ref().map(|v| v.to_json()).unwrap_or(Value::Null));
        }
      }
    }
    if let Some(parent) = self.enclosing_container(id)? {
      map.insert("Parent".to_string(), self.ancestor_configuration(&parent)?);
    }
    Ok(Value::Object(map))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::{AttributeSpec, Cardinality, ElementSpec, Pattern, ToolkitDefinition};
  use crate::version::VersionInstruction;
  use serde_json::json;

  fn draft() -> DraftModel {
    let mut pattern = Pattern::new("Api").unwrap();
    let root = pattern.id().clone();
    pattern
      .add_attribute(&root, AttributeSpec::new("Port", "int").default_value("8080"))
      .unwrap();
    pattern.add_attribute(&root, AttributeSpec::new("Owner", "string")).unwrap();
    let services = pattern
      .add_element(&root, ElementSpec::new("Services", Cardinality::ZeroOrMany))
      .unwrap();
    pattern
      .add_attribute(&services, AttributeSpec::new("Name", "string"))
      .unwrap();
    pattern
      .add_element(&root, ElementSpec::new("Database", Cardinality::ZeroOrOne))
      .unwrap();
    let toolkit = ToolkitDefinition::build(&mut pattern, &VersionInstruction::Auto, &Default::default())
      .unwrap()
      .toolkit;
    DraftModel::new("Mine", &toolkit).unwrap()
  }

  #[test]
  fn test_configuration_omits_unmaterialised_children() {
    let draft = draft();
    let root = draft.root_id().clone();
    let configuration = draft.get_configuration(&root, false).unwrap();
    assert_eq!(configuration, json!({ "Id": root.to_string(), "Port": 8080 }));
  }

  #[test]
  fn test_configuration_of_collections() {
    let mut draft = draft();
    let root = draft.root_id().clone();
    let ItemShape::Container(properties) = draft.item(&root).unwrap().shape.clone() else {
      panic!("expected container");
    };
    let services = properties["Services"].clone();
    let item = draft.materialise_collection_item(&services).unwrap();
    draft.set_properties(&item, &["Name=billing"]).unwrap();

    let configuration = draft.get_configuration(&root, false).unwrap();
    assert_eq!(
      configuration["Services"],
      json!({
        "Id": services.to_string(),
        "Items": [{ "Id": item.to_string(), "Name": "billing" }],
      })
    );
  }

  #[test]
  fn test_configuration_with_ancestry_skips_collection_nodes() {
    let mut draft = draft();
    let root = draft.root_id().clone();
    draft.set_properties(&root, &["Owner=platform"]).unwrap();
    let ItemShape::Container(properties) = draft.item(&root).unwrap().shape.clone() else {
      panic!("expected container");
    };
    let item = draft.materialise_collection_item(&properties["Services"]).unwrap();

    let configuration = draft.get_configuration(&item, true).unwrap();
    assert_eq!(configuration["Parent"]["Id"], json!(root.to_string()));
    assert_eq!(configuration["Parent"]["Owner"], json!("platform"));
    assert_eq!(configuration["Parent"]["Port"], json!(8080));
    assert!(configuration["Parent"].get("Parent").is_none());
  }
}
