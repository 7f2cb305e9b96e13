//! Structural migration of drafts onto a newer toolkit
//!
//! [`DraftModel::upgrade`] first decides whether an upgrade may happen at all, and
//! only then runs [`migrate`]. The gate never mutates the draft; the walk never
//! fails.
//!
//! Old and new schema children are matched by [`SchemaId`] alone. Snapshots are
//! deep copies, so ids survive from one release to the next and a rename shows up
//! as the same id under a different name. Deleting a node and adding one with the
//! same name produces a new id, so the old value is dropped and the new node starts
//! from its default.
//!
//! [`SchemaId`]: crate::schema::SchemaId

use crate::draft::{DraftItemId, DraftModel, ItemShape};
use crate::schema::{Attribute, Element, ScalarValue, ToolkitDefinition};
use crate::version::format_template;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Kind of a migration log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationChangeType {
  Breaking,
  NonBreaking,
  /// Upgrade was refused or skipped
  Abort,
}

impl fmt::Display for MigrationChangeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MigrationChangeType::Breaking => write!(f, "breaking"),
      MigrationChangeType::NonBreaking => write!(f, "non-breaking"),
      MigrationChangeType::Abort => write!(f, "abort"),
    }
  }
}

/// One entry in a migration log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationChange {
  pub change_type: MigrationChangeType,
  pub message_template: String,
  pub args: Vec<String>,
  /// Addressing path of the affected draft node
  pub path: String,
}

impl MigrationChange {
  pub fn message(&self) -> String {
    format_template(&self.message_template, &self.args)
  }
}

/// Outcome of an upgrade
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationResult {
  pub is_success: bool,
  pub from: semver::Version,
  pub to: semver::Version,
  pub changes: Vec<MigrationChange>,
}

impl MigrationResult {
  pub fn new(from: semver::Version, to: semver::Version) -> Self {
    Self {
      is_success: true,
      from,
      to,
      changes: Vec::new(),
    }
  }

  pub fn add(&mut self, change_type: MigrationChangeType, path: &str, template: &str, args: &[&str]) {
    tracing::debug!(%change_type, path, message = %format_template(template, &owned(args)), "migration change");
    self.changes.push(MigrationChange {
      change_type,
      message_template: template.to_string(),
      args: owned(args),
      path: path.to_string(),
    });
  }

  /// Entries of one type
  pub fn of_type(&self, change_type: MigrationChangeType) -> Vec<&MigrationChange> {
    self.changes.iter().filter(|c| c.change_type == change_type).collect()
  }

  fn abort(mut self, is_success: bool, template: &str, args: &[&str]) -> Self {
    self.is_success = is_success;
    self.add(MigrationChangeType::Abort, "", template, args);
    self
  }
}

fn owned(args: &[&str]) -> Vec<String> {
  args.iter().map(|a| a.to_string()).collect()
}

fn child_path(parent: &str, segment: &str) -> String {
  match parent.strip_suffix('}') {
    Some(inner) => format!("{}.{}}}", inner, segment),
    None => format!("{{{}}}", segment),
  }
}

fn display(value: Option<&ScalarValue>) -> String {
  value.map(ToString::to_string).unwrap_or_else(|| "null".to_string())
}

impl DraftModel {
  /// Move this draft onto `toolkit`
  ///
  /// Same version, a different toolkit, downgrades, and unforced major upgrades
  /// leave the draft untouched.
  pub fn upgrade(&mut self, toolkit: &ToolkitDefinition, force: bool) -> MigrationResult {
    let from = self.toolkit().version.clone();
    let to = toolkit.version.clone();
    let mut result = MigrationResult::new(from.clone(), to.clone());
    let (from_text, to_text) = (from.to_string(), to.to_string());

    if toolkit.id != self.toolkit().id {
      return result.abort(
        false,
        "Draft was created from toolkit '{0}', not '{1}'",
        &[&self.toolkit().name, &toolkit.name],
      );
    }
    if to == from {
      return result.abort(true, "Draft is already at version {0}", &[&from_text]);
    }
    if to < from {
      return result.abort(false, "Cannot downgrade from {0} to {1}", &[&from_text, &to_text]);
    }
    if to.major > from.major {
      if !force {
        return result.abort(
          false,
          "Upgrade from {0} to {1} contains breaking changes; use --force to upgrade anyway",
          &[&from_text, &to_text],
        );
      }
      let path = self.path(self.root_id()).unwrap_or_default();
      result.add(
        MigrationChangeType::Breaking,
        &path,
        "Upgrade from {0} to {1} was forced despite breaking changes",
        &[&from_text, &to_text],
      );
    }

    let old = self.schema().clone();
    let root = self.root_id().clone();
    migrate(old.root(), toolkit.pattern.root(), self, &root, &mut result);
    self.rebind(toolkit);
    self.populate_ancestry();

    tracing::info!(draft = self.name(), %from, %to, changes = result.changes.len(), "upgraded draft");
    result
  }
}

/// Reshape the container `item` (built from `old`) to match `new`
///
/// Best effort: nodes that cannot be found are skipped.
pub fn migrate(old: &Element, new: &Element, draft: &mut DraftModel, item: &DraftItemId, result: &mut MigrationResult) {
  let path = draft.path(item).unwrap_or_else(|_| format!("{{{}}}", old.name));
  if old.name != new.name && draft.root_id() == item {
    result.add(
      MigrationChangeType::Breaking,
      &path,
      "Pattern '{0}' was renamed to '{1}'",
      &[&old.name, &new.name],
    );
  }
  migrate_container(old, new, draft, item, &path, result);
}

fn migrate_container(
  old: &Element,
  new: &Element,
  draft: &mut DraftModel,
  item: &DraftItemId,
  path: &str,
  result: &mut MigrationResult,
) {
  let Ok(container) = draft.items_mut().get_mut(item) else {
    return;
  };
  container.schema_id = new.id.clone();
  let ItemShape::Container(properties) = container.shape.clone() else {
    return;
  };

  let mut next = BTreeMap::new();
  let mut carried = BTreeSet::new();

  for attribute in &new.attributes {
    let matched = match_attribute(old, attribute).filter(|o| properties.contains_key(&o.name));
    let Some(previous) = matched else {
      let placeholder = draft.items_mut().attribute_placeholder(attribute, item);
      result.add(
        MigrationChangeType::NonBreaking,
        &child_path(path, &attribute.name),
        "Attribute '{0}' was added",
        &[&attribute.name],
      );
      next.insert(attribute.name.clone(), placeholder);
      continue;
    };

    let property = properties[&previous.name].clone();
    let attribute_path = child_path(path, &previous.name);
    if previous.name != attribute.name {
      result.add(
        MigrationChangeType::Breaking,
        &attribute_path,
        "Attribute '{0}' was renamed to '{1}'",
        &[&previous.name, &attribute.name],
      );
    }
    migrate_attribute(previous, attribute, draft, &property, &attribute_path, result);
    carried.insert(previous.name.clone());
    next.insert(attribute.name.clone(), property);
  }

  for element in &new.elements {
    let matched = match_element(old, element).filter(|o| properties.contains_key(&o.name));
    let Some(previous) = matched else {
      next.insert(element.name.clone(), draft.items_mut().element_placeholder(element, item));
      continue;
    };

    let property = properties[&previous.name].clone();
    let element_path = child_path(path, &previous.name);
    carried.insert(previous.name.clone());
    if previous.name != element.name {
      result.add(
        MigrationChangeType::Breaking,
        &element_path,
        "Element '{0}' was renamed to '{1}'",
        &[&previous.name, &element.name],
      );
    }

    if previous.is_collection() != element.is_collection() {
      let had_data = draft.items().get(&property).is_ok_and(|i| i.is_materialised());
      draft.items_mut().remove_subtree(&property);
      let placeholder = draft.items_mut().element_placeholder(element, item);
      if had_data {
        result.add(
          MigrationChangeType::Breaking,
          &element_path,
          "Element '{0}' changed cardinality from {1} to {2}; its data was removed",
          &[&element.name, &previous.cardinality.to_string(), &element.cardinality.to_string()],
        );
      }
      next.insert(element.name.clone(), placeholder);
      continue;
    }

    migrate_element(previous, element, draft, &property, &element_path, result);
    next.insert(element.name.clone(), property);
  }

  for (name, property) in &properties {
    if carried.contains(name) {
      continue;
    }
    let removed = draft.items_mut().remove_subtree(property);
    let template = if old.attribute(name).is_some() {
      "Attribute '{0}' was deleted"
    } else {
      "Element '{0}' was deleted"
    };
    tracing::debug!(property = %name, removed, "dropped property");
    result.add(MigrationChangeType::Breaking, &child_path(path, name), template, &[name]);
  }

  if let Ok(container) = draft.items_mut().get_mut(item) {
    container.shape = ItemShape::Container(next);
  }
}

fn migrate_element(
  old: &Element,
  new: &Element,
  draft: &mut DraftModel,
  item: &DraftItemId,
  path: &str,
  result: &mut MigrationResult,
) {
  let Ok(node) = draft.items_mut().get_mut(item) else {
    return;
  };
  node.schema_id = new.id.clone();
  match node.shape.clone() {
    ItemShape::Container(_) => migrate_container(old, new, draft, item, path, result),
    ItemShape::Collection(items) => {
      for child in items {
        migrate_container(old, new, draft, &child, &child_path(path, child.as_str()), result);
      }
    }
    _ => {}
  }
}

fn migrate_attribute(
  old: &Attribute,
  new: &Attribute,
  draft: &mut DraftModel,
  item: &DraftItemId,
  path: &str,
  result: &mut MigrationResult,
) {
  let Ok(node) = draft.items_mut().get_mut(item) else {
    return;
  };
  node.schema_id = new.id.clone();
  let was_materialised = node.is_materialised();
  let mut value = node.scalar().cloned();

  if old.data_type != new.data_type {
    result.add(
      MigrationChangeType::Breaking,
      path,
      "Attribute '{0}' changed data type from {1} to {2}",
      &[&new.name, old.data_type.name(), new.data_type.name()],
    );
    value = value.and_then(|v| {
      new
        .data_type
        .coerce(&v)
        .filter(|c| new.is_in_choices(c))
        .or_else(|| new.default_scalar())
    });
    store(draft, item, was_materialised, value);
    return;
  }

  if old.choices != new.choices {
    match (old.has_choices(), new.has_choices()) {
      (false, true) => {
        if let Some(current) = &value
          && !new.is_in_choices(current)
        {
          value = None;
        }
        result.add(
          MigrationChangeType::NonBreaking,
          path,
          "Attribute '{0}' is now restricted to: {1}",
          &[&new.name, &new.choices.join(", ")],
        );
      }
      (true, false) => {
        result.add(
          MigrationChangeType::Breaking,
          path,
          "Attribute '{0}' is no longer restricted to a set of choices",
          &[&new.name],
        );
      }
      _ => {
        if let Some(current) = value.clone()
          && !new.is_in_choices(&current)
        {
          value = new.default_scalar().filter(|d| new.is_in_choices(d));
          result.add(
            MigrationChangeType::Breaking,
            path,
            "Value '{0}' of attribute '{1}' is no longer a valid choice and was reset to {2}",
            &[&current.to_string(), &new.name, &display(value.as_ref())],
          );
        }
      }
    }
  }

  if old.default_value != new.default_value {
    let old_default = old.default_scalar();
    if value.is_none() || value == old_default {
      value = new.default_scalar();
      result.add(
        MigrationChangeType::NonBreaking,
        path,
        "Default of attribute '{0}' changed from {1} to {2}",
        &[&new.name, &display(old_default.as_ref()), &display(value.as_ref())],
      );
    }
  }

  store(draft, item, was_materialised, value);
}

/// Write a migrated value back; unset attributes stay unmaterialised
fn store(draft: &mut DraftModel, item: &DraftItemId, was_materialised: bool, value: Option<ScalarValue>) {
  if let Ok(node) = draft.items_mut().get_mut(item)
    && (was_materialised || value.is_some())
  {
    node.shape = ItemShape::Scalar(value);
  }
}

/// Schema nodes are matched by id only; a deleted and re-added node is a different node
fn match_attribute<'a>(old: &'a Element, attribute: &Attribute) -> Option<&'a Attribute> {
  old.attributes.iter().find(|a| a.id == attribute.id)
}

fn match_element<'a>(old: &'a Element, element: &Element) -> Option<&'a Element> {
  old.elements.iter().find(|e| e.id == element.id)
}
