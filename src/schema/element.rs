//! Elements, collections and code templates

use super::attribute::Attribute;
use super::automation::Automation;
use super::{SchemaId, validate_name};
use crate::core::error::{KitResult, SchemaError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How many instances of an element a parent holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
  #[default]
  One,
  ZeroOrOne,
  ZeroOrMany,
  OneOrMany,
}

impl Cardinality {
  pub fn parse(input: &str) -> Option<Self> {
    match input.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
      "one" => Some(Cardinality::One),
      "zeroorone" => Some(Cardinality::ZeroOrOne),
      "zeroormany" => Some(Cardinality::ZeroOrMany),
      "oneormany" => Some(Cardinality::OneOrMany),
      _ => None,
    }
  }

  /// Upper bound above one: instantiated as an ordered list of items
  pub fn is_collection(&self) -> bool {
    matches!(self, Cardinality::ZeroOrMany | Cardinality::OneOrMany)
  }

  /// Lower bound of one
  pub fn requires_instance(&self) -> bool {
    matches!(self, Cardinality::One | Cardinality::OneOrMany)
  }
}

impl fmt::Display for Cardinality {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Cardinality::One => write!(f, "one"),
      Cardinality::ZeroOrOne => write!(f, "zero-or-one"),
      Cardinality::ZeroOrMany => write!(f, "zero-or-many"),
      Cardinality::OneOrMany => write!(f, "one-or-many"),
    }
  }
}

/// A template file whose bytes are packaged into the toolkit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTemplate {
  pub id: SchemaId,
  pub name: String,
  pub original_file_path: String,
  pub extension: String,
}

impl CodeTemplate {
  pub fn new(name: &str, original_file_path: &str) -> KitResult<Self> {
    validate_name(name)?;
    let extension = Path::new(original_file_path)
      .extension()
      .map(|e| e.to_string_lossy().into_owned())
      .unwrap_or_default();
    Ok(Self {
      id: SchemaId::new(),
      name: name.to_string(),
      original_file_path: original_file_path.to_string(),
      extension,
    })
  }
}

/// Input for adding an element
#[derive(Debug, Clone, Default)]
pub struct ElementSpec {
  pub name: String,
  pub cardinality: Cardinality,
  pub auto_create: bool,
  pub display_name: Option<String>,
  pub description: Option<String>,
}

impl ElementSpec {
  pub fn new(name: impl Into<String>, cardinality: Cardinality) -> Self {
    Self {
      name: name.into(),
      cardinality,
      ..Default::default()
    }
  }

  pub fn auto_create(mut self) -> Self {
    self.auto_create = true;
    self
  }
}

/// Partial update of an element; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ElementUpdate {
  pub name: Option<String>,
  pub cardinality: Option<Cardinality>,
  pub auto_create: Option<bool>,
  pub display_name: Option<String>,
  pub description: Option<String>,
}

/// A schema node: the pattern root, a nested element, or a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
  pub id: SchemaId,
  pub name: String,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub cardinality: Cardinality,
  #[serde(default)]
  pub auto_create: bool,
  #[serde(default)]
  pub attributes: Vec<Attribute>,
  #[serde(default)]
  pub elements: Vec<Element>,
  #[serde(default)]
  pub code_templates: Vec<CodeTemplate>,
  #[serde(default)]
  pub automation: Vec<Automation>,
}

/// Borrowed view of any node that a draft item can be bound to
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode<'a> {
  Element(&'a Element),
  Attribute(&'a Attribute),
}

impl<'a> SchemaNode<'a> {
  pub fn name(&self) -> &'a str {
    match self {
      SchemaNode::Element(e) => &e.name,
      SchemaNode::Attribute(a) => &a.name,
    }
  }

  pub fn id(&self) -> &'a SchemaId {
    match self {
      SchemaNode::Element(e) => &e.id,
      SchemaNode::Attribute(a) => &a.id,
    }
  }
}

impl Element {
  pub fn new(spec: ElementSpec) -> KitResult<Self> {
    validate_name(&spec.name)?;
    Ok(Self {
      id: SchemaId::new(),
      name: spec.name,
      display_name: spec.display_name,
      description: spec.description,
      cardinality: spec.cardinality,
      auto_create: spec.auto_create,
      attributes: Vec::new(),
      elements: Vec::new(),
      code_templates: Vec::new(),
      automation: Vec::new(),
    })
  }

  pub fn is_collection(&self) -> bool {
    self.cardinality.is_collection()
  }

  pub fn attribute(&self, name: &str) -> Option<&Attribute> {
    self.attributes.iter().find(|a| a.name == name)
  }

  pub fn element(&self, name: &str) -> Option<&Element> {
    self.elements.iter().find(|e| e.name == name)
  }

  /// Direct child (attribute or element) with this name
  pub fn child(&self, name: &str) -> Option<SchemaNode<'_>> {
    self
      .attribute(name)
      .map(SchemaNode::Attribute)
      .or_else(|| self.element(name).map(SchemaNode::Element))
  }

  /// Any node in this subtree (including self) with this id
  pub fn find(&self, id: &SchemaId) -> Option<SchemaNode<'_>> {
    if self.id == *id {
      return Some(SchemaNode::Element(self));
    }
    if let Some(attribute) = self.attributes.iter().find(|a| a.id == *id) {
      return Some(SchemaNode::Attribute(attribute));
    }
    self.elements.iter().find_map(|e| e.find(id))
  }

  pub fn find_element(&self, id: &SchemaId) -> Option<&Element> {
    match self.find(id) {
      Some(SchemaNode::Element(e)) => Some(e),
      _ => None,
    }
  }

  pub fn find_element_mut(&mut self, id: &SchemaId) -> Option<&mut Element> {
    if self.id == *id {
      return Some(self);
    }
    self.elements.iter_mut().find_map(|e| e.find_element_mut(id))
  }

  /// Element that directly owns the attribute or element with this id
  pub fn find_parent_mut(&mut self, id: &SchemaId) -> Option<&mut Element> {
    let owns = self.attributes.iter().any(|a| a.id == *id)
      || self.elements.iter().any(|e| e.id == *id)
      || self.code_templates.iter().any(|t| t.id == *id)
      || self.automation.iter().any(|a| a.id == *id);
    if owns {
      return Some(self);
    }
    self.elements.iter_mut().find_map(|e| e.find_parent_mut(id))
  }

  /// Automation with this id or name anywhere in the subtree, with its owner
  pub fn find_automation(&self, key: &str) -> Option<(&Element, &Automation)> {
    if let Some(automation) = self
      .automation
      .iter()
      .find(|a| a.id.as_str() == key || a.name == key)
    {
      return Some((self, automation));
    }
    self.elements.iter().find_map(|e| e.find_automation(key))
  }

  /// Code template with this id or name anywhere in the subtree
  pub fn find_code_template(&self, key: &str) -> Option<&CodeTemplate> {
    self
      .code_templates
      .iter()
      .find(|t| t.id.as_str() == key || t.name == key)
      .or_else(|| self.elements.iter().find_map(|e| e.find_code_template(key)))
  }

  /// Every code template in the subtree, depth first
  pub fn all_code_templates(&self) -> Vec<&CodeTemplate> {
    let mut templates: Vec<&CodeTemplate> = self.code_templates.iter().collect();
    for element in &self.elements {
      templates.extend(element.all_code_templates());
    }
    templates
  }

  /// Every automation in the subtree, depth first
  pub fn all_automation(&self) -> Vec<&Automation> {
    let mut automation: Vec<&Automation> = self.automation.iter().collect();
    for element in &self.elements {
      automation.extend(element.all_automation());
    }
    automation
  }

  pub fn all_automation_mut(&mut self) -> Vec<&mut Automation> {
    let mut automation: Vec<&mut Automation> = self.automation.iter_mut().collect();
    for element in &mut self.elements {
      automation.extend(element.all_automation_mut());
    }
    automation
  }

  /// Resolve child element names below this element
  pub fn resolve_path(&self, segments: &[String]) -> Option<&Element> {
    let mut current = self;
    for segment in segments {
      current = current.element(segment)?;
    }
    Some(current)
  }

  pub(crate) fn check_new_attribute_name(&self, name: &str) -> KitResult<()> {
    validate_name(name)?;
    if self.attribute(name).is_some() {
      return Err(
        SchemaError::DuplicateAttribute {
          name: name.to_string(),
          parent: self.name.clone(),
        }
        .into(),
      );
    }
    if self.element(name).is_some() {
      return Err(
        SchemaError::AttributeNameTakenByElement {
          name: name.to_string(),
          parent: self.name.clone(),
        }
        .into(),
      );
    }
    Ok(())
  }

  pub(crate) fn check_new_element_name(&self, name: &str) -> KitResult<()> {
    validate_name(name)?;
    if self.element(name).is_some() {
      return Err(
        SchemaError::DuplicateElement {
          name: name.to_string(),
          parent: self.name.clone(),
        }
        .into(),
      );
    }
    if self.attribute(name).is_some() {
      return Err(
        SchemaError::ElementNameTakenByAttribute {
          name: name.to_string(),
          parent: self.name.clone(),
        }
        .into(),
      );
    }
    Ok(())
  }

  pub(crate) fn check_new_automation_name(&self, name: &str) -> KitResult<()> {
    validate_name(name)?;
    let taken =
      self.automation.iter().any(|a| a.name == name) || self.code_templates.iter().any(|t| t.name == name);
    if taken {
      return Err(
        SchemaError::DuplicateAutomation {
          name: name.to_string(),
          parent: self.name.clone(),
        }
        .into(),
      );
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::attribute::AttributeSpec;

  fn sample() -> Element {
    let mut root = Element::new(ElementSpec::new("Root", Cardinality::One)).unwrap();
    let mut child = Element::new(ElementSpec::new("Child", Cardinality::ZeroOrMany)).unwrap();
    child.attributes.push(Attribute::new(AttributeSpec::new("Leaf", "string")).unwrap());
    root.elements.push(child);
    root
  }

  #[test]
  fn test_cardinality_parse() {
    assert_eq!(Cardinality::parse("ZeroOrMany"), Some(Cardinality::ZeroOrMany));
    assert_eq!(Cardinality::parse("one-or-many"), Some(Cardinality::OneOrMany));
    assert_eq!(Cardinality::parse("lots"), None);
    assert!(Cardinality::OneOrMany.is_collection());
    assert!(!Cardinality::ZeroOrOne.requires_instance());
  }

  #[test]
  fn test_find_by_id() {
    let root = sample();
    let leaf_id = root.elements[0].attributes[0].id.clone();
    assert_eq!(root.find(&leaf_id).map(|n| n.name()), Some("Leaf"));
    assert!(root.find(&SchemaId::new()).is_none());
  }

  #[test]
  fn test_shared_namespace() {
    let root = sample();
    assert!(matches!(
      root.check_new_attribute_name("Child").unwrap_err(),
      crate::core::error::KitError::Schema(SchemaError::AttributeNameTakenByElement { .. })
    ));
    let child = &root.elements[0];
    assert!(matches!(
      child.check_new_element_name("Leaf").unwrap_err(),
      crate::core::error::KitError::Schema(SchemaError::ElementNameTakenByAttribute { .. })
    ));
  }

  #[test]
  fn test_code_template_extension() {
    let template = CodeTemplate::new("Controller", "src/controller.cs").unwrap();
    assert_eq!(template.extension, "cs");
  }
}
