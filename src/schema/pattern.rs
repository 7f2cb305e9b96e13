//! The pattern aggregate and its authoring operations
//!
//! Every structural mutation validates first, applies second, and then registers
//! its severity on the pattern's version tracker:
//!
//! | Mutation                                              | Severity    |
//! |-------------------------------------------------------|-------------|
//! | add attribute/element/template/command/launch point   | NonBreaking |
//! | display name, description, required flag, default     | NonBreaking |
//! | choices superset                                      | NonBreaking |
//! | rename, data type, cardinality, any delete            | Breaking    |
//! | choices removed or replaced                           | Breaking    |

use super::attribute::{Attribute, AttributeSpec, AttributeUpdate};
use super::automation::{Automation, AutomationKind};
use super::element::{CodeTemplate, Element, ElementSpec, ElementUpdate, SchemaNode};
use super::{Cardinality, SchemaId, parse_address};
use crate::core::error::{KitError, KitResult, SchemaError};
use crate::version::{ChangeSeverity, VersionInstruction, VersionTracker, VersionUpdate};
use serde::{Deserialize, Serialize};

/// Root schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
  root: Element,
  version: VersionTracker,
}

fn not_found(kind: &'static str, key: impl ToString) -> KitError {
  SchemaError::NodeNotFound {
    kind,
    key: key.to_string(),
  }
  .into()
}

impl Pattern {
  pub fn new(name: &str) -> KitResult<Self> {
    let root = Element::new(ElementSpec::new(name, Cardinality::One))?;
    Ok(Self {
      root,
      version: VersionTracker::new(),
    })
  }

  pub fn id(&self) -> &SchemaId {
    &self.root.id
  }

  pub fn name(&self) -> &str {
    &self.root.name
  }

  pub fn root(&self) -> &Element {
    &self.root
  }

  pub fn version(&self) -> &VersionTracker {
    &self.version
  }

  /// Any schema node with this id
  pub fn find(&self, id: &SchemaId) -> Option<SchemaNode<'_>> {
    self.root.find(id)
  }

  pub fn find_element(&self, id: &SchemaId) -> Option<&Element> {
    self.root.find_element(id)
  }

  /// Automation by id or name, with its owning element
  pub fn find_automation(&self, key: &str) -> Option<(&Element, &Automation)> {
    self.root.find_automation(key)
  }

  /// Resolve `{Pattern.Element.Collection}` to an element id
  pub fn resolve_element(&self, expression: &str) -> KitResult<SchemaId> {
    let segments = parse_address(expression)?;
    let invalid = |reason: &str| -> KitError {
      SchemaError::InvalidExpression {
        expression: expression.to_string(),
        reason: reason.to_string(),
      }
      .into()
    };

    if segments[0] != self.root.name {
      return Err(invalid("must start with the pattern name"));
    }
    self
      .root
      .resolve_path(&segments[1..])
      .map(|e| e.id.clone())
      .ok_or_else(|| invalid("no element at that path"))
  }

  /// Resolve and apply the next released version
  pub fn update_version(&mut self, instruction: &VersionInstruction) -> KitResult<VersionUpdate> {
    self.version.update_version(instruction)
  }

  fn element_mut(&mut self, id: &SchemaId) -> KitResult<&mut Element> {
    self.root.find_element_mut(id).ok_or_else(|| not_found("element", id))
  }

  fn register(&mut self, severity: ChangeSeverity, template: &str, args: &[&str]) {
    self
      .version
      .register_change(severity, template, args.iter().map(|a| a.to_string()).collect());
  }

  // ==========================================================================
  // Attributes
  // ==========================================================================

  pub fn add_attribute(&mut self, parent: &SchemaId, spec: AttributeSpec) -> KitResult<SchemaId> {
    let element = self.element_mut(parent)?;
    element.check_new_attribute_name(&spec.name)?;
    let attribute = Attribute::new(spec)?;
    let id = attribute.id.clone();
    let (name, parent_name) = (attribute.name.clone(), element.name.clone());
    element.attributes.push(attribute);

    self.register(
      ChangeSeverity::NonBreaking,
      "Attribute '{0}' was added to '{1}'",
      &[&name, &parent_name],
    );
    Ok(id)
  }

  pub fn update_attribute(&mut self, id: &SchemaId, update: AttributeUpdate) -> KitResult<()> {
    let parent = self.root.find_parent_mut(id).ok_or_else(|| not_found("attribute", id))?;
    if let Some(name) = &update.name
      && parent.attribute(name).is_none_or(|a| a.id != *id)
    {
      parent.check_new_attribute_name(name)?;
    }
    let attribute = parent
      .attributes
      .iter_mut()
      .find(|a| a.id == *id)
      .ok_or_else(|| not_found("attribute", id))?;

    let changes = attribute.apply_update(update)?;
    for (severity, message) in changes {
      self.version.register_change(severity, message, Vec::new());
    }
    Ok(())
  }

  pub fn delete_attribute(&mut self, id: &SchemaId) -> KitResult<()> {
    let parent = self.root.find_parent_mut(id).ok_or_else(|| not_found("attribute", id))?;
    let index = parent
      .attributes
      .iter()
      .position(|a| a.id == *id)
      .ok_or_else(|| not_found("attribute", id))?;
    let removed = parent.attributes.remove(index);
    let parent_name = parent.name.clone();

    self.register(
      ChangeSeverity::Breaking,
      "Attribute '{0}' was deleted from '{1}'",
      &[&removed.name, &parent_name],
    );
    Ok(())
  }

  // ==========================================================================
  // Elements and collections
  // ==========================================================================

  pub fn add_element(&mut self, parent: &SchemaId, spec: ElementSpec) -> KitResult<SchemaId> {
    let element = self.element_mut(parent)?;
    element.check_new_element_name(&spec.name)?;
    let child = Element::new(spec)?;
    let id = child.id.clone();
    let (name, parent_name) = (child.name.clone(), element.name.clone());
    element.elements.push(child);

    self.register(
      ChangeSeverity::NonBreaking,
      "Element '{0}' was added to '{1}'",
      &[&name, &parent_name],
    );
    Ok(id)
  }

  pub fn update_element(&mut self, id: &SchemaId, update: ElementUpdate) -> KitResult<()> {
    let is_root = *id == self.root.id;
    if is_root && update.cardinality.is_some_and(|c| c != Cardinality::One) {
      return Err(KitError::message("The pattern root always has cardinality 'one'"));
    }
    if let Some(name) = &update.name
      && !is_root
    {
      let parent = self.root.find_parent_mut(id).ok_or_else(|| not_found("element", id))?;
      if parent.element(name).is_none_or(|e| e.id != *id) {
        parent.check_new_element_name(name)?;
      }
    } else if let Some(name) = &update.name {
      super::validate_name(name)?;
    }

    let element = self.element_mut(id)?;
    let mut changes: Vec<(ChangeSeverity, String)> = Vec::new();

    if let Some(name) = update.name
      && name != element.name
    {
      changes.push((
        ChangeSeverity::Breaking,
        format!("Element '{}' was renamed to '{}'", element.name, name),
      ));
      element.name = name;
    }
    if let Some(cardinality) = update.cardinality
      && cardinality != element.cardinality
    {
      changes.push((
        ChangeSeverity::Breaking,
        format!(
          "Element '{}' changed cardinality from {} to {}",
          element.name, element.cardinality, cardinality
        ),
      ));
      element.cardinality = cardinality;
    }
    if let Some(auto_create) = update.auto_create
      && auto_create != element.auto_create
    {
      changes.push((
        ChangeSeverity::NonBreaking,
        format!("Element '{}' auto-create set to {}", element.name, auto_create),
      ));
      element.auto_create = auto_create;
    }
    if let Some(display_name) = update.display_name
      && element.display_name.as_ref() != Some(&display_name)
    {
      changes.push((
        ChangeSeverity::NonBreaking,
        format!("Element '{}' display name changed", element.name),
      ));
      element.display_name = Some(display_name);
    }
    if let Some(description) = update.description
      && element.description.as_ref() != Some(&description)
    {
      changes.push((
        ChangeSeverity::NonBreaking,
        format!("Element '{}' description changed", element.name),
      ));
      element.description = Some(description);
    }

    for (severity, message) in changes {
      self.version.register_change(severity, message, Vec::new());
    }
    Ok(())
  }

  /// Rename the pattern itself; the pattern id is unchanged
  pub fn rename(&mut self, name: &str) -> KitResult<()> {
    let id = self.root.id.clone();
    self.update_element(
      &id,
      ElementUpdate {
        name: Some(name.to_string()),
        ..Default::default()
      },
    )
  }

  pub fn delete_element(&mut self, id: &SchemaId) -> KitResult<()> {
    if *id == self.root.id {
      return Err(KitError::message("The pattern root cannot be deleted"));
    }
    let parent = self.root.find_parent_mut(id).ok_or_else(|| not_found("element", id))?;
    let index = parent
      .elements
      .iter()
      .position(|e| e.id == *id)
      .ok_or_else(|| not_found("element", id))?;
    let removed = parent.elements.remove(index);
    let parent_name = parent.name.clone();

    let removed_commands: Vec<SchemaId> = collect_automation_ids(&removed);
    self.unlink_commands(&removed_commands);

    self.register(
      ChangeSeverity::Breaking,
      "Element '{0}' was deleted from '{1}'",
      &[&removed.name, &parent_name],
    );
    Ok(())
  }

  // ==========================================================================
  // Code templates and automation
  // ==========================================================================

  pub fn add_code_template(&mut self, parent: &SchemaId, name: &str, original_file_path: &str) -> KitResult<SchemaId> {
    let element = self.element_mut(parent)?;
    element.check_new_automation_name(name)?;
    let template = CodeTemplate::new(name, original_file_path)?;
    let id = template.id.clone();
    let parent_name = element.name.clone();
    element.code_templates.push(template);

    self.register(
      ChangeSeverity::NonBreaking,
      "Code template '{0}' was added to '{1}'",
      &[name, &parent_name],
    );
    Ok(id)
  }

  pub fn delete_code_template(&mut self, id: &SchemaId) -> KitResult<()> {
    let in_use = self.root.all_automation().into_iter().any(|a| {
      matches!(&a.kind, AutomationKind::CodeTemplateCommand { code_template_id, .. } if code_template_id == id)
    });
    if in_use {
      return Err(KitError::with_help(
        format!("Code template '{}' is used by a command", id),
        "Delete the commands that render it first",
      ));
    }

    let parent = self.root.find_parent_mut(id).ok_or_else(|| not_found("code template", id))?;
    let index = parent
      .code_templates
      .iter()
      .position(|t| t.id == *id)
      .ok_or_else(|| not_found("code template", id))?;
    let removed = parent.code_templates.remove(index);
    let parent_name = parent.name.clone();

    self.register(
      ChangeSeverity::Breaking,
      "Code template '{0}' was deleted from '{1}'",
      &[&removed.name, &parent_name],
    );
    Ok(())
  }

  /// Add a command rendering a code template owned by the same element
  pub fn add_code_template_command(
    &mut self,
    parent: &SchemaId,
    name: &str,
    template: &str,
    is_one_off: bool,
    file_path: &str,
  ) -> KitResult<SchemaId> {
    let element = self.element_mut(parent)?;
    element.check_new_automation_name(name)?;
    let code_template_id = element
      .code_templates
      .iter()
      .find(|t| t.name == template || t.id.as_str() == template)
      .map(|t| t.id.clone())
      .ok_or_else(|| not_found("code template", template))?;
    if file_path.trim().is_empty() {
      return Err(KitError::message(format!("Command '{}' needs a file path", name)));
    }

    let automation = Automation::new(
      name,
      AutomationKind::CodeTemplateCommand {
        code_template_id,
        is_one_off,
        file_path: file_path.to_string(),
      },
    )?;
    self.push_automation(parent, automation, "Code template command '{0}' was added to '{1}'")
  }

  pub fn update_code_template_command(
    &mut self,
    id: &SchemaId,
    is_one_off: Option<bool>,
    file_path: Option<String>,
  ) -> KitResult<()> {
    let automation = self
      .root
      .find_parent_mut(id)
      .and_then(|p| p.automation.iter_mut().find(|a| a.id == *id))
      .ok_or_else(|| not_found("automation", id))?;
    let name = automation.name.clone();
    match &mut automation.kind {
      AutomationKind::CodeTemplateCommand {
        is_one_off: one_off,
        file_path: path,
        ..
      } => {
        if let Some(value) = is_one_off {
          *one_off = value;
        }
        if let Some(value) = file_path {
          *path = value;
        }
      }
      _ => {
        return Err(
          crate::core::error::AutomationError::WrongKind {
            name,
            expected: "code template command",
          }
          .into(),
        );
      }
    }

    self.register(ChangeSeverity::NonBreaking, "Command '{0}' was updated", &[&name]);
    Ok(())
  }

  pub fn add_cli_command(
    &mut self,
    parent: &SchemaId,
    name: &str,
    application_name: &str,
    arguments: &str,
  ) -> KitResult<SchemaId> {
    self.element_mut(parent)?.check_new_automation_name(name)?;
    if application_name.trim().is_empty() {
      return Err(KitError::message(format!("Command '{}' needs an application name", name)));
    }
    let automation = Automation::new(
      name,
      AutomationKind::CliCommand {
        application_name: application_name.to_string(),
        arguments: arguments.to_string(),
      },
    )?;
    self.push_automation(parent, automation, "CLI command '{0}' was added to '{1}'")
  }

  /// Add a launch point referencing commands anywhere in the pattern
  pub fn add_launch_point(&mut self, parent: &SchemaId, name: &str, commands: &[String]) -> KitResult<SchemaId> {
    self.element_mut(parent)?.check_new_automation_name(name)?;
    let command_ids = self.resolve_commands(commands)?;
    let automation = Automation::new(name, AutomationKind::CommandLaunchPoint { command_ids })?;
    self.push_automation(parent, automation, "Launch point '{0}' was added to '{1}'")
  }

  pub fn update_launch_point(&mut self, id: &SchemaId, add: &[String], remove: &[String]) -> KitResult<()> {
    let added = self.resolve_commands(add)?;
    let removed = self.resolve_commands(remove)?;
    let automation = self
      .root
      .find_parent_mut(id)
      .and_then(|p| p.automation.iter_mut().find(|a| a.id == *id))
      .ok_or_else(|| not_found("automation", id))?;
    let name = automation.name.clone();
    let AutomationKind::CommandLaunchPoint { command_ids } = &mut automation.kind else {
      return Err(
        crate::core::error::AutomationError::WrongKind {
          name,
          expected: "launch point",
        }
        .into(),
      );
    };
    command_ids.retain(|c| !removed.contains(c));
    for command in added {
      if !command_ids.contains(&command) {
        command_ids.push(command);
      }
    }

    self.register(ChangeSeverity::NonBreaking, "Launch point '{0}' was updated", &[&name]);
    Ok(())
  }

  /// Delete any automation; deleted commands are dropped from launch points
  pub fn delete_automation(&mut self, id: &SchemaId) -> KitResult<()> {
    let parent = self.root.find_parent_mut(id).ok_or_else(|| not_found("automation", id))?;
    let index = parent
      .automation
      .iter()
      .position(|a| a.id == *id)
      .ok_or_else(|| not_found("automation", id))?;
    let removed = parent.automation.remove(index);
    let parent_name = parent.name.clone();
    self.unlink_commands(std::slice::from_ref(&removed.id));

    self.register(
      ChangeSeverity::Breaking,
      "Automation '{0}' was deleted from '{1}'",
      &[&removed.name, &parent_name],
    );
    Ok(())
  }

  fn push_automation(&mut self, parent: &SchemaId, automation: Automation, template: &str) -> KitResult<SchemaId> {
    let element = self.element_mut(parent)?;
    let id = automation.id.clone();
    let (name, parent_name) = (automation.name.clone(), element.name.clone());
    element.automation.push(automation);
    self.register(ChangeSeverity::NonBreaking, template, &[&name, &parent_name]);
    Ok(id)
  }

  fn resolve_commands(&self, keys: &[String]) -> KitResult<Vec<SchemaId>> {
    keys
      .iter()
      .map(|key| -> KitResult<SchemaId> {
        let (_, automation) = self.find_automation(key).ok_or_else(|| not_found("command", key))?;
        if automation.is_launch_point() {
          return Err(
            crate::core::error::AutomationError::WrongKind {
              name: automation.name.clone(),
              expected: "command",
            }
            .into(),
          );
        }
        Ok(automation.id.clone())
      })
      .collect()
  }

  fn unlink_commands(&mut self, ids: &[SchemaId]) {
    if ids.is_empty() {
      return;
    }
    for automation in self.root.all_automation_mut() {
      if let AutomationKind::CommandLaunchPoint { command_ids } = &mut automation.kind {
        command_ids.retain(|c| !ids.contains(c));
      }
    }
  }
}

fn collect_automation_ids(element: &Element) -> Vec<SchemaId> {
  let mut ids: Vec<SchemaId> = element.automation.iter().map(|a| a.id.clone()).collect();
  for child in &element.elements {
    ids.extend(collect_automation_ids(child));
  }
  ids
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::DataType;

  fn pattern() -> Pattern {
    Pattern::new("Api").unwrap()
  }

  #[test]
  fn test_add_attribute_is_non_breaking() {
    let mut p = pattern();
    let root = p.id().clone();
    p.add_attribute(&root, AttributeSpec::new("Name", "string")).unwrap();
    assert_eq!(p.version().last_changes(), ChangeSeverity::NonBreaking);
    assert_eq!(p.root().attributes.len(), 1);
  }

  #[test]
  fn test_duplicate_and_reserved_names() {
    let mut p = pattern();
    let root = p.id().clone();
    p.add_attribute(&root, AttributeSpec::new("Name", "string")).unwrap();
    assert!(matches!(
      p.add_attribute(&root, AttributeSpec::new("Name", "int")).unwrap_err(),
      KitError::Schema(SchemaError::DuplicateAttribute { .. })
    ));
    assert!(matches!(
      p.add_element(&root, ElementSpec::new("Name", Cardinality::One)).unwrap_err(),
      KitError::Schema(SchemaError::ElementNameTakenByAttribute { .. })
    ));
    assert!(matches!(
      p.add_attribute(&root, AttributeSpec::new("Id", "string")).unwrap_err(),
      KitError::Schema(SchemaError::ReservedName { .. })
    ));
    assert_eq!(p.root().attributes.len(), 1);
    assert!(p.root().elements.is_empty());
  }

  #[test]
  fn test_rename_attribute_is_breaking_and_auto_bumps_major() {
    let mut p = pattern();
    let root = p.id().clone();
    let attr = p.add_attribute(&root, AttributeSpec::new("Name", "string")).unwrap();
    p.update_version(&VersionInstruction::Explicit {
      version: "1.4.2".into(),
      force: false,
    })
    .unwrap();

    p.update_attribute(
      &attr,
      AttributeUpdate {
        name: Some("Title".into()),
        ..Default::default()
      },
    )
    .unwrap();
    p.add_attribute(&root, AttributeSpec::new("Other", "string")).unwrap();
    assert_eq!(p.version().last_changes(), ChangeSeverity::Breaking);

    let update = p.update_version(&VersionInstruction::Auto).unwrap();
    assert_eq!(update.version.to_string(), "2.0.0");
    assert_eq!(p.find(&attr).map(|n| n.name()), Some("Title"));
  }

  #[test]
  fn test_update_attribute_rejects_sibling_name() {
    let mut p = pattern();
    let root = p.id().clone();
    let a = p.add_attribute(&root, AttributeSpec::new("A", "string")).unwrap();
    p.add_attribute(&root, AttributeSpec::new("B", "string")).unwrap();
    let err = p
      .update_attribute(
        &a,
        AttributeUpdate {
          name: Some("B".into()),
          ..Default::default()
        },
      )
      .unwrap_err();
    assert!(matches!(err, KitError::Schema(SchemaError::DuplicateAttribute { .. })));
  }

  #[test]
  fn test_change_type_is_breaking() {
    let mut p = pattern();
    let root = p.id().clone();
    let attr = p
      .add_attribute(&root, AttributeSpec::new("Port", "int").default_value("80"))
      .unwrap();
    p.update_version(&VersionInstruction::Auto).unwrap();

    p.update_attribute(
      &attr,
      AttributeUpdate {
        data_type: Some("string".into()),
        ..Default::default()
      },
    )
    .unwrap();
    assert_eq!(p.version().last_changes(), ChangeSeverity::Breaking);
    match p.find(&attr) {
      Some(SchemaNode::Attribute(a)) => assert_eq!(a.data_type, DataType::String),
      other => panic!("unexpected node {:?}", other),
    }
  }

  #[test]
  fn test_delete_element_unlinks_commands() {
    let mut p = pattern();
    let root = p.id().clone();
    let service = p.add_element(&root, ElementSpec::new("Service", Cardinality::ZeroOrMany)).unwrap();
    p.add_code_template(&service, "Handler", "handler.rs").unwrap();
    p.add_code_template_command(&service, "Generate", "Handler", false, "~/src/{{Name}}.rs")
      .unwrap();
    let launch = p.add_launch_point(&root, "Build", &["Generate".to_string()]).unwrap();

    p.delete_element(&service).unwrap();
    let (_, launch_point) = p.find_automation(launch.as_str()).unwrap();
    assert_eq!(
      launch_point.kind,
      AutomationKind::CommandLaunchPoint { command_ids: vec![] }
    );
    assert_eq!(p.version().last_changes(), ChangeSeverity::Breaking);
  }

  #[test]
  fn test_launch_point_rejects_unknown_and_nested_launch_points() {
    let mut p = pattern();
    let root = p.id().clone();
    assert!(p.add_launch_point(&root, "Build", &["Missing".to_string()]).is_err());
    p.add_cli_command(&root, "Format", "cargo", "fmt").unwrap();
    p.add_launch_point(&root, "Build", &["Format".to_string()]).unwrap();
    assert!(p.add_launch_point(&root, "Outer", &["Build".to_string()]).is_err());
  }

  #[test]
  fn test_template_in_use_cannot_be_deleted() {
    let mut p = pattern();
    let root = p.id().clone();
    let template = p.add_code_template(&root, "Readme", "README.md").unwrap();
    p.add_code_template_command(&root, "WriteReadme", "Readme", true, "README.md").unwrap();
    assert!(p.delete_code_template(&template).is_err());
  }

  #[test]
  fn test_resolve_element_expression() {
    let mut p = pattern();
    let root = p.id().clone();
    let service = p.add_element(&root, ElementSpec::new("Service", Cardinality::One)).unwrap();
    assert_eq!(p.resolve_element("{Api.Service}").unwrap(), service);
    assert_eq!(p.resolve_element("{Api}").unwrap(), root);
    assert!(p.resolve_element("{Other.Service}").is_err());
  }

  #[test]
  fn test_unchanged_display_text_registers_nothing() {
    let mut p = pattern();
    let root = p.id().clone();
    let orders = p
      .add_element(&root, ElementSpec::new("Orders", Cardinality::ZeroOrOne))
      .unwrap();
    let update = || ElementUpdate {
      display_name: Some("Customer orders".into()),
      description: Some("Orders placed through the API".into()),
      ..Default::default()
    };

    p.update_element(&orders, update()).unwrap();
    assert_eq!(p.version().change_log().len(), 3);
    p.update_version(&VersionInstruction::Auto).unwrap();

    p.update_element(&orders, update()).unwrap();
    assert_eq!(p.version().last_changes(), ChangeSeverity::NoChange);
    assert!(p.version().change_log().is_empty());
  }

  #[test]
  fn test_root_cannot_change_cardinality_or_be_deleted() {
    let mut p = pattern();
    let root = p.id().clone();
    assert!(
      p.update_element(
        &root,
        ElementUpdate {
          cardinality: Some(Cardinality::ZeroOrMany),
          ..Default::default()
        }
      )
      .is_err()
    );
    assert!(p.delete_element(&root).is_err());
    p.rename("Backend").unwrap();
    assert_eq!(p.name(), "Backend");
    assert_eq!(p.id(), &root);
  }
}
