//! Attribute definitions

use super::data_type::{DataType, ScalarValue};
use super::{SchemaId, validate_name};
use crate::core::error::{KitResult, SchemaError};
use crate::version::ChangeSeverity;
use serde::{Deserialize, Serialize};

/// A typed scalar property of an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
  pub id: SchemaId,
  pub name: String,
  pub data_type: DataType,
  pub is_required: bool,
  #[serde(default)]
  pub default_value: Option<String>,
  #[serde(default)]
  pub choices: Vec<String>,
}

/// Input for adding an attribute
#[derive(Debug, Clone, Default)]
pub struct AttributeSpec {
  pub name: String,
  /// Type name; empty means `string`
  pub data_type: String,
  pub is_required: bool,
  pub default_value: Option<String>,
  pub choices: Vec<String>,
}

impl AttributeSpec {
  pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      data_type: data_type.into(),
      ..Default::default()
    }
  }

  pub fn required(mut self) -> Self {
    self.is_required = true;
    self
  }

  pub fn default_value(mut self, value: impl Into<String>) -> Self {
    self.default_value = Some(value.into());
    self
  }

  pub fn choices<I, S>(mut self, choices: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.choices = choices.into_iter().map(Into::into).collect();
    self
  }
}

/// Partial update of an attribute; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct AttributeUpdate {
  pub name: Option<String>,
  pub data_type: Option<String>,
  pub is_required: Option<bool>,
  /// `Some(None)` clears the default
  pub default_value: Option<Option<String>>,
  pub choices: Option<Vec<String>>,
}

impl Attribute {
  pub fn new(spec: AttributeSpec) -> KitResult<Self> {
    validate_name(&spec.name)?;
    let data_type = if spec.data_type.trim().is_empty() {
      DataType::default()
    } else {
      DataType::parse(&spec.data_type)?
    };
    check_values(data_type, spec.default_value.as_deref(), &spec.choices)?;

    Ok(Self {
      id: SchemaId::new(),
      name: spec.name,
      data_type,
      is_required: spec.is_required,
      default_value: spec.default_value,
      choices: spec.choices,
    })
  }

  /// Typed default value, if one is declared
  pub fn default_scalar(&self) -> Option<ScalarValue> {
    self
      .default_value
      .as_deref()
      .and_then(|raw| self.data_type.parse_value(raw))
  }

  pub fn has_choices(&self) -> bool {
    !self.choices.is_empty()
  }

  /// Whether `value` is one of the declared choices (true when unconstrained)
  pub fn is_in_choices(&self, value: &ScalarValue) -> bool {
    !self.has_choices()
      || self
        .choices
        .iter()
        .any(|c| self.data_type.parse_value(c).as_ref() == Some(value))
  }

  /// Whether `value` satisfies both the data type and the choices
  pub fn is_valid_value(&self, value: &ScalarValue) -> bool {
    self.data_type.accepts(value) && self.is_in_choices(value)
  }

  /// Apply an update, returning the severity of each changed facet
  ///
  /// The combined result is validated before anything is written.
  pub(crate) fn apply_update(&mut self, update: AttributeUpdate) -> KitResult<Vec<(ChangeSeverity, String)>> {
    let mut changes = Vec::new();

    let name = match update.name {
      Some(name) if name != self.name => {
        validate_name(&name)?;
        changes.push((
          ChangeSeverity::Breaking,
          format!("Attribute '{}' was renamed to '{}'", self.name, name),
        ));
        name
      }
      _ => self.name.clone(),
    };

    let data_type = match update.data_type {
      Some(raw) => {
        let parsed = DataType::parse(&raw)?;
        if parsed != self.data_type {
          changes.push((
            ChangeSeverity::Breaking,
            format!(
              "Attribute '{}' changed type from {} to {}",
              self.name, self.data_type, parsed
            ),
          ));
        }
        parsed
      }
      None => self.data_type,
    };

    let default_value = match update.default_value {
      Some(value) => {
        if value != self.default_value {
          changes.push((
            ChangeSeverity::NonBreaking,
            format!("Attribute '{}' default value changed", self.name),
          ));
        }
        value
      }
      None => self.default_value.clone(),
    };

    let choices = match update.choices {
      Some(choices) => {
        let severity = choices_severity(&self.choices, &choices);
        if severity != ChangeSeverity::NoChange {
          changes.push((severity, format!("Attribute '{}' choices changed", self.name)));
        }
        choices
      }
      None => self.choices.clone(),
    };

    let is_required = match update.is_required {
      Some(required) => {
        if required != self.is_required {
          changes.push((
            ChangeSeverity::NonBreaking,
            format!("Attribute '{}' required flag set to {}", self.name, required),
          ));
        }
        required
      }
      None => self.is_required,
    };

    check_values(data_type, default_value.as_deref(), &choices)?;

    self.name = name;
    self.data_type = data_type;
    self.default_value = default_value;
    self.choices = choices;
    self.is_required = is_required;
    Ok(changes)
  }
}

/// Severity of replacing one choice set with another
pub fn choices_severity(old: &[String], new: &[String]) -> ChangeSeverity {
  if old == new {
    ChangeSeverity::NoChange
  } else if new.is_empty() {
    ChangeSeverity::Breaking
  } else if old.is_empty() || old.iter().all(|c| new.contains(c)) {
    ChangeSeverity::NonBreaking
  } else {
    ChangeSeverity::Breaking
  }
}

fn check_values(data_type: DataType, default_value: Option<&str>, choices: &[String]) -> KitResult<()> {
  for choice in choices {
    if data_type.parse_value(choice).is_none() {
      return Err(
        SchemaError::IncompatibleChoice {
          value: choice.clone(),
          data_type: data_type.to_string(),
        }
        .into(),
      );
    }
  }

  if let Some(value) = default_value {
    let parsed = data_type.parse_value(value).ok_or_else(|| SchemaError::IncompatibleDefault {
      value: value.to_string(),
      data_type: data_type.to_string(),
    })?;
    if !choices.is_empty() && !choices.iter().any(|c| data_type.parse_value(c).as_ref() == Some(&parsed)) {
      return Err(
        SchemaError::DefaultNotInChoices {
          value: value.to_string(),
        }
        .into(),
      );
    }
  }
  Ok(())
}
