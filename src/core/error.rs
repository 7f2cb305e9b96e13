//! Error types for patternkit with contextual messages and exit codes
//!
//! Every failure is categorized (config, schema, version, draft, automation) so the
//! CLI can map it to an exit code and print a help line where one exists.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for patternkit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing aggregates)
  User = 1,
  /// System error (I/O, external processes)
  System = 2,
  /// Validation failure (schema rules, version rules, draft shape)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for patternkit
#[derive(Debug)]
pub enum KitError {
  /// Configuration and session errors
  Config(ConfigError),

  /// Pattern authoring errors
  Schema(SchemaError),

  /// Toolkit versioning errors
  Version(VersionError),

  /// Draft shape and property errors
  Draft(DraftError),

  /// Automation lookup and execution errors
  Automation(AutomationError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl KitError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    KitError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    KitError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      KitError::Message { message, context, help } => KitError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      KitError::Io(err) => KitError::Io(io::Error::new(err.kind(), format!("{}: {}", ctx_str, err))),
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      KitError::Config(_) => ExitCode::User,
      KitError::Schema(_) => ExitCode::Validation,
      KitError::Version(_) => ExitCode::Validation,
      KitError::Draft(_) => ExitCode::Validation,
      KitError::Automation(_) => ExitCode::System,
      KitError::Io(_) => ExitCode::System,
      KitError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      KitError::Config(e) => e.help_message(),
      KitError::Version(e) => e.help_message(),
      KitError::Draft(e) => e.help_message(),
      KitError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for KitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KitError::Config(e) => write!(f, "{}", e),
      KitError::Schema(e) => write!(f, "{}", e),
      KitError::Version(e) => write!(f, "{}", e),
      KitError::Draft(e) => write!(f, "{}", e),
      KitError::Automation(e) => write!(f, "{}", e),
      KitError::Io(e) => write!(f, "I/O error: {}", e),
      KitError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for KitError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      KitError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for KitError {
  fn from(err: io::Error) -> Self {
    KitError::Io(err)
  }
}

impl From<String> for KitError {
  fn from(msg: String) -> Self {
    KitError::message(msg)
  }
}

impl From<&str> for KitError {
  fn from(msg: &str) -> Self {
    KitError::message(msg)
  }
}

impl From<ConfigError> for KitError {
  fn from(err: ConfigError) -> Self {
    KitError::Config(err)
  }
}

impl From<SchemaError> for KitError {
  fn from(err: SchemaError) -> Self {
    KitError::Schema(err)
  }
}

impl From<VersionError> for KitError {
  fn from(err: VersionError) -> Self {
    KitError::Version(err)
  }
}

impl From<DraftError> for KitError {
  fn from(err: DraftError) -> Self {
    KitError::Draft(err)
  }
}

impl From<AutomationError> for KitError {
  fn from(err: AutomationError) -> Self {
    KitError::Automation(err)
  }
}

impl From<toml_edit::de::Error> for KitError {
  fn from(err: toml_edit::de::Error) -> Self {
    KitError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for KitError {
  fn from(err: toml_edit::ser::Error) -> Self {
    KitError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for KitError {
  fn from(err: serde_json::Error) -> Self {
    KitError::message(format!("JSON error: {}", err))
  }
}

impl From<semver::Error> for KitError {
  fn from(err: semver::Error) -> Self {
    KitError::message(format!("Version parse error: {}", err))
  }
}

impl From<regex::Error> for KitError {
  fn from(err: regex::Error) -> Self {
    KitError::message(format!("Expression error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for KitError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    KitError::message(format!("UTF-8 conversion error: {}", err))
  }
}

/// Configuration and session errors
#[derive(Debug)]
pub enum ConfigError {
  /// Invalid value in patternkit.toml
  InvalidValue { field: String, value: String },

  /// No pattern selected in the session
  NoCurrentPattern,

  /// No draft selected in the session
  NoCurrentDraft,

  /// Aggregate not found in the store
  NotFound { kind: &'static str, name: String, store: PathBuf },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NoCurrentPattern => Some("Run `patternkit pattern create <name>` to start a pattern.".to_string()),
      ConfigError::NoCurrentDraft => {
        Some("Run `patternkit draft new <toolkit> <name>` or `patternkit draft switch <name>`.".to_string())
      }
      ConfigError::NotFound { kind, .. } if *kind == "toolkit" => {
        Some("Build the toolkit first with `patternkit toolkit build`.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::InvalidValue { field, value } => {
        write!(f, "Invalid value '{}' for config field '{}'", value, field)
      }
      ConfigError::NoCurrentPattern => write!(f, "No pattern is currently selected"),
      ConfigError::NoCurrentDraft => write!(f, "No draft is currently selected"),
      ConfigError::NotFound { kind, name, store } => {
        write!(f, "No {} named '{}' in store {}", kind, name, store.display())
      }
    }
  }
}

/// Pattern authoring errors
#[derive(Debug)]
pub enum SchemaError {
  /// Name does not match the identifier grammar
  InvalidIdentifier { name: String },

  /// Name is reserved
  ReservedName { name: String },

  /// Attribute with this name already exists on the parent
  DuplicateAttribute { name: String, parent: String },

  /// Element with this name already exists on the parent
  DuplicateElement { name: String, parent: String },

  /// Attribute name collides with an existing element
  AttributeNameTakenByElement { name: String, parent: String },

  /// Element name collides with an existing attribute
  ElementNameTakenByAttribute { name: String, parent: String },

  /// Automation or code template name already used on the parent
  DuplicateAutomation { name: String, parent: String },

  /// Data type is not one of the supported set
  UnsupportedDataType { data_type: String },

  /// Default value cannot be parsed as the data type
  IncompatibleDefault { value: String, data_type: String },

  /// A choice cannot be parsed as the data type
  IncompatibleChoice { value: String, data_type: String },

  /// Default value is not one of the declared choices
  DefaultNotInChoices { value: String },

  /// No node with this id or name
  NodeNotFound { kind: &'static str, key: String },

  /// Code template has no content in the toolkit build
  MissingTemplateContent { name: String },

  /// Addressing expression is malformed or does not resolve
  InvalidExpression { expression: String, reason: String },
}

impl fmt::Display for SchemaError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SchemaError::InvalidIdentifier { name } => write!(f, "'{}' is not a valid name", name),
      SchemaError::ReservedName { name } => write!(f, "'{}' is a reserved name", name),
      SchemaError::DuplicateAttribute { name, parent } => {
        write!(f, "An attribute named '{}' already exists on '{}'", name, parent)
      }
      SchemaError::DuplicateElement { name, parent } => {
        write!(f, "An element named '{}' already exists on '{}'", name, parent)
      }
      SchemaError::AttributeNameTakenByElement { name, parent } => {
        write!(f, "Cannot add attribute '{}' to '{}': an element with that name exists", name, parent)
      }
      SchemaError::ElementNameTakenByAttribute { name, parent } => {
        write!(f, "Cannot add element '{}' to '{}': an attribute with that name exists", name, parent)
      }
      SchemaError::DuplicateAutomation { name, parent } => {
        write!(f, "Automation or code template '{}' already exists on '{}'", name, parent)
      }
      SchemaError::UnsupportedDataType { data_type } => {
        write!(
          f,
          "Unsupported data type '{}'. Expected one of: {}",
          data_type,
          crate::schema::DataType::supported_names().join(", ")
        )
      }
      SchemaError::IncompatibleDefault { value, data_type } => {
        write!(f, "Default value '{}' is not a valid {}", value, data_type)
      }
      SchemaError::IncompatibleChoice { value, data_type } => {
        write!(f, "Choice '{}' is not a valid {}", value, data_type)
      }
      SchemaError::DefaultNotInChoices { value } => {
        write!(f, "Default value '{}' is not one of the choices", value)
      }
      SchemaError::NodeNotFound { kind, key } => write!(f, "No {} found for '{}'", kind, key),
      SchemaError::MissingTemplateContent { name } => {
        write!(f, "Code template '{}' has no content to package", name)
      }
      SchemaError::InvalidExpression { expression, reason } => {
        write!(f, "Expression '{}' is invalid: {}", expression, reason)
      }
    }
  }
}

/// Toolkit versioning errors
#[derive(Debug)]
pub enum VersionError {
  /// Not a dotted three-part numeric version
  InvalidFormat { version: String },

  /// 0.0.0 is never a valid release
  ZeroVersion,

  /// Requested version orders before the current one
  BeforeCurrent { requested: String, current: String },

  /// Breaking changes require a major bump (or force)
  Illegal {
    requested: String,
    current: String,
    changes: Vec<String>,
  },
}

impl VersionError {
  fn help_message(&self) -> Option<String> {
    match self {
      VersionError::Illegal { .. } => {
        Some("Use a new major version, `--version auto`, or pass `--force` to override.".to_string())
      }
      VersionError::InvalidFormat { .. } => Some("Versions look like '1.2.3'.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for VersionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionError::InvalidFormat { version } => write!(f, "'{}' is not a valid version", version),
      VersionError::ZeroVersion => write!(f, "Version 0.0.0 cannot be released"),
      VersionError::BeforeCurrent { requested, current } => {
        write!(f, "Version {} is before the current version {}", requested, current)
      }
      VersionError::Illegal {
        requested,
        current,
        changes,
      } => {
        write!(
          f,
          "Illegal version {}: breaking changes since {} require a new major version",
          requested, current
        )?;
        for change in changes {
          write!(f, "\n  - {}", change)?;
        }
        Ok(())
      }
    }
  }
}

/// Draft shape and property errors
#[derive(Debug)]
pub enum DraftError {
  /// Draft item id does not exist
  ItemNotFound { id: String },

  /// Node is already materialised
  AlreadyMaterialised { id: String },

  /// Node must be materialised first
  NotMaterialised { id: String },

  /// Operation is not valid for the node's shape
  WrongShape {
    operation: &'static str,
    id: String,
    shape: &'static str,
  },

  /// Property name is not on the schema
  PropertyNotFound { name: String, id: String },

  /// Property exists but is an element or collection
  NotAnAttribute { name: String, id: String },

  /// Assignment is not `Name=Value`
  MalformedAssignment { assignment: String, id: String },

  /// Value is not one of the declared choices
  ValueNotInChoices {
    assignment: String,
    id: String,
    choices: Vec<String>,
  },

  /// Value cannot be parsed as the declared data type
  IncompatibleValue {
    assignment: String,
    id: String,
    data_type: String,
  },

  /// Node is not a child of the receiver
  NotAChild { child: String, id: String },
}

impl DraftError {
  fn help_message(&self) -> Option<String> {
    match self {
      DraftError::NotMaterialised { .. } => Some("Run `patternkit draft materialise` on the node first.".to_string()),
      DraftError::MalformedAssignment { .. } => Some("Assignments look like 'Name=Value'.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for DraftError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DraftError::ItemNotFound { id } => write!(f, "Draft item '{}' not found", id),
      DraftError::AlreadyMaterialised { id } => write!(f, "Draft item '{}' is already materialised", id),
      DraftError::NotMaterialised { id } => write!(f, "Draft item '{}' is not materialised", id),
      DraftError::WrongShape { operation, id, shape } => {
        write!(f, "Cannot {} on draft item '{}': it is {}", operation, id, shape)
      }
      DraftError::PropertyNotFound { name, id } => {
        write!(f, "Draft item '{}' has no property named '{}'", id, name)
      }
      DraftError::NotAnAttribute { name, id } => {
        write!(f, "Property '{}' of draft item '{}' is not an attribute", name, id)
      }
      DraftError::MalformedAssignment { assignment, id } => {
        write!(f, "Assignment '{}' for draft item '{}' is malformed", assignment, id)
      }
      DraftError::ValueNotInChoices {
        assignment,
        id,
        choices,
      } => write!(
        f,
        "Assignment '{}' for draft item '{}' is not one of: {}",
        assignment,
        id,
        choices.join(", ")
      ),
      DraftError::IncompatibleValue {
        assignment,
        id,
        data_type,
      } => write!(
        f,
        "Assignment '{}' for draft item '{}' is not a valid {}",
        assignment, id, data_type
      ),
      DraftError::NotAChild { child, id } => {
        write!(f, "Draft item '{}' is not a child of '{}'", child, id)
      }
    }
  }
}

/// Automation lookup and execution errors
#[derive(Debug)]
pub enum AutomationError {
  /// No automation with this id or name on the pattern
  NotFound { key: String },

  /// Automation exists but is the wrong kind for the request
  WrongKind { name: String, expected: &'static str },

  /// Template bytes are missing from the toolkit
  TemplateMissing { template_id: String },

  /// External application failed
  ApplicationFailed { application: String, output: String },
}

impl fmt::Display for AutomationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AutomationError::NotFound { key } => write!(f, "No automation found for '{}'", key),
      AutomationError::WrongKind { name, expected } => {
        write!(f, "Automation '{}' is not a {}", name, expected)
      }
      AutomationError::TemplateMissing { template_id } => {
        write!(f, "Toolkit has no content for code template '{}'", template_id)
      }
      AutomationError::ApplicationFailed { application, output } => {
        write!(f, "Application '{}' failed: {}", application, output)
      }
    }
  }
}

/// Result type alias for patternkit
pub type KitResult<T> = Result<T, KitError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> KitResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> KitResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<KitError>,
{
  fn context(self, ctx: impl Into<String>) -> KitResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> KitResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &KitError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

impl From<anyhow::Error> for KitError {
  fn from(err: anyhow::Error) -> Self {
    KitError::message(err.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exit_codes_by_category() {
    assert_eq!(KitError::from(ConfigError::NoCurrentDraft).exit_code(), ExitCode::User);
    assert_eq!(KitError::from(VersionError::ZeroVersion).exit_code(), ExitCode::Validation);
    assert_eq!(
      KitError::from(io::Error::new(io::ErrorKind::NotFound, "gone")).exit_code(),
      ExitCode::System
    );
  }

  #[test]
  fn test_context_chains_on_messages() {
    let err = KitError::message("inner").context("outer");
    assert_eq!(err.to_string(), "inner\nouter");
  }

  #[test]
  fn test_illegal_version_lists_changes() {
    let err = VersionError::Illegal {
      requested: "1.1.0".to_string(),
      current: "1.0.0".to_string(),
      changes: vec!["Attribute 'A' was renamed to 'B'".to_string()],
    };
    let text = err.to_string();
    assert!(text.contains("1.1.0"));
    assert!(text.contains("renamed to 'B'"));
  }
}
