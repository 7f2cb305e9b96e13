//! Change-severity tracking and toolkit version computation
//!
//! Every pattern mutation registers a [`ChangeSeverity`] here. The tracker keeps the
//! highest severity seen since the last release, and resolves the next release
//! version from either an explicit request or an automatic bump.
//!
//! # Rules
//!
//! - `0.0.0` is never releasable
//! - A version before the current one is always rejected, even with `force`
//! - Pending breaking changes require a new major version unless `force` is set
//! - `auto` bumps major for breaking, minor for non-breaking, nothing otherwise

use crate::core::error::{KitResult, VersionError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Classification of a schema mutation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSeverity {
  #[default]
  NoChange,
  NonBreaking,
  Breaking,
}

impl fmt::Display for ChangeSeverity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ChangeSeverity::NoChange => write!(f, "no change"),
      ChangeSeverity::NonBreaking => write!(f, "non-breaking"),
      ChangeSeverity::Breaking => write!(f, "breaking"),
    }
  }
}

/// Version bump implied by a severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
  Major,
  Minor,
  None,
}

impl VersionBump {
  /// Apply bump to a semver version
  pub fn apply(&self, version: &semver::Version) -> semver::Version {
    match self {
      VersionBump::Major => semver::Version::new(version.major + 1, 0, 0),
      VersionBump::Minor => semver::Version::new(version.major, version.minor + 1, 0),
      VersionBump::None => version.clone(),
    }
  }
}

impl From<ChangeSeverity> for VersionBump {
  fn from(severity: ChangeSeverity) -> Self {
    match severity {
      ChangeSeverity::Breaking => VersionBump::Major,
      ChangeSeverity::NonBreaking => VersionBump::Minor,
      ChangeSeverity::NoChange => VersionBump::None,
    }
  }
}

/// One registered change: a message template with `{0}`-style placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
  pub severity: ChangeSeverity,
  pub message_template: String,
  pub args: Vec<String>,
}

impl ChangeEntry {
  /// Render the template with its arguments substituted
  pub fn message(&self) -> String {
    format_template(&self.message_template, &self.args)
  }
}

/// Substitute `{0}`, `{1}`, ... in `template` with `args`
pub fn format_template(template: &str, args: &[String]) -> String {
  let mut out = template.to_string();
  for (index, arg) in args.iter().enumerate() {
    out = out.replace(&format!("{{{}}}", index), arg);
  }
  out
}

/// How the next version should be chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionInstruction {
  /// Compute from accumulated severity
  Auto,
  /// Use the given version, optionally overriding the breaking-change rule
  Explicit { version: String, force: bool },
}

impl VersionInstruction {
  /// Build from CLI-style input: empty or "auto" means automatic
  pub fn parse(input: Option<&str>, force: bool) -> Self {
    match input.map(str::trim) {
      None | Some("") => VersionInstruction::Auto,
      Some(v) if v.eq_ignore_ascii_case("auto") => VersionInstruction::Auto,
      Some(v) => VersionInstruction::Explicit {
        version: v.to_string(),
        force,
      },
    }
  }
}

/// Outcome of a successful version update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionUpdate {
  pub version: semver::Version,
  /// Set when a forced update overrode pending breaking changes
  pub warning: Option<String>,
}

/// Accumulates change severity since the last released version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionTracker {
  current: semver::Version,
  last_changes: ChangeSeverity,
  #[serde(default)]
  change_log: Vec<ChangeEntry>,
}

impl Default for VersionTracker {
  fn default() -> Self {
    Self::new()
  }
}

impl VersionTracker {
  pub fn new() -> Self {
    Self {
      current: semver::Version::new(0, 0, 0),
      last_changes: ChangeSeverity::NoChange,
      change_log: Vec::new(),
    }
  }

  pub fn current(&self) -> &semver::Version {
    &self.current
  }

  pub fn last_changes(&self) -> ChangeSeverity {
    self.last_changes
  }

  pub fn change_log(&self) -> &[ChangeEntry] {
    &self.change_log
  }

  /// Record a change; severity only ever rises until the next release
  pub fn register_change(&mut self, severity: ChangeSeverity, template: impl Into<String>, args: Vec<String>) {
    let entry = ChangeEntry {
      severity,
      message_template: template.into(),
      args,
    };
    tracing::debug!(%severity, change = %entry.message(), "registered pattern change");
    self.change_log.push(entry);
    self.last_changes = self.last_changes.max(severity);
  }

  /// Version that `auto` would resolve to right now
  pub fn next_auto_version(&self) -> semver::Version {
    VersionBump::from(self.last_changes).apply(&self.current)
  }

  /// Resolve and apply the next version
  pub fn update_version(&mut self, instruction: &VersionInstruction) -> KitResult<VersionUpdate> {
    let (next, warning) = match instruction {
      VersionInstruction::Auto => (self.next_auto_version(), None),
      VersionInstruction::Explicit { version, force } => {
        let requested = parse_version(version)?;
        let warning = self.check_explicit(&requested, *force)?;
        (requested, warning)
      }
    };

    tracing::info!(from = %self.current, to = %next, changes = %self.last_changes, "updated pattern version");
    self.current = next.clone();
    self.last_changes = ChangeSeverity::NoChange;
    self.change_log.clear();

    Ok(VersionUpdate { version: next, warning })
  }

  fn check_explicit(&self, requested: &semver::Version, force: bool) -> KitResult<Option<String>> {
    if *requested == semver::Version::new(0, 0, 0) {
      return Err(VersionError::ZeroVersion.into());
    }

    if *requested < self.current {
      return Err(
        VersionError::BeforeCurrent {
          requested: requested.to_string(),
          current: self.current.to_string(),
        }
        .into(),
      );
    }

    if self.last_changes == ChangeSeverity::Breaking && requested.major <= self.current.major {
      let changes: Vec<String> = self.change_log.iter().map(ChangeEntry::message).collect();
      if !force {
        return Err(
          VersionError::Illegal {
            requested: requested.to_string(),
            current: self.current.to_string(),
            changes,
          }
          .into(),
        );
      }
      let mut warning = format!(
        "Version {} was forced despite breaking changes since {}:",
        requested, self.current
      );
      for change in &changes {
        warning.push_str(&format!("\n  - {}", change));
      }
      return Ok(Some(warning));
    }

    Ok(None)
  }
}

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("valid version regex"));

/// Parse a dotted three-part numeric version
pub fn parse_version(input: &str) -> KitResult<semver::Version> {
  let trimmed = input.trim();
  if !VERSION_RE.is_match(trimmed) {
    return Err(
      VersionError::InvalidFormat {
        version: input.to_string(),
      }
      .into(),
    );
  }
  Ok(semver::Version::parse(trimmed)?)
}
