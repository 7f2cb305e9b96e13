//! File-backed persistence for patterns, toolkits, drafts, and the session
//!
//! ```text
//! <store>/
//!   patterns/<name>/pattern.json
//!   patterns/<name>/templates/<template-id>
//!   toolkits/<name>/<version>.json   (moved with the pattern on rename)
//!   drafts/<name>.json
//!   session.json
//! ```

use crate::core::context::Session;
use crate::core::error::{ConfigError, KitError, KitResult, ResultExt};
use crate::draft::DraftModel;
use crate::schema::{Pattern, SchemaId, ToolkitDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON store rooted at one directory
#[derive(Debug, Clone)]
pub struct Store {
  root: PathBuf,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> KitResult<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
  }
  let content = serde_json::to_string_pretty(value)?;
  fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> KitResult<T> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Entry names in a directory, with an optional extension stripped, sorted
fn list_names(dir: &Path, extension: Option<&str>) -> KitResult<Vec<String>> {
  if !dir.is_dir() {
    return Ok(Vec::new());
  }
  let mut names = Vec::new();
  for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
    let path = entry?.path();
    let name = match extension {
      Some(ext) if path.extension().is_some_and(|e| e == ext) => path.file_stem(),
      Some(_) => None,
      None => path.file_name(),
    };
    if let Some(name) = name {
      names.push(name.to_string_lossy().to_string());
    }
  }
  names.sort();
  Ok(names)
}

impl Store {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn not_found(&self, kind: &'static str, name: &str) -> KitError {
    ConfigError::NotFound {
      kind,
      name: name.to_string(),
      store: self.root.clone(),
    }
    .into()
  }

  // ============================================================================
  // Patterns
  // ============================================================================

  fn pattern_dir(&self, name: &str) -> PathBuf {
    self.root.join("patterns").join(name)
  }

  pub fn pattern_exists(&self, name: &str) -> bool {
    self.pattern_dir(name).join("pattern.json").is_file()
  }

  pub fn save_pattern(&self, pattern: &Pattern) -> KitResult<()> {
    write_json(&self.pattern_dir(pattern.name()).join("pattern.json"), pattern)
  }

  pub fn load_pattern(&self, name: &str) -> KitResult<Pattern> {
    let path = self.pattern_dir(name).join("pattern.json");
    if !path.is_file() {
      return Err(self.not_found("pattern", name));
    }
    read_json(&path)
  }

  pub fn list_patterns(&self) -> KitResult<Vec<String>> {
    list_names(&self.root.join("patterns"), None)
  }

  /// Move a pattern's directory and its releases after a root rename
  pub fn rename_pattern(&self, old: &str, new: &str) -> KitResult<()> {
    let moves = [
      (self.pattern_dir(old), self.pattern_dir(new), "pattern"),
      (self.toolkit_dir(old), self.toolkit_dir(new), "toolkit"),
    ];
    for (_, to, kind) in &moves {
      if to.exists() {
        return Err(KitError::message(format!("A {} named '{}' already exists", kind, new)));
      }
    }
    for (from, to, _) in &moves {
      if from.is_dir() {
        fs::rename(from, to).with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))?;
      }
    }
    Ok(())
  }

  pub fn save_template(&self, pattern: &str, template: &SchemaId, content: &[u8]) -> KitResult<()> {
    let path = self.pattern_dir(pattern).join("templates").join(template.as_str());
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
  }

  pub fn load_template(&self, pattern: &str, template: &SchemaId) -> KitResult<Vec<u8>> {
    let path = self.pattern_dir(pattern).join("templates").join(template.as_str());
    fs::read(&path).with_context(|| format!("Failed to read template {}", path.display()))
  }

  /// Stored bytes for every code template in the pattern; missing files are skipped
  pub fn template_contents(&self, pattern: &Pattern) -> KitResult<BTreeMap<SchemaId, Vec<u8>>> {
    let mut contents = BTreeMap::new();
    for template in pattern.root().all_code_templates() {
      let path = self.pattern_dir(pattern.name()).join("templates").join(template.id.as_str());
      if path.is_file() {
        contents.insert(template.id.clone(), self.load_template(pattern.name(), &template.id)?);
      }
    }
    Ok(contents)
  }

  // ============================================================================
  // Toolkits
  // ============================================================================

  fn toolkit_dir(&self, name: &str) -> PathBuf {
    self.root.join("toolkits").join(name)
  }

  pub fn save_toolkit(&self, toolkit: &ToolkitDefinition) -> KitResult<()> {
    let path = self.toolkit_dir(&toolkit.name).join(format!("{}.json", toolkit.version));
    write_json(&path, toolkit)
  }

  /// Released versions of a toolkit, oldest first
  pub fn list_toolkit_versions(&self, name: &str) -> KitResult<Vec<semver::Version>> {
    let mut versions: Vec<semver::Version> = list_names(&self.toolkit_dir(name), Some("json"))?
      .iter()
      .filter_map(|v| semver::Version::parse(v).ok())
      .collect();
    versions.sort();
    Ok(versions)
  }

  pub fn list_toolkits(&self) -> KitResult<Vec<String>> {
    list_names(&self.root.join("toolkits"), None)
  }

  /// Load one release, or the latest when `version` is `None`
  pub fn load_toolkit(&self, name: &str, version: Option<&semver::Version>) -> KitResult<ToolkitDefinition> {
    let version = match version {
      Some(version) => version.clone(),
      None => self
        .list_toolkit_versions(name)?
        .pop()
        .ok_or_else(|| self.not_found("toolkit", name))?,
    };
    let path = self.toolkit_dir(name).join(format!("{}.json", version));
    if !path.is_file() {
      return Err(self.not_found("toolkit", &format!("{}@{}", name, version)));
    }
    read_json(&path)
  }

  /// Load a release by toolkit id, whatever name it is currently stored under
  pub fn load_toolkit_by_id(&self, id: &SchemaId, version: Option<&semver::Version>) -> KitResult<ToolkitDefinition> {
    for name in self.list_toolkits()? {
      let Some(latest) = self.list_toolkit_versions(&name)?.pop() else {
        continue;
      };
      if self.load_toolkit(&name, Some(&latest))?.id == *id {
        return self.load_toolkit(&name, version);
      }
    }
    Err(self.not_found("toolkit", id.as_str()))
  }

  // ============================================================================
  // Drafts and session
  // ============================================================================

  fn draft_path(&self, name: &str) -> PathBuf {
    self.root.join("drafts").join(format!("{}.json", name))
  }

  pub fn draft_exists(&self, name: &str) -> bool {
    self.draft_path(name).is_file()
  }

  pub fn save_draft(&self, draft: &DraftModel) -> KitResult<()> {
    write_json(&self.draft_path(draft.name()), draft)
  }

  /// Load a draft and rebuild its parent links
  pub fn load_draft(&self, name: &str) -> KitResult<DraftModel> {
    let path = self.draft_path(name);
    if !path.is_file() {
      return Err(self.not_found("draft", name));
    }
    let mut draft: DraftModel = read_json(&path)?;
    draft.populate_ancestry();
    Ok(draft)
  }

  pub fn list_drafts(&self) -> KitResult<Vec<String>> {
    list_names(&self.root.join("drafts"), Some("json"))
  }

  pub fn load_session(&self) -> KitResult<Session> {
    let path = self.root.join("session.json");
    if !path.is_file() {
      return Ok(Session::default());
    }
    read_json(&path)
  }

  pub fn save_session(&self, session: &Session) -> KitResult<()> {
    write_json(&self.root.join("session.json"), session)
  }
}
