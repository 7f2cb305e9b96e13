//! Tests for automation runs against real and in-memory file systems

use crate::helpers::*;
use anyhow::Result;
use patternkit::automation::{
  AutomationContext, ExecutionOutcome, FileSystemWriter, MustacheTemplateEngine, TemplateEngine, run_automation,
};
use patternkit::core::error::KitResult;
use patternkit::draft::DraftModel;
use patternkit::schema::{AttributeSpec, Cardinality, ElementSpec, Pattern, ToolkitDefinition};
use patternkit::version::VersionInstruction;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[test]
fn test_launch_point_generates_one_file_per_item() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  api_toolkit(&workspace)?;
  workspace.run(&["draft", "new", "Api", "Mine"])?;
  workspace.run(&["draft", "add-item", "{Api.Services}", "Name=billing"])?;
  workspace.run(&["draft", "add-item", "{Api.Services}", "Name=orders", "Port=9000"])?;

  let result = workspace.json(&["draft", "run", "Build", "--json"])?;
  assert_eq!(result["is_success"], true);
  assert_eq!(workspace.read_file("gen/billing.rs")?, "// service billing on 8080\n");
  assert_eq!(workspace.read_file("gen/orders.rs")?, "// service orders on 9000\n");
  Ok(())
}

#[test]
fn test_rename_replaces_generated_file() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  api_toolkit(&workspace)?;
  workspace.run(&["draft", "new", "Api", "Mine"])?;
  workspace.run(&["draft", "add-item", "{Api.Services}", "Name=billing"])?;
  workspace.run(&["draft", "run", "Build"])?;

  let view = workspace.json(&["draft", "view", "--json"])?;
  let id = view["Services"]["Items"][0]["Id"].as_str().unwrap_or_default().to_string();
  workspace.run(&["draft", "set", "Name=payments", "--item", &format!("{{Api.Services.{}}}", id)])?;
  let log = workspace.stdout(&["draft", "run", "Build"])?;

  assert!(log.contains("Deleted"));
  assert!(!workspace.file_exists("gen/billing.rs"));
  assert!(workspace.file_exists("gen/payments.rs"));
  Ok(())
}

#[test]
fn test_run_on_unknown_automation_fails() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  api_toolkit(&workspace)?;
  workspace.run(&["draft", "new", "Api", "Mine"])?;
  let output = workspace.run_failing(&["draft", "run", "Deploy"])?;
  assert!(String::from_utf8_lossy(&output.stderr).contains("No automation found for 'Deploy'"));
  Ok(())
}

// ============================================================================
// Library flow with in-memory collaborators
// ============================================================================

#[derive(Default)]
struct MemoryFs {
  files: RefCell<BTreeSet<PathBuf>>,
  moves: RefCell<usize>,
}

impl FileSystemWriter for MemoryFs {
  fn exists(&self, path: &Path) -> bool {
    self.files.borrow().contains(path)
  }

  fn write(&self, _content: &str, path: &Path) -> KitResult<()> {
    self.files.borrow_mut().insert(path.to_path_buf());
    Ok(())
  }

  fn delete(&self, path: &Path) -> KitResult<()> {
    self.files.borrow_mut().remove(path);
    Ok(())
  }

  fn move_file(&self, from: &Path, to: &Path) -> KitResult<()> {
    *self.moves.borrow_mut() += 1;
    self.files.borrow_mut().remove(from);
    self.files.borrow_mut().insert(to.to_path_buf());
    Ok(())
  }
}

#[derive(Default)]
struct CountingEngine {
  renders: RefCell<usize>,
}

impl TemplateEngine for CountingEngine {
  fn transform(&self, description: &str, template: &str, data: &serde_json::Value) -> KitResult<String> {
    *self.renders.borrow_mut() += 1;
    MustacheTemplateEngine.transform(description, template, data)
  }
}

struct NoProcesses;

impl patternkit::automation::ApplicationExecutor for NoProcesses {
  fn run(&self, _application: &str, _arguments: &str) -> KitResult<ExecutionOutcome> {
    Ok(ExecutionOutcome {
      success: true,
      output: String::new(),
    })
  }
}

#[test]
fn test_one_off_rename_moves_file_without_rendering() -> Result<()> {
  let mut pattern = Pattern::new("Api")?;
  let root = pattern.id().clone();
  let services = pattern.add_element(&root, ElementSpec::new("Services", Cardinality::ZeroOrMany))?;
  pattern.add_attribute(&services, AttributeSpec::new("Name", "string"))?;
  let template = pattern.add_code_template(&services, "Handler", "handler.rs")?;
  pattern.add_code_template_command(&services, "Scaffold", template.as_str(), true, "~/src/{{Name}}.rs")?;

  let mut contents = BTreeMap::new();
  contents.insert(template, b"// {{Name}}".to_vec());
  let toolkit = ToolkitDefinition::build(&mut pattern, &VersionInstruction::Auto, &contents)?.toolkit;

  let mut draft = DraftModel::new("Mine", &toolkit)?;
  let collection = draft.find_by_expression("{Api.Services}")?;
  let item = draft.materialise_collection_item(&collection)?;
  draft.set_properties(&item, &["Name=billing"])?;

  let fs = MemoryFs::default();
  let first = CountingEngine::default();
  let from = draft.root_id().clone();
  let context = AutomationContext {
    fs: &fs,
    templates: &first,
    executor: &NoProcesses,
    output_root: PathBuf::from("/project"),
  };
  run_automation(&context, &toolkit, &mut draft, "Scaffold", &from)?;
  assert_eq!(*first.renders.borrow(), 1);

  draft.set_properties(&item, &["Name=payments"])?;
  let second = CountingEngine::default();
  let context = AutomationContext {
    fs: &fs,
    templates: &second,
    executor: &NoProcesses,
    output_root: PathBuf::from("/project"),
  };
  let result = run_automation(&context, &toolkit, &mut draft, "Scaffold", &from)?;

  assert!(result.is_success);
  assert_eq!(*second.renders.borrow(), 0);
  assert_eq!(*fs.moves.borrow(), 1);
  assert!(fs.exists(Path::new("/project/src/payments.rs")));
  let link = &draft.item(&item)?.artifact_links[0];
  assert_eq!(link.path, PathBuf::from("/project/src/payments.rs"));
  assert_eq!(link.tag, "payments.rs");
  Ok(())
}
