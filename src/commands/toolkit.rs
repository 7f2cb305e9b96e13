//! `patternkit toolkit ...` - releasing the current pattern

use crate::commands::pattern::current_pattern;
use crate::core::context::KitContext;
use crate::core::error::KitResult;
use crate::schema::ToolkitDefinition;
use crate::version::VersionInstruction;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct BuildReport<'a> {
  name: &'a str,
  version: String,
  fingerprint: &'a str,
  templates: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  warning: Option<&'a str>,
}

/// Release the current pattern and store the snapshot
///
/// The pattern is saved too, since releasing resets its pending change log.
pub fn run_toolkit_build(ctx: &KitContext, version: Option<&str>, force: bool, json: bool) -> KitResult<()> {
  let mut pattern = current_pattern(ctx)?;
  let contents = ctx.store.template_contents(&pattern)?;
  let instruction = VersionInstruction::parse(version, force);

  let build = ToolkitDefinition::build(&mut pattern, &instruction, &contents)?;
  ctx.store.save_toolkit(&build.toolkit)?;
  ctx.store.save_pattern(&pattern)?;

  let toolkit = &build.toolkit;
  if json {
    return super::print_json(&BuildReport {
      name: &toolkit.name,
      version: toolkit.version.to_string(),
      fingerprint: &toolkit.fingerprint,
      templates: toolkit.code_templates.len(),
      warning: build.warning.as_deref(),
    });
  }

  if let Some(warning) = &build.warning {
    eprintln!("Warning: {}", warning);
  }
  println!("Built toolkit '{}' version {}", toolkit.name, toolkit.version);
  println!("  templates:   {}", toolkit.code_templates.len());
  println!("  fingerprint: {}", toolkit.fingerprint);
  Ok(())
}

/// List toolkits with their released versions
pub fn run_toolkit_list(ctx: &KitContext, json: bool) -> KitResult<()> {
  let mut releases = Vec::new();
  for name in ctx.store.list_toolkits()? {
    let versions: Vec<String> = ctx
      .store
      .list_toolkit_versions(&name)?
      .iter()
      .map(ToString::to_string)
      .collect();
    releases.push((name, versions));
  }

  if json {
    let map: serde_json::Map<String, serde_json::Value> = releases
      .into_iter()
      .map(|(name, versions)| (name, serde_json::Value::from(versions)))
      .collect();
    return super::print_json(&map);
  }
  for (name, versions) in releases {
    println!("{} {}", name, versions.join(", "));
  }
  Ok(())
}
