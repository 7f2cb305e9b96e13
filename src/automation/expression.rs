//! `{{Element.Attribute}}` substitution against a draft configuration

use crate::core::error::KitResult;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*\}\}").expect("valid placeholder regex")
});

/// Replace every placeholder in `text` with the value it names in `data`
///
/// Missing and null values render as empty text.
pub fn resolve(text: &str, data: &Value) -> KitResult<String> {
  Ok(
    PLACEHOLDER_RE
      .replace_all(text, |caps: &Captures| match lookup(data, &caps[1]) {
        Some(value) => render(value),
        None => {
          tracing::debug!(expression = &caps[1], "unresolved placeholder");
          String::new()
        }
      })
      .into_owned(),
  )
}

/// Follow a dotted path through objects, and arrays by index
pub fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
  path.split('.').try_fold(data, |current, segment| match current {
    Value::Object(map) => map.get(segment),
    Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
    _ => None,
  })
}

fn render(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    other => other.to_string(),
  }
}
