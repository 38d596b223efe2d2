//! Package schema boundary: turns raw decoded JSON into a normalized `QuestionPackage`.
//!
//! Tolerated drift, applied once here and never re-checked downstream:
//!   - `essay` may be a single object, a list, null or absent; it always comes out as a list.
//!   - an essay item without a rubric gets `Rubric::default()` (no criteria, 100 points).
//!   - `mcqs` may be null or absent (empty list).
//!   - `correct_option` is not checked against `options`; grading just never matches it.
//!   - `difficulty` is matched case-insensitively; an unrecognized value is dropped.
//!
//! Anything else that is missing or mistyped is a `SchemaError`, reported with the field path.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{EssayItem, Level, Mcq, QuestionPackage};

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
  #[error("package is not valid JSON: {0}")]
  Malformed(String),
  #[error("package must be a JSON object")]
  NotAnObject,
  #[error("invalid field `{path}`: {message}")]
  Field { path: String, message: String },
}

impl SchemaError {
  fn field(path: impl Into<String>, message: impl ToString) -> Self {
    SchemaError::Field { path: path.into(), message: message.to_string() }
  }
}

/// Normalize the legacy `essay` encodings into a list of raw entries.
///
/// Returns `None` when the value is present but neither an object nor a list.
pub fn essay_entries(value: Option<&Value>) -> Option<Vec<Value>> {
  match value {
    None | Some(Value::Null) => Some(Vec::new()),
    Some(obj @ Value::Object(_)) => Some(vec![obj.clone()]),
    Some(Value::Array(items)) => Some(items.clone()),
    Some(_) => None,
  }
}

/// Parse a JSON document and normalize it.
pub fn parse_package(text: &str) -> Result<QuestionPackage, SchemaError> {
  let raw: Value = serde_json::from_str(text).map_err(|e| SchemaError::Malformed(e.to_string()))?;
  normalize_package(raw)
}

pub fn normalize_package(raw: Value) -> Result<QuestionPackage, SchemaError> {
  let Value::Object(obj) = raw else {
    return Err(SchemaError::NotAnObject);
  };

  let package_id: String = required(&obj, "package_id")?;
  let source: String = required(&obj, "source")?;
  let level: Level = required(&obj, "level")?;

  let mcqs = match obj.get("mcqs") {
    None | Some(Value::Null) => Vec::new(),
    Some(Value::Array(items)) => items
      .iter()
      .enumerate()
      .map(|(i, item)| decode::<Mcq>(item.clone(), &format!("mcqs[{i}]")))
      .collect::<Result<Vec<_>, _>>()?,
    Some(_) => return Err(SchemaError::field("mcqs", "expected a list")),
  };

  let essay = essay_entries(obj.get("essay"))
    .ok_or_else(|| SchemaError::field("essay", "expected an object or a list"))?
    .into_iter()
    .enumerate()
    .map(|(i, item)| normalize_essay_item(item, &format!("essay[{i}]")))
    .collect::<Result<Vec<_>, _>>()?;

  Ok(QuestionPackage { package_id, source, level, mcqs, essay })
}

fn normalize_essay_item(mut item: Value, path: &str) -> Result<EssayItem, SchemaError> {
  if let Value::Object(map) = &mut item {
    // `"rubric": null` is treated like a missing rubric.
    if matches!(map.get("rubric"), Some(Value::Null)) {
      map.remove("rubric");
    }
  }
  decode(item, path)
}

fn required<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Result<T, SchemaError> {
  let value = obj.get(key).ok_or_else(|| SchemaError::field(key, "missing"))?;
  decode(value.clone(), key)
}

fn decode<T: DeserializeOwned>(value: Value, path: &str) -> Result<T, SchemaError> {
  serde_json::from_value(value).map_err(|e| SchemaError::field(path, e))
}

/// Canonical on-disk form: pretty JSON with `essay` always written as a list.
pub fn to_pretty_json(pkg: &QuestionPackage) -> Result<String, serde_json::Error> {
  serde_json::to_string_pretty(pkg)
}
