//! Merge engine: folds every package JSON file under a directory into one aggregate package.
//!
//! Entries are copied as raw JSON and never deduplicated; the same MCQ id coming from two
//! sources shows up twice. Files are visited in lexical path order.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use crate::domain::MergedPackage;
use crate::error::{AppError, Result};
use crate::schema::essay_entries;

/// Caller-supplied metadata written onto the merged package as-is.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergeMeta {
  pub merged_source: String,
  pub level: String,
  pub notes: String,
}

impl Default for MergeMeta {
  fn default() -> Self {
    Self {
      merged_source: "Question Bank Compilation".into(),
      level: "advanced_undergraduate".into(),
      notes: "Merged automatically using Question Bank Generator".into(),
    }
  }
}

/// All `*.json` files below `root` (any depth), sorted by path.
pub fn collect_package_files(root: &Path) -> Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  for entry in WalkDir::new(root).follow_links(false) {
    let entry = entry.map_err(std::io::Error::from)?;
    let is_json = entry.path().extension().is_some_and(|ext| ext == "json");
    if entry.file_type().is_file() && is_json {
      files.push(entry.into_path());
    }
  }
  files.sort();
  Ok(files)
}

/// Folds already-decoded packages, in the given order.
pub fn merge_values<I>(packages: I, meta: MergeMeta) -> MergedPackage
where
  I: IntoIterator<Item = Value>,
{
  let mut merged = MergedPackage {
    merged_source: meta.merged_source,
    level: meta.level,
    packages: Vec::new(),
    mcqs: Vec::new(),
    essay: Vec::new(),
    notes: meta.notes,
  };

  for pkg in packages {
    let id = package_label(pkg.get("package_id"));
    merged.packages.push(id.clone());

    if let Some(Value::Array(mcqs)) = pkg.get("mcqs") {
      merged.mcqs.extend(mcqs.iter().cloned());
    }
    match essay_entries(pkg.get("essay")) {
      Some(items) => merged.essay.extend(items),
      None => warn!(target: "quizbank", package_id = %id, "Ignoring essay field of unexpected type"),
    }
  }
  merged
}

/// `package_id` as written: strings as-is, other values in their JSON form, `"unknown"` when
/// absent or null.
fn package_label(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => "unknown".to_string(),
    Some(Value::String(s)) => s.clone(),
    Some(other) => other.to_string(),
  }
}

/// Reads and merges the given files in order. A file that is not valid JSON aborts the merge.
pub fn merge_files(files: &[PathBuf], meta: MergeMeta) -> Result<MergedPackage> {
  let mut values = Vec::with_capacity(files.len());
  for path in files {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text).map_err(|e| {
      AppError::BadRequest(format!("{} is not valid JSON: {e}", path.display()))
    })?;
    values.push(value);
  }
  Ok(merge_values(values, meta))
}

#[instrument(level = "info", skip(meta), fields(root = %root.display()))]
pub fn merge_directory(root: &Path, meta: MergeMeta) -> Result<MergedPackage> {
  if !root.is_dir() {
    return Err(AppError::NotFound(root.display().to_string()));
  }
  let files = collect_package_files(root)?;
  let merged = merge_files(&files, meta)?;
  info!(
    target: "quizbank",
    packages = merged.packages.len(),
    mcqs = merged.mcqs.len(),
    essays = merged.essay.len(),
    "Merged packages"
  );
  Ok(merged)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use tempfile::TempDir;

  fn write(dir: &Path, rel: &str, value: &Value) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
  }

  #[test]
  fn repeated_mcq_ids_are_kept() {
    let m1 = json!({ "id": "m1", "question": "?", "options": { "A": "a" }, "correct_option": "A" });
    let p1 = json!({ "package_id": "package_1", "mcqs": [m1.clone()] });
    let p2 = json!({ "package_id": "package_2", "mcqs": [m1.clone()] });
    let merged = merge_values(vec![p1, p2], MergeMeta::default());
    assert_eq!(merged.mcqs, vec![m1.clone(), m1]);
    assert_eq!(merged.packages, vec!["package_1", "package_2"]);
  }

  #[test]
  fn essay_object_and_list_are_both_flattened() {
    let e1 = json!({ "id": "e1", "prompt": "one" });
    let e2 = json!({ "id": "e2", "prompt": "two" });
    let e3 = json!({ "id": "e3", "prompt": "three" });
    let merged = merge_values(
      vec![
        json!({ "package_id": "a", "essay": e1.clone() }),
        json!({ "package_id": "b", "essay": [e2.clone(), e3.clone()] }),
        json!({ "package_id": "c", "essay": "not an essay" }),
      ],
      MergeMeta::default(),
    );
    assert_eq!(merged.essay, vec![e1, e2, e3]);
  }

  #[test]
  fn missing_id_and_non_list_mcqs() {
    let merged = merge_values(vec![json!({ "mcqs": { "id": "odd" } })], MergeMeta::default());
    assert_eq!(merged.packages, vec!["unknown"]);
    assert!(merged.mcqs.is_empty());
    assert!(merged.essay.is_empty());
  }

  #[test]
  fn numeric_package_ids_are_kept() {
    let merged = merge_values(
      vec![json!({ "package_id": 7 }), json!({ "package_id": null }), json!({ "package_id": true })],
      MergeMeta::default(),
    );
    assert_eq!(merged.packages, vec!["7", "unknown", "true"]);
  }

  #[test]
  fn metadata_comes_from_caller() {
    let meta = MergeMeta {
      merged_source: "Machine Vision Exams".into(),
      level: "graduate".into(),
      notes: "n".into(),
    };
    let merged = merge_values(vec![json!({ "package_id": "p", "level": "introductory" })], meta.clone());
    assert_eq!(merged.merged_source, meta.merged_source);
    assert_eq!(merged.level, "graduate");
    assert_eq!(merged.notes, "n");
  }

  #[test]
  fn directory_walk_is_recursive_and_sorted() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package_2/package.json", &json!({ "package_id": "package_2", "mcqs": [{ "id": "b" }] }));
    write(dir.path(), "package_1/package.json", &json!({ "package_id": "package_1", "mcqs": [{ "id": "a" }] }));
    write(dir.path(), "extra/deep/more.json", &json!({ "package_id": "deep" }));
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let merged = merge_directory(dir.path(), MergeMeta::default()).unwrap();
    assert_eq!(merged.packages, vec!["deep", "package_1", "package_2"]);
    assert_eq!(merged.mcqs, vec![json!({ "id": "a" }), json!({ "id": "b" })]);
  }

  #[test]
  fn invalid_json_file_fails_the_merge() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ nope").unwrap();
    assert!(matches!(merge_directory(dir.path(), MergeMeta::default()), Err(AppError::BadRequest(_))));
  }

  #[test]
  fn missing_directory_is_not_found() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(merge_directory(&missing, MergeMeta::default()), Err(AppError::NotFound(_))));
  }
}
