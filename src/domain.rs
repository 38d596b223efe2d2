//! Domain models: question packages, MCQs, essay items with rubrics, and submission records.
//!
//! These are the *normalized* shapes. Raw JSON from disk or from the model goes through
//! `schema::normalize_package` first, which fixes up the legacy `essay` encodings and fills
//! the documented defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Target audience of a package.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Level {
  Introductory,
  Undergraduate,
  AdvancedUndergraduate,
  Graduate,
  Intermediate,
}

impl Level {
  pub fn as_str(&self) -> &'static str {
    match self {
      Level::Introductory => "introductory",
      Level::Undergraduate => "undergraduate",
      Level::AdvancedUndergraduate => "advanced_undergraduate",
      Level::Graduate => "graduate",
      Level::Intermediate => "intermediate",
    }
  }
}

impl std::fmt::Display for Level {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl std::str::FromStr for Difficulty {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Ok(Difficulty::Easy),
      "medium" => Ok(Difficulty::Medium),
      "hard" => Ok(Difficulty::Hard),
      other => Err(format!("unknown difficulty `{other}`")),
    }
  }
}

/// Difficulty is informational: labels are matched case-insensitively and anything
/// unrecognized is dropped instead of rejecting the package.
fn lenient_difficulty<'de, D>(deserializer: D) -> Result<Option<Difficulty>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(raw.as_ref().and_then(serde_json::Value::as_str).and_then(|s| s.parse().ok()))
}

/// Option labels in display order. `serde_json` is built with `preserve_order`,
/// so the map keeps the order the producer wrote them in.
pub type Options = Map<String, serde_json::Value>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Mcq {
  pub id: String,
  pub question: String,
  pub options: Options,
  /// May be missing or name a label not in `options`; such a question is never graded correct.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correct_option: Option<String>,
  #[serde(default, deserialize_with = "lenient_difficulty", skip_serializing_if = "Option::is_none")]
  pub difficulty: Option<Difficulty>,
  #[serde(default)]
  pub learning_objective: String,
  #[serde(default)]
  pub slide_refs: Vec<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
  pub keyword: String,
  pub weight: u32,
  #[serde(default)]
  pub description: String,
}

/// Keyword-weighted scoring scheme. Criteria weights need not add up to `total_points`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Rubric {
  pub total_points: u32,
  pub criteria: Vec<Criterion>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub grading_notes: Option<String>,
}

impl Default for Rubric {
  /// Substituted for essay items that carry no rubric: nothing can match, out of 100.
  fn default() -> Self {
    Self { total_points: 100, criteria: Vec::new(), grading_notes: None }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EssayItem {
  pub id: String,
  pub prompt: String,
  #[serde(default)]
  pub expected_keywords: Vec<String>,
  #[serde(default)]
  pub rubric: Rubric,
}

impl EssayItem {
  pub fn rubric_keywords(&self) -> Vec<String> {
    self.rubric.criteria.iter().map(|c| c.keyword.clone()).collect()
  }
}

/// One self-contained set of MCQ + essay questions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestionPackage {
  pub package_id: String,
  pub source: String,
  pub level: Level,
  #[serde(default)]
  pub mcqs: Vec<Mcq>,
  /// Always a list once normalized.
  #[serde(default)]
  pub essay: Vec<EssayItem>,
}

/// Aggregate produced by the merge engine. Question entries are carried through as raw JSON.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MergedPackage {
  pub merged_source: String,
  pub level: String,
  pub packages: Vec<String>,
  pub mcqs: Vec<serde_json::Value>,
  pub essay: Vec<serde_json::Value>,
  pub notes: String,
}

/// One recorded test attempt. Written once, never updated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SubmissionRecord {
  pub timestamp: String,
  pub subject: String,
  pub package_id: String,
  pub mcq_score: u32,
  pub mcq_total: u32,
  pub essay_score: f64,
  pub essay_total: f64,
  pub final_score: f64,
  #[serde(default)]
  pub matched_keywords: Vec<String>,
  #[serde(default)]
  pub user_answers: BTreeMap<String, String>,
  #[serde(default)]
  pub user_essay_answers: BTreeMap<String, String>,
}
