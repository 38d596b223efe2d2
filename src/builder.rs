//! Question builder: a per-session accumulator that turns pasted MCQ text into package entries.
//!
//! A `PackageBuilder` is owned by one editing session (see `state::BuilderSessions`) and
//! discarded with it; nothing here is global.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Difficulty, Level, Mcq, Options, QuestionPackage};

const OPTION_LABELS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Splits pasted text into a question (first non-blank line) and up to five labelled options.
/// Returns `None` when there are fewer than two option lines.
pub fn parse_mcq_block(text: &str) -> Option<(String, Options)> {
  let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
  if lines.len() < 3 {
    return None;
  }
  let question = lines[0].to_string();
  let options = OPTION_LABELS
    .iter()
    .zip(&lines[1..])
    .map(|(label, line)| (label.to_string(), serde_json::Value::String(line.trim_end_matches('.').to_string())))
    .collect();
  Some((question, options))
}

/// "12, 13, x, 4" -> [12, 13, 4]. Tokens that are not plain digits are skipped.
pub fn parse_slide_refs(text: &str) -> Vec<u32> {
  text
    .split(',')
    .map(str::trim)
    .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
    .filter_map(|t| t.parse().ok())
    .collect()
}

/// What the author fills in for one question.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionDraft {
  pub raw_text: String,
  pub correct_option: String,
  pub difficulty: Difficulty,
  #[serde(default)]
  pub learning_objective: String,
  #[serde(default)]
  pub slide_refs: String,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DraftError {
  #[error("could not parse question; expected a question line followed by at least two options")]
  Unparseable,
  #[error("correct option `{0}` is not one of the parsed labels")]
  UnknownOption(String),
}

#[derive(Clone, Debug, Serialize)]
pub struct PackageBuilder {
  pub package_id: String,
  pub source: String,
  pub level: Level,
  pub questions: Vec<Mcq>,
}

impl PackageBuilder {
  pub fn new(package_id: impl Into<String>, source: impl Into<String>, level: Level) -> Self {
    Self { package_id: package_id.into(), source: source.into(), level, questions: Vec::new() }
  }

  /// Parses the draft and appends it; returns the new question's id.
  pub fn add_question(&mut self, draft: QuestionDraft) -> Result<String, DraftError> {
    let (question, options) = parse_mcq_block(&draft.raw_text).ok_or(DraftError::Unparseable)?;
    // The picker only ever offers parsed labels.
    if !options.contains_key(&draft.correct_option) {
      return Err(DraftError::UnknownOption(draft.correct_option));
    }
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
    let id = format!("{}_mcq_{}", self.package_id, suffix);
    self.questions.push(Mcq {
      id: id.clone(),
      question,
      options,
      correct_option: Some(draft.correct_option),
      difficulty: Some(draft.difficulty),
      learning_objective: draft.learning_objective,
      slide_refs: parse_slide_refs(&draft.slide_refs),
    });
    Ok(id)
  }

  /// Package holding the accumulated questions; no essay section.
  pub fn export(&self) -> QuestionPackage {
    QuestionPackage {
      package_id: self.package_id.clone(),
      source: self.source.clone(),
      level: self.level,
      mcqs: self.questions.clone(),
      essay: Vec::new(),
    }
  }
}
