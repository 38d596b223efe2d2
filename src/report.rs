//! Review layer: rebuilds MCQ and essay comparison tables from a package and a stored
//! submission, indexes submissions by subject/package from their file names, and exports CSV.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::{QuestionPackage, SubmissionRecord};
use crate::grading::{is_correct, matched_keywords};

const MISSING_ANSWER: &str = "-";
const RESPONSE_PREVIEW_CHARS: usize = 300;
const PACKAGE_MARKER: &str = "package";

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct McqRow {
  pub question_id: String,
  pub question_text: String,
  pub user_answer: String,
  pub correct_answer: String,
  pub is_correct: bool,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct EssayRow {
  pub essay_id: String,
  pub prompt: String,
  pub expected_keywords: Vec<String>,
  pub user_response_truncated: String,
  pub matched_keywords: Vec<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Summary {
  pub subject: String,
  pub package_id: String,
  pub mcq_score: String,
  pub final_score: String,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Report {
  pub summary: Summary,
  pub mcq_rows: Vec<McqRow>,
  pub essay_rows: Vec<EssayRow>,
}

pub fn build_report(pkg: &QuestionPackage, record: &SubmissionRecord) -> Report {
  Report {
    summary: Summary {
      subject: record.subject.clone(),
      package_id: record.package_id.clone(),
      mcq_score: format!("{}/{}", record.mcq_score, record.mcq_total),
      final_score: format!("{:.1}/100", record.final_score),
    },
    mcq_rows: build_mcq_comparison(pkg, record),
    essay_rows: build_essay_comparison(pkg, record),
  }
}

/// One row per MCQ, in package order.
pub fn build_mcq_comparison(pkg: &QuestionPackage, record: &SubmissionRecord) -> Vec<McqRow> {
  pkg
    .mcqs
    .iter()
    .map(|q| {
      let given = record.user_answers.get(&q.id).map(String::as_str);
      McqRow {
        question_id: q.id.clone(),
        question_text: q.question.clone(),
        user_answer: given.unwrap_or(MISSING_ANSWER).to_string(),
        correct_answer: q.correct_option.clone().unwrap_or_else(|| MISSING_ANSWER.to_string()),
        is_correct: is_correct(q, given),
      }
    })
    .collect()
}

/// One row per essay item. Matches are recomputed from the stored response, since the record
/// only keeps a flattened keyword list.
pub fn build_essay_comparison(pkg: &QuestionPackage, record: &SubmissionRecord) -> Vec<EssayRow> {
  pkg
    .essay
    .iter()
    .map(|e| {
      let response = record.user_essay_answers.get(&e.id).map(String::as_str).unwrap_or("");
      EssayRow {
        essay_id: e.id.clone(),
        prompt: e.prompt.clone(),
        expected_keywords: e.rubric_keywords(),
        user_response_truncated: truncate_response(response),
        matched_keywords: matched_keywords(e, response),
      }
    })
    .collect()
}

/// First 300 characters, with "..." appended when anything was cut.
pub fn truncate_response(text: &str) -> String {
  let mut chars = text.chars();
  let head: String = chars.by_ref().take(RESPONSE_PREVIEW_CHARS).collect();
  if chars.next().is_some() {
    format!("{head}...")
  } else {
    head
  }
}

// ---- submission index ----

/// Subject part of a submission file name: everything before the first `_package_`.
/// Names without the marker yield the whole name.
pub fn subject_of(file_name: &str) -> &str {
  file_name.split("_package_").next().unwrap_or(file_name)
}

/// Package token: the underscore-separated token following the first literal `package` token.
pub fn package_token_of(file_name: &str) -> Option<&str> {
  let stem = file_name.strip_suffix(".json").unwrap_or(file_name);
  let mut parts = stem.split('_');
  parts.by_ref().find(|p| *p == PACKAGE_MARKER)?;
  parts.next().filter(|t| !t.is_empty())
}

/// Facets over a list of submission file names.
#[derive(Clone, Debug)]
pub struct SubmissionIndex {
  files: Vec<String>,
}

impl SubmissionIndex {
  pub fn new(mut files: Vec<String>) -> Self {
    files.sort();
    Self { files }
  }

  pub fn subjects(&self) -> Vec<String> {
    let set: BTreeSet<&str> = self.files.iter().map(|f| subject_of(f)).collect();
    set.into_iter().map(String::from).collect()
  }

  fn for_subject<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a String> + 'a {
    self.files.iter().filter(move |f| subject_of(f) == subject)
  }

  /// Distinct package tokens for a subject, sorted. Names without the marker are skipped.
  pub fn package_ids(&self, subject: &str) -> Vec<String> {
    let set: BTreeSet<&str> = self.for_subject(subject).filter_map(|f| package_token_of(f)).collect();
    set.into_iter().map(String::from).collect()
  }

  pub fn submissions(&self, subject: &str, token: &str) -> Vec<String> {
    self
      .for_subject(subject)
      .filter(|f| package_token_of(f) == Some(token))
      .cloned()
      .collect()
  }
}

// ---- CSV export ----

const CSV_HEADER: [&str; 10] = [
  "Question ID",
  "Question",
  "User Answer",
  "Correct Answer",
  "Result",
  "Essay ID",
  "Prompt",
  "Expected Keywords",
  "User Response (short)",
  "Matched Keywords",
];

/// MCQ rows first, then essay rows; each row leaves the other group's columns empty.
pub fn comparison_csv(mcq_rows: &[McqRow], essay_rows: &[EssayRow]) -> String {
  let mut out = String::new();
  push_line(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));

  for r in mcq_rows {
    let result = if r.is_correct { "Correct" } else { "Incorrect" };
    let cells = [&r.question_id, &r.question_text, &r.user_answer, &r.correct_answer]
      .into_iter()
      .cloned()
      .chain([result.to_string()])
      .chain(std::iter::repeat(String::new()).take(5));
    push_line(&mut out, cells);
  }

  for r in essay_rows {
    let matched = if r.matched_keywords.is_empty() { "None".to_string() } else { r.matched_keywords.join(", ") };
    let cells = std::iter::repeat(String::new()).take(5).chain([
      r.essay_id.clone(),
      r.prompt.clone(),
      r.expected_keywords.join(", "),
      r.user_response_truncated.clone(),
      matched,
    ]);
    push_line(&mut out, cells);
  }
  out
}

fn push_line(out: &mut String, cells: impl Iterator<Item = String>) {
  let line: Vec<String> = cells.map(|c| csv_escape(&c)).collect();
  out.push_str(&line.join(","));
  out.push('\n');
}

fn csv_escape(s: &str) -> String {
  if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
    format!("\"{}\"", s.replace('"', "\"\""))
  } else {
    s.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::normalize_package;
  use serde_json::{json, Value};
  use std::collections::BTreeMap;

  fn package(essay: Value) -> QuestionPackage {
    normalize_package(json!({
      "package_id": "package_1",
      "source": "risk.pdf",
      "level": "graduate",
      "mcqs": [
        { "id": "q1", "question": "First?", "options": { "A": "x", "B": "y" }, "correct_option": "A" },
        { "id": "q2", "question": "Second?", "options": { "A": "x", "B": "y" } }
      ],
      "essay": essay
    }))
    .unwrap()
  }

  fn essay_item() -> Value {
    json!({
      "id": "e1",
      "prompt": "Discuss risk.",
      "rubric": { "total_points": 100, "criteria": [
        { "keyword": "Risk", "weight": 60 },
        { "keyword": "ethics", "weight": 40 }
      ]}
    })
  }

  fn record(essay_text: &str) -> SubmissionRecord {
    SubmissionRecord {
      timestamp: "2025-06-15T09:00:00.000000+00:00".into(),
      subject: "finance".into(),
      package_id: "package_1".into(),
      mcq_score: 1,
      mcq_total: 2,
      essay_score: 60.0,
      essay_total: 100.0,
      final_score: 55.0,
      matched_keywords: vec!["Risk".into()],
      user_answers: BTreeMap::from([("q1".to_string(), "A".to_string())]),
      user_essay_answers: BTreeMap::from([("e1".to_string(), essay_text.to_string())]),
    }
  }

  #[test]
  fn mcq_rows_follow_package_order_with_sentinels() {
    let rows = build_mcq_comparison(&package(json!([])), &record(""));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].user_answer, "A");
    assert!(rows[0].is_correct);
    assert_eq!(rows[1].user_answer, "-");
    assert_eq!(rows[1].correct_answer, "-");
    assert!(!rows[1].is_correct);
  }

  #[test]
  fn essay_rows_recompute_matches() {
    let rows = build_essay_comparison(&package(essay_item()), &record("the RISK is real"));
    assert_eq!(rows[0].expected_keywords, vec!["Risk", "ethics"]);
    assert_eq!(rows[0].matched_keywords, vec!["Risk"]);
    assert_eq!(rows[0].user_response_truncated, "the RISK is real");
  }

  #[test]
  fn essay_object_and_list_report_identically() {
    let rec = record("risk and ethics");
    assert_eq!(
      build_report(&package(essay_item()), &rec),
      build_report(&package(json!([essay_item()])), &rec)
    );
  }

  #[test]
  fn truncation_counts_characters() {
    let exact = "é".repeat(300);
    assert_eq!(truncate_response(&exact), exact);
    let long = "é".repeat(301);
    let cut = truncate_response(&long);
    assert!(cut.ends_with("..."));
    assert_eq!(cut.chars().count(), 303);
  }

  #[test]
  fn file_name_parsing() {
    let name = "data_mining_ethics_package_11_20250615_090000.json";
    assert_eq!(subject_of(name), "data_mining_ethics");
    assert_eq!(package_token_of(name), Some("11"));
    assert_eq!(package_token_of("physics_20250615_090000.json"), None);
    assert_eq!(subject_of("physics_20250615_090000.json"), "physics_20250615_090000.json");
  }

  #[test]
  fn index_facets() {
    let index = SubmissionIndex::new(vec![
      "physics_package_2_20250615_090000.json".into(),
      "physics_package_10_20250615_090000.json".into(),
      "physics_package_2_20250616_090000.json".into(),
      "physics_advanced_package_1_20250615_090000.json".into(),
      "stray.json".into(),
    ]);
    assert_eq!(index.subjects(), vec!["physics", "physics_advanced", "stray.json"]);
    assert_eq!(index.package_ids("physics"), vec!["10", "2"]);
    assert!(index.package_ids("stray.json").is_empty());
    assert_eq!(
      index.submissions("physics", "2"),
      vec!["physics_package_2_20250615_090000.json", "physics_package_2_20250616_090000.json"]
    );
  }

  #[test]
  fn csv_places_groups_in_their_columns() {
    let pkg = package(essay_item());
    let rec = record("no keywords, here");
    let csv = comparison_csv(&build_mcq_comparison(&pkg, &rec), &build_essay_comparison(&pkg, &rec));
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("Question ID,Question,"));
    assert_eq!(lines[1], "q1,First?,A,A,Correct,,,,,");
    assert_eq!(lines[2], "q2,Second?,-,-,Incorrect,,,,,");
    assert_eq!(lines[3], ",,,,,e1,Discuss risk.,\"Risk, ethics\",\"no keywords, here\",None");
  }
}
