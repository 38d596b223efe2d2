//! Result recorder: one new JSON file per submission under the results directory.
//!
//! File names look like `{subject}_package_{token}_{YYYYMMDD_HHMMSS}.json`, where `token` is the
//! package id without its `package_` prefix. Two submissions for the same subject and package
//! within one second share a name; the later write wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat};
use tracing::{info, instrument};

use crate::domain::SubmissionRecord;
use crate::error::{AppError, Result};
use crate::grading::{final_score, EssayTotals, McqGrade};

/// Raw answers as submitted: MCQ id -> label, essay id -> free text.
#[derive(Clone, Debug, Default)]
pub struct RawAnswers {
  pub mcq: BTreeMap<String, String>,
  pub essay: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct ResultRecorder {
  dir: PathBuf,
}

impl ResultRecorder {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Builds and persists the record; returns the file name it was written under.
  pub fn record_submission(
    &self,
    subject: &str,
    package_id: &str,
    mcq: McqGrade,
    essay: &EssayTotals,
    answers: &RawAnswers,
  ) -> Result<(String, SubmissionRecord)> {
    self.record_submission_at(Local::now(), subject, package_id, mcq, essay, answers)
  }

  #[instrument(level = "info", skip(self, mcq, essay, answers), fields(%subject, %package_id))]
  pub fn record_submission_at(
    &self,
    now: DateTime<Local>,
    subject: &str,
    package_id: &str,
    mcq: McqGrade,
    essay: &EssayTotals,
    answers: &RawAnswers,
  ) -> Result<(String, SubmissionRecord)> {
    let essay_score = essay.score as f64;
    let essay_total = essay.possible as f64;
    let record = SubmissionRecord {
      timestamp: now.to_rfc3339_opts(SecondsFormat::Micros, false),
      subject: subject.to_string(),
      package_id: package_id.to_string(),
      mcq_score: mcq.correct,
      mcq_total: mcq.total,
      essay_score,
      essay_total,
      final_score: final_score(mcq, essay_score, essay_total),
      matched_keywords: essay.matched.clone(),
      user_answers: answers.mcq.clone(),
      user_essay_answers: answers.essay.clone(),
    };

    std::fs::create_dir_all(&self.dir)?;
    let name = submission_file_name(subject, package_id, &now);
    std::fs::write(self.dir.join(&name), serde_json::to_string_pretty(&record)?)?;
    info!(
      target: "quizbank",
      file = %name,
      mcq = %format!("{}/{}", record.mcq_score, record.mcq_total),
      essay = %format!("{}/{}", record.essay_score, record.essay_total),
      final_score = %format!("{:.1}", record.final_score),
      "Recorded submission"
    );
    Ok((name, record))
  }

  /// All `*.json` submission file names, sorted.
  pub fn list(&self) -> Result<Vec<String>> {
    if !self.dir.is_dir() {
      return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&self.dir)? {
      let name = entry?.file_name().to_string_lossy().into_owned();
      if name.ends_with(".json") {
        names.push(name);
      }
    }
    names.sort();
    Ok(names)
  }

  pub fn load(&self, name: &str) -> Result<SubmissionRecord> {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
      return Err(AppError::BadRequest(format!("invalid submission name: {name}")));
    }
    let path = self.dir.join(name);
    let text = match std::fs::read_to_string(&path) {
      Ok(t) => t,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(AppError::NotFound(path.display().to_string()))
      }
      Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&text)?)
  }
}

pub fn package_token(package_id: &str) -> &str {
  package_id.strip_prefix("package_").unwrap_or(package_id)
}

pub fn submission_file_name(subject: &str, package_id: &str, at: &DateTime<Local>) -> String {
  format!("{subject}_package_{}_{}.json", package_token(package_id), at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use tempfile::TempDir;

  fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 6, 15, h, m, s).single().unwrap()
  }

  fn answers() -> RawAnswers {
    RawAnswers {
      mcq: [("q1".to_string(), "A".to_string())].into(),
      essay: [("e1".to_string(), "this discusses risk".to_string())].into(),
    }
  }

  #[test]
  fn file_name_encodes_subject_package_and_second() {
    assert_eq!(
      submission_file_name("data_mining", "package_7", &at(14, 5, 9)),
      "data_mining_package_7_20250615_140509.json"
    );
    assert_eq!(
      submission_file_name("physics", "pkg_exposure_01", &at(0, 0, 0)),
      "physics_package_pkg_exposure_01_20250615_000000.json"
    );
  }

  #[test]
  fn records_full_submission() {
    let dir = TempDir::new().unwrap();
    let recorder = ResultRecorder::new(dir.path().join("results"));
    let essay = EssayTotals { score: 100, possible: 100, matched: vec!["risk".into()] };
    let (name, record) = recorder
      .record_submission_at(at(9, 0, 0), "physics", "package_1", McqGrade { correct: 1, total: 1 }, &essay, &answers())
      .unwrap();

    assert_eq!(name, "physics_package_1_20250615_090000.json");
    assert_eq!(record.final_score, 100.0);
    assert_eq!(record.package_id, "package_1");
    assert_eq!(recorder.load(&name).unwrap(), record);
    assert_eq!(recorder.list().unwrap(), vec![name]);
  }

  #[test]
  fn essay_only_submission_does_not_divide_by_zero() {
    let dir = TempDir::new().unwrap();
    let recorder = ResultRecorder::new(dir.path());
    let essay = EssayTotals { score: 80, possible: 100, matched: vec![] };
    let (_, record) = recorder
      .record_submission_at(at(9, 0, 1), "physics", "package_2", McqGrade { correct: 0, total: 0 }, &essay, &RawAnswers::default())
      .unwrap();
    assert_eq!(record.final_score, 80.0);
  }

  #[test]
  fn same_second_overwrites() {
    let dir = TempDir::new().unwrap();
    let recorder = ResultRecorder::new(dir.path());
    let essay = EssayTotals::default();
    recorder.record_submission_at(at(9, 0, 0), "s", "package_1", McqGrade { correct: 0, total: 1 }, &essay, &answers()).unwrap();
    recorder.record_submission_at(at(9, 0, 0), "s", "package_1", McqGrade { correct: 1, total: 1 }, &essay, &answers()).unwrap();
    let names = recorder.list().unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(recorder.load(&names[0]).unwrap().mcq_score, 1);
  }

  #[test]
  fn load_rejects_missing_and_traversal() {
    let dir = TempDir::new().unwrap();
    let recorder = ResultRecorder::new(dir.path());
    assert!(matches!(recorder.load("nope.json"), Err(AppError::NotFound(_))));
    assert!(matches!(recorder.load("../secret.json"), Err(AppError::BadRequest(_))));
  }
}
