//! Core behaviors behind the HTTP handlers: taking a test, building a review report, merging a
//! subject, and generating + saving a package. Handlers stay thin wrappers over these.

use tracing::{info, instrument};

use crate::domain::{QuestionPackage, SubmissionRecord};
use crate::error::{AppError, Result};
use crate::generation::{generate_package, GenerateRequest, Origin};
use crate::grading::{grade_all_essays, grade_mcq};
use crate::merge::{merge_directory, MergeMeta};
use crate::domain::MergedPackage;
use crate::protocol::{MergeIn, SubmitIn};
use crate::recorder::{package_token, RawAnswers};
use crate::report::{build_report, comparison_csv, Report, SubmissionIndex};
use crate::state::AppState;

/// Grades a submission against the stored package and records it under the directory id the
/// caller chose, which may differ from the id written inside the file.
#[instrument(level = "info", skip(state, input), fields(%subject, %package_id, mcq_answers = input.answers.len(), essay_answers = input.essay_answers.len()))]
pub fn submit_answers(
  state: &AppState,
  subject: &str,
  package_id: &str,
  input: SubmitIn,
) -> Result<(String, SubmissionRecord)> {
  let pkg = state.packages.load(subject, package_id)?;
  let mcq = grade_mcq(&pkg.mcqs, &input.answers);
  let essay = grade_all_essays(&pkg.essay, &input.essay_answers);
  let answers = RawAnswers { mcq: input.answers, essay: input.essay_answers };
  state.recorder.record_submission(subject, package_id, mcq, &essay, &answers)
}

/// Loads a stored submission and the package it refers to, and rebuilds the comparison tables.
#[instrument(level = "info", skip(state), fields(%name))]
pub fn submission_report(state: &AppState, name: &str) -> Result<Report> {
  let record = state.recorder.load(name)?;
  let pkg = state.packages.load(&record.subject, &record.package_id).map_err(|e| match e {
    AppError::NotFound(path) => AppError::NotFound(format!("question package for submission {name} ({path})")),
    other => other,
  })?;
  Ok(build_report(&pkg, &record))
}

pub fn submission_csv(state: &AppState, name: &str) -> Result<String> {
  let report = submission_report(state, name)?;
  Ok(comparison_csv(&report.mcq_rows, &report.essay_rows))
}

pub fn submission_index(state: &AppState) -> Result<SubmissionIndex> {
  Ok(SubmissionIndex::new(state.recorder.list()?))
}

pub fn merge_subject(state: &AppState, subject: &str, overrides: MergeIn) -> Result<MergedPackage> {
  let defaults = &state.config.merge;
  let meta = MergeMeta {
    merged_source: overrides.merged_source.unwrap_or_else(|| defaults.merged_source.clone()),
    level: overrides.level.unwrap_or_else(|| defaults.level.clone()),
    notes: overrides.notes.unwrap_or_else(|| defaults.notes.clone()),
  };
  merge_directory(&state.packages.subject_dir(subject), meta)
}

/// Normalizes and saves an uploaded package under `subject`. The id in the path must match.
pub fn save_uploaded(state: &AppState, subject: &str, package_id: &str, raw: serde_json::Value) -> Result<String> {
  let pkg = crate::schema::normalize_package(raw)?;
  if pkg.package_id != package_id {
    return Err(AppError::BadRequest(format!(
      "package_id `{}` does not match path `{package_id}`",
      pkg.package_id
    )));
  }
  Ok(state.packages.save(subject, &pkg)?.display().to_string())
}

/// Generates a package and saves it. A failed generation saves nothing.
pub async fn generate_and_save(state: &AppState, req: GenerateRequest) -> Result<(QuestionPackage, Origin, String)> {
  let (pkg, origin) = generate_package(
    &state.config,
    state.openai.as_ref(),
    state.extractor.clone(),
    &state.system_prompt,
    &req,
  )
  .await?;
  let path = state.packages.save(&req.subject, &pkg)?;
  info!(target: "quizbank", subject = %req.subject, package_id = %pkg.package_id, origin = origin.as_str(), "Generated package saved");
  Ok((pkg, origin, path.display().to_string()))
}

/// Submission files that belong to a stored package id (`package_7` or `7`).
pub fn submissions_for(index: &SubmissionIndex, subject: &str, package: &str) -> Vec<String> {
  index.submissions(subject, package_token(package))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::pdf::{PdfError, TextExtractor};
  use serde_json::json;
  use std::sync::Arc;
  use tempfile::TempDir;

  struct NoPdf;

  impl TextExtractor for NoPdf {
    fn extract_text_from_bytes(&self, _bytes: &[u8]) -> std::result::Result<String, PdfError> {
      Ok(String::new())
    }
  }

  fn state(dir: &TempDir) -> AppState {
    let mut cfg = AppConfig::default();
    cfg.paths.database_dir = dir.path().join("database");
    cfg.paths.results_dir = dir.path().join("results").join("user_submissions");
    AppState::with_parts(cfg, None, Arc::new(NoPdf), String::new())
  }

  fn scenario_package() -> serde_json::Value {
    json!({
      "package_id": "package_1",
      "source": "risk.pdf",
      "level": "undergraduate",
      "mcqs": [{ "id": "q1", "question": "Pick", "options": { "A": "x", "B": "y" }, "correct_option": "A" }],
      "essay": [{ "id": "e1", "prompt": "Discuss.", "rubric": {
        "total_points": 100, "criteria": [{ "keyword": "risk", "weight": 100 }]
      }}]
    })
  }

  #[test]
  fn submit_then_review_end_to_end() {
    let dir = TempDir::new().unwrap();
    let st = state(&dir);
    save_uploaded(&st, "finance", "package_1", scenario_package()).unwrap();

    let input = SubmitIn {
      answers: [("q1".to_string(), "A".to_string())].into(),
      essay_answers: [("e1".to_string(), "this discusses risk".to_string())].into(),
    };
    let (name, record) = submit_answers(&st, "finance", "package_1", input).unwrap();
    assert_eq!((record.mcq_score, record.mcq_total), (1, 1));
    assert_eq!((record.essay_score, record.essay_total), (100.0, 100.0));
    assert_eq!(record.final_score, 100.0);
    assert_eq!(record.matched_keywords, vec!["risk"]);

    let index = submission_index(&st).unwrap();
    assert_eq!(index.subjects(), vec!["finance"]);
    assert_eq!(index.package_ids("finance"), vec!["1"]);
    assert_eq!(submissions_for(&index, "finance", "package_1"), vec![name.clone()]);

    let report = submission_report(&st, &name).unwrap();
    assert_eq!(report.summary.final_score, "100.0/100");
    assert!(report.mcq_rows[0].is_correct);
    assert_eq!(report.essay_rows[0].matched_keywords, vec!["risk"]);

    let csv = submission_csv(&st, &name).unwrap();
    assert_eq!(csv.lines().count(), 3);
  }

  #[test]
  fn submission_keeps_directory_id_when_file_id_differs() {
    let dir = TempDir::new().unwrap();
    let st = state(&dir);
    let mut exported = scenario_package();
    exported["package_id"] = json!("pkg_exposure_01");
    let path = st.packages.package_path("physics", "package_1");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, exported.to_string()).unwrap();

    let input = SubmitIn { answers: [("q1".to_string(), "A".to_string())].into(), ..Default::default() };
    let (name, record) = submit_answers(&st, "physics", "package_1", input).unwrap();
    assert_eq!(record.package_id, "package_1");
    assert!(name.starts_with("physics_package_1_"));

    let report = submission_report(&st, &name).unwrap();
    assert_eq!(report.summary.package_id, "package_1");
    assert!(report.mcq_rows[0].is_correct);
  }

  #[test]
  fn report_for_deleted_package_is_not_found() {
    let dir = TempDir::new().unwrap();
    let st = state(&dir);
    let path = save_uploaded(&st, "finance", "package_1", scenario_package()).unwrap();
    let (name, _) = submit_answers(&st, "finance", "package_1", SubmitIn::default()).unwrap();
    std::fs::remove_file(path).unwrap();
    assert!(matches!(submission_report(&st, &name), Err(AppError::NotFound(_))));
  }

  #[test]
  fn uploaded_package_must_match_path_id() {
    let dir = TempDir::new().unwrap();
    let st = state(&dir);
    assert!(matches!(
      save_uploaded(&st, "finance", "package_2", scenario_package()),
      Err(AppError::BadRequest(_))
    ));
    assert!(st.packages.list_packages("finance").unwrap().is_empty());
  }

  #[test]
  fn merge_uses_config_defaults_for_missing_overrides() {
    let dir = TempDir::new().unwrap();
    let st = state(&dir);
    save_uploaded(&st, "finance", "package_1", scenario_package()).unwrap();
    let merged = merge_subject(&st, "finance", MergeIn { notes: Some("custom".into()), ..Default::default() }).unwrap();
    assert_eq!(merged.notes, "custom");
    assert_eq!(merged.level, st.config.merge.level);
    assert_eq!(merged.packages, vec!["package_1"]);
    assert_eq!(merged.essay.len(), 1);
  }

  #[tokio::test]
  async fn placeholder_generation_is_saved_and_listed() {
    let dir = TempDir::new().unwrap();
    let st = state(&dir);
    let req = GenerateRequest {
      subject: "optics".into(),
      package_id: "package_4".into(),
      level: crate::domain::Level::Introductory,
      source: "lenses.pdf".into(),
      pdf: vec![],
    };
    let (pkg, origin, _) = generate_and_save(&st, req).await.unwrap();
    assert_eq!(origin, Origin::Placeholder);
    assert_eq!(st.packages.list_packages("optics").unwrap(), vec!["package_4"]);
    assert_eq!(st.packages.load("optics", "package_4").unwrap(), pkg);
  }
}
