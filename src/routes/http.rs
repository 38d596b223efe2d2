//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{Multipart, Path, State},
  http::{header, StatusCode},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::builder::{parse_mcq_block, PackageBuilder};
use crate::domain::{Level, MergedPackage, QuestionPackage};
use crate::error::{AppError, Result};
use crate::generation::GenerateRequest;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

/// Subjects, package ids and submission names become path components on disk.
fn segment(value: &str) -> Result<&str> {
  if value.is_empty() || value.contains(['/', '\\']) || value.contains("..") {
    return Err(AppError::BadRequest(format!("invalid name: {value:?}")));
  }
  Ok(value)
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, openai: state.openai.is_some() })
}

// ---- question bank ----

#[instrument(level = "info", skip(state))]
pub async fn http_list_subjects(State(state): State<Arc<AppState>>) -> Result<Json<NamesOut>> {
  Ok(Json(NamesOut { items: state.packages.list_subjects()? }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_packages(
  State(state): State<Arc<AppState>>,
  Path(subject): Path<String>,
) -> Result<Json<NamesOut>> {
  Ok(Json(NamesOut { items: state.packages.list_packages(segment(&subject)?)? }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_quiz(
  State(state): State<Arc<AppState>>,
  Path((subject, package_id)): Path<(String, String)>,
) -> Result<Json<QuizOut>> {
  let pkg = state.packages.load(segment(&subject)?, segment(&package_id)?)?;
  info!(target: "quizbank", %subject, %package_id, mcqs = pkg.mcqs.len(), essays = pkg.essay.len(), "Quiz served");
  Ok(Json(to_quiz(&pkg)))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_put_package(
  State(state): State<Arc<AppState>>,
  Path((subject, package_id)): Path<(String, String)>,
  Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
  let path = save_uploaded(&state, segment(&subject)?, segment(&package_id)?, body)?;
  info!(target: "quizbank", %subject, %package_id, %path, "Package saved");
  Ok((StatusCode::CREATED, Json(SavedOut { path })))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  Path((subject, package_id)): Path<(String, String)>,
  Json(body): Json<SubmitIn>,
) -> Result<Json<SubmitOut>> {
  let (submission, record) = submit_answers(&state, segment(&subject)?, segment(&package_id)?, body)?;
  Ok(Json(SubmitOut { submission, record }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_merge(
  State(state): State<Arc<AppState>>,
  Path(subject): Path<String>,
  body: Option<Json<MergeIn>>,
) -> Result<Json<MergedPackage>> {
  let overrides = body.map(|Json(b)| b).unwrap_or_default();
  let merged = merge_subject(&state, segment(&subject)?, overrides)?;
  info!(target: "quizbank", %subject, packages = merged.packages.len(), mcqs = merged.mcqs.len(), essays = merged.essay.len(), "Subject merged");
  Ok(Json(merged))
}

/// Multipart fields: `subject`, `package_id`, `level`, and the PDF as `file`.
#[instrument(level = "info", skip(state, multipart))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  mut multipart: Multipart,
) -> Result<impl IntoResponse> {
  let bad = |e: axum::extract::multipart::MultipartError| AppError::BadRequest(e.to_string());
  let (mut subject, mut package_id, mut level, mut source, mut pdf) = (None, None, None, None, None);

  while let Some(field) = multipart.next_field().await.map_err(bad)? {
    let name = field.name().unwrap_or_default().to_string();
    match name.as_str() {
      "subject" => subject = Some(field.text().await.map_err(bad)?),
      "package_id" => package_id = Some(field.text().await.map_err(bad)?),
      "level" => level = Some(field.text().await.map_err(bad)?),
      "file" => {
        source = field.file_name().map(str::to_string);
        pdf = Some(field.bytes().await.map_err(bad)?.to_vec());
      }
      _ => {}
    }
  }

  let missing = |name: &str| AppError::BadRequest(format!("missing multipart field `{name}`"));
  let subject = subject.ok_or_else(|| missing("subject"))?;
  let package_id = package_id.ok_or_else(|| missing("package_id"))?;
  let level = level.ok_or_else(|| missing("level"))?;
  let pdf = pdf.ok_or_else(|| missing("file"))?;
  segment(&subject)?;
  segment(&package_id)?;
  let level: Level = serde_json::from_value(serde_json::Value::String(level))
    .map_err(|e| AppError::BadRequest(format!("level: {e}")))?;

  let req = GenerateRequest {
    source: source.unwrap_or_else(|| format!("{package_id}.pdf")),
    subject,
    package_id,
    level,
    pdf,
  };
  info!(target: "quizbank", subject = %req.subject, package_id = %req.package_id, %level, pdf_bytes = req.pdf.len(), "Generation requested");
  let (package, origin, path) = generate_and_save(&state, req).await?;
  Ok((StatusCode::CREATED, Json(GeneratedOut { origin: origin.as_str(), path, package })))
}

// ---- results ----

#[instrument(level = "info", skip(state))]
pub async fn http_result_subjects(State(state): State<Arc<AppState>>) -> Result<Json<NamesOut>> {
  Ok(Json(NamesOut { items: submission_index(&state)?.subjects() }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_result_packages(
  State(state): State<Arc<AppState>>,
  Path(subject): Path<String>,
) -> Result<Json<NamesOut>> {
  Ok(Json(NamesOut { items: submission_index(&state)?.package_ids(&subject) }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_result_submissions(
  State(state): State<Arc<AppState>>,
  Path((subject, package)): Path<(String, String)>,
) -> Result<Json<NamesOut>> {
  let index = submission_index(&state)?;
  Ok(Json(NamesOut { items: submissions_for(&index, &subject, &package) }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_result_report(
  State(state): State<Arc<AppState>>,
  Path(name): Path<String>,
) -> Result<Json<ReportOut>> {
  let report = submission_report(&state, segment(&name)?)?;
  info!(target: "quizbank", submission = %name, final_score = %report.summary.final_score, "Report served");
  Ok(Json(ReportOut { submission: name, report }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_result_csv(
  State(state): State<Arc<AppState>>,
  Path(name): Path<String>,
) -> Result<impl IntoResponse> {
  let csv = submission_csv(&state, segment(&name)?)?;
  let stem = name.strip_suffix(".json").unwrap_or(&name);
  let headers = [
    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
    (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{stem}_comparison.csv\"")),
  ];
  Ok((headers, csv))
}

// ---- question builder sessions ----

fn no_session(id: &Uuid) -> AppError {
  AppError::NotFound(format!("builder session {id}"))
}

#[instrument(level = "info", skip(state, body), fields(package_id = %body.package_id))]
pub async fn http_builder_open(
  State(state): State<Arc<AppState>>,
  Json(body): Json<BuilderIn>,
) -> impl IntoResponse {
  let session = state.builders.open(PackageBuilder::new(body.package_id, body.source, body.level)).await;
  info!(target: "quizbank", %session, "Builder session opened");
  (StatusCode::CREATED, Json(BuilderOpenedOut { session }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_builder_get(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PackageBuilder>> {
  state.builders.get(&id).await.map(Json).ok_or_else(|| no_session(&id))
}

/// Preview only: shows how pasted text splits into a question and options.
#[instrument(level = "info", skip(state, body), fields(text_len = body.raw_text.len()))]
pub async fn http_builder_parse(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ParseIn>,
) -> Result<Json<ParseOut>> {
  if state.builders.get(&id).await.is_none() {
    return Err(no_session(&id));
  }
  let (question, options) = parse_mcq_block(&body.raw_text).ok_or_else(|| {
    AppError::BadRequest("expected a question line followed by at least two options".into())
  })?;
  Ok(Json(ParseOut { question, options }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_builder_add(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AddQuestionIn>,
) -> Result<impl IntoResponse> {
  let (added, count) = state
    .builders
    .with_mut(&id, |b| (b.add_question(body), b.questions.len()))
    .await
    .ok_or_else(|| no_session(&id))?;
  let id = added.map_err(|e| AppError::BadRequest(e.to_string()))?;
  info!(target: "quizbank", question = %id, count, "Builder question added");
  Ok((StatusCode::CREATED, Json(AddQuestionOut { id, count })))
}

#[instrument(level = "info", skip(state))]
pub async fn http_builder_export(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<QuestionPackage>> {
  let builder = state.builders.get(&id).await.ok_or_else(|| no_session(&id))?;
  Ok(Json(builder.export()))
}

#[instrument(level = "info", skip(state))]
pub async fn http_builder_close(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode> {
  state.builders.close(&id).await.ok_or_else(|| no_session(&id))?;
  info!(target: "quizbank", session = %id, "Builder session closed");
  Ok(StatusCode::NO_CONTENT)
}
