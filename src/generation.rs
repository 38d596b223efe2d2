//! Package generation: PDF text -> (optional) model -> normalized `QuestionPackage`.
//!
//! Without an OpenAI client a fixed placeholder package is produced so the rest of the flow
//! (save, take test, review) still works end to end.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::domain::{Level, QuestionPackage};
use crate::error::{AppError, Result};
use crate::openai::OpenAI;
use crate::pdf::TextExtractor;
use crate::schema::{normalize_package, SchemaError};
use crate::util::{fill_template, strip_code_fence, take_chars};

#[derive(Clone, Debug)]
pub struct GenerateRequest {
  pub subject: String,
  pub package_id: String,
  pub level: Level,
  /// Original document name, e.g. the uploaded file name.
  pub source: String,
  pub pdf: Vec<u8>,
}

/// Which path produced the package.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
  Model,
  Placeholder,
}

impl Origin {
  pub fn as_str(&self) -> &'static str {
    match self {
      Origin::Model => "model",
      Origin::Placeholder => "placeholder",
    }
  }
}

pub fn build_user_prompt(cfg: &AppConfig, req: &GenerateRequest, text: &str) -> String {
  fill_template(
    &cfg.generation.user_template,
    &[
      ("source", req.source.as_str()),
      ("package_id", req.package_id.as_str()),
      ("subject", req.subject.as_str()),
      ("level", req.level.as_str()),
      ("content", take_chars(text, cfg.generation.max_source_chars)),
    ],
  )
}

/// Parses model output. Non-JSON output is a `Generation` error; JSON that fails the package
/// schema is a `Schema` error.
pub fn parse_generated(text: &str) -> Result<QuestionPackage> {
  let body = strip_code_fence(text);
  let raw: serde_json::Value = serde_json::from_str(body)
    .map_err(|e| AppError::Generation(format!("model returned invalid JSON: {e}")))?;
  Ok(normalize_package(raw)?)
}

/// Stand-in package used while no model is configured.
pub fn placeholder_package(package_id: &str, source: &str, level: Level, subject: &str) -> QuestionPackage {
  let raw = json!({
    "package_id": package_id,
    "source": source,
    "level": level,
    "mcqs": [{
      "id": format!("{package_id}_mcq1"),
      "question": format!("Example MCQ question for {subject}."),
      "options": {
        "A": "Example Option A",
        "B": "Example Option B",
        "C": "Example Option C",
        "D": "Example Option D"
      },
      "correct_option": "A",
      "difficulty": "easy",
      "learning_objective": "Understand example placeholder question",
      "slide_refs": [1, 2]
    }],
    "essay": {
      "id": format!("{package_id}_essay1"),
      "prompt": format!("Write an essay discussing key ideas of {subject}."),
      "expected_keywords": ["example", "placeholder", "essay"],
      "rubric": {
        "total_points": 100,
        "criteria": [
          { "keyword": "example", "weight": 40, "description": "Mentions example concept" },
          { "keyword": "placeholder", "weight": 40, "description": "Mentions placeholder concept" },
          { "keyword": "essay", "weight": 20, "description": "Mentions essay structure" }
        ],
        "grading_notes": "This is a placeholder rubric until a model is configured."
      }
    }
  });
  // The literal above always satisfies the schema.
  normalize_package(raw).unwrap_or_else(|_: SchemaError| QuestionPackage {
    package_id: package_id.to_string(),
    source: source.to_string(),
    level,
    mcqs: Vec::new(),
    essay: Vec::new(),
  })
}

/// Runs the whole generation flow. Nothing is saved here; the caller saves only on `Ok`.
#[instrument(level = "info", skip_all, fields(subject = %req.subject, package_id = %req.package_id, pdf_len = req.pdf.len()))]
pub async fn generate_package(
  cfg: &AppConfig,
  openai: Option<&OpenAI>,
  extractor: Arc<dyn TextExtractor>,
  system_prompt: &str,
  req: &GenerateRequest,
) -> Result<(QuestionPackage, Origin)> {
  let bytes = req.pdf.clone();
  let text = tokio::task::spawn_blocking(move || extractor.extract_text_from_bytes(&bytes))
    .await
    .map_err(|e| AppError::Io(std::io::Error::other(e.to_string())))??;
  info!(target: "quizbank", text_chars = text.chars().count(), "Extracted PDF text");

  let Some(oa) = openai else {
    warn!(target: "quizbank", "OpenAI disabled; using placeholder package");
    let pkg = placeholder_package(&req.package_id, &req.source, req.level, &req.subject);
    return Ok((pkg, Origin::Placeholder));
  };

  let user = build_user_prompt(cfg, req, &text);
  let raw = oa.complete(system_prompt, &user).await.map_err(AppError::Generation)?;
  let mut pkg = parse_generated(&raw)?;
  if pkg.package_id != req.package_id {
    warn!(target: "quizbank", returned = %pkg.package_id, requested = %req.package_id, "Model changed package_id; keeping the requested one");
    pkg.package_id = req.package_id.clone();
  }
  info!(target: "quizbank", mcqs = pkg.mcqs.len(), essays = pkg.essay.len(), "Model package accepted");
  Ok((pkg, Origin::Model))
}
