//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::builder::QuestionDraft;
use crate::domain::{Difficulty, Level, Mcq, Options, QuestionPackage, SubmissionRecord};
use crate::report::Report;

/// Quiz view of a package: everything needed to take the test, without answers or rubrics.
#[derive(Debug, Serialize)]
pub struct QuizOut {
  pub package_id: String,
  pub source: String,
  pub level: Level,
  pub mcqs: Vec<QuizMcqOut>,
  pub essay: Vec<QuizEssayOut>,
}

#[derive(Debug, Serialize)]
pub struct QuizMcqOut {
  pub id: String,
  pub question: String,
  pub options: Options,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Serialize)]
pub struct QuizEssayOut {
  pub id: String,
  pub prompt: String,
}

fn quiz_mcq(q: &Mcq) -> QuizMcqOut {
  QuizMcqOut { id: q.id.clone(), question: q.question.clone(), options: q.options.clone(), difficulty: q.difficulty }
}

/// Convert a full package (internal) to the public quiz DTO.
pub fn to_quiz(p: &QuestionPackage) -> QuizOut {
  QuizOut {
    package_id: p.package_id.clone(),
    source: p.source.clone(),
    level: p.level,
    mcqs: p.mcqs.iter().map(quiz_mcq).collect(),
    essay: p.essay.iter().map(|e| QuizEssayOut { id: e.id.clone(), prompt: e.prompt.clone() }).collect(),
  }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
  pub openai: bool,
}

#[derive(Serialize)]
pub struct NamesOut {
  pub items: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitIn {
  /// MCQ id -> chosen option label.
  #[serde(default)]
  pub answers: BTreeMap<String, String>,
  /// Essay id -> response text.
  #[serde(default)]
  pub essay_answers: BTreeMap<String, String>,
}

#[derive(Serialize)]
pub struct SubmitOut {
  pub submission: String,
  pub record: SubmissionRecord,
}

#[derive(Serialize)]
pub struct SavedOut {
  pub path: String,
}

#[derive(Serialize)]
pub struct GeneratedOut {
  pub origin: &'static str,
  pub path: String,
  pub package: QuestionPackage,
}

/// Merge metadata overrides; missing fields fall back to the `[merge]` config section.
#[derive(Debug, Default, Deserialize)]
pub struct MergeIn {
  pub merged_source: Option<String>,
  pub level: Option<String>,
  pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct ReportOut {
  pub submission: String,
  #[serde(flatten)]
  pub report: Report,
}

#[derive(Debug, Deserialize)]
pub struct BuilderIn {
  pub package_id: String,
  pub source: String,
  pub level: Level,
}

#[derive(Serialize)]
pub struct BuilderOpenedOut {
  pub session: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ParseIn {
  pub raw_text: String,
}

#[derive(Serialize)]
pub struct ParseOut {
  pub question: String,
  pub options: Options,
}

pub type AddQuestionIn = QuestionDraft;

#[derive(Serialize)]
pub struct AddQuestionOut {
  pub id: String,
  pub count: usize,
}
