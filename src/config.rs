//! Loading application configuration (paths, generation settings, merge metadata) from TOML.
//!
//! Every section and key is optional; see the `Default` impls for the values used otherwise.
//!
//! ```toml
//! [paths]
//! database_dir = "database"
//! results_dir = "results/user_submissions"
//! prompt_file = "config/prompts/generate_questions.txt"
//! pdfium_dir = "/opt/pdfium/lib"
//!
//! [generation]
//! max_source_chars = 10000
//! temperature = 0.4
//!
//! [merge]
//! merged_source = "Machine Vision Exams Compilation (2014-2020)"
//! level = "advanced_undergraduate"
//! notes = "Merged automatically using Question Bank Generator"
//! ```

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::merge::MergeMeta;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub paths: Paths,
  #[serde(default)]
  pub generation: Generation,
  #[serde(default)]
  pub merge: MergeMeta,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Paths {
  pub database_dir: PathBuf,
  pub results_dir: PathBuf,
  pub prompt_file: PathBuf,
  pub pdfium_dir: Option<PathBuf>,
}

impl Default for Paths {
  fn default() -> Self {
    Self {
      database_dir: "database".into(),
      results_dir: PathBuf::from("results").join("user_submissions"),
      prompt_file: PathBuf::from("config").join("prompts").join("generate_questions.txt"),
      pdfium_dir: None,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Generation {
  /// Only this many characters of the extracted PDF text are sent to the model.
  pub max_source_chars: usize,
  pub temperature: f32,
  pub user_template: String,
}

impl Default for Generation {
  fn default() -> Self {
    Self {
      max_source_chars: 10_000,
      temperature: 0.4,
      user_template: "Input: {source}\nPackage number: {package_id}\nSubject: {subject}\nLevel: {level}\nPDF Content:\n{content}".into(),
    }
  }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You generate exam question packages from lecture material.
Respond ONLY with one strict JSON object with keys:
  package_id, source, level, mcqs, essay
Each MCQ: id, question, options (labels "A".."E" mapped to text), correct_option (a label),
  difficulty ("easy" | "medium" | "hard"), learning_objective, slide_refs (list of page numbers).
essay: list of items with id, prompt, expected_keywords, and
  rubric { total_points, criteria: [{ keyword, weight, description }], grading_notes }.
"#;

/// Attempt to load `AppConfig` from QUIZBANK_CONFIG_PATH. On any parsing/IO error, returns defaults.
pub fn load_app_config_from_env() -> AppConfig {
  let Ok(path) = std::env::var("QUIZBANK_CONFIG_PATH") else {
    info!(target: "quizbank", "QUIZBANK_CONFIG_PATH not set; using default configuration");
    return AppConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quizbank", %path, "Loaded app config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "quizbank", %path, error = %e, "Failed to parse TOML config; using defaults");
        AppConfig::default()
      }
    },
    Err(e) => {
      error!(target: "quizbank", %path, error = %e, "Failed to read TOML config file; using defaults");
      AppConfig::default()
    }
  }
}

/// The generation system prompt: the configured template file, or the built-in prompt.
pub fn load_system_prompt(cfg: &AppConfig) -> String {
  match std::fs::read_to_string(&cfg.paths.prompt_file) {
    Ok(s) if !s.trim().is_empty() => s,
    _ => {
      warn!(target: "quizbank", path = %cfg.paths.prompt_file.display(), "Prompt file not found; using built-in prompt");
      DEFAULT_SYSTEM_PROMPT.to_string()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg: AppConfig = toml::from_str(
      r#"
        [paths]
        database_dir = "/srv/quiz/db"

        [merge]
        merged_source = "Machine Vision Exams"
        level = "graduate"
        notes = "spring"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.paths.database_dir, PathBuf::from("/srv/quiz/db"));
    assert_eq!(cfg.paths.results_dir, PathBuf::from("results").join("user_submissions"));
    assert_eq!(cfg.generation.max_source_chars, 10_000);
    assert_eq!(cfg.merge.level, "graduate");
  }

  #[test]
  fn empty_toml_is_all_defaults() {
    let cfg: AppConfig = toml::from_str("").unwrap();
    assert_eq!(cfg.merge, MergeMeta::default());
    assert!(cfg.paths.pdfium_dir.is_none());
  }

  #[test]
  fn missing_prompt_file_falls_back() {
    let mut cfg = AppConfig::default();
    cfg.paths.prompt_file = PathBuf::from("/definitely/not/here.txt");
    assert_eq!(load_system_prompt(&cfg), DEFAULT_SYSTEM_PROMPT);
  }
}
