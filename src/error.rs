//! Error taxonomy shared by the core modules and the HTTP layer.
//!
//! Every error is scoped to the operation that raised it; handlers turn it into a JSON
//! response and the process keeps serving.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

use crate::pdf::PdfError;
use crate::schema::SchemaError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Schema(#[from] SchemaError),

  /// The model answered with something that is not a usable package.
  #[error("generation failed: {0}")]
  Generation(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Pdf(#[from] PdfError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl AppError {
  pub fn kind(&self) -> &'static str {
    match self {
      AppError::Schema(_) => "schema",
      AppError::Generation(_) => "generation",
      AppError::NotFound(_) => "not_found",
      AppError::BadRequest(_) => "bad_request",
      AppError::Pdf(_) => "pdf",
      AppError::Io(_) => "io",
      AppError::Json(_) => "json",
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      AppError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::Generation(_) => StatusCode::BAD_GATEWAY,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::Pdf(_) => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::Io(_) | AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

#[derive(Serialize)]
struct ErrorOut {
  error: &'static str,
  message: String,
}

impl IntoResponse for AppError {
  fn into_response(self) -> axum::response::Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(target: "quizbank", kind = self.kind(), error = %self, "Request failed");
    } else {
      tracing::warn!(target: "quizbank", kind = self.kind(), error = %self, "Request rejected");
    }
    (status, Json(ErrorOut { error: self.kind(), message: self.to_string() })).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn not_found_maps_to_404() {
    let resp = AppError::NotFound("database/x/package_1/package.json".into()).into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn generation_failure_is_a_gateway_error() {
    let err = AppError::Generation("model returned non-JSON".into());
    assert_eq!(err.kind(), "generation");
    assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
  }
}
