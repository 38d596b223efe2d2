//! Question Bank backend
//!
//! - Axum HTTP API over a directory-backed question bank and results store
//! - PDF -> question package generation (OpenAI when configured, placeholder otherwise)
//! - Grading, submission recording, review reports and CSV export
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   OPENAI_API_KEY       : enables OpenAI generation if present
//!   OPENAI_BASE_URL      : default "https://api.openai.com/v1"
//!   OPENAI_MODEL         : default "gpt-4"
//!   QUIZBANK_CONFIG_PATH : path to TOML config (paths, generation, merge defaults)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod builder;
mod config;
mod domain;
mod error;
mod generation;
mod grading;
mod logic;
mod merge;
mod openai;
mod packages;
mod pdf;
mod protocol;
mod recorder;
mod report;
mod routes;
mod schema;
mod state;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (stores, OpenAI client, PDF extractor, builder sessions).
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizbank", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!(target: "quizbank", "Shutdown signal received");
    })
    .await?;
  Ok(())
}
