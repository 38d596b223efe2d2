//! Application state: stores, configuration, the optional OpenAI client, the PDF extractor,
//! and the per-session builder accumulators.

use std::{
  collections::HashMap,
  sync::Arc,
  time::{Duration, Instant},
};

use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::builder::PackageBuilder;
use crate::config::{load_app_config_from_env, load_system_prompt, AppConfig};
use crate::openai::OpenAI;
use crate::packages::PackageStore;
use crate::pdf::{PdfExtractor, TextExtractor};
use crate::recorder::ResultRecorder;

/// Builder sessions untouched for this long are dropped the next time a session opens.
const BUILDER_IDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

struct Session {
  builder: PackageBuilder,
  last_used: Instant,
}

/// Open question-builder sessions, keyed by session id. A session ends on DELETE, or is
/// swept once it has been idle for longer than the TTL.
#[derive(Clone)]
pub struct BuilderSessions {
  inner: Arc<RwLock<HashMap<Uuid, Session>>>,
  idle_ttl: Duration,
}

impl Default for BuilderSessions {
  fn default() -> Self {
    Self::with_idle_ttl(BUILDER_IDLE_TTL)
  }
}

impl BuilderSessions {
  pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
    Self { inner: Arc::default(), idle_ttl }
  }

  pub async fn open(&self, builder: PackageBuilder) -> Uuid {
    let id = Uuid::new_v4();
    let mut sessions = self.inner.write().await;
    let before = sessions.len();
    sessions.retain(|_, s| s.last_used.elapsed() <= self.idle_ttl);
    if sessions.len() < before {
      debug!(target: "quizbank", expired = before - sessions.len(), "Swept idle builder sessions");
    }
    sessions.insert(id, Session { builder, last_used: Instant::now() });
    id
  }

  pub async fn get(&self, id: &Uuid) -> Option<PackageBuilder> {
    let mut sessions = self.inner.write().await;
    let session = sessions.get_mut(id)?;
    session.last_used = Instant::now();
    Some(session.builder.clone())
  }

  /// Runs `f` against the session's builder, if the session exists.
  pub async fn with_mut<R>(&self, id: &Uuid, f: impl FnOnce(&mut PackageBuilder) -> R) -> Option<R> {
    let mut sessions = self.inner.write().await;
    let session = sessions.get_mut(id)?;
    session.last_used = Instant::now();
    Some(f(&mut session.builder))
  }

  pub async fn close(&self, id: &Uuid) -> Option<PackageBuilder> {
    self.inner.write().await.remove(id).map(|s| s.builder)
  }
}

#[derive(Clone)]
pub struct AppState {
  pub config: AppConfig,
  pub packages: PackageStore,
  pub recorder: ResultRecorder,
  pub openai: Option<OpenAI>,
  pub extractor: Arc<dyn TextExtractor>,
  pub system_prompt: String,
  pub builders: BuilderSessions,
}

impl AppState {
  /// Build state from env: load config, open stores, init OpenAI.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    let config = load_app_config_from_env();
    let system_prompt = load_system_prompt(&config);

    let openai = OpenAI::from_env(config.generation.temperature);
    if let Some(oa) = &openai {
      info!(target: "quizbank", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
    } else {
      info!(target: "quizbank", "OpenAI disabled (no OPENAI_API_KEY). Generation uses the placeholder package.");
    }

    let extractor = Arc::new(PdfExtractor::new(config.paths.pdfium_dir.clone()));
    Self::with_parts(config, openai, extractor, system_prompt)
  }

  pub fn with_parts(
    config: AppConfig,
    openai: Option<OpenAI>,
    extractor: Arc<dyn TextExtractor>,
    system_prompt: String,
  ) -> Self {
    let packages = PackageStore::new(config.paths.database_dir.clone());
    let recorder = ResultRecorder::new(config.paths.results_dir.clone());
    info!(
      target: "quizbank",
      database = %packages.root().display(),
      results = %recorder.dir().display(),
      "Storage locations"
    );
    Self {
      config,
      packages,
      recorder,
      openai,
      extractor,
      system_prompt,
      builders: BuilderSessions::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Level;

  #[tokio::test]
  async fn builder_sessions_are_independent() {
    let sessions = BuilderSessions::default();
    let a = sessions.open(PackageBuilder::new("pkg_a", "a.pdf", Level::Graduate)).await;
    let b = sessions.open(PackageBuilder::new("pkg_b", "b.pdf", Level::Graduate)).await;
    assert_ne!(a, b);

    sessions.with_mut(&a, |builder| builder.source = "renamed.pdf".into()).await.unwrap();
    assert_eq!(sessions.get(&a).await.unwrap().source, "renamed.pdf");
    assert_eq!(sessions.get(&b).await.unwrap().source, "b.pdf");

    assert!(sessions.close(&a).await.is_some());
    assert!(sessions.get(&a).await.is_none());
    assert!(sessions.with_mut(&a, |_| ()).await.is_none());
  }

  #[tokio::test]
  async fn idle_sessions_are_swept_on_open() {
    let sessions = BuilderSessions::with_idle_ttl(Duration::from_millis(20));
    let stale = sessions.open(PackageBuilder::new("pkg_a", "a.pdf", Level::Graduate)).await;
    std::thread::sleep(Duration::from_millis(60));
    let fresh = sessions.open(PackageBuilder::new("pkg_b", "b.pdf", Level::Graduate)).await;
    assert!(sessions.get(&stale).await.is_none());
    assert!(sessions.get(&fresh).await.is_some());

    let kept = BuilderSessions::default();
    let a = kept.open(PackageBuilder::new("pkg_a", "a.pdf", Level::Graduate)).await;
    kept.open(PackageBuilder::new("pkg_b", "b.pdf", Level::Graduate)).await;
    assert!(kept.get(&a).await.is_some());
  }
}
