use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, routing::post, Router};
use tower_http::trace::TraceLayer;

use crate::cache::ResponseCache;
use crate::config::AppConfig;
use crate::knowledge::KnowledgeBase;
use crate::platform::github::GitHubHost;
use crate::platform::RepositoryHost;
use crate::provider::claude::ClaudeClient;
use crate::provider::generation::ClaudeGenerator;
use crate::provider::review::ClaudeReviewer;
use crate::provider::testgen::ClaudeTestWriter;
use crate::provider::GeneratedCode;
use crate::sandbox::process::ProcessSandbox;
use crate::workflow::pipeline::Pipeline;

pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Pipeline,
    pub repository: Option<Arc<dyn RepositoryHost>>,
    /// Handle to the generation cache, for the periodic sweeper.
    pub generation_cache: Arc<ResponseCache<GeneratedCode>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> crate::error::Result<Self> {
        let client = ClaudeClient::new(
            config.claude_api_key(),
            &config.claude.model,
            config.claude.max_tokens,
        );

        let generator = ClaudeGenerator::new(
            client.clone(),
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.max_entries,
        );
        let generation_cache = generator.cache();

        let repository: Option<Arc<dyn RepositoryHost>> = match &config.github {
            Some(github) => Some(Arc::new(GitHubHost::new(github)?)),
            None => None,
        };

        let pipeline = Pipeline::new(
            KnowledgeBase::new(config.knowledge.max_patterns),
            Arc::new(generator),
            Arc::new(ClaudeReviewer::new(client.clone())),
            Arc::new(ClaudeTestWriter::new(client)),
            Arc::new(ProcessSandbox::new()),
            repository.clone(),
            config.sandbox.timeout_ms,
        );

        Ok(Self {
            config,
            pipeline,
            repository,
            generation_cache,
        })
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/workflows", post(crate::trigger::handler::handle_workflow))
        .route(
            "/repository",
            post(crate::trigger::handler::handle_repository),
        )
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
