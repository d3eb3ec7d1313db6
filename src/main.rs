use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crucible::config::AppConfig;
use crucible::server::{create_router, AppState};
use crucible::shutdown::wait_for_shutdown;
use crucible::workflow::types::{Language, WorkflowRequest};

#[derive(Parser)]
#[command(name = "crucible", about = "Turns natural-language requests into reviewed, tested code")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve,
    /// Run a single workflow and print the report as JSON
    Run {
        /// The natural-language request
        prompt: String,
        /// Target language (python, javascript, typescript, rust)
        #[arg(short, long, default_value = "python")]
        language: String,
        /// Repository (owner/name) to open a pull request against
        #[arg(short, long)]
        repository: Option<String>,
        /// Execute the generated tests in the sandbox
        #[arg(long)]
        execute_tests: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Run {
            prompt,
            language,
            repository,
            execute_tests,
        } => {
            let language: Language = language
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;

            let state = AppState::new(config)?;
            let result = state
                .pipeline
                .run(WorkflowRequest {
                    prompt,
                    language,
                    repository,
                    execute_tests: Some(execute_tests),
                })
                .await;

            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting Crucible server"
    );

    let state = Arc::new(AppState::new(config.clone())?);

    // Periodically sweep expired generation-cache entries
    let sweep_interval = Duration::from_secs(config.cache.sweep_interval_secs);
    crucible::cache::spawn_sweeper(Arc::clone(&state.generation_cache), sweep_interval);

    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        config.server.host, config.server.port
    ))
    .await?;

    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    Ok(())
}
