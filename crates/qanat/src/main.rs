use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use qanat::api::{AppState, create_router};
use qanat::config::ServerConfig;
use qanat::engine::OpenAiEngine;
use qanat::models::ModelRegistry;

#[derive(Debug, Parser)]
#[command(author, version, about = "Streaming chat relay server.")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Socket address to listen on (overrides the configuration).
    #[arg(long)]
    bind: Option<String>,
}

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    serve(config)
}

#[tokio::main]
async fn serve(config: ServerConfig) -> Result<()> {
    let models = ModelRegistry::new(config.models.clone(), &config.default_model)
        .context("invalid model configuration")?;
    let state = AppState::new(Arc::new(models), Arc::new(OpenAiEngine::new()));
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.init();
}
