//! callrisk-api - Danger scoring and term attribution service
//!
//! Scores emergency-call transcripts and explains the score by ranking the
//! terms whose removal moves it most. Starts without a model if none is
//! configured or the configured one fails to load; the heuristic strategy
//! then serves every request.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use callrisk_api::config::{CliOverrides, ConfigSource, Settings};
use callrisk_api::{build_router, AppState};
use callrisk_engine::{LanguageConfig, ModelHandle};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for callrisk-api
#[derive(Parser, Debug)]
#[command(name = "callrisk-api")]
#[command(about = "Danger scoring and term attribution for emergency-call transcripts")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Model artifact (JSON export) to load at startup
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Language set TOML (stopwords, risk lexicon, heuristic weights)
    #[arg(short, long)]
    language: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long)]
    log_level: Option<String>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        Self {
            config: args.config,
            host: args.host,
            port: args.port,
            model: args.model,
            language: args.language,
            log_level: args.log_level,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: CliOverrides = Args::parse().into();
    let settings = Settings::resolve(&cli).context("Failed to resolve configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&settings.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting callrisk-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &settings.source {
        ConfigSource::File(path) => info!("Configuration: {}", path.display()),
        ConfigSource::Missing(path) => warn!(
            "Config file {} not found, using defaults",
            path.display()
        ),
        ConfigSource::Defaults => warn!("No config directory available, using defaults"),
    }

    let language = match &settings.language_path {
        Some(path) => LanguageConfig::load(path)
            .with_context(|| format!("Failed to load language set {}", path.display()))?,
        None => LanguageConfig::dutch(),
    };
    info!(
        language = %language.name,
        stopwords = language.stopwords.len(),
        lexicon = language.risk_lexicon.len(),
        "Language set ready"
    );

    let model = Arc::new(ModelHandle::empty());
    let mut startup_error = None;
    match &settings.model_path {
        Some(path) => match model.load_from(path) {
            Ok(info) => info!("✓ Model {} loaded", info.version),
            Err(e) => {
                warn!(
                    "Model {} failed to load ({}); serving heuristic scores",
                    path.display(),
                    e
                );
                startup_error = Some(format!("startup load from {} failed: {}", path.display(), e));
            }
        },
        None => info!("No model configured; serving heuristic scores"),
    }

    let state = AppState::new(settings.engine.clone(), language, model)
        .context("Failed to build scoring engine")?
        .with_model_path(settings.model_path.clone())
        .with_cors_origin(settings.cors_origin.clone());
    if let Some(message) = startup_error {
        state.record_error(message).await;
    }
    info!(
        strategies = ?state.scoring.chain().names(),
        workers = settings.engine.workers,
        "Scoring engine ready"
    );

    let app = build_router(state);

    let addr = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("callrisk-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
