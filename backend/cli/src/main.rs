mod api;
mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use dealcoach_analyzer::providers::anthropic::AnthropicProvider;
use dealcoach_analyzer::{AnalyzerConfig, NegotiationAnalyzer, ProviderRegistry};
use dealcoach_coach::{Coach, TriggerConfig};
use dealcoach_store::TranscriptStore;

use api::AppState;
use config::Config;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Parser)]
#[command(name = "dealcoach")]
#[command(about = "Dealcoach — real-time loan negotiation coaching service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dealcoach HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show current service status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Status => {
            println!("Dealcoach status: checking...");
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/api/health", config.port))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("Dealcoach is not running on port {}", config.port);
                }
            }
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        model = %config.model,
        conversations_dir = %config.conversations_dir.display(),
        "Starting dealcoach service"
    );

    // A missing API key is a startup error, not a degraded mode.
    let api_key = config
        .anthropic_api_key
        .clone()
        .context("ANTHROPIC_API_KEY environment variable is required")?;

    let mut registry = ProviderRegistry::new();
    registry.register("anthropic", Arc::new(AnthropicProvider::new(api_key)));
    info!("Registered Anthropic provider");

    let provider = registry
        .get("anthropic")
        .context("anthropic provider not registered")?;

    let store = Arc::new(TranscriptStore::new(config.store_config()));
    let analyzer = Arc::new(NegotiationAnalyzer::new(
        store.clone(),
        provider,
        AnalyzerConfig {
            model: config.model.clone(),
            ..Default::default()
        },
    ));
    let coach = Coach::new(store.clone(), analyzer, TriggerConfig::default());

    let app_state = AppState::new(coach.clone());

    // Keep /api/analysis/:id/latest current.
    tokio::spawn(Arc::clone(&app_state).track_latest_analyses());

    // Periodic sweep of idle sessions.
    let cleanup_store = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        interval.tick().await; // first tick is immediate; skip it
        loop {
            interval.tick().await;
            cleanup_store.cleanup_expired_sessions().await;
        }
    });

    let app = api::build_router(Arc::clone(&app_state)).layer(CorsLayer::permissive());
    let addr = format!("{}:{}", config.bind_address, config.port);

    info!(addr = %addr, "HTTP API listening");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush everything before exit: close the HTTP session if one is open,
    // then persist all non-empty conversations.
    info!("Shutting down, saving conversations");
    let open_http_session = {
        let mut ctx = app_state.http_ctx.lock().await;
        ctx.clear_session()
    };
    if let Some(session_id) = open_http_session {
        coach.end_session(&session_id).await;
    }
    let saved = store.save_all_sessions().await;
    info!(saved, "Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
