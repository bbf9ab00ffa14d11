use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clipsight::config::Settings;
use clipsight::gemini::GeminiClient;
use clipsight::history::create_history_store;
use clipsight::server::{create_app, AppState};
use clipsight::tasks::SweepTask;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Load configuration
    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");

    if settings.gemini.api_key.is_none() {
        tracing::warn!(
            "No server-side Gemini API key configured; requests must supply their own apiKey"
        );
    }

    // Upstream client and history backend
    let generator = Arc::new(GeminiClient::new(settings.gemini.clone())?);
    let history = create_history_store(&settings.database).await;

    // Create application state
    let state = AppState::new(settings.clone(), generator, history);
    tracing::info!("Application state initialized");

    // Start rate-limit sweep task in background
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let sweep_task = SweepTask::new(
        settings.rate_limit.sweep_interval_seconds,
        state.admission.clone(),
        shutdown_rx,
    );
    let sweep_handle = tokio::spawn(async move {
        sweep_task.run().await;
    });

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    // Wait for background tasks to finish
    tracing::info!("Waiting for background tasks to finish...");
    let _ = sweep_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Send shutdown signal to background tasks
    let _ = shutdown_tx.send(());
}
