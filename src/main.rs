//! Tomato Timer - a state-managed countdown timer engine
//!
//! This is the main entry point for the tomato-timer application.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use tomato_timer::{
    completion_task, config::Config, create_router, services::check_alarm_tooling,
    state::AppState, timer_engine_task, utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("tomato_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting tomato-timer v0.1.0");
    info!(
        "Configuration: host={}, port={}, default={}m{}s, clock={:?}",
        config.host, config.port, config.minutes, config.seconds, config.clock
    );

    // A missing alarm player is not fatal; completion falls back to the
    // terminal bell.
    if let Err(e) = check_alarm_tooling().await {
        tracing::warn!("{} - completions will ring the terminal bell", e);
    }

    // Create application state and the engine input channel
    let (state, engine_rx) = AppState::new(&config)?;

    // Start the timer engine background task
    let engine_state = Arc::clone(&state);
    tokio::spawn(async move {
        timer_engine_task(engine_state, engine_rx).await;
    });

    // Start the completion side-effect task
    let completion_state = Arc::clone(&state);
    tokio::spawn(async move {
        completion_task(completion_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start    - Start a session");
    info!("  POST /pause    - Pause the running countdown");
    info!("  POST /resume   - Resume from the paused value");
    info!("  POST /reset    - Return to pristine");
    info!("  POST /duration - Edit the session length");
    info!("  GET  /status   - Current timer snapshot and metadata");
    info!("  GET  /health   - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
