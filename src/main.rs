//! Study Timer - a shared wall-clock stopwatch for study sessions
//!
//! This is the host process: it owns one timer context and exposes it over HTTP.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use study_timer::{
    api::create_router,
    clock::SystemClock,
    config::Config,
    state::{AppState, SharedTimer},
    tasks::display_loop_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("study_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting study-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, state={}, channel={}, sync={}, tick={}ms",
          config.host, config.port,
          if config.ephemeral { "memory" } else { config.state_file.as_str() },
          config.channel, !config.no_sync, config.tick().as_millis());

    // Create this host's timer context
    let hub = config.hub();
    let timer = Arc::new(SharedTimer::new(
        Arc::new(SystemClock),
        config.store(),
        hub.channel(&config.channel),
    ));
    timer.connect();
    timer.on_stop(Box::new(|duration: &str| {
        info!("Study session ready to log: {}", duration);
    }));

    let (state, display) = AppState::new(config.port, config.host.clone(), Arc::clone(&timer));
    let state = Arc::new(state);

    // Start the display refresh loop
    tokio::spawn(display_loop_task(
        Arc::clone(&timer),
        config.tick(),
        display.visibility_rx,
        display.frames_tx,
    ));

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/toggle    - Start or pause the timer");
    info!("  POST /timer/reset     - Reset elapsed time to zero");
    info!("  POST /timer/stop      - Stop and pre-fill a study draft");
    info!("  POST /timer/sync      - Re-save and re-broadcast the timer state");
    info!("  GET  /timer/status    - Current timer and host status");
    info!("  GET  /study/draft     - Study draft from the last stop");
    info!("  GET  /display         - Latest display frame");
    info!("  POST /display/visible - Display back on screen");
    info!("  POST /display/hidden  - Display minimized");
    info!("  GET  /health          - Health check");

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

    // Keep an in-flight run durable across restarts
    timer.persist();
    timer.disconnect();

    info!("Server shutdown complete");
    Ok(())
}
