use anyhow::Result;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use claimmon_server::app;
use claimmon_server::config::MonitorConfig;
use claimmon_server::monitor::SystemMonitor;
use claimmon_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  claimmon-server [monitor.toml]    Start the monitoring server");
}

#[tokio::main]
async fn main() -> Result<()> {
    claimmon_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("claimmon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        other => run_server(other.unwrap_or("config/monitor.toml")).await,
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = if Path::new(config_path).exists() {
        MonitorConfig::load(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to load config '{config_path}': {e}"))?
    } else {
        tracing::warn!(path = %config_path, "Config file not found, using defaults");
        MonitorConfig::default()
    };

    tracing::info!(
        version = %config.version,
        http_port = config.http_port,
        "claimmon-server starting"
    );

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let monitor = Arc::new(SystemMonitor::new(config));
    monitor.init();

    let app = app::build_http_app(AppState::new(monitor.clone()));
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    tracing::info!(addr = %http_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    monitor.shutdown();
    tracing::info!("claimmon-server stopped");
    Ok(())
}
