use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iptv_merge::{
    config::Config,
    ingestor::{RebuildService, RefreshScheduler},
    models::BuildTrigger,
    sources::HttpSourceFetcher,
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "iptv-merge")]
#[command(version)]
#[command(about = "Merges regional IPTV playlists into curated, de-duplicated subscriptions")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Build and publish the playlists once, then exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("iptv_merge={},tower_http=trace", cli.log_level)
    } else {
        format!("iptv_merge={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting IPTV merge service v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    let fetcher = Arc::new(HttpSourceFetcher::new(
        config.ingestion.fetch_timeout,
        config.ingestion.user_agent.as_deref(),
    )?);
    let rebuild = Arc::new(RebuildService::from_config(&config, fetcher).await?);
    info!(
        "Sources: {}, output: {}, {} playlists",
        config.storage.sources_path.display(),
        config.storage.output_path.display(),
        rebuild.playlists().len()
    );

    if cli.once {
        let report = rebuild.rebuild(BuildTrigger::Manual).await?;
        info!(
            "Published {} playlists with {} channels",
            report.playlists.len(),
            report.channels.len()
        );
        return Ok(());
    }

    let cancellation_token = CancellationToken::new();

    let scheduler = RefreshScheduler::from_config(&config, Arc::clone(&rebuild))?;
    let scheduler_token = cancellation_token.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_token).await;
    });

    let state = AppState::new(Arc::clone(&rebuild), config.ingestion.build_on_missing_output);
    let web_server = WebServer::new(&config.web, state)?;
    info!(
        "Serving playlists on {}:{}",
        web_server.host(),
        web_server.port()
    );

    let shutdown_token = cancellation_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_token.cancel();
    });

    if let Err(e) = web_server
        .serve_with_cancellation(cancellation_token.clone())
        .await
    {
        error!("Web server error: {}", e);
        cancellation_token.cancel();
        let _ = scheduler_handle.await;
        return Err(e);
    }

    let _ = scheduler_handle.await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                    _ = sigint.recv() => info!("Received SIGINT (Ctrl+C), shutting down gracefully"),
                }
            }
            _ => {
                error!("Failed to install signal handlers, falling back to Ctrl+C");
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down gracefully");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully");
        }
    }
}
