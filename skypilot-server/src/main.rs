// SkyPilot - fly a drone from the browser

use anyhow::Context;
use clap::Parser;
use skypilot_core::{LinkEvent, LinkHandle, RecordingLink};
use skypilot_eye::NullDetector;
use skypilot_server::{create_router, logging, AppConfig, PilotSession};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "skypilot", version, about = "Remote pilot server for a camera drone")]
struct Args {
    /// Configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    address: Option<String>,

    /// HTTP port
    #[arg(short, long)]
    port: Option<u16>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long)]
    log_level: Option<String>,

    /// Directory receiving snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Do not start the transcoder and frame pipeline
    #[arg(long)]
    no_video: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AppConfig::default(),
        };

        if let Some(address) = self.address {
            config.server.address = address;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(log_file) = self.log_file {
            config.server.log_file = Some(log_file);
        }
        if let Some(log_level) = self.log_level {
            config.server.log_level = log_level;
        }
        if let Some(snapshot_dir) = self.snapshot_dir {
            config.pilot.snapshot_dir = snapshot_dir;
        }
        if self.no_video {
            config.video_enabled = false;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config()?;
    logging::init(&config.server.log_level, config.server.log_file.as_deref())?;

    info!("starting SkyPilot {}", env!("CARGO_PKG_VERSION"));

    // The vehicle wire protocol is provided outside this workspace; the
    // simulated link records every command instead.
    let sim = Arc::new(RecordingLink::new());
    let session = PilotSession::new(
        LinkHandle::new(sim.clone()),
        Arc::new(NullDetector),
        config.pilot.clone(),
        config.transcoder.clone(),
        config.video_enabled,
    );
    session.start();
    sim.emit(LinkEvent::Connected);

    if let Err(e) = session.wait_ready().await {
        warn!("vehicle not ready: {}", e);
    }

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("listening on http://{}", addr);

    axum::serve(listener, create_router(session.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session.shutdown().await;
    info!("bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
