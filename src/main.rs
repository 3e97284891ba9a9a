//! Roverlink bridge - main application
//!
//! Finds the motor controller on a serial port, then serves the command
//! channel over HTTP until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use roverlink::config::Config;
use roverlink::{Bridge, BridgeServer, DeviceLink};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "roverlink")]
#[command(about = "HTTP bridge between operators and a serial motor controller")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file (defaults to configs/default.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address, e.g. 0.0.0.0:5000
    #[arg(short, long)]
    listen: Option<String>,

    /// Use this serial device instead of discovering one
    #[arg(short, long)]
    serial_path: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;

    if let Some(listen) = args.listen {
        config.bridge.listen = listen;
    }
    if let Some(path) = args.serial_path {
        config.serial.path = Some(path);
    }
    config.validate().context("Invalid configuration")?;

    if args.validate_config {
        info!("✓ Configuration is valid");
        return Ok(());
    }

    info!("=== Roverlink bridge v{} ===", env!("CARGO_PKG_VERSION"));

    // Discovery blocks, so it runs off the runtime and watches Ctrl+C
    let cancelled = Arc::new(AtomicBool::new(false));
    let discovery = {
        let serial = config.serial.clone();
        let capacity = config.bridge.log_capacity;
        let cancelled = Arc::clone(&cancelled);
        tokio::task::spawn_blocking(move || DeviceLink::open_with_retry(&serial, capacity, &cancelled))
    };

    let link = tokio::select! {
        result = discovery => result.context("Device discovery task failed")??,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted during device discovery");
            cancelled.store(true, Ordering::SeqCst);
            return Ok(());
        }
    };

    let bridge = Arc::new(Bridge::new(Arc::new(link), config.bridge.status_settle()));
    let server = BridgeServer::new(config.bridge.clone(), Arc::clone(&bridge));
    let listener = server
        .bind()
        .await
        .with_context(|| format!("Failed to bind {}", config.bridge.listen))?;

    info!("Press Ctrl+C to stop");
    server.serve(listener, shutdown_signal()).await?;

    bridge.link().close();
    info!("Bridge stopped");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load {}", path.display())),
        None if Path::new("configs/default.toml").exists() => Ok(Config::load_default()?),
        None => {
            warn!("No configuration file found, using defaults");
            Ok(Config::default())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}
