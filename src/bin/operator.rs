//! Roverlink operator client
//!
//! `run` drives the rover from a gamepad and keeps watch on the bridge. The
//! other subcommands talk to the bridge once and exit.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::{error, info, warn};
use roverlink::backend::{get_input_source, LogRenderSink};
use roverlink::channel::{CommandChannel, HttpChannel};
use roverlink::config::{Config, InputConfig};
use roverlink::control::{Command, InputSampler, SamplerSettings};
use roverlink::poller::{format_timestamp, LogObserver, StatusPoller};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Parser, Debug)]
#[command(name = "operator")]
#[command(about = "Operator client for the roverlink bridge")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file (defaults to configs/default.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bridge URL, e.g. http://192.168.1.20:5000
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Stream gamepad input to the bridge and report device output
    Run,

    /// Send one raw command
    Send {
        command: u8,
        motor: u8,
        #[arg(allow_hyphen_values = true)]
        value: i32,
    },

    /// Request and print the current status snapshot
    Status,

    /// Drain and print pending console entries
    Console,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(endpoint) = args.endpoint {
        config.client.endpoint = endpoint;
    }
    config.validate().context("Invalid configuration")?;

    let channel = Arc::new(HttpChannel::connect(&config.client)?);

    match args.action {
        Action::Run => run(config, channel).await,
        Action::Send { command, motor, value } => {
            let message = channel.send_now(Command::new(command, motor, value)).await?;
            println!("{}", message);
            Ok(())
        }
        Action::Status => {
            match channel.poll_status().await? {
                Some(status) => {
                    for (key, value) in &status.fields {
                        println!("{:>12}: {}", key, value);
                    }
                }
                None => println!("No status received"),
            }
            Ok(())
        }
        Action::Console => {
            for entry in channel.poll_log().await?.unwrap_or_default() {
                println!("[{}] {}", format_timestamp(entry.timestamp), entry.text);
            }
            Ok(())
        }
    }
}

async fn run(config: Config, channel: Arc<HttpChannel>) -> Result<()> {
    info!("=== Roverlink operator ===");
    info!("Bridge: {}", channel.base_url());

    let poller = StatusPoller::new(channel.clone(), config.client.poll_interval(), Box::new(LogObserver));
    let poller = poller.spawn();

    let (stop_tx, stop_rx) = bounded::<()>(1);
    let input = start_input_thread(config.input.clone(), channel, stop_rx)?;

    info!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    info!("Stopping...");

    let _ = stop_tx.send(());
    poller.stop();
    poller.join().await;

    if input.join().is_err() {
        error!("Input thread panicked");
    }

    info!("Operator stopped");
    Ok(())
}

/// Sample the gamepad on a dedicated thread until told to stop
///
/// The input source is created on this thread; gamepad handles are not
/// `Send` on every platform.
fn start_input_thread(
    input: InputConfig,
    channel: Arc<HttpChannel>,
    stop: Receiver<()>,
) -> Result<JoinHandle<()>> {
    let mut sampler = InputSampler::new(SamplerSettings::from(&input))?;
    let interval = input.sample_interval();

    let handle = thread::Builder::new()
        .name("input".to_string())
        .spawn(move || {
            let mut source = match get_input_source() {
                Ok(source) => source,
                Err(e) => {
                    warn!("No input source ({}); only monitoring the bridge", e);
                    return;
                }
            };
            let mut sink = LogRenderSink;

            info!("Input thread started ({} ms per sample)", interval.as_millis());

            loop {
                match stop.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        for command in sampler.tick(&mut source, &mut sink) {
                            channel.send(command);
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            info!("Input thread stopped");
        })?;

    Ok(handle)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load {}", path.display())),
        None if Path::new("configs/default.toml").exists() => Ok(Config::load_default()?),
        None => Ok(Config::default()),
    }
}
