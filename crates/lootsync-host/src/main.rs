//! Lootsync host binary.
//!
//! Treats stdin as the chat channel's inbound side: every line is published
//! as if a participant had typed it. Host broadcasts are written to stdout,
//! one per line. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! echo '[REQ]DROP|0|7|1|1|0|0|0|1001|E|2|1|0|0' | lootsync-host --log-level debug
//! ```

use std::time::Duration;

use clap::Parser;
use lootsync_core::{ChatChannel, DismantleRules};
use lootsync_host::{HostConfig, HostDriver, HostError, HostRuntime, MemoryInventory, SystemEnv};
use lootsync_proto::BROADCAST_OPEN;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Lootsync drop host
#[derive(Parser, Debug)]
#[command(name = "lootsync-host")]
#[command(about = "Authoritative host for networked item drops")]
#[command(version)]
struct Args {
    /// Minimum drop age before pickup, in milliseconds
    #[arg(long, default_value = "500")]
    pickup_delay_ms: u64,

    /// Minimum spacing between dismantle taps, in milliseconds
    #[arg(long, default_value = "75")]
    min_tap_interval_ms: u64,

    /// Idle time before dismantle progress resets, in milliseconds
    #[arg(long, default_value = "1000")]
    decay_after_ms: u64,

    /// Largest accepted tap strength
    #[arg(long, default_value = "1.0")]
    max_tap_strength: f32,

    /// Decay check interval, in milliseconds
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Lines buffered per slow channel subscriber
    #[arg(long, default_value = "1024")]
    channel_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn host_config(&self) -> HostConfig {
        HostConfig {
            pickup_delay: Duration::from_millis(self.pickup_delay_ms),
            max_tap_strength: self.max_tap_strength,
            dismantle: DismantleRules {
                min_tap_interval: Duration::from_millis(self.min_tap_interval_ms),
                decay_after: Duration::from_millis(self.decay_after_ms),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let channel = ChatChannel::new(args.channel_capacity);
    let driver = HostDriver::new(SystemEnv::new(), MemoryInventory::new(), args.host_config())?;
    let (runtime, handle) =
        HostRuntime::new(driver, channel.clone(), Duration::from_millis(args.tick_ms))?;

    let writer = tokio::spawn(forward_broadcasts(channel.subscribe_raw()));
    let host = tokio::spawn(runtime.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        channel.publish_raw(line);
    }

    handle.shutdown().await?;
    let driver = host.await??;
    tracing::info!(
        drops = driver.drop_count(),
        currency = driver.inventory().total_currency(),
        items = driver.inventory().total_items(),
        "input closed"
    );

    // Last sender gone; the writer drains and exits.
    drop(channel);
    writer.await??;

    Ok(())
}

/// Copy host broadcasts from the channel to stdout.
async fn forward_broadcasts(
    mut lines: tokio::sync::broadcast::Receiver<String>,
) -> Result<(), HostError> {
    let mut stdout = tokio::io::stdout();
    loop {
        match lines.recv().await {
            Ok(line) if line.starts_with(BROADCAST_OPEN) => {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            },
            Ok(_) => {},
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "stdout writer lagged, broadcasts lost");
            },
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}
