//! Chat relay over turmoil TCP.
//!
//! Bridges newline-delimited TCP connections onto one [`ChatChannel`]: every
//! line a connection sends is published, and every line published is written
//! to every connection. With a [`lootsync_host::HostRuntime`] subscribed to
//! the same channel this is a complete host process for turmoil simulations.

use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
};

use lootsync_core::{ChatChannel, Environment};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::{
    io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    sync::broadcast::error::RecvError,
};
use turmoil::net::{TcpListener, TcpStream};

/// Environment reading tokio's clock, which turmoil drives.
///
/// Randomness comes from a seeded stream so a simulation replays exactly.
#[derive(Debug, Clone)]
pub struct TurmoilEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl TurmoilEnv {
    /// Environment drawing randomness from `seed`.
    pub fn new(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }
}

impl Environment for TurmoilEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> tokio::time::Instant {
        tokio::time::Instant::now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}

/// Accept `connections` connections and relay them onto `channel`.
///
/// Returns once all are accepted; relaying continues on spawned tasks. Each
/// connection is subscribed before this returns, so nothing published
/// afterwards is missed.
pub async fn serve_chat(
    listener: &TcpListener,
    channel: &ChatChannel,
    connections: usize,
) -> io::Result<()> {
    for _ in 0..connections {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "chat connection accepted");
        relay(stream, channel);
    }
    Ok(())
}

fn relay(stream: TcpStream, channel: &ChatChannel) {
    let (reader, writer) = tokio::io::split(stream);
    let inbound = channel.clone();
    let outbound = channel.subscribe_raw();

    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            inbound.publish_raw(line);
        }
    });

    tokio::spawn(async move {
        if let Err(error) = forward(outbound, writer).await {
            tracing::debug!(%error, "chat connection closed");
        }
    });
}

async fn forward<W>(
    mut lines: tokio::sync::broadcast::Receiver<String>,
    mut writer: W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match lines.recv().await {
            Ok(line) => {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "relay lagged, lines lost");
            },
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}
