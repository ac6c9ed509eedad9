//! TCP acceptor: accept loop and per-connection task spawning.
//!
//! Each accepted connection gets its own Tokio task running a
//! [`SessionTask`].  The accept loop never waits on a session; it hands the
//! stream off and goes straight back to `accept()`.
//!
//! Shutdown is driven by a shared `AtomicBool` that `main.rs` clears on
//! Ctrl+C.  `accept()` is polled with a 200 ms timeout so the flag is noticed
//! even when nobody is connecting.  Sessions already running are not
//! interrupted; they end when their clients disconnect or the process exits.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::application::{LineSink, MessageRouter, SessionRegistry};
use crate::domain::ServerConfig;

use super::framing::{ConnectionError, FrameReader};
use super::history_file::FileHistory;
use super::image_store::ImageStore;
use super::line_sink::WriterSink;
use super::session_task::{SessionContext, SessionError, SessionTask};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A bound listener plus everything its sessions share.
pub struct ChatServer {
    listener: TcpListener,
    ctx: Arc<SessionContext>,
}

impl ChatServer {
    /// Prepares the image directory, wires up history and the router, and
    /// binds the listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address is invalid, the image directory
    /// cannot be created, or the port cannot be bound.
    pub async fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        let addr = config.bind_addr()?;

        let images = ImageStore::open(&config.storage.image_dir)
            .await
            .context("image storage is unavailable")?;
        info!("storing uploads in {}", images.dir().display());

        let history = Arc::new(FileHistory::new(&config.storage.history_file));
        info!("appending history to {}", history.path().display());

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind chat listener on {addr}"))?;

        let router = Arc::new(MessageRouter::new(Arc::new(SessionRegistry::new()), history));
        let ctx = Arc::new(SessionContext {
            router,
            images,
            idle_timeout: config.idle_timeout(),
            write_timeout: config.write_timeout(),
        });
        Ok(Self { listener, ctx })
    }

    /// Address actually bound.  Differs from the configured one when port 0
    /// was requested.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `running` is cleared.
    pub async fn run(self, running: Arc<AtomicBool>) {
        if let Ok(addr) = self.local_addr() {
            info!("chat server listening on {addr}");
        }

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            match timeout(ACCEPT_POLL_INTERVAL, self.listener.accept()).await {
                Ok(Ok((stream, peer))) => {
                    info!("new connection from {peer}");
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        handle_connection(stream, peer, ctx).await;
                    });
                }
                Ok(Err(e)) => {
                    // e.g. too many open files; keep serving the others
                    error!("accept error: {e}");
                }
                Err(_) => {}
            }
        }
    }
}

/// Binds a server for `config` and runs it until `running` is cleared.
///
/// # Errors
///
/// Returns an error if [`ChatServer::bind`] fails.
pub async fn run_server(config: ServerConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let server = ChatServer::bind(&config).await?;
    server.run(running).await;
    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: Arc<SessionContext>) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("{peer}: could not set TCP_NODELAY: {e}");
    }
    let (read_half, write_half) = stream.into_split();
    let sink: Arc<dyn LineSink> = Arc::new(WriterSink::new(write_half, ctx.write_timeout));
    let reader = FrameReader::new(read_half, ctx.idle_timeout);

    match SessionTask::new(reader, sink, peer, ctx).run().await {
        Ok(()) => info!("connection {peer} closed"),
        Err(SessionError::Connection(ConnectionError::IdleTimeout(limit))) => {
            info!("connection {peer} idle for {limit:?}; disconnected");
        }
        Err(e) => warn!("connection {peer} closed with error: {e}"),
    }
}
