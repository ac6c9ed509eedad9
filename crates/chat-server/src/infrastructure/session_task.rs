//! The per-connection task: identity handshake, command loop, departure.
//!
//! ```text
//! AwaitingIdentity ──(non-blank name)──▶ Active ──(EOF / read or write fault / storage fault)──▶ Terminated
//!        │                                                                              ▲
//!        └──────────────────(EOF or blank name, never registered)──────────────────────────────┘
//! ```
//!
//! Departure is processed at most once: the task deregisters first and only
//! announces the leave when the registry actually removed the session.  The
//! connection is closed exactly once, on every exit path, after departure.
//!
//! Writes to a session are mostly issued by other sessions' tasks, so a dead
//! write side is noticed through [`LineSink::failed`] rather than through an
//! error returned here.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chat_core::{
    parse_command, parse_identity, ClientCommand, ServerLine, Timestamp, TransferDescriptor,
    IDENTITY_PROMPT,
};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::application::{LineSink, MessageRouter, Session};

use super::framing::{ConnectionError, FrameReader};
use super::image_store::{ImageStore, TransferError, TransferOutcome};

/// Why a session ended abnormally.  A clean EOF is not an error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("upload aborted: {0}")]
    Transfer(#[source] TransferError),
    #[error("client stopped accepting lines")]
    WriteFailed,
}

/// Shared state every session task needs.
pub struct SessionContext {
    pub router: Arc<MessageRouter>,
    pub images: ImageStore,
    pub idle_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

#[derive(Debug)]
enum SessionState {
    AwaitingIdentity,
    Active(Arc<Session>),
    Terminated,
}

pub struct SessionTask<R> {
    reader: FrameReader<R>,
    sink: Arc<dyn LineSink>,
    peer: SocketAddr,
    ctx: Arc<SessionContext>,
    state: SessionState,
}

impl<R: AsyncRead + Unpin> SessionTask<R> {
    pub fn new(
        reader: FrameReader<R>,
        sink: Arc<dyn LineSink>,
        peer: SocketAddr,
        ctx: Arc<SessionContext>,
    ) -> Self {
        Self {
            reader,
            sink,
            peer,
            ctx,
            state: SessionState::AwaitingIdentity,
        }
    }

    /// Runs the session to completion.
    ///
    /// # Errors
    ///
    /// Returns the fault that ended the session.  Departure processing and
    /// closing the connection have already happened by then.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let outcome = self.drive().await;
        self.depart().await;
        self.sink.close().await;
        outcome
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        match self.join().await? {
            Some(session) => self.serve(&session).await,
            None => Ok(()),
        }
    }

    async fn join(&mut self) -> Result<Option<Arc<Session>>, SessionError> {
        self.sink
            .send_line(IDENTITY_PROMPT)
            .await
            .map_err(ConnectionError::Io)?;

        let Some(line) = self.reader.next_line().await? else {
            debug!("{} disconnected before naming itself", self.peer);
            return Ok(None);
        };
        let Some(identity) = parse_identity(&line) else {
            debug!("{} sent a blank identity; closing", self.peer);
            return Ok(None);
        };

        let session = Arc::new(Session::new(identity, self.peer, Arc::clone(&self.sink)));
        let router = &self.ctx.router;
        router.registry().register(Arc::clone(&session)).await;
        self.state = SessionState::Active(Arc::clone(&session));
        info!("{} joined from {} ({})", session.identity(), self.peer, session.id());

        let notice = ServerLine::Joined {
            at: Timestamp::now(),
            user: session.identity().to_string(),
        };
        router
            .broadcast(&notice.to_string(), Some(session.id()))
            .await;
        router.announce_presence().await;
        Ok(Some(session))
    }

    async fn serve(&mut self, session: &Arc<Session>) -> Result<(), SessionError> {
        loop {
            let next = tokio::select! {
                biased;
                () = self.sink.failed() => {
                    debug!("{}: write side failed", session.identity());
                    return Err(SessionError::WriteFailed);
                }
                next = self.reader.next_line() => next?,
            };
            let Some(line) = next else {
                break;
            };
            let router = Arc::clone(&self.ctx.router);
            match parse_command(&line) {
                Ok(ClientCommand::Chat(text)) => {
                    let line = ServerLine::Chat {
                        at: Timestamp::now(),
                        from: session.identity().to_string(),
                        text,
                    }
                    .to_string();
                    router.broadcast(&line, Some(session.id())).await;
                    router.notify(session, &line).await;
                }
                Ok(ClientCommand::Private { target, body }) => {
                    router.send_private(session, &target, &body).await;
                }
                Ok(ClientCommand::Image(desc)) => self.upload(session, &desc).await?,
                Err(e) => {
                    debug!("{}: rejected command: {e}", session.identity());
                    router.notify(session, &e.to_string()).await;
                }
            }
        }
        debug!("{} closed the stream", session.identity());
        Ok(())
    }

    async fn upload(
        &mut self,
        session: &Arc<Session>,
        desc: &TransferDescriptor,
    ) -> Result<(), SessionError> {
        let router = Arc::clone(&self.ctx.router);
        match self.ctx.images.receive(&mut self.reader, desc).await {
            Ok(TransferOutcome::Stored { path, bytes }) => {
                info!("{} uploaded {bytes} bytes to {}", session.identity(), path.display());
                let notice = ServerLine::ImageAvailable {
                    at: Timestamp::now(),
                    path: path.display().to_string(),
                };
                router
                    .broadcast(&notice.to_string(), Some(session.id()))
                    .await;
                router.announce_presence().await;
                Ok(())
            }
            Ok(TransferOutcome::SizeMismatch { declared, received }) => {
                warn!(
                    "{}: upload of '{}' ended after {received} of {declared} bytes",
                    session.identity(),
                    desc.filename
                );
                router
                    .notify(session, &ServerLine::transfer_mismatch().to_string())
                    .await;
                Ok(())
            }
            Err(TransferError::Connection(e)) => Err(e.into()),
            Err(e) => {
                router
                    .notify(session, &ServerLine::transfer_error(&e).to_string())
                    .await;
                Err(SessionError::Transfer(e))
            }
        }
    }

    async fn depart(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::Terminated);
        let SessionState::Active(session) = previous else {
            return;
        };
        let router = &self.ctx.router;
        if !router.registry().deregister(session.id()).await {
            return;
        }
        info!("{} left ({})", session.identity(), self.peer);

        let notice = ServerLine::Left {
            at: Timestamp::now(),
            user: session.identity().to_string(),
        };
        router
            .broadcast(&notice.to_string(), Some(session.id()))
            .await;
        router.announce_presence().await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
