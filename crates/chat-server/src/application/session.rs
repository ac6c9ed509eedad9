//! Sessions: one connected client that has declared its identity.
//!
//! A [`Session`] is created by the session task once the first line (the
//! display name) has been read.  It owns an output capability, a
//! [`LineSink`], that any task may call.  The router writes to *other*
//! sessions' sinks from the sender's task, so every sink implementation must
//! serialize its own writes.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

/// Server-assigned identifier.  Display names are not unique, so the registry
/// tracks membership by this id instead.
pub type SessionId = Uuid;

/// Output side of one client connection.
///
/// The infrastructure implementation wraps a socket write half; tests use a
/// recording double.
#[async_trait]
pub trait LineSink: Send + Sync {
    /// Writes `line` followed by a single `\n`.
    ///
    /// Concurrent callers must never interleave bytes of different lines.
    async fn send_line(&self, line: &str) -> io::Result<()>;

    /// Closes the underlying stream.  Only the first call has an effect.
    async fn close(&self);

    /// Resolves once a write on this sink has failed, whichever task issued
    /// it.  Pending forever while every write succeeds.
    async fn failed(&self);
}

/// Latches the first write failure of a sink.
///
/// Deliveries to a session happen on other sessions' tasks, so the owning
/// session task waits on this instead of seeing the error itself.
#[derive(Debug, Default)]
pub struct WriteFault {
    tripped: AtomicBool,
    notify: Notify,
}

impl WriteFault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure.  Later calls are no-ops.
    pub fn trip(&self) {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Waits until [`trip`](Self::trip) has been called.
    pub async fn wait(&self) {
        loop {
            // Registered before the check, so a concurrent trip is not missed.
            let notified = self.notify.notified();
            if self.is_tripped() {
                return;
            }
            notified.await;
        }
    }
}

/// A joined client.
pub struct Session {
    id: SessionId,
    identity: String,
    peer: SocketAddr,
    sink: Arc<dyn LineSink>,
}

impl Session {
    /// Binds `identity` to a connection.  A fresh [`SessionId`] is generated.
    pub fn new(identity: impl Into<String>, peer: SocketAddr, sink: Arc<dyn LineSink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity: identity.into(),
            peer,
            sink,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Display name declared on the first line.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Sends one line to this client.
    pub async fn send(&self, line: &str) -> io::Result<()> {
        self.sink.send_line(line).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("peer", &self.peer)
            .finish()
    }
}

// ── Test doubles ──────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use super::*;

    /// Records every line instead of writing to a socket.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        lines: Mutex<Vec<String>>,
        close_calls: AtomicUsize,
        /// Number of lines accepted before every write fails.
        accept_limit: Option<usize>,
        fault: WriteFault,
    }

    impl RecordingSink {
        pub(crate) fn failing() -> Self {
            Self::failing_after(0)
        }

        pub(crate) fn failing_after(accepted: usize) -> Self {
            Self {
                accept_limit: Some(accepted),
                ..Self::default()
            }
        }

        pub(crate) fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        pub(crate) fn close_calls(&self) -> usize {
            self.close_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LineSink for RecordingSink {
        async fn send_line(&self, line: &str) -> io::Result<()> {
            let mut lines = self.lines.lock().unwrap();
            if self.accept_limit.is_some_and(|limit| lines.len() >= limit) {
                self.fault.trip();
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "injected failure"));
            }
            lines.push(line.to_string());
            Ok(())
        }

        async fn close(&self) {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
        }

        async fn failed(&self) {
            self.fault.wait().await;
        }
    }

    pub(crate) fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    /// Builds a session backed by a fresh recording sink.
    pub(crate) fn recorded_session(name: &str) -> (Arc<Session>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let session = Arc::new(Session::new(name, peer(), sink.clone()));
        (session, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_sessions_with_same_name_get_distinct_ids() {
        let (a, _) = recorded_session("alice");
        let (b, _) = recorded_session("alice");
        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_send_forwards_line_to_sink() {
        let (session, sink) = recorded_session("alice");
        session.send("hello").await.unwrap();
        assert_eq!(sink.lines(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_send_surfaces_sink_failure() {
        let sink = Arc::new(RecordingSink::failing());
        let session = Session::new("bob", peer(), sink);
        assert!(session.send("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_write_fault_wakes_waiter_tripped_from_another_task() {
        // Arrange
        let fault = Arc::new(WriteFault::new());
        let waiter = {
            let fault = Arc::clone(&fault);
            tokio::spawn(async move { fault.wait().await })
        };
        tokio::task::yield_now().await;

        // Act
        fault.trip();
        fault.trip();

        // Assert
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(fault.is_tripped());
    }

    #[tokio::test]
    async fn test_write_fault_wait_returns_at_once_when_already_tripped() {
        let fault = WriteFault::new();
        fault.trip();

        fault.wait().await;
    }
}
