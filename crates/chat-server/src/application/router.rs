//! MessageRouter: decides who receives a line and delivers it.
//!
//! All routing decisions are taken against a registry snapshot.  The lock is
//! released before any bytes are written, so one slow client cannot stall
//! joins and leaves elsewhere on the server.
//!
//! The flip side is ordering between fan-outs.  Two presence announcements
//! run concurrently, and one of them can be held up by a recipient that is
//! slow to drain (up to the write timeout).  A client may then receive an
//! older `/users` list after a newer one and show a departed member until
//! the next join or leave.
//!
//! # Fault isolation
//!
//! A failed write to one recipient is logged and skipped; the remaining
//! recipients still receive the line and the sender is never told.  A failed
//! history append is logged and otherwise ignored.

use std::sync::Arc;

use chat_core::{ServerLine, Timestamp};
use tracing::{debug, warn};

use super::history::HistorySink;
use super::registry::SessionRegistry;
use super::session::{Session, SessionId};

/// Outcome of [`MessageRouter::send_private`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivateDelivery {
    Delivered,
    TargetNotFound,
}

pub struct MessageRouter {
    registry: Arc<SessionRegistry>,
    history: Arc<dyn HistorySink>,
}

impl MessageRouter {
    pub fn new(registry: Arc<SessionRegistry>, history: Arc<dyn HistorySink>) -> Self {
        Self { registry, history }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Delivers `text` to every member except `excluding`, then records it in
    /// history once.
    ///
    /// Returns the number of recipients that accepted the line.
    pub async fn broadcast(&self, text: &str, excluding: Option<SessionId>) -> usize {
        let recipients = self.registry.snapshot().await;
        let mut delivered = 0;
        for session in recipients.iter().filter(|s| Some(s.id()) != excluding) {
            if deliver(session, text).await {
                delivered += 1;
            }
        }
        self.record(text).await;
        delivered
    }

    /// Sends a private line from `from` to the first member named `to`.
    ///
    /// Both parties receive the formatted line; if `from` addressed itself it
    /// receives it once.  When nobody is named `to`, only `from` is told and
    /// nothing is recorded.
    pub async fn send_private(&self, from: &Session, to: &str, text: &str) -> PrivateDelivery {
        let Some(target) = self.registry.find_by_identity(to).await else {
            self.notify(from, &ServerLine::user_not_found(to).to_string())
                .await;
            return PrivateDelivery::TargetNotFound;
        };

        let line = ServerLine::Private {
            at: Timestamp::now(),
            from: from.identity().to_string(),
            to: to.to_string(),
            text: text.to_string(),
        }
        .to_string();

        deliver(&target, &line).await;
        if target.id() != from.id() {
            deliver(from, &line).await;
        }
        self.record(&line).await;
        PrivateDelivery::Delivered
    }

    /// Sends the full `/users` list to every member, nobody excluded.
    ///
    /// Not ordered against concurrent announcements; see the module docs.
    pub async fn announce_presence(&self) {
        let members = self.registry.snapshot().await;
        let line = ServerLine::Users(
            members
                .iter()
                .map(|m| m.identity().to_string())
                .collect(),
        )
        .to_string();
        for session in &members {
            deliver(session, &line).await;
        }
    }

    /// Sends a notice to one session.  Not recorded in history.
    pub async fn notify(&self, session: &Session, text: &str) {
        deliver(session, text).await;
    }

    async fn record(&self, text: &str) {
        if let Err(e) = self.history.append(text).await {
            warn!("history append failed: {e}");
        }
    }
}

/// Writes one line, logging instead of propagating failure.
async fn deliver(session: &Session, text: &str) -> bool {
    match session.send(text).await {
        Ok(()) => true,
        Err(e) => {
            debug!(
                "delivery to {} ({}) failed: {e}",
                session.identity(),
                session.peer()
            );
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::application::history::{HistoryError, MockHistorySink};
    use crate::application::session::test_support::{peer, recorded_session, RecordingSink};

    /// History double that accepts any number of appends.
    fn permissive_history() -> MockHistorySink {
        let mut history = MockHistorySink::new();
        history.expect_append().returning(|_| Ok(()));
        history
    }

    async fn router_with(
        history: MockHistorySink,
        names: &[&str],
    ) -> (MessageRouter, Vec<(Arc<Session>, Arc<RecordingSink>)>) {
        let registry = Arc::new(SessionRegistry::new());
        let mut sessions = Vec::new();
        for name in names {
            let (s, sink) = recorded_session(name);
            registry.register(Arc::clone(&s)).await;
            sessions.push((s, sink));
        }
        (MessageRouter::new(registry, Arc::new(history)), sessions)
    }

    // ── broadcast ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_but_excluded_sender() {
        // Arrange
        let (router, s) = router_with(permissive_history(), &["alice", "bob", "carol"]).await;
        let alice = &s[0].0;

        // Act
        let delivered = router
            .broadcast("[12:00:00] [Global] alice: hi", Some(alice.id()))
            .await;

        // Assert
        assert_eq!(delivered, 2);
        assert!(s[0].1.lines().is_empty());
        assert_eq!(s[1].1.lines(), vec!["[12:00:00] [Global] alice: hi"]);
        assert_eq!(s[2].1.lines(), vec!["[12:00:00] [Global] alice: hi"]);
    }

    #[tokio::test]
    async fn test_broadcast_without_exclusion_reaches_everyone() {
        let (router, s) = router_with(permissive_history(), &["alice", "bob"]).await;
        assert_eq!(router.broadcast("notice", None).await, 2);
        assert_eq!(s[0].1.lines(), vec!["notice"]);
    }

    #[tokio::test]
    async fn test_broadcast_appends_history_exactly_once() {
        let mut history = MockHistorySink::new();
        history
            .expect_append()
            .withf(|record: &str| record == "line")
            .times(1)
            .returning(|_| Ok(()));
        let (router, _s) = router_with(history, &["alice", "bob", "carol"]).await;

        router.broadcast("line", None).await;
    }

    #[tokio::test]
    async fn test_broadcast_isolates_failing_recipient() {
        // Arrange: bob's sink fails on every write
        let registry = Arc::new(SessionRegistry::new());
        let (alice, alice_sink) = recorded_session("alice");
        let bob = Arc::new(Session::new("bob", peer(), Arc::new(RecordingSink::failing())));
        let (carol, carol_sink) = recorded_session("carol");
        for s in [&alice, &bob, &carol] {
            registry.register(Arc::clone(s)).await;
        }
        let router = MessageRouter::new(registry, Arc::new(permissive_history()));

        // Act
        let delivered = router.broadcast("hello", None).await;

        // Assert: alice and carol still receive it
        assert_eq!(delivered, 2);
        assert_eq!(alice_sink.lines(), vec!["hello"]);
        assert_eq!(carol_sink.lines(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_broadcast_survives_history_failure() {
        let mut history = MockHistorySink::new();
        history.expect_append().times(1).returning(|_| {
            Err(HistoryError::Io {
                path: PathBuf::from("/nope/chat_history.txt"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        });
        let (router, s) = router_with(history, &["alice", "bob"]).await;

        assert_eq!(router.broadcast("still delivered", None).await, 2);
        assert_eq!(s[1].1.lines(), vec!["still delivered"]);
    }

    // ── send_private ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_private_reaches_sender_and_target_only() {
        // Arrange
        let mut history = MockHistorySink::new();
        history
            .expect_append()
            .withf(|record: &str| record.ends_with("[Private] alice -> bob: psst"))
            .times(1)
            .returning(|_| Ok(()));
        let (router, s) = router_with(history, &["alice", "bob", "carol"]).await;

        // Act
        let outcome = router.send_private(&s[0].0, "bob", "psst").await;

        // Assert
        assert_eq!(outcome, PrivateDelivery::Delivered);
        let alice_lines = s[0].1.lines();
        let bob_lines = s[1].1.lines();
        assert_eq!(alice_lines.len(), 1);
        assert_eq!(bob_lines.len(), 1);
        assert!(alice_lines[0].contains("alice -> bob"));
        assert_eq!(alice_lines, bob_lines);
        assert!(s[2].1.lines().is_empty(), "carol must receive nothing");
    }

    #[tokio::test]
    async fn test_private_to_absent_user_notifies_sender_only() {
        let mut history = MockHistorySink::new();
        history.expect_append().never();
        let (router, s) = router_with(history, &["alice", "bob"]).await;

        let outcome = router.send_private(&s[0].0, "dave", "hello?").await;

        assert_eq!(outcome, PrivateDelivery::TargetNotFound);
        assert_eq!(s[0].1.lines(), vec!["User dave not found."]);
        assert!(s[1].1.lines().is_empty());
    }

    #[tokio::test]
    async fn test_private_to_self_is_delivered_once() {
        let (router, s) = router_with(permissive_history(), &["alice"]).await;

        router.send_private(&s[0].0, "alice", "note to self").await;

        assert_eq!(s[0].1.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_private_goes_to_first_matching_identity() {
        let (router, s) = router_with(permissive_history(), &["alice", "bob", "bob"]).await;

        router.send_private(&s[0].0, "bob", "which one?").await;

        assert_eq!(s[1].1.lines().len(), 1);
        assert!(s[2].1.lines().is_empty());
    }

    // ── announce_presence / notify ───────────────────────────────────────────

    #[tokio::test]
    async fn test_announce_presence_sends_user_list_to_everyone() {
        let mut history = MockHistorySink::new();
        history.expect_append().never();
        let (router, s) = router_with(history, &["alice", "bob"]).await;

        router.announce_presence().await;

        for (_, sink) in &s {
            assert_eq!(sink.lines(), vec!["/users alice,bob"]);
        }
    }

    #[tokio::test]
    async fn test_notify_is_not_recorded() {
        let mut history = MockHistorySink::new();
        history.expect_append().never();
        let (router, s) = router_with(history, &["alice"]).await;

        router.notify(&s[0].0, "Invalid image message format.").await;

        assert_eq!(s[0].1.lines(), vec!["Invalid image message format."]);
    }
}
