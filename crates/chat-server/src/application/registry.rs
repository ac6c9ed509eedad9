//! SessionRegistry: the authoritative set of online sessions.
//!
//! A session is a member from the moment its task finishes join processing
//! until its task starts departure processing.  Every mutation and every
//! snapshot goes through the same `tokio::sync::Mutex`, so the router never
//! observes a half-applied join or leave.
//!
//! # Why a `Vec` and not a `HashMap`?
//!
//! The registry is small (one entry per connected client) and `/users` lists
//! are nicer when they come out in join order.  Membership is keyed on
//! [`SessionId`], never on the display name, because names are not unique.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::session::{Session, SessionId};

#[derive(Default)]
pub struct SessionRegistry {
    members: Mutex<Vec<Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `session`.  Returns `false` (and changes nothing) when it is
    /// already a member.
    pub async fn register(&self, session: Arc<Session>) -> bool {
        let mut members = self.members.lock().await;
        if members.iter().any(|m| m.id() == session.id()) {
            return false;
        }
        members.push(session);
        true
    }

    /// Removes the session with `id`.  Returns `false` when it was not a
    /// member, which makes repeated departures harmless.
    pub async fn deregister(&self, id: SessionId) -> bool {
        let mut members = self.members.lock().await;
        let before = members.len();
        members.retain(|m| m.id() != id);
        members.len() != before
    }

    /// Point-in-time copy of the member list.
    pub async fn snapshot(&self) -> Vec<Arc<Session>> {
        self.members.lock().await.clone()
    }

    /// Display names of all members, in join order.
    pub async fn identity_list(&self) -> Vec<String> {
        self.members
            .lock()
            .await
            .iter()
            .map(|m| m.identity().to_string())
            .collect()
    }

    /// First member whose identity equals `identity`.
    pub async fn find_by_identity(&self, identity: &str) -> Option<Arc<Session>> {
        self.members
            .lock()
            .await
            .iter()
            .find(|m| m.identity() == identity)
            .cloned()
    }

}

#[cfg(test)]
impl SessionRegistry {
    pub(crate) async fn contains(&self, id: SessionId) -> bool {
        self.members.lock().await.iter().any(|m| m.id() == id)
    }

    pub(crate) async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    pub(crate) async fn is_empty(&self) -> bool {
        self.members.lock().await.is_empty()
    }
}
