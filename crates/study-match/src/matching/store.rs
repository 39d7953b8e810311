//! Collaborator interfaces for the document store backing profiles, likes, and chats.
//!
//! The core only needs equality lookups, create-or-replace writes, create-if-absent, and
//! deletes keyed by deterministic ids. Any backend offering those can sit behind these
//! traits; [`crate::matching::memory::MemoryStore`] is the in-process implementation.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

use super::domain::{EdgeKey, LikeEdge, MatchThread, Message, Profile, ThreadId, Uid};

/// Error enumeration for collaborator failures. Every variant is transient.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("{operation} timed out after {limit:?}")]
    Timeout {
        operation: &'static str,
        limit: Duration,
    },
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Every profile whose uid differs from `uid`.
    async fn query_uid_not_equal(&self, uid: &Uid) -> Result<Vec<Profile>, StoreError>;
    async fn get(&self, uid: &Uid) -> Result<Option<Profile>, StoreError>;
    /// Create or replace.
    async fn put(&self, profile: Profile) -> Result<(), StoreError>;
    async fn delete(&self, uid: &Uid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LikeStore: Send + Sync {
    async fn get(&self, key: &EdgeKey) -> Result<Option<LikeEdge>, StoreError>;
    /// Create or replace; the edge key is the identity, so repeats never duplicate.
    async fn put(&self, edge: LikeEdge) -> Result<(), StoreError>;
    async fn delete(&self, key: &EdgeKey) -> Result<(), StoreError>;
    /// Every edge where `uid` is the liker or the liked user.
    async fn edges_touching(&self, uid: &Uid) -> Result<Vec<LikeEdge>, StoreError>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn get(&self, id: &ThreadId) -> Result<Option<MatchThread>, StoreError>;
    /// Insert `thread` unless a record with the same id exists; reports whether it inserted.
    async fn create_if_absent(&self, thread: MatchThread) -> Result<bool, StoreError>;
    /// Removes the thread together with its messages.
    async fn delete(&self, id: &ThreadId) -> Result<(), StoreError>;
    async fn threads_for(&self, uid: &Uid) -> Result<Vec<MatchThread>, StoreError>;
    async fn append_message(&self, id: &ThreadId, message: Message) -> Result<(), StoreError>;
    /// Messages in the order they were appended.
    async fn messages(&self, id: &ThreadId) -> Result<Vec<Message>, StoreError>;
    /// Ordered feed of messages appended after subscription.
    async fn subscribe(&self, id: &ThreadId) -> Result<broadcast::Receiver<Message>, StoreError>;
}

/// Bound a collaborator call by `limit`, surfacing expiry as [`StoreError::Timeout`].
pub(crate) async fn bounded<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, ?limit, "store call exceeded deadline");
            Err(StoreError::Timeout { operation, limit })
        }
    }
}
