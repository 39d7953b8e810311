use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{EdgeKey, LikeEdge, MatchThread, PairState, ThreadId, Uid};
use super::error::MatchError;
use super::store::{bounded, ChatStore, LikeStore};

/// Records directed likes and provisions a chat thread the moment a pair becomes mutual.
///
/// No locks are taken. Edge writes are keyed by the ordered pair and thread creation is a
/// create-if-absent keyed by the unordered pair, so concurrent sessions converge on one
/// edge per direction and exactly one thread.
pub struct MutualInterestLedger<L, C> {
    likes: Arc<L>,
    chats: Arc<C>,
    timeout: Duration,
}

/// Counts removed when a user's ledger history is purged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeSummary {
    pub edges_removed: usize,
    pub threads_removed: usize,
}

impl<L, C> MutualInterestLedger<L, C>
where
    L: LikeStore,
    C: ChatStore,
{
    pub fn new(likes: Arc<L>, chats: Arc<C>, timeout: Duration) -> Self {
        Self {
            likes,
            chats,
            timeout,
        }
    }

    /// Record that `liker` is interested in `liked`. Repeating the call is a no-op that
    /// returns the edge recorded the first time.
    pub async fn like(&self, liker: &Uid, liked: &Uid) -> Result<LikeEdge, MatchError> {
        ensure_distinct(liker, liked, "like")?;

        let key = EdgeKey::new(liker, liked);
        if let Some(existing) = self.edge(&key).await? {
            debug!(edge = %key, "like already recorded");
            return Ok(existing);
        }

        let edge = LikeEdge {
            liker_uid: liker.clone(),
            liked_uid: liked.clone(),
            liked_at: Utc::now(),
        };
        bounded(self.timeout, "likes.put", self.likes.put(edge.clone())).await?;
        info!(edge = %key, "like recorded");
        Ok(edge)
    }

    /// Withdraw a one-sided like. Absent edges are a no-op; matched pairs are rejected
    /// because nothing defines how a thread would be unwound.
    pub async fn unlike(&self, disliker: &Uid, disliked: &Uid) -> Result<(), MatchError> {
        let key = EdgeKey::new(disliker, disliked);
        let Some(forward) = self.edge(&key).await? else {
            debug!(edge = %key, "unlike on absent edge");
            return Ok(());
        };

        if self.edge(&key.reversed()).await?.is_some() {
            return Err(matched_pair(disliker, disliked));
        }

        bounded(self.timeout, "likes.delete", self.likes.delete(&key)).await?;

        // A like back may have landed between the check and the delete.
        if self.edge(&key.reversed()).await?.is_some() {
            bounded(self.timeout, "likes.put", self.likes.put(forward)).await?;
            self.check_mutual(disliker, disliked).await?;
            warn!(edge = %key, "like back raced the withdrawal; edge restored");
            return Err(matched_pair(disliker, disliked));
        }

        info!(edge = %key, "like withdrawn");
        Ok(())
    }

    /// True iff both directed edges exist. When they do, the pair's thread is guaranteed
    /// to exist before this returns.
    pub async fn check_mutual(&self, a: &Uid, b: &Uid) -> Result<bool, MatchError> {
        ensure_distinct(a, b, "check_mutual")?;

        if self.pair_state(a, b).await? != PairState::Matched {
            return Ok(false);
        }

        Ok(self.provision_thread(a, b).await? != Provisioned::Withdrawn)
    }

    pub async fn pair_state(&self, a: &Uid, b: &Uid) -> Result<PairState, MatchError> {
        let forward = EdgeKey::new(a, b);
        let backward = forward.reversed();
        let state = match (
            self.edge(&forward).await?.is_some(),
            self.edge(&backward).await?.is_some(),
        ) {
            (true, true) => PairState::Matched,
            (true, false) => PairState::OneSided {
                liker: a.clone(),
                liked: b.clone(),
            },
            (false, true) => PairState::OneSided {
                liker: b.clone(),
                liked: a.clone(),
            },
            (false, false) => PairState::NoInterest,
        };
        Ok(state)
    }

    /// Whether a like exists between the pair in either direction.
    pub async fn is_linked(&self, a: &Uid, b: &Uid) -> Result<bool, MatchError> {
        let forward = EdgeKey::new(a, b);
        if self.edge(&forward).await?.is_some() {
            return Ok(true);
        }
        Ok(self.edge(&forward.reversed()).await?.is_some())
    }

    /// Re-run thread provisioning for every mutual pair involving `uid`, returning the ids
    /// of threads that were missing. Repairs a crash between the second like and thread
    /// creation.
    pub async fn reconcile(&self, uid: &Uid) -> Result<Vec<ThreadId>, MatchError> {
        let edges = bounded(
            self.timeout,
            "likes.edges_touching",
            self.likes.edges_touching(uid),
        )
        .await?;
        let keys: BTreeSet<EdgeKey> = edges.iter().map(LikeEdge::key).collect();

        let mut healed = Vec::new();
        for key in keys.iter().filter(|key| &key.liker == uid) {
            if !keys.contains(&key.reversed()) {
                continue;
            }
            if self.provision_thread(&key.liker, &key.liked).await? == Provisioned::Created {
                let id = ThreadId::for_pair(&key.liker, &key.liked);
                warn!(thread = %id, "recreated missing thread for mutual like");
                healed.push(id);
            }
        }
        Ok(healed)
    }

    /// Remove every edge touching `uid`, then every thread containing `uid`.
    ///
    /// Edges go first. A provisioning call that read both edges before they were removed
    /// re-checks the pair after creating its thread and discards it.
    pub async fn purge(&self, uid: &Uid) -> Result<PurgeSummary, MatchError> {
        let edges = bounded(
            self.timeout,
            "likes.edges_touching",
            self.likes.edges_touching(uid),
        )
        .await?;
        for edge in &edges {
            bounded(self.timeout, "likes.delete", self.likes.delete(&edge.key())).await?;
        }

        let threads = bounded(self.timeout, "chats.threads_for", self.chats.threads_for(uid))
            .await?;
        for thread in &threads {
            bounded(self.timeout, "chats.delete", self.chats.delete(&thread.id)).await?;
        }

        let summary = PurgeSummary {
            edges_removed: edges.len(),
            threads_removed: threads.len(),
        };
        info!(%uid, ?summary, "purged ledger history");
        Ok(summary)
    }

    async fn provision_thread(&self, a: &Uid, b: &Uid) -> Result<Provisioned, MatchError> {
        let thread = MatchThread::for_pair(a, b, Utc::now());
        let id = thread.id.clone();
        let created = bounded(
            self.timeout,
            "chats.create_if_absent",
            self.chats.create_if_absent(thread),
        )
        .await?;
        if !created {
            return Ok(Provisioned::Existing);
        }

        // An unlike or purge may have removed an edge after the caller saw both.
        if self.pair_state(a, b).await? != PairState::Matched {
            bounded(self.timeout, "chats.delete", self.chats.delete(&id)).await?;
            warn!(thread = %id, "pair no longer mutual, discarded new thread");
            return Ok(Provisioned::Withdrawn);
        }

        info!(thread = %id, "mutual match, chat thread created");
        Ok(Provisioned::Created)
    }

    async fn edge(&self, key: &EdgeKey) -> Result<Option<LikeEdge>, MatchError> {
        Ok(bounded(self.timeout, "likes.get", self.likes.get(key)).await?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provisioned {
    Existing,
    Created,
    /// Created, then deleted because the pair stopped being mutual.
    Withdrawn,
}

fn matched_pair(a: &Uid, b: &Uid) -> MatchError {
    MatchError::InvalidState(format!("{a} and {b} are matched; likes cannot be withdrawn"))
}

fn ensure_distinct(a: &Uid, b: &Uid, operation: &str) -> Result<(), MatchError> {
    if a == b {
        return Err(MatchError::InvalidArgument(format!(
            "{operation} requires two different users, got {a} twice"
        )));
    }
    Ok(())
}
