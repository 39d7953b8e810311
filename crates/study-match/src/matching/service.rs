use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::chat::ChatService;
use super::domain::{Profile, ThreadId, Uid};
use super::error::MatchError;
use super::ledger::MutualInterestLedger;
use super::profiles::ProfileDirectory;
use super::scoring::{rank, ScoredCandidate};
use super::selector::CandidateSelector;
use super::store::{ChatStore, LikeStore, ProfileStore};
use crate::config::MatchingConfig;

/// Result of a "connect" action on a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOutcome {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
}

/// State handed to the caller when a user's session begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub profile: Profile,
    pub healed_threads: Vec<ThreadId>,
}

/// Facade composing the profile directory, selector, scorer, ledger, and chat.
pub struct MatchingService<P, L, C> {
    profiles: ProfileDirectory<P, L, C>,
    selector: CandidateSelector<P, L, C>,
    ledger: Arc<MutualInterestLedger<L, C>>,
    chat: ChatService<L, C>,
    config: MatchingConfig,
}

impl<P, L, C> MatchingService<P, L, C>
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    pub fn new(profiles: Arc<P>, likes: Arc<L>, chats: Arc<C>, config: MatchingConfig) -> Self {
        let ledger = Arc::new(MutualInterestLedger::new(
            likes,
            chats.clone(),
            config.store_timeout,
        ));
        let selector =
            CandidateSelector::new(profiles.clone(), ledger.clone(), config.store_timeout);
        let chat = ChatService::new(
            ledger.clone(),
            chats,
            config.store_timeout,
            config.max_attachments,
        );
        let profiles = ProfileDirectory::new(profiles, ledger.clone(), config.clone());

        Self {
            profiles,
            selector,
            ledger,
            chat,
            config,
        }
    }

    pub fn profiles(&self) -> &ProfileDirectory<P, L, C> {
        &self.profiles
    }

    pub fn selector(&self) -> &CandidateSelector<P, L, C> {
        &self.selector
    }

    pub fn ledger(&self) -> &MutualInterestLedger<L, C> {
        &self.ledger
    }

    pub fn chat(&self) -> &ChatService<L, C> {
        &self.chat
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Ensure the user's profile exists and repair any thread lost between a mutual like
    /// and its provisioning.
    pub async fn start_session(&self, uid: &Uid) -> Result<SessionSnapshot, MatchError> {
        let profile = self.profiles.ensure_profile(uid).await?;
        let healed_threads = self.ledger.reconcile(uid).await?;
        info!(%uid, healed = healed_threads.len(), "session started");
        Ok(SessionSnapshot {
            profile,
            healed_threads,
        })
    }

    /// Candidates for `viewer`, scored against the viewer's profile and sorted for display.
    /// `count` falls back to the configured default.
    pub async fn top_matches(
        &self,
        viewer: &Uid,
        count: Option<usize>,
    ) -> Result<Vec<ScoredCandidate>, MatchError> {
        let me = self.profiles.get_profile(viewer).await?;
        let count = count.unwrap_or(self.config.default_candidate_count);
        let candidates = self.selector.select_candidates(viewer, count).await?;
        Ok(rank(&me, candidates))
    }

    /// Like `candidate` and report whether that completed a mutual match.
    pub async fn connect(
        &self,
        viewer: &Uid,
        candidate: &Uid,
    ) -> Result<ConnectOutcome, MatchError> {
        self.ledger.like(viewer, candidate).await?;
        let matched = self.ledger.check_mutual(viewer, candidate).await?;
        Ok(ConnectOutcome {
            matched,
            thread_id: matched.then(|| ThreadId::for_pair(viewer, candidate)),
        })
    }
}
