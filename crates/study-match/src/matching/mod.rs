//! Study-partner matching: profile lifecycle, compatibility scoring, candidate selection,
//! the mutual-interest ledger, and the chat threads a mutual match unlocks.

pub mod chat;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod profiles;
pub mod router;
pub mod scoring;
pub mod selector;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use chat::{attachment_path, ChatService, NewMessage, ThreadSummary, ThreadView};
pub use domain::{
    Attachment, EdgeKey, LearningStyle, LikeEdge, MatchThread, Message, MessageId, PairState,
    PreferredSchedule, Profile, ProfileUpdate, ThreadId, Uid,
};
pub use error::MatchError;
pub use ledger::{MutualInterestLedger, PurgeSummary};
pub use memory::MemoryStore;
pub use profiles::{AccountDeletion, ProfileDirectory, ProfileViolation};
pub use router::matching_router;
pub use scoring::{rank, score, ScoredCandidate};
pub use selector::CandidateSelector;
pub use service::{ConnectOutcome, MatchingService, SessionSnapshot};
pub use store::{ChatStore, LikeStore, ProfileStore, StoreError};
