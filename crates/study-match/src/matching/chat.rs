use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use super::domain::{Attachment, MatchThread, Message, MessageId, ThreadId, Uid};
use super::error::MatchError;
use super::ledger::MutualInterestLedger;
use super::store::{bounded, ChatStore, LikeStore};

static MESSAGE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_message_id() -> MessageId {
    let id = MESSAGE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    MessageId(format!("msg-{id:08}"))
}

/// Message body submitted by a thread member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A thread together with its messages in posting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadView {
    pub thread: MatchThread,
    pub messages: Vec<Message>,
}

/// Sidebar entry listing one of the user's threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: ThreadId,
    pub partner_uid: Uid,
    pub created_at: DateTime<Utc>,
}

/// Storage path for an attachment: `chats/{thread}/{millis}_{name}` with whitespace runs
/// in the file name collapsed to `_`.
pub fn attachment_path(thread: &ThreadId, file_name: &str, at: DateTime<Utc>) -> String {
    let mut safe = String::with_capacity(file_name.len());
    let mut in_whitespace = false;
    for ch in file_name.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                safe.push('_');
            }
            in_whitespace = true;
        } else {
            safe.push(ch);
            in_whitespace = false;
        }
    }
    format!("chats/{}/{}_{}", thread, at.timestamp_millis(), safe)
}

/// Per-pair messaging on top of the threads the ledger provisions.
pub struct ChatService<L, C> {
    ledger: Arc<MutualInterestLedger<L, C>>,
    chats: Arc<C>,
    timeout: Duration,
    max_attachments: usize,
}

impl<L, C> ChatService<L, C>
where
    L: LikeStore,
    C: ChatStore,
{
    pub fn new(
        ledger: Arc<MutualInterestLedger<L, C>>,
        chats: Arc<C>,
        timeout: Duration,
        max_attachments: usize,
    ) -> Self {
        Self {
            ledger,
            chats,
            timeout,
            max_attachments,
        }
    }

    /// Open the conversation between `viewer` and `other`, which may be the partner's uid
    /// or the thread id itself. Provisioning is re-run first so a thread lost to a crash
    /// reappears before it is displayed.
    pub async fn open_thread(&self, viewer: &Uid, other: &str) -> Result<ThreadView, MatchError> {
        let partner = ThreadId::partner_for(viewer, other);
        if !self.ledger.check_mutual(viewer, &partner).await? {
            return Err(MatchError::InvalidState(format!(
                "{viewer} and {partner} have not matched"
            )));
        }
        let thread = self.member_thread(viewer, &ThreadId::for_pair(viewer, &partner)).await?;

        let messages = bounded(self.timeout, "chats.messages", self.chats.messages(&thread.id))
            .await?;
        Ok(ThreadView { thread, messages })
    }

    pub async fn post_message(
        &self,
        sender: &Uid,
        other: &str,
        message: NewMessage,
    ) -> Result<Message, MatchError> {
        let id = ThreadId::resolve(sender, other);
        let thread = self.member_thread(sender, &id).await?;

        let text = message.text.trim().to_string();
        if text.is_empty() && message.attachments.is_empty() {
            return Err(MatchError::InvalidArgument(
                "a message needs text or at least one attachment".to_string(),
            ));
        }
        if message.attachments.len() > self.max_attachments {
            return Err(MatchError::InvalidArgument(format!(
                "at most {} attachments per message, got {}",
                self.max_attachments,
                message.attachments.len()
            )));
        }

        let stored = Message {
            id: next_message_id(),
            sender_uid: sender.clone(),
            text,
            created_at: Utc::now(),
            attachments: message.attachments,
        };
        bounded(
            self.timeout,
            "chats.append_message",
            self.chats.append_message(&thread.id, stored.clone()),
        )
        .await?;

        info!(thread = %thread.id, message = %stored.id.0, "message posted");
        Ok(stored)
    }

    pub async fn threads_for(&self, uid: &Uid) -> Result<Vec<ThreadSummary>, MatchError> {
        let threads = bounded(self.timeout, "chats.threads_for", self.chats.threads_for(uid))
            .await?;

        let mut summaries: Vec<ThreadSummary> = threads
            .into_iter()
            .filter_map(|thread| {
                let partner_uid = thread.partner_of(uid)?.clone();
                Some(ThreadSummary {
                    id: thread.id,
                    partner_uid,
                    created_at: thread.created_at,
                })
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    /// Ordered feed of messages posted to the thread after this call.
    pub async fn subscribe(
        &self,
        viewer: &Uid,
        other: &str,
    ) -> Result<broadcast::Receiver<Message>, MatchError> {
        let id = ThreadId::resolve(viewer, other);
        let thread = self.member_thread(viewer, &id).await?;
        Ok(bounded(self.timeout, "chats.subscribe", self.chats.subscribe(&thread.id)).await?)
    }

    async fn member_thread(&self, uid: &Uid, id: &ThreadId) -> Result<MatchThread, MatchError> {
        let thread = bounded(self.timeout, "chats.get", self.chats.get(id))
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("thread {id}")))?;

        if !thread.includes(uid) {
            return Err(MatchError::InvalidArgument(format!(
                "{uid} is not a member of thread {id}"
            )));
        }
        Ok(thread)
    }
}
