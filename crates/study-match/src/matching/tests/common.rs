use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::{broadcast, Notify};

use crate::config::MatchingConfig;
use crate::matching::domain::{
    EdgeKey, LearningStyle, LikeEdge, MatchThread, Message, PreferredSchedule, Profile, ThreadId,
    Uid,
};
use crate::matching::ledger::MutualInterestLedger;
use crate::matching::memory::MemoryStore;
use crate::matching::service::MatchingService;
use crate::matching::store::{ChatStore, LikeStore, ProfileStore, StoreError};

pub(super) fn uid(value: &str) -> Uid {
    Uid::new(value)
}

pub(super) fn matching_config() -> MatchingConfig {
    MatchingConfig {
        store_timeout: Duration::from_millis(200),
        ..MatchingConfig::default()
    }
}

pub(super) fn profile(id: &str, name: &str) -> Profile {
    Profile {
        name: name.to_string(),
        ..Profile::empty(uid(id))
    }
}

/// Viewer from the worked scoring example.
pub(super) fn viewer_profile() -> Profile {
    Profile {
        uid: uid("viewer"),
        name: "Vera".to_string(),
        major: "CS".to_string(),
        years_of_study: "2".to_string(),
        description: "Looking for a data structures study buddy".to_string(),
        current_subjects: vec!["CS101".to_string(), "CS102".to_string()],
        preferred_schedule: Some(PreferredSchedule::WeekdayEarlyEvening),
        learning_style: Some(LearningStyle::Visual),
        avatar_image: None,
    }
}

/// Candidate from the worked scoring example; scores 70 against [`viewer_profile`].
pub(super) fn candidate_profile() -> Profile {
    Profile {
        uid: uid("candidate"),
        name: "Cam".to_string(),
        major: "cs ".to_string(),
        years_of_study: "3".to_string(),
        description: String::new(),
        current_subjects: vec!["CS101".to_string(), "CS103".to_string()],
        preferred_schedule: Some(PreferredSchedule::WeekdayEarlyEvening),
        learning_style: Some(LearningStyle::Visual),
        avatar_image: None,
    }
}

pub(super) fn build_ledger(
    store: &Arc<MemoryStore>,
) -> Arc<MutualInterestLedger<MemoryStore, MemoryStore>> {
    Arc::new(MutualInterestLedger::new(
        store.clone(),
        store.clone(),
        matching_config().store_timeout,
    ))
}

pub(super) type MemoryService = MatchingService<MemoryStore, MemoryStore, MemoryStore>;

pub(super) fn build_service_with(profiles: Vec<Profile>) -> (MemoryService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_profiles(profiles));
    let service = MatchingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        matching_config(),
    );
    (service, store)
}

pub(super) fn build_service() -> (MemoryService, Arc<MemoryStore>) {
    build_service_with(vec![viewer_profile(), candidate_profile()])
}

/// Write an edge straight into the store, bypassing the ledger.
pub(super) async fn raw_like(store: &MemoryStore, liker: &str, liked: &str) {
    LikeStore::put(
        store,
        LikeEdge {
            liker_uid: uid(liker),
            liked_uid: uid(liked),
            liked_at: chrono::Utc::now(),
        },
    )
    .await
    .expect("edge stored");
}

pub(super) async fn thread_exists(store: &MemoryStore, a: &str, b: &str) -> bool {
    ChatStore::get(store, &ThreadId::for_pair(&uid(a), &uid(b)))
        .await
        .expect("thread lookup")
        .is_some()
}

/// Every call fails as if the backend were offline.
pub(super) struct UnavailableStore;

fn offline() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

#[async_trait]
impl ProfileStore for UnavailableStore {
    async fn query_uid_not_equal(&self, _uid: &Uid) -> Result<Vec<Profile>, StoreError> {
        Err(offline())
    }

    async fn get(&self, _uid: &Uid) -> Result<Option<Profile>, StoreError> {
        Err(offline())
    }

    async fn put(&self, _profile: Profile) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn delete(&self, _uid: &Uid) -> Result<(), StoreError> {
        Err(offline())
    }
}

#[async_trait]
impl LikeStore for UnavailableStore {
    async fn get(&self, _key: &EdgeKey) -> Result<Option<LikeEdge>, StoreError> {
        Err(offline())
    }

    async fn put(&self, _edge: LikeEdge) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn delete(&self, _key: &EdgeKey) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn edges_touching(&self, _uid: &Uid) -> Result<Vec<LikeEdge>, StoreError> {
        Err(offline())
    }
}

#[async_trait]
impl ChatStore for UnavailableStore {
    async fn get(&self, _id: &ThreadId) -> Result<Option<MatchThread>, StoreError> {
        Err(offline())
    }

    async fn create_if_absent(&self, _thread: MatchThread) -> Result<bool, StoreError> {
        Err(offline())
    }

    async fn delete(&self, _id: &ThreadId) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn threads_for(&self, _uid: &Uid) -> Result<Vec<MatchThread>, StoreError> {
        Err(offline())
    }

    async fn append_message(&self, _id: &ThreadId, _message: Message) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn messages(&self, _id: &ThreadId) -> Result<Vec<Message>, StoreError> {
        Err(offline())
    }

    async fn subscribe(&self, _id: &ThreadId) -> Result<broadcast::Receiver<Message>, StoreError> {
        Err(offline())
    }
}

/// Profile store whose queries never complete, for exercising timeouts.
pub(super) struct StalledProfiles;

#[async_trait]
impl ProfileStore for StalledProfiles {
    async fn query_uid_not_equal(&self, _uid: &Uid) -> Result<Vec<Profile>, StoreError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    async fn get(&self, _uid: &Uid) -> Result<Option<Profile>, StoreError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }

    async fn put(&self, _profile: Profile) -> Result<(), StoreError> {
        Ok(())
    }

    async fn delete(&self, _uid: &Uid) -> Result<(), StoreError> {
        Ok(())
    }
}

/// One-shot pause point: the first call after [`Gate::arm`] parks until [`Gate::open`].
#[derive(Default)]
pub(super) struct Gate {
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl Gate {
    pub(super) fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Wait until a call is parked at the gate.
    pub(super) async fn reached(&self) {
        self.reached.notified().await;
    }

    pub(super) fn open(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
    }
}

/// In-memory likes and chats that can hold an edge delete or a thread creation in flight
/// while other sessions interleave.
pub(super) struct GatedStore {
    inner: Arc<MemoryStore>,
    pub(super) like_delete: Gate,
    pub(super) thread_create: Gate,
}

impl GatedStore {
    pub(super) fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            like_delete: Gate::default(),
            thread_create: Gate::default(),
        }
    }
}

/// Ledger over a [`GatedStore`] with a timeout long enough to sit at a gate.
pub(super) fn build_gated_ledger(
    store: &Arc<MemoryStore>,
) -> (Arc<GatedStore>, Arc<MutualInterestLedger<GatedStore, GatedStore>>) {
    let gated = Arc::new(GatedStore::new(store.clone()));
    let ledger = Arc::new(MutualInterestLedger::new(
        gated.clone(),
        gated.clone(),
        Duration::from_secs(5),
    ));
    (gated, ledger)
}

#[async_trait]
impl LikeStore for GatedStore {
    async fn get(&self, key: &EdgeKey) -> Result<Option<LikeEdge>, StoreError> {
        LikeStore::get(self.inner.as_ref(), key).await
    }

    async fn put(&self, edge: LikeEdge) -> Result<(), StoreError> {
        LikeStore::put(self.inner.as_ref(), edge).await
    }

    async fn delete(&self, key: &EdgeKey) -> Result<(), StoreError> {
        self.like_delete.pass().await;
        LikeStore::delete(self.inner.as_ref(), key).await
    }

    async fn edges_touching(&self, uid: &Uid) -> Result<Vec<LikeEdge>, StoreError> {
        self.inner.edges_touching(uid).await
    }
}

#[async_trait]
impl ChatStore for GatedStore {
    async fn get(&self, id: &ThreadId) -> Result<Option<MatchThread>, StoreError> {
        ChatStore::get(self.inner.as_ref(), id).await
    }

    async fn create_if_absent(&self, thread: MatchThread) -> Result<bool, StoreError> {
        self.thread_create.pass().await;
        self.inner.create_if_absent(thread).await
    }

    async fn delete(&self, id: &ThreadId) -> Result<(), StoreError> {
        ChatStore::delete(self.inner.as_ref(), id).await
    }

    async fn threads_for(&self, uid: &Uid) -> Result<Vec<MatchThread>, StoreError> {
        ChatStore::threads_for(self.inner.as_ref(), uid).await
    }

    async fn append_message(&self, id: &ThreadId, message: Message) -> Result<(), StoreError> {
        self.inner.append_message(id, message).await
    }

    async fn messages(&self, id: &ThreadId) -> Result<Vec<Message>, StoreError> {
        self.inner.messages(id).await
    }

    async fn subscribe(&self, id: &ThreadId) -> Result<broadcast::Receiver<Message>, StoreError> {
        self.inner.subscribe(id).await
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
