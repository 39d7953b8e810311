use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::domain::{EdgeKey, LikeEdge, MatchThread, Message, Profile, ThreadId, Uid};
use super::store::{ChatStore, LikeStore, ProfileStore, StoreError};

const UPDATE_BUFFER: usize = 64;

struct ThreadEntry {
    thread: MatchThread,
    messages: Vec<Message>,
    updates: broadcast::Sender<Message>,
}

/// Process-local document store holding the profile, like, and chat collections.
///
/// Each collection sits behind its own mutex; create-if-absent and append run under the
/// lock so they are atomic with respect to concurrent callers.
#[derive(Default, Clone)]
pub struct MemoryStore {
    profiles: Arc<Mutex<BTreeMap<Uid, Profile>>>,
    likes: Arc<Mutex<BTreeMap<EdgeKey, LikeEdge>>>,
    threads: Arc<Mutex<BTreeMap<ThreadId, ThreadEntry>>>,
}

impl MemoryStore {
    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let store = Self::default();
        if let Ok(mut guard) = store.profiles.lock() {
            guard.extend(
                profiles
                    .into_iter()
                    .map(|profile| (profile.uid.clone(), profile)),
            );
        }
        store
    }

    pub fn like_count(&self) -> usize {
        self.likes.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn thread_count(&self) -> usize {
        self.threads.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    collection: &'static str,
) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable(format!("{collection} collection lock poisoned")))
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn query_uid_not_equal(&self, uid: &Uid) -> Result<Vec<Profile>, StoreError> {
        let guard = lock(&self.profiles, "profiles")?;
        Ok(guard
            .values()
            .filter(|profile| &profile.uid != uid)
            .cloned()
            .collect())
    }

    async fn get(&self, uid: &Uid) -> Result<Option<Profile>, StoreError> {
        let guard = lock(&self.profiles, "profiles")?;
        Ok(guard.get(uid).cloned())
    }

    async fn put(&self, profile: Profile) -> Result<(), StoreError> {
        let mut guard = lock(&self.profiles, "profiles")?;
        guard.insert(profile.uid.clone(), profile);
        Ok(())
    }

    async fn delete(&self, uid: &Uid) -> Result<(), StoreError> {
        let mut guard = lock(&self.profiles, "profiles")?;
        guard.remove(uid);
        Ok(())
    }
}

#[async_trait]
impl LikeStore for MemoryStore {
    async fn get(&self, key: &EdgeKey) -> Result<Option<LikeEdge>, StoreError> {
        let guard = lock(&self.likes, "likes")?;
        Ok(guard.get(key).cloned())
    }

    async fn put(&self, edge: LikeEdge) -> Result<(), StoreError> {
        let mut guard = lock(&self.likes, "likes")?;
        guard.insert(edge.key(), edge);
        Ok(())
    }

    async fn delete(&self, key: &EdgeKey) -> Result<(), StoreError> {
        let mut guard = lock(&self.likes, "likes")?;
        guard.remove(key);
        Ok(())
    }

    async fn edges_touching(&self, uid: &Uid) -> Result<Vec<LikeEdge>, StoreError> {
        let guard = lock(&self.likes, "likes")?;
        Ok(guard
            .iter()
            .filter(|(key, _)| key.touches(uid))
            .map(|(_, edge)| edge.clone())
            .collect())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn get(&self, id: &ThreadId) -> Result<Option<MatchThread>, StoreError> {
        let guard = lock(&self.threads, "chats")?;
        Ok(guard.get(id).map(|entry| entry.thread.clone()))
    }

    async fn create_if_absent(&self, thread: MatchThread) -> Result<bool, StoreError> {
        let mut guard = lock(&self.threads, "chats")?;
        if guard.contains_key(&thread.id) {
            return Ok(false);
        }
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        guard.insert(
            thread.id.clone(),
            ThreadEntry {
                thread,
                messages: Vec::new(),
                updates,
            },
        );
        Ok(true)
    }

    async fn delete(&self, id: &ThreadId) -> Result<(), StoreError> {
        let mut guard = lock(&self.threads, "chats")?;
        guard.remove(id);
        Ok(())
    }

    async fn threads_for(&self, uid: &Uid) -> Result<Vec<MatchThread>, StoreError> {
        let guard = lock(&self.threads, "chats")?;
        Ok(guard
            .values()
            .filter(|entry| entry.thread.includes(uid))
            .map(|entry| entry.thread.clone())
            .collect())
    }

    async fn append_message(&self, id: &ThreadId, message: Message) -> Result<(), StoreError> {
        let mut guard = lock(&self.threads, "chats")?;
        let entry = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::Unavailable(format!("thread {id} does not exist")))?;
        entry.messages.push(message.clone());
        // No subscribers is not an error.
        let _ = entry.updates.send(message);
        Ok(())
    }

    async fn messages(&self, id: &ThreadId) -> Result<Vec<Message>, StoreError> {
        let guard = lock(&self.threads, "chats")?;
        Ok(guard
            .get(id)
            .map(|entry| entry.messages.clone())
            .unwrap_or_default())
    }

    async fn subscribe(&self, id: &ThreadId) -> Result<broadcast::Receiver<Message>, StoreError> {
        let guard = lock(&self.threads, "chats")?;
        guard
            .get(id)
            .map(|entry| entry.updates.subscribe())
            .ok_or_else(|| StoreError::Unavailable(format!("thread {id} does not exist")))
    }
}
