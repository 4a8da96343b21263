//! Conversation store: process-lifetime mapping from id to dialogue history.

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::conversation::errors::{StoreError, StoreResult};
use crate::conversation::ids::ConversationId;
use crate::conversation::turn::{Conversation, Turn};

/// Boxed future type for conversation store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Conversation store trait.
///
/// `get_or_create` and the append operations are atomic with respect to each
/// other, so concurrent requests on the same id never lose a turn.
pub trait ConversationStore: Send + Sync {
    /// Resolve `id` (generating one when absent) and return a snapshot of its
    /// conversation, creating it seeded with the system turn if unknown.
    fn get_or_create(
        &self,
        id: Option<ConversationId>,
    ) -> StoreFuture<'_, (ConversationId, Conversation)>;

    /// Append several turns in one step; no other append interleaves.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if `id` is unknown.
    fn append_all<'a>(
        &'a self,
        id: &'a ConversationId,
        turns: Vec<Turn>,
    ) -> StoreFuture<'a, StoreResult<()>>;

    /// Append a single turn.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if `id` is unknown.
    fn append<'a>(&'a self, id: &'a ConversationId, turn: Turn) -> StoreFuture<'a, StoreResult<()>> {
        self.append_all(id, vec![turn])
    }

    /// Snapshot of a conversation, if present.
    fn get<'a>(&'a self, id: &'a ConversationId) -> StoreFuture<'a, Option<Conversation>>;

    /// Number of stored conversations.
    fn len(&self) -> StoreFuture<'_, usize>;

    /// Whether no conversation has been created yet.
    fn is_empty(&self) -> StoreFuture<'_, bool> {
        let len = self.len();
        Box::pin(async move { len.await == 0 })
    }
}

/// Unbounded in-memory store backed by a sharded concurrent map.
pub struct InMemoryConversationStore {
    system_prompt: String,
    conversations: DashMap<ConversationId, Conversation>,
}

impl InMemoryConversationStore {
    /// Create an empty store whose conversations open with `system_prompt`.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            conversations: DashMap::new(),
        }
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn get_or_create(
        &self,
        id: Option<ConversationId>,
    ) -> StoreFuture<'_, (ConversationId, Conversation)> {
        Box::pin(async move {
            let id = id.unwrap_or_else(ConversationId::generate);
            let conversation = match self.conversations.entry(id.clone()) {
                Entry::Occupied(entry) => entry.get().clone(),
                Entry::Vacant(entry) => {
                    debug!("Creating conversation {id}");
                    entry
                        .insert(Conversation::seeded(self.system_prompt.as_str()))
                        .value()
                        .clone()
                }
            };
            (id, conversation)
        })
    }

    fn append_all<'a>(
        &'a self,
        id: &'a ConversationId,
        turns: Vec<Turn>,
    ) -> StoreFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.conversations
                .get_mut(id)
                .map(|mut conversation| conversation.extend(turns))
                .ok_or_else(|| StoreError::NotFound(id.clone()))
        })
    }

    fn get<'a>(&'a self, id: &'a ConversationId) -> StoreFuture<'a, Option<Conversation>> {
        Box::pin(async move { self.conversations.get(id).map(|entry| entry.value().clone()) })
    }

    fn len(&self) -> StoreFuture<'_, usize> {
        Box::pin(async move { self.conversations.len() })
    }
}

/// Capacity-bounded store evicting the least-recently-used conversation.
pub struct BoundedConversationStore {
    system_prompt: String,
    conversations: Mutex<LruCache<ConversationId, Conversation>>,
}

impl BoundedConversationStore {
    /// Create an empty store holding at most `capacity` conversations.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>, capacity: NonZeroUsize) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            conversations: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl ConversationStore for BoundedConversationStore {
    fn get_or_create(
        &self,
        id: Option<ConversationId>,
    ) -> StoreFuture<'_, (ConversationId, Conversation)> {
        Box::pin(async move {
            let id = id.unwrap_or_else(ConversationId::generate);
            let (conversation, evicted) = {
                let mut conversations = self.conversations.lock().await;
                if let Some(existing) = conversations.get(&id) {
                    return (id, existing.clone());
                }
                let conversation = Conversation::seeded(self.system_prompt.as_str());
                let evicted = conversations.push(id.clone(), conversation.clone());
                (conversation, evicted)
            };

            debug!("Creating conversation {id}");
            if let Some((evicted, _)) = evicted {
                debug!("Evicted least recently used conversation {evicted}");
            }
            (id, conversation)
        })
    }

    fn append_all<'a>(
        &'a self,
        id: &'a ConversationId,
        turns: Vec<Turn>,
    ) -> StoreFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.conversations
                .lock()
                .await
                .get_mut(id)
                .map(|conversation| conversation.extend(turns))
                .ok_or_else(|| StoreError::NotFound(id.clone()))
        })
    }

    fn get<'a>(&'a self, id: &'a ConversationId) -> StoreFuture<'a, Option<Conversation>> {
        Box::pin(async move { self.conversations.lock().await.peek(id).cloned() })
    }

    fn len(&self) -> StoreFuture<'_, usize> {
        Box::pin(async move { self.conversations.lock().await.len() })
    }
}

/// Build the store selected by configuration: bounded when `max_conversations`
/// is set, unbounded otherwise.
#[must_use]
pub fn build_store(
    system_prompt: &str,
    max_conversations: Option<NonZeroUsize>,
) -> Arc<dyn ConversationStore> {
    match max_conversations {
        Some(capacity) => Arc::new(BoundedConversationStore::new(system_prompt, capacity)),
        None => Arc::new(InMemoryConversationStore::new(system_prompt)),
    }
}
