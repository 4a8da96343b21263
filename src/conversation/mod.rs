//! Conversation state: identifiers, turns and the in-memory store.
//!
//! - `ids`: opaque conversation identifiers
//! - `turn`: roles, turns and ordered conversations
//! - `store`: the store trait with unbounded and LRU-bounded implementations
//! - `errors`: store error type

pub mod errors;
pub mod ids;
pub mod store;
pub mod turn;

pub use errors::{StoreError, StoreResult};
pub use ids::ConversationId;
pub use store::{
    BoundedConversationStore, ConversationStore, InMemoryConversationStore, StoreFuture,
    build_store,
};
pub use turn::{Conversation, Role, Turn};
