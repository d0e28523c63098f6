//! Context and log persistence contract.
//!
//! A [`ContextStore`] keeps one opaque payload per `(bot_id, owner_id)` and an
//! append-only audit log. The core never interprets payloads; typed access
//! with a caller-chosen codec lives in the framework crate.
//!
//! # Enumeration
//!
//! [`ContextStore::enumerate_contexts`] is cursor-paginated. Callers loop
//! until the returned page carries no token:
//!
//! ```rust,ignore
//! let mut token = None;
//! loop {
//!     let page = store.enumerate_contexts(bot_id, None, token.as_ref()).await?;
//!     for ctx in &page.items {
//!         handle(ctx);
//!     }
//!     match page.next {
//!         Some(next) => token = Some(next),
//!         None => break,
//!     }
//! }
//! ```
//!
//! Passing a token back must resume exactly where the previous page ended.
//! Page size and ordering are up to the backend but must be stable for a
//! given token.

mod log;

pub use log::{Direction, LogEntry, LogKey, LoggedEvent};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::model::{Chat, ChatType, User};

// =============================================================================
// Owners
// =============================================================================

/// What kind of entity owns a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// A group, supergroup or channel.
    Chat,
    /// A user, or a private chat with one.
    Private,
    /// Not known.
    Unknown,
}

impl From<ChatType> for OwnerKind {
    fn from(chat_type: ChatType) -> Self {
        match chat_type {
            ChatType::Private => Self::Private,
            ChatType::Group | ChatType::Supergroup | ChatType::Channel => Self::Chat,
            ChatType::Unknown => Self::Unknown,
        }
    }
}

/// The entity a context belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    /// Chat or user id.
    pub id: i64,
    /// Owner kind, used for filtered enumeration.
    pub kind: OwnerKind,
}

impl Owner {
    pub fn new(id: i64, kind: OwnerKind) -> Self {
        Self { id, kind }
    }

    /// Owner of unknown kind.
    pub fn id(id: i64) -> Self {
        Self::new(id, OwnerKind::Unknown)
    }

    pub fn chat(chat: &Chat) -> Self {
        Self::new(chat.id, chat.chat_type.into())
    }

    pub fn user(user: &User) -> Self {
        Self::new(user.id, OwnerKind::Private)
    }
}

// =============================================================================
// Payloads and pages
// =============================================================================

/// An encoded context value. Empty means "no value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ContextPayload(Vec<u8>);

impl ContextPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<u8>> for ContextPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<String> for ContextPayload {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

/// Opaque enumeration cursor.
///
/// Only the backend that issued a token knows what it means. It is
/// serializable so hosts can persist a long-running enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// One enumerated context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContext {
    pub owner: Owner,
    pub payload: ContextPayload,
}

/// One page of an enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextPage {
    pub items: Vec<StoredContext>,
    /// Cursor for the next page, `None` when enumeration is complete.
    pub next: Option<ContinuationToken>,
}

impl ContextPage {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

// =============================================================================
// Store trait
// =============================================================================

/// A context and log backend.
///
/// Operations on different `(bot_id, owner_id)` keys may run concurrently.
/// There is no compare-and-swap: read-modify-write on one context is not
/// atomic.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Upserts the context of `owner`, replacing any previous value.
    async fn save_context(&self, bot_id: i64, owner: Owner, payload: ContextPayload) -> StoreResult<()>;

    /// Loads a context. `None` if it was never saved or saved empty.
    async fn load_context(&self, bot_id: i64, owner_id: i64) -> StoreResult<Option<ContextPayload>>;

    /// Returns one page of the contexts of `bot_id`, optionally restricted to
    /// one owner kind. `token` of `None` starts from the beginning.
    async fn enumerate_contexts(
        &self,
        bot_id: i64,
        filter: Option<OwnerKind>,
        token: Option<&ContinuationToken>,
    ) -> StoreResult<ContextPage>;

    /// Appends an audit record. Must never overwrite an existing record.
    async fn append_log(&self, entry: &LogEntry) -> StoreResult<()>;
}
