//! In-memory [`ContextStore`].
//!
//! Suitable for tests and single-process deployments that do not need to
//! survive a restart. Contexts live in an ordered map keyed by
//! `(bot_id, owner_id)`; the continuation token is the owner id of the last
//! returned row, so writes to other bots (or to rows already returned) never
//! shift a page boundary.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use gramkit_core::{
    ContextPage, ContextPayload, ContextStore, ContinuationToken, LogEntry, LogKey, Owner,
    OwnerKind, StoreError, StoreResult, StoredContext,
};

/// Default number of contexts per enumeration page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A process-local context and log store.
#[derive(Debug)]
pub struct MemoryStore {
    page_size: usize,
    contexts: RwLock<BTreeMap<(i64, i64), (OwnerKind, ContextPayload)>>,
    logs: RwLock<BTreeMap<LogKey, LogEntry>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store returning at most `page_size` contexts per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            contexts: RwLock::new(BTreeMap::new()),
            logs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the log entries of `bot_id` in key order.
    pub fn logs(&self, bot_id: i64) -> Vec<LogEntry> {
        self.logs
            .read()
            .values()
            .filter(|entry| entry.bot_id() == bot_id)
            .cloned()
            .collect()
    }

    /// Returns the number of log entries of `bot_id`.
    pub fn log_count(&self, bot_id: i64) -> usize {
        self.logs
            .read()
            .values()
            .filter(|entry| entry.bot_id() == bot_id)
            .count()
    }

    /// Returns the number of stored contexts across all bots.
    pub fn context_count(&self) -> usize {
        self.contexts.read().len()
    }

    fn parse_token(token: &ContinuationToken) -> StoreResult<i64> {
        token
            .as_str()
            .parse()
            .map_err(|_| StoreError::InvalidToken(token.as_str().to_string()))
    }
}

#[async_trait]
impl ContextStore for MemoryStore {
    async fn save_context(&self, bot_id: i64, owner: Owner, payload: ContextPayload) -> StoreResult<()> {
        trace!(bot_id, owner_id = owner.id, bytes = payload.len(), "Saving context");
        self.contexts
            .write()
            .insert((bot_id, owner.id), (owner.kind, payload));
        Ok(())
    }

    async fn load_context(&self, bot_id: i64, owner_id: i64) -> StoreResult<Option<ContextPayload>> {
        let contexts = self.contexts.read();
        Ok(contexts
            .get(&(bot_id, owner_id))
            .map(|(_, payload)| payload)
            .filter(|payload| !payload.is_empty())
            .cloned())
    }

    async fn enumerate_contexts(
        &self,
        bot_id: i64,
        filter: Option<OwnerKind>,
        token: Option<&ContinuationToken>,
    ) -> StoreResult<ContextPage> {
        let lower = match token {
            Some(token) => Bound::Excluded((bot_id, Self::parse_token(token)?)),
            None => Bound::Included((bot_id, i64::MIN)),
        };
        let upper = Bound::Included((bot_id, i64::MAX));

        let contexts = self.contexts.read();
        let mut matching = contexts
            .range((lower, upper))
            .filter(|(_, (kind, _))| filter.is_none_or(|wanted| *kind == wanted));

        let items: Vec<StoredContext> = matching
            .by_ref()
            .take(self.page_size)
            .map(|(&(_, owner_id), (kind, payload))| StoredContext {
                owner: Owner::new(owner_id, *kind),
                payload: payload.clone(),
            })
            .collect();

        let next = match (items.last(), matching.next()) {
            (Some(last), Some(_)) => Some(ContinuationToken::new(last.owner.id.to_string())),
            _ => None,
        };

        Ok(ContextPage { items, next })
    }

    async fn append_log(&self, entry: &LogEntry) -> StoreResult<()> {
        let mut logs = self.logs.write();
        if logs.contains_key(entry.key()) {
            return Err(StoreError::Conflict {
                key: entry.key().to_string(),
            });
        }
        trace!(key = %entry.key(), kind = entry.kind(), "Appending log entry");
        logs.insert(entry.key().clone(), entry.clone());
        Ok(())
    }
}
