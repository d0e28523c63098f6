//! Typed access to per-owner contexts.
//!
//! A [`ContextStore`] only knows opaque payloads. [`Contexts`] pairs a store
//! with a [`ContextCodec`] so handlers can save and load their own types:
//!
//! ```rust,ignore
//! #[derive(Serialize, Deserialize)]
//! struct Subscription { topics: Vec<String> }
//!
//! let contexts = bot.contexts();
//! contexts.save(bot.id(), Owner::chat(&message.chat), &sub).await?;
//! let sub: Option<Subscription> = contexts.load(bot.id(), message.chat.id).await?;
//! ```
//!
//! Saving replaces the stored value wholesale. There is no compare-and-swap,
//! so load-modify-save sequences are not atomic.

use std::sync::Arc;

use futures::stream::{self, Stream, TryStreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

use gramkit_core::{
    ContextPayload, ContextStore, ContinuationToken, Owner, OwnerKind, StoreError, StoreResult,
};

// =============================================================================
// Codecs
// =============================================================================

/// Encodes and decodes context values of type `T`.
pub trait ContextCodec<T>: Send + Sync {
    fn encode(&self, value: &T) -> StoreResult<ContextPayload>;

    fn decode(&self, payload: &ContextPayload) -> StoreResult<T>;
}

/// JSON codec for any serde type.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> ContextCodec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> StoreResult<ContextPayload> {
        serde_json::to_vec(value)
            .map(ContextPayload::from)
            .map_err(|e| StoreError::codec(e.to_string()))
    }

    fn decode(&self, payload: &ContextPayload) -> StoreResult<T> {
        serde_json::from_slice(payload.as_bytes()).map_err(|e| StoreError::codec(e.to_string()))
    }
}

// =============================================================================
// Typed facade
// =============================================================================

/// One decoded page of an enumeration.
#[derive(Debug, Clone)]
pub struct TypedPage<T> {
    pub items: Vec<(Owner, T)>,
    pub next: Option<ContinuationToken>,
}

/// A [`ContextStore`] viewed through a codec.
#[derive(Clone)]
pub struct Contexts<C = JsonCodec> {
    store: Arc<dyn ContextStore>,
    codec: C,
}

impl Contexts<JsonCodec> {
    /// Creates a JSON view of `store`.
    pub fn json(store: Arc<dyn ContextStore>) -> Self {
        Self::new(store, JsonCodec)
    }
}

impl<C> Contexts<C> {
    pub fn new(store: Arc<dyn ContextStore>, codec: C) -> Self {
        Self { store, codec }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    /// Saves `value` as the context of `owner`, replacing any previous one.
    pub async fn save<T>(&self, bot_id: i64, owner: Owner, value: &T) -> StoreResult<()>
    where
        C: ContextCodec<T>,
        T: Sync,
    {
        let payload = self.codec.encode(value)?;
        self.store.save_context(bot_id, owner, payload).await
    }

    /// Loads the context of `owner_id`; `None` if absent or empty.
    pub async fn load<T>(&self, bot_id: i64, owner_id: i64) -> StoreResult<Option<T>>
    where
        C: ContextCodec<T>,
    {
        match self.store.load_context(bot_id, owner_id).await? {
            Some(payload) if !payload.is_empty() => self.codec.decode(&payload).map(Some),
            _ => Ok(None),
        }
    }

    /// Loads and decodes one page. Empty payloads are skipped.
    pub async fn enumerate<T>(
        &self,
        bot_id: i64,
        filter: Option<OwnerKind>,
        token: Option<&ContinuationToken>,
    ) -> StoreResult<TypedPage<T>>
    where
        C: ContextCodec<T>,
    {
        let page = self.store.enumerate_contexts(bot_id, filter, token).await?;
        let items = page
            .items
            .iter()
            .filter(|ctx| !ctx.payload.is_empty())
            .map(|ctx| Ok((ctx.owner, self.codec.decode(&ctx.payload)?)))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(TypedPage {
            items,
            next: page.next,
        })
    }

    /// Streams every decoded context, fetching pages lazily.
    ///
    /// ```rust,ignore
    /// let mut chats = pin!(contexts.stream::<Subscription>(bot.id(), Some(OwnerKind::Chat)));
    /// while let Some((owner, sub)) = chats.try_next().await? {
    ///     bot.send(&SendMessage::new(owner.id, digest(&sub))).await?;
    /// }
    /// ```
    pub fn stream<'a, T>(
        &'a self,
        bot_id: i64,
        filter: Option<OwnerKind>,
    ) -> impl Stream<Item = StoreResult<(Owner, T)>> + 'a
    where
        C: ContextCodec<T>,
        T: 'a,
    {
        // `None` once the last page has been fetched.
        let start: Option<Option<ContinuationToken>> = Some(None);
        stream::try_unfold(start, move |state| async move {
            let Some(token) = state else {
                return Ok(None);
            };
            let page = self.enumerate::<T>(bot_id, filter, token.as_ref()).await?;
            let items = stream::iter(page.items.into_iter().map(Ok::<_, StoreError>));
            Ok::<_, StoreError>(Some((items, page.next.map(Some))))
        })
        .try_flatten()
    }

    /// Follows continuation tokens until the enumeration is complete.
    pub async fn enumerate_all<T>(&self, bot_id: i64, filter: Option<OwnerKind>) -> StoreResult<Vec<(Owner, T)>>
    where
        C: ContextCodec<T>,
    {
        self.stream(bot_id, filter).try_collect().await
    }
}
