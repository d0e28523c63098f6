//! The update dispatcher.
//!
//! [`Dispatcher`] turns one inbound [`Update`] into exactly one handler or
//! hook invocation. Per update:
//!
//! 1. Append the inbound log entry (every recognized branch).
//! 2. Route the branch: messages go through the [`CommandParser`] and the
//!    [`HandlerRegistry`], other branches to their [`UpdateHooks`] method.
//! 3. On failure, ask [`UpdateHooks::classify_error`]. Swallowed failures
//!    are logged at warning; propagated ones are logged at error and
//!    returned without touching the offset.
//! 4. Advance `last_offset` to the update id.
//!
//! ```rust,ignore
//! let mut registry = HandlerRegistry::new();
//! registry.register_default::<SendAll>("sendall");
//!
//! let dispatcher = Dispatcher::builder(api, store)
//!     .parser(CommandParser::new('_'))
//!     .registry(registry)
//!     .build()
//!     .await?;
//!
//! dispatcher.process(&update).await?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use tracing::{Instrument, error, info, info_span, warn};

use crate::bot::BotHandle;
use crate::hooks::{DefaultHooks, ErrorDisposition, UpdateHooks};
use crate::registry::HandlerRegistry;
use gramkit_core::api::{self, GetMe};
use gramkit_core::{
    ApiTransport, BotError, BotResult, CommandParser, ContextStore, LogEntry, Message, Update,
    UpdateKind,
};

/// Routes updates for one bot identity.
pub struct Dispatcher {
    bot: BotHandle,
    parser: CommandParser,
    registry: HandlerRegistry,
    hooks: Arc<dyn UpdateHooks>,
    last_offset: AtomicI64,
}

impl Dispatcher {
    /// Starts building a dispatcher on top of `api` and `store`.
    pub fn builder(api: Arc<dyn ApiTransport>, store: Arc<dyn ContextStore>) -> DispatcherBuilder {
        DispatcherBuilder::new(api, store)
    }

    pub fn bot(&self) -> &BotHandle {
        &self.bot
    }

    pub fn parser(&self) -> CommandParser {
        self.parser
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Highest update id fully processed so far.
    ///
    /// Polling resumes at `last_offset() + 1`.
    pub fn last_offset(&self) -> i64 {
        self.last_offset.load(Ordering::SeqCst)
    }

    /// Processes one update.
    ///
    /// Returns an error only when the hooks classify a failure as
    /// [`ErrorDisposition::Propagate`]; the offset is then left unchanged.
    pub async fn process(&self, update: &Update) -> BotResult<()> {
        let span = info_span!("update", update_id = update.update_id, kind = update.kind.name());
        async {
            if let Err(err) = self.route(update).await {
                match self.hooks.classify_error(&err) {
                    ErrorDisposition::Swallow => {
                        warn!(error = %err, "Update failed, continuing");
                    }
                    ErrorDisposition::Propagate => {
                        error!(error = %err, "Update failed");
                        return Err(err);
                    }
                }
            }
            self.advance(update.update_id);
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Decodes a webhook request body into one update and processes it.
    pub async fn process_webhook_body(&self, body: &[u8]) -> BotResult<()> {
        let update: Update = serde_json::from_slice(body).map_err(|e| BotError::Decode(e.to_string()))?;
        self.process(&update).await
    }

    fn advance(&self, update_id: i64) {
        // Concurrent webhook deliveries may finish out of order.
        self.last_offset.fetch_max(update_id, Ordering::SeqCst);
    }

    async fn route(&self, update: &Update) -> BotResult<()> {
        if let Some(entry) = LogEntry::inbound(self.bot.id(), &update.kind) {
            self.bot.store().append_log(&entry).await?;
        }

        let bot = &self.bot;
        match &update.kind {
            UpdateKind::Message(message) => self.route_message(message).await,
            UpdateKind::EditedMessage(message) => self.hooks.on_edited_message(bot, message).await,
            UpdateKind::ChannelPost(post) => self.hooks.on_channel_post(bot, post).await,
            UpdateKind::EditedChannelPost(post) => self.hooks.on_edited_channel_post(bot, post).await,
            UpdateKind::InlineQuery(query) => self.hooks.on_inline_query(bot, query).await,
            UpdateKind::ChosenInlineResult(result) => {
                self.hooks.on_chosen_inline_result(bot, result).await
            }
            UpdateKind::CallbackQuery(query) => self.hooks.on_callback_query(bot, query).await,
            UpdateKind::Unrecognized => {
                warn!("Update carries no recognized branch");
                Ok(())
            }
        }
    }

    async fn route_message(&self, message: &Message) -> BotResult<()> {
        let Some(command) = self.parser.try_parse(message.text()) else {
            return self.hooks.on_message(&self.bot, message).await;
        };

        match self.registry.resolve(&command.name) {
            Some(handler) => {
                info!(command = %command.name, chat_id = message.chat.id, "Executing command");
                handler.execute(&command, &self.bot, message).await
            }
            None => self.hooks.on_unknown_command(&self.bot, &command, message).await,
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("bot", &self.bot)
            .field("delimiter", &self.parser.delimiter())
            .field("registry", &self.registry)
            .field("last_offset", &self.last_offset())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    api: Arc<dyn ApiTransport>,
    store: Arc<dyn ContextStore>,
    parser: CommandParser,
    registry: HandlerRegistry,
    hooks: Arc<dyn UpdateHooks>,
    initial_offset: i64,
}

impl DispatcherBuilder {
    pub fn new(api: Arc<dyn ApiTransport>, store: Arc<dyn ContextStore>) -> Self {
        Self {
            api,
            store,
            parser: CommandParser::default(),
            registry: HandlerRegistry::new(),
            hooks: Arc::new(DefaultHooks),
            initial_offset: 0,
        }
    }

    pub fn parser(mut self, parser: CommandParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn hooks(mut self, hooks: impl UpdateHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn shared_hooks(mut self, hooks: Arc<dyn UpdateHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Seeds the offset, for hosts that persist it across restarts.
    pub fn initial_offset(mut self, offset: i64) -> Self {
        self.initial_offset = offset;
        self
    }

    /// Resolves the bot identity with `getMe` and builds the dispatcher.
    ///
    /// # Errors
    ///
    /// [`BotError::Identity`] if the call fails or returns no identity.
    pub async fn build(self) -> BotResult<Dispatcher> {
        let me = api::call(self.api.as_ref(), &GetMe {})
            .await
            .map_err(|e| BotError::Identity(e.to_string()))?;
        if me.id == 0 {
            return Err(BotError::Identity("getMe returned an empty identity".to_string()));
        }

        info!(
            bot_id = me.id,
            username = me.username.as_deref().unwrap_or(""),
            commands = self.registry.len(),
            "Bot identity resolved"
        );

        Ok(Dispatcher {
            bot: BotHandle::new(me, self.api, self.store),
            parser: self.parser,
            registry: self.registry,
            hooks: self.hooks,
            last_offset: AtomicI64::new(self.initial_offset),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::registry::CommandHandler;
    use crate::testing::{MockApi, message, text_update};
    use async_trait::async_trait;
    use gramkit_core::{CallbackQuery, Command, Direction, SendError, User};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio_test::assert_ok;

    const BOT_ID: i64 = 4242;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl CommandHandler for Counter {
        async fn execute(&self, _: &Command, _: &BotHandle, _: &Message) -> BotResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailWithSend;

    #[async_trait]
    impl CommandHandler for FailWithSend {
        async fn execute(&self, _: &Command, _: &BotHandle, _: &Message) -> BotResult<()> {
            Err(SendError::api(400, "Bad Request: chat not found").into())
        }
    }

    struct FailWithBug;

    #[async_trait]
    impl CommandHandler for FailWithBug {
        async fn execute(&self, _: &Command, _: &BotHandle, _: &Message) -> BotResult<()> {
            Err(BotError::handler(anyhow::anyhow!("index out of range")))
        }
    }

    struct Echo;

    #[async_trait]
    impl CommandHandler for Echo {
        async fn execute(&self, command: &Command, bot: &BotHandle, message: &Message) -> BotResult<()> {
            bot.reply(message, command.args_text()).await?;
            Ok(())
        }
    }

    #[derive(serde::Serialize)]
    struct SendScores {
        chat_id: i64,
        scores: std::collections::HashMap<(i32, i32), i32>,
    }

    impl gramkit_core::Request for SendScores {
        type Response = bool;
        const METHOD: &'static str = "sendScores";
    }

    struct Scores;

    #[async_trait]
    impl CommandHandler for Scores {
        async fn execute(&self, _: &Command, bot: &BotHandle, message: &Message) -> BotResult<()> {
            let request = SendScores {
                chat_id: message.chat.id,
                scores: [((1, 2), 3)].into_iter().collect(),
            };
            bot.send(&request).await?;
            Ok(())
        }
    }

    struct Setup {
        api: Arc<MockApi>,
        store: Arc<MemoryStore>,
        dispatcher: Dispatcher,
    }

    async fn setup(registry: HandlerRegistry) -> Setup {
        let api = Arc::new(MockApi::new(BOT_ID));
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Dispatcher::builder(api.clone(), store.clone())
            .registry(registry)
            .build()
            .await
            .unwrap();
        Setup { api, store, dispatcher }
    }

    #[tokio::test]
    async fn test_build_resolves_identity() {
        let s = setup(HandlerRegistry::new()).await;
        assert_eq!(s.dispatcher.bot().id(), BOT_ID);
        assert_eq!(s.dispatcher.last_offset(), 0);
        assert_eq!(s.api.calls_to("getMe").len(), 1);
    }

    #[tokio::test]
    async fn test_build_fails_without_identity() {
        let api = Arc::new(MockApi::new(BOT_ID));
        api.fail("getMe", SendError::api(401, "Unauthorized"));
        let result = Dispatcher::builder(api, Arc::new(MemoryStore::new())).build().await;
        assert!(matches!(result, Err(BotError::Identity(_))));

        let empty = Arc::new(MockApi::with_identity(User {
            id: 0,
            is_bot: true,
            first_name: String::new(),
            last_name: None,
            username: None,
        }));
        let result = Dispatcher::builder(empty, Arc::new(MemoryStore::new())).build().await;
        assert!(matches!(result, Err(BotError::Identity(_))));
    }

    #[tokio::test]
    async fn test_command_lookup_ignores_case() {
        let counter = Arc::new(Counter::default());
        let mut registry = HandlerRegistry::new();
        registry.register_shared("sendall", counter.clone());
        let s = setup(registry).await;

        assert_ok!(s.dispatcher.process(&text_update(1, 10, "/SENDALL now")).await);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(s.api.calls_to("sendMessage").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command_replies_once_threaded() {
        let s = setup(HandlerRegistry::new()).await;

        assert_ok!(s.dispatcher.process(&text_update(3, 10, "/nope")).await);

        let sent = s.api.calls_to("sendMessage");
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            json!({"chat_id": 10, "text": "Unknown command :(", "reply_to_message_id": 3})
        );
        // Inbound plus outbound.
        assert_eq!(s.store.log_count(BOT_ID), 2);
    }

    #[tokio::test]
    async fn test_plain_text_is_logged_without_reply() {
        let s = setup(HandlerRegistry::new()).await;
        assert_ok!(s.dispatcher.process(&text_update(4, 10, "hello there")).await);
        assert!(s.api.calls_to("sendMessage").is_empty());
        assert_eq!(s.store.log_count(BOT_ID), 1);
        assert_eq!(s.dispatcher.last_offset(), 4);
    }

    #[tokio::test]
    async fn test_send_failure_is_swallowed_and_offset_advances() {
        let mut registry = HandlerRegistry::new();
        registry.register("fail", || FailWithSend);
        let s = setup(registry).await;

        let updates = [
            text_update(5, 10, "first"),
            text_update(6, 10, "/fail"),
            text_update(7, 10, "third"),
        ];
        for update in &updates {
            assert_ok!(s.dispatcher.process(update).await);
        }

        assert_eq!(s.dispatcher.last_offset(), 7);
        assert_eq!(s.store.log_count(BOT_ID), 3);
    }

    #[tokio::test]
    async fn test_handler_failure_propagates_and_offset_holds() {
        let mut registry = HandlerRegistry::new();
        registry.register("fail", || FailWithBug);
        let s = setup(registry).await;

        let updates = [
            text_update(5, 10, "first"),
            text_update(6, 10, "/fail"),
            text_update(7, 10, "third"),
        ];
        let mut failure = None;
        for update in &updates {
            if let Err(err) = s.dispatcher.process(update).await {
                failure = Some(err);
                break;
            }
        }

        assert!(matches!(failure, Some(BotError::Handler(_))));
        assert_eq!(s.dispatcher.last_offset(), 5);
        // The failed update was still audited.
        assert_eq!(s.store.log_count(BOT_ID), 2);
    }

    #[tokio::test]
    async fn test_reply_failure_inside_handler_is_swallowed() {
        let mut registry = HandlerRegistry::new();
        registry.register("echo", || Echo);
        let s = setup(registry).await;
        s.api.fail("sendMessage", SendError::api(403, "Forbidden: bot was blocked by the user"));

        assert_ok!(s.dispatcher.process(&text_update(9, 10, "/echo hi")).await);
        assert_eq!(s.dispatcher.last_offset(), 9);
    }

    #[tokio::test]
    async fn test_unencodable_request_propagates_and_offset_holds() {
        let mut registry = HandlerRegistry::new();
        registry.register("scores", || Scores);
        let s = setup(registry).await;

        assert_ok!(s.dispatcher.process(&text_update(5, 10, "first")).await);
        let result = s.dispatcher.process(&text_update(6, 10, "/scores")).await;

        match result {
            Err(BotError::Send(SendError::Encode(msg))) => assert!(msg.starts_with("sendScores")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(s.dispatcher.last_offset(), 5);
        assert!(s.api.calls_to("sendScores").is_empty());
    }

    #[tokio::test]
    async fn test_echo_reply_is_logged_outbound() {
        let mut registry = HandlerRegistry::new();
        registry.register("echo", || Echo);
        let s = setup(registry).await;

        assert_ok!(s.dispatcher.process(&text_update(9, 10, "/echo@test_bot hi  there")).await);

        let sent = s.api.calls_to("sendMessage");
        assert_eq!(sent[0]["text"], "hi there");
        let directions: Vec<Direction> = s.store.logs(BOT_ID).iter().map(|e| e.direction()).collect();
        assert!(directions.contains(&Direction::Inbound));
        assert!(directions.contains(&Direction::Outbound));
    }

    #[tokio::test]
    async fn test_unrecognized_update_advances_offset() {
        let s = setup(HandlerRegistry::new()).await;
        assert_ok!(s.dispatcher.process(&Update::new(20, UpdateKind::Unrecognized)).await);
        assert_eq!(s.dispatcher.last_offset(), 20);
        assert_eq!(s.store.log_count(BOT_ID), 0);
    }

    #[derive(Default)]
    struct CallbackHooks {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl UpdateHooks for CallbackHooks {
        async fn on_callback_query(&self, _: &BotHandle, _: &CallbackQuery) -> BotResult<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_overridden_hook_keeps_audit_record() {
        let api = Arc::new(MockApi::new(BOT_ID));
        let store = Arc::new(MemoryStore::new());
        let hooks = Arc::new(CallbackHooks::default());
        let dispatcher = Dispatcher::builder(api, store.clone())
            .shared_hooks(hooks.clone())
            .build()
            .await
            .unwrap();

        let update: Update = serde_json::from_value(json!({
            "update_id": 30,
            "callback_query": {
                "id": "cb",
                "from": {"id": 10, "first_name": "T"},
                "message": serde_json::to_value(message(10, 2, "pick one")).unwrap(),
                "data": "a"
            }
        }))
        .unwrap();

        assert_ok!(dispatcher.process(&update).await);
        assert_eq!(hooks.seen.load(Ordering::SeqCst), 1);

        let logs = store.logs(BOT_ID);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].kind(), "callback_query");
        assert_eq!(logs[0].chat_id(), 10);
    }

    #[tokio::test]
    async fn test_webhook_body() {
        let s = setup(HandlerRegistry::new()).await;

        let body = serde_json::to_vec(&text_update(40, 10, "hi")).unwrap();
        assert_ok!(s.dispatcher.process_webhook_body(&body).await);
        assert_eq!(s.dispatcher.last_offset(), 40);

        let result = s.dispatcher.process_webhook_body(b"{not json").await;
        assert!(matches!(result, Err(BotError::Decode(_))));
        assert_eq!(s.dispatcher.last_offset(), 40);
    }

    #[tokio::test]
    async fn test_offset_never_moves_backward() {
        let api = Arc::new(MockApi::new(BOT_ID));
        let dispatcher = Dispatcher::builder(api, Arc::new(MemoryStore::new()))
            .initial_offset(100)
            .build()
            .await
            .unwrap();

        assert_ok!(dispatcher.process(&text_update(90, 10, "late")).await);
        assert_eq!(dispatcher.last_offset(), 100);
        assert_ok!(dispatcher.process(&text_update(101, 10, "next")).await);
        assert_eq!(dispatcher.last_offset(), 101);
    }

    #[tokio::test]
    async fn test_custom_delimiter() {
        let counter = Arc::new(Counter::default());
        let mut registry = HandlerRegistry::new();
        registry.register_shared("start", counter.clone());

        let api = Arc::new(MockApi::new(BOT_ID));
        let dispatcher = Dispatcher::builder(api.clone(), Arc::new(MemoryStore::new()))
            .parser(CommandParser::new('_'))
            .registry(registry)
            .build()
            .await
            .unwrap();

        assert_ok!(dispatcher.process(&text_update(1, 10, "/start")).await);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
        assert_ok!(dispatcher.process(&text_update(2, 10, "_start")).await);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
