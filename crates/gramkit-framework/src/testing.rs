//! Test doubles for bots built on gramkit.
//!
//! Enabled with the `testing` feature. [`MockApi`] answers every request
//! in-process and records what was sent:
//!
//! ```rust,ignore
//! let api = Arc::new(MockApi::new(1000));
//! let dispatcher = Dispatcher::builder(api.clone(), Arc::new(MemoryStore::new()))
//!     .build()
//!     .await?;
//!
//! dispatcher.process(&text_update(1, 42, "/start")).await?;
//! assert_eq!(api.calls_to("sendMessage").len(), 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use gramkit_core::{ApiTransport, Message, SendError, SendResult, Update, UpdateKind, User};

/// An in-process [`ApiTransport`].
///
/// Default answers: `getMe` returns the configured identity, `sendMessage`
/// echoes a message built from the payload, `getUpdates` returns an empty
/// batch and everything else returns `true`. Queued responses and injected
/// failures take precedence.
#[derive(Debug)]
pub struct MockApi {
    me: User,
    calls: Mutex<Vec<(String, Value)>>,
    queued: Mutex<HashMap<String, VecDeque<SendResult<Value>>>>,
    failures: Mutex<HashMap<String, SendError>>,
    next_message_id: AtomicI64,
}

impl MockApi {
    /// Creates a mock for a bot with user id `bot_id`.
    pub fn new(bot_id: i64) -> Self {
        Self::with_identity(User {
            id: bot_id,
            is_bot: true,
            first_name: "Test Bot".to_string(),
            last_name: None,
            username: Some("test_bot".to_string()),
        })
    }

    pub fn with_identity(me: User) -> Self {
        Self {
            me,
            calls: Mutex::new(Vec::new()),
            queued: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            next_message_id: AtomicI64::new(10_000),
        }
    }

    pub fn me(&self) -> &User {
        &self.me
    }

    /// Makes every call to `method` fail with `error` until [`recover`](Self::recover).
    pub fn fail(&self, method: &str, error: SendError) {
        self.failures.lock().insert(method.to_string(), error);
    }

    /// Clears an injected failure.
    pub fn recover(&self, method: &str) {
        self.failures.lock().remove(method);
    }

    /// Queues a one-shot response for the next call to `method`.
    pub fn respond(&self, method: &str, response: SendResult<Value>) {
        self.queued
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Payloads of the calls made to `method`.
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    fn default_response(&self, method: &str, payload: &Value) -> SendResult<Value> {
        match method {
            "getMe" => serde_json::to_value(&self.me).map_err(|e| SendError::Decode(e.to_string())),
            "getUpdates" => Ok(json!([])),
            "sendMessage" => {
                let mut message = json!({
                    "message_id": self.next_message_id.fetch_add(1, Ordering::Relaxed),
                    "date": 1_700_000_000,
                    "chat": {"id": payload["chat_id"], "type": "private"},
                    "from": self.me,
                    "text": payload["text"],
                });
                if let Some(reply_to) = payload.get("reply_to_message_id") {
                    message["reply_to_message"] = json!({
                        "message_id": reply_to,
                        "date": 1_700_000_000,
                        "chat": {"id": payload["chat_id"], "type": "private"},
                    });
                }
                Ok(message)
            }
            _ => Ok(json!(true)),
        }
    }
}

#[async_trait]
impl ApiTransport for MockApi {
    async fn call(&self, method: &str, payload: Value) -> SendResult<Value> {
        self.calls.lock().push((method.to_string(), payload.clone()));

        if let Some(error) = self.failures.lock().get(method) {
            return Err(error.clone());
        }
        let queued = self
            .queued
            .lock()
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(response) => response,
            None => self.default_response(method, &payload),
        }
    }
}

/// Builds a private-chat text message.
pub fn message(chat_id: i64, message_id: i64, text: &str) -> Message {
    Message {
        message_id,
        from: Some(User {
            id: chat_id,
            is_bot: false,
            first_name: "Tester".to_string(),
            last_name: None,
            username: None,
        }),
        date: 1_700_000_000,
        chat: gramkit_core::Chat {
            id: chat_id,
            chat_type: gramkit_core::ChatType::Private,
            title: None,
            username: None,
        },
        text: Some(text.to_string()),
        reply_to_message: None,
        extra: Default::default(),
    }
}

/// Builds a `message` update whose message id equals its update id.
pub fn text_update(update_id: i64, chat_id: i64, text: &str) -> Update {
    Update::new(update_id, UpdateKind::Message(message(chat_id, update_id, text)))
}
