//! Webhook receiver.
//!
//! Each POST body is one update. Status codes tell the platform whether to
//! redeliver:
//!
//! | Outcome | Status |
//! |---------|--------|
//! | processed, or failure swallowed | `200 OK` |
//! | body is not an update | `400 Bad Request` |
//! | secret token missing or wrong | `401 Unauthorized` |
//! | failure propagated by the dispatcher | `500 Internal Server Error` |
//!
//! Deliveries are serialized per receiver by default, so handlers see the
//! same one-at-a-time ordering as under polling. With serialization
//! disabled, concurrent deliveries may interleave their log writes and the
//! dispatcher offset is advisory only.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use crate::error::TransportResult;
use gramkit_core::BotError;
use gramkit_framework::Dispatcher;

/// Header carrying the secret registered with `setWebhook`.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Default route path.
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";

/// Shared state for the webhook route.
struct ReceiverState {
    dispatcher: Arc<Dispatcher>,
    gate: Option<Mutex<()>>,
    secret_token: Option<String>,
}

/// HTTP endpoint feeding a [`Dispatcher`].
pub struct WebhookReceiver {
    dispatcher: Arc<Dispatcher>,
    path: String,
    serialize: bool,
    secret_token: Option<String>,
}

impl WebhookReceiver {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            path: DEFAULT_WEBHOOK_PATH.to_string(),
            serialize: true,
            secret_token: None,
        }
    }

    /// Sets the route path. A missing leading `/` is added.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    /// Enables or disables per-receiver serialization of deliveries.
    pub fn serialize(mut self, serialize: bool) -> Self {
        self.serialize = serialize;
        self
    }

    /// Requires deliveries to carry `token` in [`SECRET_TOKEN_HEADER`].
    pub fn secret_token(mut self, token: impl Into<String>) -> Self {
        self.secret_token = Some(token.into());
        self
    }

    pub fn route_path(&self) -> &str {
        &self.path
    }

    /// Builds the axum router.
    pub fn router(&self) -> Router {
        let state = Arc::new(ReceiverState {
            dispatcher: Arc::clone(&self.dispatcher),
            gate: self.serialize.then(|| Mutex::new(())),
            secret_token: self.secret_token.clone(),
        });

        Router::new()
            .route(&self.path, post(receive))
            .with_state(state)
    }

    /// Binds `addr` and serves until `cancel` fires.
    pub async fn serve(self, addr: &str, cancel: CancellationToken) -> TransportResult<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_on(listener, cancel).await
    }

    /// Serves on an already bound listener until `cancel` fires.
    pub async fn serve_on(self, listener: TcpListener, cancel: CancellationToken) -> TransportResult<()> {
        let local: SocketAddr = listener.local_addr()?;
        info!(
            addr = %local,
            path = %self.path,
            serialized = self.serialize,
            "Webhook receiver listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await?;

        info!("Webhook receiver stopped");
        Ok(())
    }
}

/// POST handler.
async fn receive(State(state): State<Arc<ReceiverState>>, headers: HeaderMap, body: Bytes) -> StatusCode {
    if let Some(expected) = &state.secret_token {
        let given = headers.get(SECRET_TOKEN_HEADER).and_then(|v| v.to_str().ok());
        if given != Some(expected.as_str()) {
            warn!("Rejected webhook delivery with bad secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    trace!(len = body.len(), "Received webhook delivery");

    let _guard = match &state.gate {
        Some(gate) => Some(gate.lock().await),
        None => None,
    };

    match state.dispatcher.process_webhook_body(&body).await {
        Ok(()) => StatusCode::OK,
        Err(BotError::Decode(reason)) => {
            warn!(reason = %reason, "Rejected undecodable webhook body");
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            error!(error = %e, "Webhook delivery failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use gramkit_core::{BotResult, Command, Message};
    use gramkit_framework::testing::{MockApi, text_update};
    use gramkit_framework::{BotHandle, CommandHandler, HandlerRegistry, MemoryStore};
    use tower::ServiceExt;

    struct Broken;

    #[async_trait::async_trait]
    impl CommandHandler for Broken {
        async fn execute(&self, _: &Command, _: &BotHandle, _: &Message) -> BotResult<()> {
            Err(BotError::handler(std::io::Error::other("db unavailable")))
        }
    }

    async fn dispatcher() -> Arc<Dispatcher> {
        let mut registry = HandlerRegistry::new();
        registry.register("broken", || Broken);
        Arc::new(
            Dispatcher::builder(Arc::new(MockApi::new(1)), Arc::new(MemoryStore::new()))
                .registry(registry)
                .build()
                .await
                .unwrap(),
        )
    }

    fn post(path: &str, body: Vec<u8>) -> Request<Body> {
        Request::post(path)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn update_body(id: i64, text: &str) -> Vec<u8> {
        serde_json::to_vec(&text_update(id, 1, text)).unwrap()
    }

    #[tokio::test]
    async fn test_delivery_is_processed() {
        let dispatcher = dispatcher().await;
        let router = WebhookReceiver::new(Arc::clone(&dispatcher)).router();

        let response = router.oneshot(post("/webhook", update_body(12, "hi"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(dispatcher.last_offset(), 12);
    }

    #[tokio::test]
    async fn test_bad_body_is_rejected() {
        let router = WebhookReceiver::new(dispatcher().await).router();
        let response = router.oneshot(post("/webhook", b"[1,2".to_vec())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_propagated_failure_asks_for_redelivery() {
        let dispatcher = dispatcher().await;
        let router = WebhookReceiver::new(Arc::clone(&dispatcher))
            .path("hook")
            .router();

        let response = router.oneshot(post("/hook", update_body(3, "/broken"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(dispatcher.last_offset(), 0);
    }

    #[tokio::test]
    async fn test_secret_token_is_checked() {
        let receiver = WebhookReceiver::new(dispatcher().await).secret_token("s3cret");

        let response = receiver
            .router()
            .oneshot(post("/webhook", update_body(1, "hi")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut request = post("/webhook", update_body(1, "hi"));
        request
            .headers_mut()
            .insert(SECRET_TOKEN_HEADER, "s3cret".parse().unwrap());
        let response = receiver.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(WebhookReceiver::new(dispatcher().await).serve_on(listener, cancel.clone()));

        cancel.cancel();
        assert!(task.await.unwrap().is_ok());
    }
}
