//! HTTP implementation of the outbound send capability.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use crate::error::{TransportError, TransportResult};
use gramkit_core::{ApiTransport, SendError, SendResult};

/// Public Bot API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Response envelope of every Bot API method.
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

/// [`ApiTransport`] posting JSON to `{base}/bot{token}/{method}`.
///
/// The token is part of every request url, so errors are reported without
/// their url and the token never reaches the logs.
#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpApiClient {
    /// Creates a client for the public endpoint with a 30s timeout.
    pub fn new(token: impl Into<String>) -> TransportResult<Self> {
        Self::builder(token).build()
    }

    pub fn builder(token: impl Into<String>) -> HttpApiClientBuilder {
        HttpApiClientBuilder {
            token: token.into(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }
}

impl fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Builder for [`HttpApiClient`].
#[derive(Debug)]
pub struct HttpApiClientBuilder {
    token: String,
    base_url: String,
    timeout: Duration,
}

impl HttpApiClientBuilder {
    /// Overrides the endpoint, e.g. for a self-hosted Bot API server.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the per-request timeout. Must exceed the long-poll timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> TransportResult<HttpApiClient> {
        let client = ClientBuilder::new()
            .timeout(self.timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(HttpApiClient {
            client,
            base_url: self.base_url,
            token: self.token,
        })
    }
}

fn map_request_error(err: reqwest::Error) -> SendError {
    if err.is_timeout() {
        SendError::Timeout
    } else {
        SendError::Http(err.without_url().to_string())
    }
}

#[async_trait]
impl ApiTransport for HttpApiClient {
    async fn call(&self, method: &str, payload: Value) -> SendResult<Value> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_request_error)?;
        trace!(method, status = status.as_u16(), len = body.len(), "Received API response");

        let envelope: Envelope = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(SendError::api(
                    i64::from(status.as_u16()),
                    String::from_utf8_lossy(&body).into_owned(),
                ));
            }
            Err(e) => return Err(SendError::Decode(e.to_string())),
        };

        if !envelope.ok || !status.is_success() {
            return Err(SendError::api(
                envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                envelope
                    .description
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string()),
            ));
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use gramkit_core::api::{self, GetMe, GetUpdates, SendMessage};
    use serde_json::json;
    use tokio::net::TcpListener;

    const TOKEN: &str = "123-abc";

    async fn spawn_api() -> String {
        let router = Router::new()
            .route(
                "/bot123-abc/getMe",
                post(|| async {
                    Json(json!({
                        "ok": true,
                        "result": {"id": 123, "is_bot": true, "first_name": "Bot", "username": "gk_bot"}
                    }))
                }),
            )
            .route(
                "/bot123-abc/sendMessage",
                post(|Json(body): Json<Value>| async move {
                    if body["chat_id"] == 0 {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({"ok": false, "error_code": 400, "description": "Bad Request: chat not found"})),
                        );
                    }
                    (
                        StatusCode::OK,
                        Json(json!({
                            "ok": true,
                            "result": {
                                "message_id": 1,
                                "date": 0,
                                "chat": {"id": body["chat_id"], "type": "private"},
                                "text": body["text"]
                            }
                        })),
                    )
                }),
            )
            .route(
                "/bot123-abc/getUpdates",
                post(|| async { Json(json!({"ok": true, "result": null})) }),
            )
            .route("/bot123-abc/broken", post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn client() -> HttpApiClient {
        HttpApiClient::builder(TOKEN)
            .base_url(spawn_api().await)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_successful_call() {
        let client = client().await;
        let me = api::call(&client, &GetMe {}).await.unwrap();
        assert_eq!(me.id, 123);

        let sent = api::call(&client, &SendMessage::new(77, "hi")).await.unwrap();
        assert_eq!(sent.chat.id, 77);
        assert_eq!(sent.text(), "hi");
    }

    #[tokio::test]
    async fn test_api_error_envelope() {
        let client = client().await;
        let err = api::call(&client, &SendMessage::new(0, "hi")).await.unwrap_err();
        match err {
            SendError::Api { code, description } => {
                assert_eq!(code, 400);
                assert!(description.contains("chat not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_null_result_is_not_an_error() {
        let client = client().await;
        let batch = api::call(&client, &GetUpdates::new(1, 0)).await.unwrap();
        assert!(batch.is_none());
    }

    #[tokio::test]
    async fn test_non_json_failure_uses_status() {
        let client = client().await;
        let err = client.call("broken", json!({})).await.unwrap_err();
        assert!(matches!(err, SendError::Api { code: 502, .. }));
    }

    #[tokio::test]
    async fn test_unknown_method_is_api_error() {
        let client = client().await;
        let err = client.call("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, SendError::Api { code: 404, .. }));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = HttpApiClient::new(TOKEN).unwrap();
        assert!(!format!("{client:?}").contains(TOKEN));
    }
}
