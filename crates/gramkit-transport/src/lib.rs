//! # Gramkit Transport
//!
//! Drivers that feed a [`Dispatcher`](gramkit_framework::Dispatcher), plus the
//! HTTP implementation of the send capability.
//!
//! ## Features
//!
//! - `http-client`: [`HttpApiClient`], a reqwest-based `ApiTransport`
//! - `webhook`: [`WebhookReceiver`], an axum endpoint for webhook deliveries
//! - `full`: both
//!
//! Polling is always available.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  gramkit-runtime     │  (picks exactly one delivery mode)
//! ├──────────────────────┤
//! │  gramkit-transport   │  <- This crate (polling / webhook / client)
//! ├──────────────────────┤
//! │  gramkit-framework   │  (dispatcher)
//! ├──────────────────────┤
//! │  Network (HTTP)      │
//! └──────────────────────┘
//! ```
//!
//! A bot identity must use one delivery mode at a time: once a webhook is
//! registered the platform refuses `getUpdates`, and running both against
//! the same identity would process updates twice.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gramkit_transport::{HttpApiClient, PollingConfig, PollingRunner};
//!
//! let api = Arc::new(HttpApiClient::new(token)?);
//! let dispatcher = Arc::new(Dispatcher::builder(api, store).build().await?);
//!
//! let cancel = CancellationToken::new();
//! PollingRunner::new(dispatcher, PollingConfig::default())
//!     .run(cancel.child_token())
//!     .await?;
//! ```

pub mod error;
pub mod polling;

#[cfg(any(feature = "http-client", feature = "webhook"))]
pub mod http;

pub use error::{TransportError, TransportResult};
pub use polling::{FailurePolicy, PollingConfig, PollingRunner};

#[cfg(feature = "http-client")]
pub use http::{DEFAULT_API_BASE_URL, HttpApiClient, HttpApiClientBuilder};

#[cfg(feature = "webhook")]
pub use http::{DEFAULT_WEBHOOK_PATH, SECRET_TOKEN_HEADER, WebhookReceiver};

pub use tokio_util::sync::CancellationToken;
