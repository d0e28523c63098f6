//! HTTP transports.
//!
//! The client implements the outbound send capability; the server receives
//! webhook deliveries.

#[cfg(feature = "http-client")]
mod client;
#[cfg(feature = "http-client")]
pub use client::{DEFAULT_API_BASE_URL, HttpApiClient, HttpApiClientBuilder};

#[cfg(feature = "webhook")]
mod server;
#[cfg(feature = "webhook")]
pub use server::{DEFAULT_WEBHOOK_PATH, SECRET_TOKEN_HEADER, WebhookReceiver};
