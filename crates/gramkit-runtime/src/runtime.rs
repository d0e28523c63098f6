//! Host runtime.
//!
//! [`BotRuntime`] wires configuration, logging, the API client, the
//! dispatcher and exactly one delivery mode:
//!
//! ```text
//! load config ─► init logging ─► getMe handshake
//!                                     │
//!                 ┌───────────────────┴───────────────────┐
//!          webhook configured                       no webhook
//!                 │                                       │
//!      setWebhook(url, secret)                     deleteWebhook
//!                 │                                       │
//!      serve WebhookReceiver                    run PollingRunner
//!                 └───────────────────┬───────────────────┘
//!                                     ▼
//!                     Ctrl+C / SIGTERM / run_until future
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use gramkit_runtime::BotRuntime;
//!
//! // Loads gramkit.toml and GRAMKIT_* variables
//! BotRuntime::builder()
//!     .command("ping", || Ping)
//!     .build()?
//!     .run()
//!     .await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use figment::Provider;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{ConfigLoader, GramkitConfig, PollingSettings, WebhookSettings, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use gramkit_core::api::DeleteWebhook;
use gramkit_core::{ApiTransport, CommandParser, ContextStore};
use gramkit_framework::{CommandHandler, DefaultHooks, Dispatcher, HandlerRegistry, MemoryStore, UpdateHooks};
use gramkit_transport::PollingRunner;

/// A configured bot, ready to run.
pub struct BotRuntime {
    config: GramkitConfig,
    store: Arc<dyn ContextStore>,
    registry: HandlerRegistry,
    hooks: Arc<dyn UpdateHooks>,
    api: Option<Arc<dyn ApiTransport>>,
    initial_offset: i64,
    init_logging: bool,
}

impl BotRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &GramkitConfig {
        &self.config
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(self) -> RuntimeResult<()> {
        info!("Gramkit runtime starting. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes or the delivery mode fails.
    ///
    /// On shutdown the transport is cancelled and allowed to finish the
    /// update it is processing.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let BotRuntime {
            config,
            store,
            registry,
            hooks,
            api,
            initial_offset,
            init_logging,
        } = self;

        if init_logging {
            logging::init_from_config(&config.logging);
        }

        let api = api_transport(&config, api)?;
        let dispatcher = Dispatcher::builder(api, store)
            .parser(CommandParser::new(config.bot.command_delimiter))
            .registry(registry)
            .shared_hooks(hooks)
            .initial_offset(initial_offset)
            .build()
            .await?;
        let dispatcher = Arc::new(dispatcher);

        let cancel = CancellationToken::new();
        let delivery = deliver(&config, Arc::clone(&dispatcher), cancel.clone());
        tokio::pin!(delivery);

        let result = tokio::select! {
            result = &mut delivery => result,
            () = shutdown => {
                info!("Shutdown requested, stopping delivery");
                cancel.cancel();
                delivery.await
            }
        };

        match &result {
            Ok(()) => info!(offset = dispatcher.last_offset(), "Runtime stopped"),
            Err(e) => error!(error = %e, offset = dispatcher.last_offset(), "Runtime stopped with error"),
        }
        result
    }
}

fn api_transport(
    config: &GramkitConfig,
    api: Option<Arc<dyn ApiTransport>>,
) -> RuntimeResult<Arc<dyn ApiTransport>> {
    if let Some(api) = api {
        return Ok(api);
    }

    #[cfg(feature = "http-client")]
    {
        let client = gramkit_transport::HttpApiClient::builder(&config.bot.token)
            .base_url(&config.bot.api_base_url)
            .timeout(config.bot.request_timeout)
            .build()?;
        Ok(Arc::new(client))
    }

    #[cfg(not(feature = "http-client"))]
    {
        let _ = config;
        Err(RuntimeError::Unsupported(
            "no ApiTransport supplied and the http-client feature is disabled",
        ))
    }
}

async fn deliver(
    config: &GramkitConfig,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) -> RuntimeResult<()> {
    match &config.webhook {
        Some(webhook) => serve_webhook(webhook, dispatcher, cancel).await,
        None => poll(&config.polling, dispatcher, cancel).await,
    }
}

async fn poll(settings: &PollingSettings, dispatcher: Arc<Dispatcher>, cancel: CancellationToken) -> RuntimeResult<()> {
    dispatcher
        .bot()
        .send(&DeleteWebhook::default())
        .await
        .map_err(RuntimeError::DeliveryMode)?;
    info!("Webhook cleared, delivering updates by polling");

    PollingRunner::new(dispatcher, settings.into()).run(cancel).await?;
    Ok(())
}

#[cfg(feature = "webhook")]
async fn serve_webhook(
    settings: &WebhookSettings,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) -> RuntimeResult<()> {
    use gramkit_core::api::SetWebhook;
    use gramkit_transport::WebhookReceiver;

    let mut request = SetWebhook::new(&settings.url);
    if let Some(secret) = &settings.secret_token {
        request = request.secret_token(secret);
    }
    dispatcher.bot().send(&request).await.map_err(RuntimeError::DeliveryMode)?;
    info!(url = %settings.url, "Webhook registered");

    let mut receiver = WebhookReceiver::new(dispatcher)
        .path(&settings.path)
        .serialize(settings.serialize);
    if let Some(secret) = &settings.secret_token {
        receiver = receiver.secret_token(secret);
    }
    receiver.serve(&settings.listen, cancel).await?;
    Ok(())
}

#[cfg(not(feature = "webhook"))]
async fn serve_webhook(_: &WebhookSettings, _: Arc<Dispatcher>, _: CancellationToken) -> RuntimeResult<()> {
    Err(RuntimeError::Unsupported(
        "a webhook is configured but the webhook feature is disabled",
    ))
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler, waiting for Ctrl+C only"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`BotRuntime`].
///
/// ```rust,ignore
/// let runtime = BotRuntime::builder()
///     .config_file("config/gramkit.toml")
///     .profile("production")
///     .store(Arc::new(MyTableStore::connect(..).await?))
///     .command("start", || Start)
///     .hooks(MyHooks)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<GramkitConfig>,
    store: Option<Arc<dyn ContextStore>>,
    registry: HandlerRegistry,
    hooks: Arc<dyn UpdateHooks>,
    api: Option<Arc<dyn ApiTransport>>,
    initial_offset: i64,
    init_logging: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            config: None,
            store: None,
            registry: HandlerRegistry::new(),
            hooks: Arc::new(DefaultHooks),
            api: None,
            initial_offset: 0,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges a provider above every other configuration source.
    pub fn merge(mut self, provider: impl Provider) -> Self {
        self.config_loader = self.config_loader.merge(provider);
        self
    }

    /// Uses `config` instead of loading one. It is still validated.
    pub fn config(mut self, config: GramkitConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the context and log store. Defaults to a [`MemoryStore`].
    pub fn store(mut self, store: Arc<dyn ContextStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Registers a handler factory for `name`.
    pub fn command<H, F>(mut self, name: &str, factory: F) -> Self
    where
        H: CommandHandler + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.registry.register(name, factory);
        self
    }

    pub fn hooks(mut self, hooks: impl UpdateHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Replaces the HTTP client, e.g. with a test double.
    pub fn api(mut self, api: Arc<dyn ApiTransport>) -> Self {
        self.api = Some(api);
        self
    }

    /// Seeds the dispatcher offset from host-side storage.
    pub fn initial_offset(mut self, offset: i64) -> Self {
        self.initial_offset = offset;
        self
    }

    /// Leaves the global subscriber to the host.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads and validates the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<BotRuntime> {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => self.config_loader.load()?,
        };

        if config.uses_webhook() && !cfg!(feature = "webhook") {
            return Err(RuntimeError::Unsupported(
                "a webhook is configured but the webhook feature is disabled",
            ));
        }

        Ok(BotRuntime {
            config,
            store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            registry: self.registry,
            hooks: self.hooks,
            api: self.api,
            initial_offset: self.initial_offset,
            init_logging: self.init_logging,
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
