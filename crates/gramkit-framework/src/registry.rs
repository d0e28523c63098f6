//! Command handler registry.
//!
//! Maps command names to handler factories. Names are folded to lowercase at
//! registration and at lookup, so `/SendAll` and `/sendall` reach the same
//! handler.
//!
//! The registry never stores handler instances directly: each entry is a
//! factory, called once per resolved command. The host decides what that
//! factory does (build a fresh handler, or hand out a shared one).
//!
//! ```rust,ignore
//! let mut registry = HandlerRegistry::new();
//! registry.register_default::<SendAll>("sendall");
//! registry.register("echo", || Echo::new("> "));
//! registry.register_shared("stats", Arc::new(stats));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::bot::BotHandle;
use gramkit_core::{BotResult, Command, Message};

/// A unit of logic bound to a command name.
///
/// Handlers may send any number of requests through `bot`. A returned
/// error is classified by the dispatcher's hooks: remote send failures are
/// swallowed by default, anything else propagates to the transport.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, command: &Command, bot: &BotHandle, message: &Message) -> BotResult<()>;
}

/// Produces a handler for one invocation.
pub type HandlerFactory = Arc<dyn Fn() -> Arc<dyn CommandHandler> + Send + Sync>;

/// Case-insensitive mapping from command name to handler factory.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory closure for `name`.
    ///
    /// A previous registration under the same (folded) name is replaced.
    pub fn register<H, F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        H: CommandHandler + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let factory: HandlerFactory = Arc::new(move || Arc::new(factory()) as Arc<dyn CommandHandler>);
        self.insert(name, factory)
    }

    /// Registers `H::default()` as a fresh handler per invocation.
    pub fn register_default<H>(&mut self, name: &str) -> &mut Self
    where
        H: CommandHandler + Default + 'static,
    {
        self.register(name, H::default)
    }

    /// Registers one shared handler instance for every invocation.
    pub fn register_shared<H>(&mut self, name: &str, handler: Arc<H>) -> &mut Self
    where
        H: CommandHandler + 'static,
    {
        let factory: HandlerFactory = Arc::new(move || Arc::clone(&handler) as Arc<dyn CommandHandler>);
        self.insert(name, factory)
    }

    fn insert(&mut self, name: &str, factory: HandlerFactory) -> &mut Self {
        let key = normalize(name);
        if self.factories.insert(key.clone(), factory).is_some() {
            debug!(command = %key, "Replaced command handler");
        } else {
            debug!(command = %key, "Registered command handler");
        }
        self
    }

    /// Instantiates the handler registered for `name`, if any.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.factories.get(&normalize(name)).map(|factory| factory())
    }

    /// Returns whether a handler is registered for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&normalize(name))
    }

    /// Returns the registered (folded) names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn execute(&self, _: &Command, _: &BotHandle, _: &Message) -> BotResult<()> {
            Ok(())
        }
    }

    struct Counted;

    impl Default for Counted {
        fn default() -> Self {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Counted
        }
    }

    #[async_trait]
    impl CommandHandler for Counted {
        async fn execute(&self, _: &Command, _: &BotHandle, _: &Message) -> BotResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = HandlerRegistry::new();
        registry.register("SendAll", || Noop);

        assert!(registry.contains("sendall"));
        assert!(registry.contains("SENDALL"));
        assert!(registry.resolve("sEnDaLl").is_some());
        assert_eq!(registry.names(), vec!["sendall"]);
    }

    #[test]
    fn test_missing_name() {
        let registry = HandlerRegistry::new();
        assert!(registry.resolve("start").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = HandlerRegistry::new();
        registry.register("start", || Noop).register("START", || Noop);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_default_factory_builds_per_resolve() {
        let mut registry = HandlerRegistry::new();
        registry.register_default::<Counted>("count");

        let before = BUILT.load(Ordering::SeqCst);
        registry.resolve("count");
        registry.resolve("count");
        assert_eq!(BUILT.load(Ordering::SeqCst) - before, 2);
    }

    #[test]
    fn test_shared_handler_is_reused() {
        let shared = Arc::new(Noop);
        let mut registry = HandlerRegistry::new();
        registry.register_shared("noop", Arc::clone(&shared));

        let first = registry.resolve("noop").unwrap();
        let second = registry.resolve("noop").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(Arc::strong_count(&shared), 4);
    }
}
