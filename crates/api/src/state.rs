//! Shared application state.

use std::sync::Arc;

use service::{EventHandlers, LoggingNotifications, MessageBus, Notifications, RetryPolicy};
use store::{InMemoryProductStore, InMemoryUnitOfWork, UnitOfWorkFactory};

use crate::config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub store: InMemoryProductStore,
    pub handlers: Arc<EventHandlers<InMemoryUnitOfWork>>,
    pub retry: RetryPolicy,
}

impl AppState {
    /// Wires the default event handlers around the given notification channel.
    pub fn new(
        store: InMemoryProductStore,
        notifications: Arc<dyn Notifications>,
        config: &Config,
    ) -> Self {
        let handlers =
            EventHandlers::with_defaults(notifications, config.notification_recipient.clone());
        Self {
            store,
            handlers: Arc::new(handlers),
            retry: config.retry_policy(),
        }
    }

    /// Returns a bus over a fresh unit of work, one per request.
    pub fn message_bus(&self) -> MessageBus<InMemoryUnitOfWork> {
        MessageBus::new(self.store.create(), Arc::clone(&self.handlers))
            .with_retry_policy(self.retry)
    }
}

/// Creates the default application state: an empty in-memory store and
/// notifications that go to the log.
pub fn create_default_state(config: &Config) -> Arc<AppState> {
    Arc::new(AppState::new(
        InMemoryProductStore::new(),
        Arc::new(LoggingNotifications),
        config,
    ))
}
