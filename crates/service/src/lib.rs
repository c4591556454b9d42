//! Service layer for the allocation system.
//!
//! The [`MessageBus`] takes one inbound command or event, runs it through
//! the registered handlers and keeps draining the events those handlers
//! raise until nothing is left:
//! - commands have exactly one handler and their failures reach the caller
//! - events fan out to every registered [`EventHandler`], each retried under
//!   a [`RetryPolicy`] and isolated from the others

pub mod error;
pub mod handlers;
pub mod message_bus;
pub mod notifications;
pub mod retry;

pub use error::{Result, ServiceError};
pub use handlers::{EventHandler, Reallocate, SendOutOfStockNotification};
pub use message_bus::{EventHandlers, MessageBus};
pub use notifications::{
    InMemoryNotifications, LoggingNotifications, Notifications, SentNotification,
};
pub use retry::RetryPolicy;
