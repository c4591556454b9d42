//! Outbound notifications and an in-memory implementation.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::ServiceError;

/// A notification that was handed to a [`Notifications`] channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub recipient: String,
    pub message: String,
}

/// Channel used to tell humans about stock problems.
#[async_trait]
pub trait Notifications: Send + Sync {
    /// Delivers a message to a recipient.
    async fn send(&self, recipient: &str, message: &str) -> Result<(), ServiceError>;
}

/// Notifications that only go to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifications;

#[async_trait]
impl Notifications for LoggingNotifications {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), ServiceError> {
        tracing::info!(recipient, message, "sending notification");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<SentNotification>,
    failures_remaining: u32,
    attempts: u32,
}

/// In-memory notifications for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifications {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` sends fail.
    pub fn fail_next(&self, count: u32) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .failures_remaining = count;
    }

    /// Makes every send fail until toggled off.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.fail_next(if fail { u32::MAX } else { 0 });
    }

    /// Returns every notification delivered so far, oldest first.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .clone()
    }

    /// Returns how many sends were attempted, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .attempts
    }
}

#[async_trait]
impl Notifications for InMemoryNotifications {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.attempts += 1;

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(ServiceError::Notification(format!(
                "could not reach {recipient}"
            )));
        }

        state.sent.push(SentNotification {
            recipient: recipient.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_sent_notifications() {
        let notifications = InMemoryNotifications::new();
        notifications
            .send("stock@made.com", "Out of stock for LAMP")
            .await
            .unwrap();

        let sent = notifications.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "stock@made.com");
        assert_eq!(sent[0].message, "Out of stock for LAMP");
        assert_eq!(notifications.attempts(), 1);
    }

    #[tokio::test]
    async fn test_fail_next_then_recover() {
        let notifications = InMemoryNotifications::new();
        notifications.fail_next(2);

        assert!(notifications.send("a", "one").await.is_err());
        assert!(notifications.send("a", "two").await.is_err());
        notifications.send("a", "three").await.unwrap();

        assert_eq!(notifications.attempts(), 3);
        assert_eq!(notifications.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_fail_on_send_toggle() {
        let notifications = InMemoryNotifications::new();
        notifications.set_fail_on_send(true);
        assert!(matches!(
            notifications.send("a", "b").await,
            Err(ServiceError::Notification(_))
        ));

        notifications.set_fail_on_send(false);
        notifications.send("a", "b").await.unwrap();
        assert_eq!(notifications.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_logging_notifications_always_succeed() {
        LoggingNotifications.send("a", "b").await.unwrap();
    }
}
