use async_trait::async_trait;
use televisit_core::{InAppNotification, PushNotification, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The channel's own network timeout. Expected for email; never
    /// worth an error-level log line.
    #[error("notification delivery timed out")]
    Timeout,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Fire-and-forget delivery of the three notification channels,
/// implemented by the hosting application. Each channel fails
/// independently; callers never treat a failure as fatal.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// In-app notification, addressed by user id.
    async fn notify(&self, user: &UserId, note: InAppNotification) -> Result<(), NotifyError>;

    /// Web-push notification, addressed by user id.
    async fn push_notify(&self, user: &UserId, push: PushNotification) -> Result<(), NotifyError>;

    /// Email, addressed directly; `user` only identifies the recipient
    /// for the backend's own bookkeeping.
    async fn email_notify(
        &self,
        address: &str,
        subject: &str,
        body: &str,
        user: &UserId,
    ) -> Result<(), NotifyError>;
}
