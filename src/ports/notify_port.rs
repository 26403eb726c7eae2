//! Notification sink port trait.

use async_trait::async_trait;

use crate::domain::error::TraderError;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one title + message. Implementations make a single attempt.
    async fn send(&self, title: &str, message: &str) -> Result<(), TraderError>;
}
