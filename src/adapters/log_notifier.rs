//! Notification sink that writes to the tracing log.

use async_trait::async_trait;
use tracing::info;

use crate::domain::error::TraderError;
use crate::ports::notify_port::Notifier;

#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, title: &str, message: &str) -> Result<(), TraderError> {
        info!(target: "notify", title, "{}", message);
        Ok(())
    }
}
