//! Notification delivery with a bounded failure path.

use std::sync::Arc;

use tracing::{info, warn};

use crate::ports::notify_port::Notifier;

pub const ERROR_TITLE: &str = "Error";

#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn Notifier>) -> Self {
        Dispatcher { sink }
    }

    /// Deliver a notification. A failed delivery is reported once through the
    /// same sink; if that also fails the notice is logged and dropped.
    pub async fn notify(&self, title: &str, message: &str) {
        info!(title, message, "notification");
        let Err(err) = self.sink.send(title, message).await else {
            return;
        };
        warn!(title, error = %err, "notification failed");

        let notice = format!("Failed to send notification: {}", err);
        if let Err(err) = self.sink.send(ERROR_TITLE, &notice).await {
            warn!(error = %err, "failure notice not delivered, dropping");
        }
    }
}
