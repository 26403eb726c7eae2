//! Pushover push notification sink.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::error::TraderError;
use crate::ports::notify_port::Notifier;

pub const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

pub struct PushoverNotifier {
    http_client: reqwest::Client,
    url: String,
    user_key: String,
    api_token: String,
}

impl PushoverNotifier {
    pub fn new(user_key: String, api_token: String) -> Self {
        Self::with_url(PUSHOVER_URL.to_string(), user_key, api_token)
    }

    pub fn with_url(url: String, user_key: String, api_token: String) -> Self {
        PushoverNotifier {
            http_client: reqwest::Client::new(),
            url,
            user_key,
            api_token,
        }
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn send(&self, title: &str, message: &str) -> Result<(), TraderError> {
        let params = [
            ("token", self.api_token.as_str()),
            ("user", self.user_key.as_str()),
            ("title", title),
            ("message", message),
        ];

        let response = self
            .http_client
            .post(&self.url)
            .form(&params)
            .send()
            .await
            .map_err(|e| TraderError::Notify {
                reason: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(TraderError::Notify {
                reason: format!("pushover returned {}: {}", status, body),
            });
        }
        debug!(title, "pushover notification delivered");
        Ok(())
    }
}
