// src/notify/mod.rs
// Outbound message delivery

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::TelegramConfig;
use crate::error::{Result, TrackerError};

/// Delivers a text message to a user identified by Telegram id
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user_id: i64, text: &str) -> Result<()>;
}

/// Sends through the Telegram Bot API with HTML formatting.
///
/// The endpoint embeds the bot token, so transport errors are stripped of
/// their URL before they leave this type.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &TelegramConfig) -> Self {
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );
        Self { client, endpoint }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, user_id: i64, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "chat_id": user_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        let body: Option<ApiResponse> = response.json().await.ok();

        match body {
            Some(body) if status.is_success() && body.ok => {
                debug!(user_id, "message delivered");
                Ok(())
            }
            Some(body) => Err(TrackerError::Delivery(format!(
                "telegram rejected message to {user_id} ({status}): {}",
                body.description.unwrap_or_default()
            ))),
            None => Err(TrackerError::Delivery(format!(
                "telegram returned {status} for {user_id}"
            ))),
        }
    }
}
