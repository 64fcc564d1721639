// src/discord.rs
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::RateLimiter;
use lazy_static::lazy_static;
use log::debug;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::render::ContentBlock;

lazy_static! {
    static ref API_BASE: String = std::env::var("DISCORD_API_BASE")
        .unwrap_or_else(|_| "https://discord.com/api/v10".to_string());
}

#[derive(Debug)]
pub enum DiscordError {
    Http(reqwest::Error),
    Api { status: u16, body: String },
}

impl fmt::Display for DiscordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "Discord request failed: {}", e),
            Self::Api { status, body } => {
                write!(f, "Discord API returned {}: {}", status, body)
            }
        }
    }
}

impl std::error::Error for DiscordError {}

impl From<reqwest::Error> for DiscordError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageAuthor {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub author: MessageAuthor,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    id: String,
}

pub struct DiscordClient {
    http: reqwest::Client,
    token: String,
    user_id: OnceCell<String>,
    write_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    status_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl DiscordClient {
    pub fn new(token: String, config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            user_id: OnceCell::new(),
            write_limiter: RateLimiter::direct(config.write_quota()),
            status_limiter: RateLimiter::direct(config.status_quota()),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, DiscordError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(DiscordError::Api { status, body })
    }

    // Resolved once per process and cached; every bulletin push filters
    // channel messages down to the ones this bot authored.
    pub async fn current_user_id(&self) -> Result<&str, DiscordError> {
        let id = self
            .user_id
            .get_or_try_init(|| async {
                let response = self
                    .http
                    .get(format!("{}/users/@me", *API_BASE))
                    .header("Authorization", self.auth_header())
                    .send()
                    .await?;
                let user: CurrentUser = Self::check(response).await?.json().await?;
                debug!("Resolved bot user id {}", user.id);
                Ok::<String, DiscordError>(user.id)
            })
            .await?;
        Ok(id)
    }

    // Newest first, as the API orders them.
    pub async fn fetch_channel_messages(
        &self,
        channel_id: u64,
    ) -> Result<Vec<Message>, DiscordError> {
        let response = self
            .http
            .get(format!("{}/channels/{}/messages", *API_BASE, channel_id))
            .query(&[("limit", "50")])
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_message(
        &self,
        channel_id: u64,
        block: &ContentBlock,
    ) -> Result<Message, DiscordError> {
        self.write_limiter.until_ready().await;
        let response = self
            .http
            .post(format!("{}/channels/{}/messages", *API_BASE, channel_id))
            .header("Authorization", self.auth_header())
            .json(&block_payload(block))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn edit_message(
        &self,
        channel_id: u64,
        message_id: &str,
        block: &ContentBlock,
    ) -> Result<(), DiscordError> {
        self.write_limiter.until_ready().await;
        let response = self
            .http
            .patch(format!(
                "{}/channels/{}/messages/{}",
                *API_BASE, channel_id, message_id
            ))
            .header("Authorization", self.auth_header())
            .json(&block_payload(block))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // Status text rides on the channel topic. Discord allows two topic
    // updates per ten minutes, so this skips instead of waiting when the
    // quota is exhausted; the next eligible cycle catches up.
    pub async fn set_status_text(
        &self,
        channel_id: u64,
        text: Option<&str>,
    ) -> Result<(), DiscordError> {
        if self.status_limiter.check().is_err() {
            debug!("Topic quota exhausted, keeping previous status text");
            return Ok(());
        }
        let response = self
            .http
            .patch(format!("{}/channels/{}", *API_BASE, channel_id))
            .header("Authorization", self.auth_header())
            .json(&json!({ "topic": text.unwrap_or("") }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

fn block_payload(block: &ContentBlock) -> serde_json::Value {
    json!({
        "content": "",
        "embeds": [{
            "title": block.title,
            "description": block.body,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_payload_carries_title_and_body_as_embed() {
        let payload = block_payload(&ContentBlock {
            title: "Servers".to_string(),
            body: "body text".to_string(),
        });
        assert_eq!(payload["content"], "");
        assert_eq!(payload["embeds"][0]["title"], "Servers");
        assert_eq!(payload["embeds"][0]["description"], "body text");
    }

    #[test]
    fn deserializes_channel_message() {
        let raw = r#"{"id": "123", "author": {"id": "42", "username": "bot"}, "content": ""}"#;
        let message: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(message.id, "123");
        assert_eq!(message.author.id, "42");
    }
}
