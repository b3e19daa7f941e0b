use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::id::TopicId;

pub mod server;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Failed to build mirror node client: {0}")]
    Build(reqwest::Error),
    #[error("Mirror node request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Mirror node responded with {status} for {url}")]
    Status { status: StatusCode, url: String },
    #[error("Message is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Message is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Topic message as served by the mirror node REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorTopicMessage {
    pub consensus_timestamp: String,
    pub topic_id: String,
    /// Base64 encoded message bytes.
    pub message: String,
    #[serde(default)]
    pub payer_account_id: Option<String>,
    pub sequence_number: u64,
}

impl MirrorTopicMessage {
    pub fn decode(&self) -> Result<String, MirrorError> {
        let bytes = STANDARD.decode(&self.message)?;
        Ok(String::from_utf8(bytes)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMessagesPage {
    #[serde(default)]
    pub messages: Vec<MirrorTopicMessage>,
    #[serde(default)]
    pub links: Links,
}

/// Read-only client for the mirror node REST API.
#[derive(Debug, Clone)]
pub struct MirrorClient {
    base_url: String,
    client: Client,
}

impl MirrorClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MirrorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(MirrorError::Build)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client,
        })
    }

    pub fn topic_messages_url(&self, topic_id: TopicId) -> String {
        format!("{}/api/v1/topics/{topic_id}/messages", self.base_url)
    }

    /// First page of the topic's messages, oldest first.
    pub async fn topic_messages(
        &self,
        topic_id: TopicId,
    ) -> Result<Vec<MirrorTopicMessage>, MirrorError> {
        let url = self.topic_messages_url(topic_id);
        Ok(self.fetch(url).await?.messages)
    }

    /// Most recent message of the topic decoded as UTF-8, `None` while the
    /// mirror node has not ingested any message yet.
    pub async fn latest_message(&self, topic_id: TopicId) -> Result<Option<String>, MirrorError> {
        let url = format!("{}?order=desc&limit=1", self.topic_messages_url(topic_id));
        let page = self.fetch(url).await?;
        page.messages
            .first()
            .map(|message| message.decode().map(|text| text.trim().to_owned()))
            .transpose()
    }

    async fn fetch(&self, url: String) -> Result<TopicMessagesPage, MirrorError> {
        debug!(%url, "mirror node request");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Status { status, url });
        }
        Ok(response.json().await?)
    }
}
