use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;

use super::{ChatError, CompletionClient, CompletionRequest, Credentials};

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatClient {
    client: Client,
    url: String,
    credentials: Arc<dyn Credentials>,
}

impl ChatClient {
    pub fn new(url: &str, credentials: Arc<dyn Credentials>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl CompletionClient for ChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ChatError> {
        let api_key = request
            .api_key
            .clone()
            .or_else(|| self.credentials.api_key())
            .ok_or_else(|| ChatError::Credential("API key is not set".to_string()))?;

        debug!("completion request to {} ({} messages)", self.url, request.messages.len());

        let response = self.client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| if err.is_timeout() { ChatError::Timeout } else { ChatError::Transport(err) })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("completion API returned {}", status);
            return Err(classify_status(status, body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| if err.is_timeout() { ChatError::Timeout } else { ChatError::Malformed(err.to_string()) })?;

        let content = body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(ChatError::Malformed("response has no message content".to_string()));
        }
        Ok(content)
    }
}

fn classify_status(status: u16, body: String) -> ChatError {
    match status {
        401 | 403 => ChatError::Credential(body),
        429 => ChatError::RateLimited(body),
        _ => ChatError::Upstream { status, body },
    }
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}
