use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod credentials;
pub mod openai;

pub use credentials::{Credentials, RotatingCredentials};
pub use openai::ChatClient;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Talk {
    pub role: Role,
    pub content: String,
}

impl Talk {
    pub fn new(role: Role, content: String) -> Self {
        Self { role, content }
    }
}

/// Everything needed for one chat completion. Serialized as the request body.
#[derive(Serialize, Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Talk>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Key to use instead of the client's credentials, for checking a candidate key.
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("API credential rejected or missing: {0}")]
    Credential(String),
    #[error("rate limited by the completion API, retry later: {0}")]
    RateLimited(String),
    #[error("completion request timed out")]
    Timeout,
    #[error("failed to reach the completion API: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("completion API returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

impl ChatError {
    /// Errors that will fail every following request too, so an upload stops on them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChatError::Credential(_) | ChatError::RateLimited(_))
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one completion request and return the assistant's text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ChatError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() -> anyhow::Result<()> {
        let request = CompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![Talk::new(Role::System, "be brief".to_string())],
            temperature: 0.5,
            max_tokens: 10,
            api_key: Some("sk-secret".to_string()),
        };
        let body = serde_json::to_value(&request)?;
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["max_tokens"], 10);
        assert!(body.get("api_key").is_none());
        Ok(())
    }

    #[test]
    fn test_fatal_errors() {
        assert!(ChatError::Credential("missing".into()).is_fatal());
        assert!(ChatError::RateLimited("slow down".into()).is_fatal());
        assert!(!ChatError::Timeout.is_fatal());
        assert!(!ChatError::Upstream { status: 500, body: String::new() }.is_fatal());
    }
}
