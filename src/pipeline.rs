use std::sync::Arc;

use futures::StreamExt;
use log::{info, warn};
use serde::Serialize;

use crate::chat::{ChatError, CompletionClient, CompletionRequest, Role, Talk};
use crate::document::chunk::{chunk_document, truncate_chars};
use crate::flashcard::{parse_limited, CardBudget, Flashcard, PromptTemplate};
use crate::Config;

/// Knobs for one flashcard generation run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub model: String,
    pub prompt: PromptTemplate,
    pub max_chunk_len: usize,
    pub max_cards: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Completion requests in flight at once.
    pub concurrency: usize,
    /// Cap on the text length before chunking.
    pub max_input_chars: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            prompt: PromptTemplate::default(),
            max_chunk_len: 3000,
            max_cards: 300,
            temperature: 0.7,
            max_tokens: 1500,
            concurrency: 1,
            max_input_chars: None,
        }
    }
}

/// Prompts for the single-shot study helpers.
#[derive(Debug, Clone)]
pub struct AssistConfig {
    pub summary_prompt: String,
    pub summary_max_tokens: u32,
    pub summary_max_chars: usize,
    pub answer_prompt: String,
    pub answer_max_tokens: u32,
    pub answer_context_chars: usize,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            summary_prompt: "You are a helpful study assistant. Create a concise but comprehensive summary of the following notes.".to_string(),
            summary_max_tokens: 1000,
            summary_max_chars: 4000,
            answer_prompt: "You are a helpful study assistant. Answer the student's question based on their notes if relevant.".to_string(),
            answer_max_tokens: 800,
            answer_context_chars: 2000,
        }
    }
}

const SUMMARY_TEMPERATURE: f32 = 0.5;
const ANSWER_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChunkFailure {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub flashcards: Vec<Flashcard>,
    pub chunk_count: usize,
    pub failures: Vec<ChunkFailure>,
    /// The card cap was reached and remaining chunks were skipped.
    pub capped: bool,
}

impl Generation {
    pub fn all_failed(&self) -> bool {
        self.chunk_count > 0 && self.failures.len() == self.chunk_count
    }
}

#[derive(Clone)]
pub struct Pipeline {
    client: Arc<dyn CompletionClient>,
    config: PipelineConfig,
    assist: AssistConfig,
}

impl Pipeline {
    pub fn new(client: Arc<dyn CompletionClient>, config: PipelineConfig, assist: AssistConfig) -> Self {
        Self { client, config, assist }
    }

    pub fn from_config(client: Arc<dyn CompletionClient>, config: &Config) -> Self {
        let pipeline = PipelineConfig {
            model: config.chat_model.clone(),
            prompt: PromptTemplate::new(&config.flashcard_system_prompt, &config.flashcard_prompt),
            max_chunk_len: config.chunk_size,
            max_cards: config.max_cards,
            temperature: config.flashcard_temperature,
            max_tokens: config.flashcard_max_tokens,
            concurrency: config.concurrency,
            max_input_chars: config.max_input_chars,
        };
        let assist = AssistConfig {
            summary_prompt: config.summary_prompt.clone(),
            summary_max_tokens: config.summary_max_tokens,
            answer_prompt: config.answer_prompt.clone(),
            answer_max_tokens: config.answer_max_tokens,
            ..AssistConfig::default()
        };
        Self::new(client, pipeline, assist)
    }

    /// Chunk `text`, request flashcards for each chunk and collect them up to the card cap.
    ///
    /// A failed chunk is recorded and skipped. Credential and rate-limit errors abort
    /// the whole run since every later chunk would fail the same way.
    pub async fn generate_flashcards(&self, text: &str) -> Result<Generation, ChatError> {
        let text = match self.config.max_input_chars {
            Some(max) => truncate_chars(text, max),
            None => text.to_string(),
        };
        let chunks = chunk_document(&text, self.config.max_chunk_len);
        let chunk_count = chunks.len();
        let mut budget = CardBudget::new(self.config.max_cards);
        if budget.is_full() {
            info!("card cap is {}, skipping {} chunks", self.config.max_cards, chunk_count);
            return Ok(Generation {
                flashcards: Vec::new(),
                chunk_count,
                failures: Vec::new(),
                capped: chunk_count > 0,
            });
        }
        info!("generating flashcards from {} chunks", chunk_count);

        let client = self.client.as_ref();
        let requests = chunks.into_iter().map(|chunk| {
            let request = CompletionRequest {
                model: self.config.model.clone(),
                messages: self.config.prompt.messages(&chunk.content),
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
                api_key: None,
            };
            async move { (chunk.index, client.complete(&request).await) }
        });
        let mut responses = std::pin::pin!(futures::stream::iter(requests).buffered(self.config.concurrency.max(1)));

        let mut failures = Vec::new();
        let mut capped = false;

        while let Some((index, result)) = responses.next().await {
            match result {
                Ok(raw) => {
                    let cards = parse_limited(&raw, budget.remaining());
                    let kept = budget.extend(cards);
                    info!("chunk {}: {} flashcards", index, kept);
                }
                Err(err) if err.is_fatal() => {
                    warn!("chunk {}: {}, aborting", index, err);
                    return Err(err);
                }
                Err(err) => {
                    warn!("chunk {}: {}, skipping", index, err);
                    failures.push(ChunkFailure { index, error: err.to_string() });
                }
            }
            if budget.is_full() {
                capped = true;
                info!("reached {} flashcards, stopping after chunk {}", self.config.max_cards, index);
                break;
            }
        }

        Ok(Generation {
            flashcards: budget.into_cards(),
            chunk_count,
            failures,
            capped,
        })
    }

    pub async fn summarize(&self, text: &str) -> Result<String, ChatError> {
        let text = truncate_chars(text, self.assist.summary_max_chars);
        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                Talk::new(Role::System, self.assist.summary_prompt.clone()),
                Talk::new(Role::User, text),
            ],
            temperature: SUMMARY_TEMPERATURE,
            max_tokens: self.assist.summary_max_tokens,
            api_key: None,
        };
        self.client.complete(&request).await
    }

    /// Send a minimal request to confirm the API credential is accepted.
    pub async fn verify_credentials(&self) -> Result<(), ChatError> {
        self.send_hello(None).await
    }

    /// Like `verify_credentials`, but authenticates with `api_key` instead of the stored key.
    pub async fn verify_key(&self, api_key: &str) -> Result<(), ChatError> {
        self.send_hello(Some(api_key.to_string())).await
    }

    async fn send_hello(&self, api_key: Option<String>) -> Result<(), ChatError> {
        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![Talk::new(Role::User, "Hello".to_string())],
            temperature: 0.0,
            max_tokens: 5,
            api_key,
        };
        self.client.complete(&request).await.map(|_| ())
    }

    /// Answer a question, optionally grounded in the student's notes.
    pub async fn answer(&self, question: &str, notes: Option<&str>) -> Result<String, ChatError> {
        let mut messages = vec![Talk::new(Role::System, self.assist.answer_prompt.clone())];
        if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
            let notes = truncate_chars(notes, self.assist.answer_context_chars);
            messages.push(Talk::new(Role::User, format!("Here are my notes: {notes}")));
        }
        messages.push(Talk::new(Role::User, question.to_string()));

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: ANSWER_TEMPERATURE,
            max_tokens: self.assist.answer_max_tokens,
            api_key: None,
        };
        self.client.complete(&request).await
    }
}
