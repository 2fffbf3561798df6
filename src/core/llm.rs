use crate::config::LLMConfig;
use crate::core::record::ChatMessage;
use crate::error::CompletionError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Duration};

/// Answer used when the provider replies successfully but says nothing
pub const NO_RESPONSE: &str = "no response";

/// Anything that can turn a curated prompt into an answer
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

/// Either shape the provider may answer with
#[derive(Debug, Deserialize)]
struct ChatResponse {
    error: Option<ProviderError>,
    /// Null at either level is a valid reply with no answer
    choices: Option<Vec<Option<Choice>>>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_answer(self) -> Result<String, CompletionError> {
        if let Some(error) = self.error {
            let message = error
                .message
                .unwrap_or_else(|| "unknown provider error".to_string());
            return Err(CompletionError::Provider(message));
        }

        Ok(self
            .choices
            .unwrap_or_default()
            .into_iter()
            .next()
            .flatten()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }
}

pub struct LLMClient {
    client: Client,
    api_key: String,
    settings: LLMConfig,
}

const BASE_DELAY_MS: u64 = 500;

/// Backoff before retry number `retry` (1-based), saturating on huge counts
fn retry_delay_ms(retry: u32) -> u64 {
    BASE_DELAY_MS.saturating_mul(2_u64.saturating_pow(retry.saturating_sub(1)))
}

fn total_attempts(max_retries: u32) -> u32 {
    max_retries.saturating_add(1)
}

impl LLMClient {
    pub fn new(api_key: String, settings: LLMConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            settings,
        }
    }

    async fn attempt(&self, request: &ChatRequest<'_>) -> Result<String, CompletionError> {
        let exchange = async {
            let response = self
                .client
                .post(&self.settings.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(request)
                .send()
                .await
                .map_err(|e| CompletionError::Transport(format!("HTTP request failed: {}", e)))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| CompletionError::Transport(format!("Failed to read body: {}", e)))?;
            Ok::<_, CompletionError>((status, body))
        };

        let (status, body) = timeout(Duration::from_secs(self.settings.timeout_secs), exchange)
            .await
            .map_err(|_| {
                CompletionError::Transport(format!(
                    "Request timed out after {} seconds",
                    self.settings.timeout_secs
                ))
            })??;

        match serde_json::from_str::<ChatResponse>(&body) {
            Ok(parsed) => parsed.into_answer(),
            Err(_) if !status.is_success() => Err(CompletionError::Transport(format!(
                "API error {}: {}",
                status, body
            ))),
            Err(e) => Err(CompletionError::Transport(format!(
                "Response decode error: {}",
                e
            ))),
        }
    }
}

#[async_trait]
impl ChatCompletion for LLMClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages,
        };

        let attempts = total_attempts(self.settings.max_retries);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = retry_delay_ms(attempt);
                tracing::warn!(
                    "[LLMClient] Retrying API call (attempt {}/{}) after {}ms delay",
                    attempt + 1,
                    attempts,
                    delay
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.attempt(&request).await {
                Ok(answer) => return Ok(answer),
                Err(CompletionError::Transport(e)) => {
                    tracing::warn!("[LLMClient] {}", e);
                    last_error = Some(CompletionError::Transport(e));
                }
                // The provider understood the request; asking again will not help
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| CompletionError::Transport("All retry attempts failed".to_string())))
    }
}
