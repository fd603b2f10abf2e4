//! OpenAI-compatible chat-completion adapter.
//!
//! One prompt in, free text out. Auth and quota failures surface as
//! `GatewayError::Unavailable` so the orchestrator can fall back to the
//! deterministic strategy instead of aborting the run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::CompletionGateway;
use crate::error::GatewayError;

pub struct ChatCompletionGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl ChatCompletionGateway {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl CompletionGateway for ChatCompletionGateway {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "completion request");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, &self.endpoint))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            return Err(GatewayError::Unavailable {
                reason: format!("completion endpoint returned {}", status),
            });
        }
        if !status.is_success() {
            return Err(GatewayError::Unavailable {
                reason: format!("completion endpoint returned {}", status),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|_| GatewayError::Parse {
            what: "chat completion response".to_string(),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(GatewayError::Parse {
                what: "chat completion choices".to_string(),
            })
    }
}
