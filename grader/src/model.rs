//! Deterministic LLM invocation with ordered fallback.
//!
//! Candidates are tried in order, one attempt each, at temperature 0.0 so
//! the same instruction grades the same way every time. Only when every
//! candidate has failed does the caller see an error, carrying the last
//! failure message.

use std::time::Duration;

use async_trait::async_trait;
use common::config::AppConfig;
use serde::{Deserialize, Serialize};

use crate::error::GradeError;

/// Request body for the chat-completions endpoint.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response from the chat-completions endpoint.
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Deserialize)]
struct MessageResponse {
    content: String,
}

/// Executes an assembled grading instruction against an LLM backend.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, instruction: &str) -> Result<String, GradeError>;
}

/// [`ModelInvoker`] backed by an OpenAI-compatible chat-completions API.
pub struct OpenAiInvoker {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    candidates: Vec<String>,
    timeout: Duration,
}

impl OpenAiInvoker {
    /// Builds an invoker over the given candidate models, in fallback order.
    /// Blank candidate names are skipped.
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        candidates: Vec<String>,
        timeout: Duration,
    ) -> Self {
        let candidates = candidates
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            candidates,
            timeout,
        }
    }

    /// Builds an invoker from the process configuration: primary model
    /// first, fallback model second.
    pub fn from_config() -> Self {
        let config = AppConfig::global();
        Self::new(
            config.openai_api_base.clone(),
            config.openai_api_key.clone(),
            vec![config.primary_model.clone(), config.fallback_model.clone()],
            Duration::from_secs(config.model_timeout_secs),
        )
    }

    async fn chat(&self, model: &str, instruction: &str) -> Result<String, GradeError> {
        let request_body = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: instruction.to_string(),
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GradeError::ModelInvocation(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| GradeError::ModelInvocation(e.to_string()))?;

        if !status.is_success() {
            return Err(GradeError::ModelInvocation(format!(
                "{} returned {}: {}",
                model, status, response_text
            )));
        }

        let response = serde_json::from_str::<ChatResponse>(&response_text).map_err(|e| {
            GradeError::ModelInvocation(format!(
                "error decoding response body: {}. Full response: {}",
                e, response_text
            ))
        })?;

        response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                GradeError::ModelInvocation(format!("{} returned no choices", model))
            })
    }
}

#[async_trait]
impl ModelInvoker for OpenAiInvoker {
    async fn invoke(&self, instruction: &str) -> Result<String, GradeError> {
        let mut last_error = "no grading model is configured".to_string();

        for model in &self.candidates {
            match self.chat(model, instruction).await {
                Ok(report) => return Ok(report),
                Err(e) => {
                    log::warn!("Model {} failed, trying next candidate: {}", model, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(GradeError::ModelInvocation(last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_candidates_are_skipped_and_order_is_kept() {
        let invoker = OpenAiInvoker::new(
            "https://api.openai.com/v1/",
            "key",
            vec![
                "gpt-4o".to_string(),
                "  ".to_string(),
                "gpt-4o-mini".to_string(),
            ],
            Duration::from_secs(5),
        );
        assert_eq!(invoker.candidates, vec!["gpt-4o", "gpt-4o-mini"]);
        assert_eq!(invoker.api_base, "https://api.openai.com/v1");
    }

    #[tokio::test]
    async fn no_candidates_means_invocation_fails() {
        let invoker =
            OpenAiInvoker::new("https://api.openai.com/v1", "key", vec![], Duration::from_secs(5));
        let err = invoker.invoke("grade this").await.unwrap_err();
        match err {
            GradeError::ModelInvocation(msg) => {
                assert_eq!(msg, "no grading model is configured")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    #[ignore]
    async fn live_grading_call() {
        let invoker = OpenAiInvoker::from_config();
        let report = invoker
            .invoke("Reply with the single word: ready")
            .await
            .unwrap();
        assert!(!report.is_empty());
        println!("Live response: {}", report);
    }
}
