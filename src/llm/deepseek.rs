//! DeepSeek chat completions (OpenAI-compatible wire format)

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatMessage, ChatModel, CompletionOptions};
use crate::error::{Result, RunError, truncate_chars};

const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for `POST {base_url}/v1/chat/completions`
pub struct DeepSeekClient {
    agent: ureq::Agent,
    base_url: String,
    model: String,
    api_key: String,
}

impl DeepSeekClient {
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

impl ChatModel for DeepSeekClient {
    fn complete(&self, messages: &[ChatMessage], options: CompletionOptions) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: false,
        };
        let request_body = serde_json::to_string(&request)?;
        let url = self.endpoint();

        log::info!(
            "Calling {} model={} temperature={} max_tokens={}",
            url,
            self.model,
            options.temperature,
            options.max_tokens
        );

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(request_body.as_bytes())
            .map_err(|e| RunError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let response_body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| RunError::Network(format!("failed to read response: {}", e)))?;

        if status >= 400 {
            return Err(RunError::Api {
                status,
                body: truncate_chars(&response_body, ERROR_BODY_LIMIT).to_string(),
            });
        }

        parse_completion(&response_body)
    }
}

/// Pull `choices[0].message.content` out of a completion body
pub fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| RunError::MalformedResponse(format!("completion body is not valid JSON: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| RunError::MalformedResponse("completion has no choices[0].message.content".to_string()))?;

    Ok(content.trim().to_string())
}
