//! Remote model backend (OpenAI-compatible `/chat/completions`)
//!
//! The bearer credential is read from the environment variable named by
//! `api_key_env` on every call, so rotating it needs no restart and a missing
//! variable only fails this backend.

use querygate_core::BackendConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::{instructions, interpret_reply, rejected, request_block, transport_error};
use crate::translator::{Translation, TranslationError, TranslationRequest, Translator};

/// Translator backed by a hosted chat-completions API
pub struct RemoteTranslator {
    name: String,
    client: Client,
    base_url: String,
    model: String,
    api_key_env: Option<String>,
    timeout: Duration,
    min_confidence: f64,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl RemoteTranslator {
    pub fn from_config(config: &BackendConfig) -> Result<Self, TranslationError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TranslationError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            name: config.name.clone(),
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            timeout: config.timeout(),
            min_confidence: config.min_confidence,
        })
    }

    fn api_key(&self) -> Result<String, TranslationError> {
        let variable = self.api_key_env.as_deref().ok_or_else(|| {
            TranslationError::Configuration(format!("backend '{}' has no api_key_env", self.name))
        })?;

        match std::env::var(variable) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(TranslationError::Configuration(format!(
                "environment variable {} is not set",
                variable
            ))),
        }
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, TranslationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instructions(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.1,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejected(status, &body));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TranslationError::MalformedResponse("reply has no message content".into()))
    }
}

#[async_trait::async_trait]
impl Translator for RemoteTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<Translation, TranslationError> {
        let api_key = self.api_key()?;
        let prompt = request_block(&request.schema_description()?, request.text());
        tracing::debug!(backend = %self.name, model = %self.model, "Querying remote model");

        let text = self.complete(&api_key, &prompt).await?;
        interpret_reply(&text, request.catalog(), self.min_confidence)
    }
}
