//! Local model backend (Ollama-compatible `/api/generate`)

use querygate_core::BackendConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::{build_prompt, interpret_reply, rejected, transport_error};
use crate::translator::{Translation, TranslationError, TranslationRequest, Translator};

/// Translator backed by a locally hosted model
pub struct LocalTranslator {
    name: String,
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
    min_confidence: f64,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl LocalTranslator {
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
            timeout: config.timeout(),
            min_confidence: config.min_confidence,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, TranslationError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
            options: GenerateOptions { temperature: 0.1 },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejected(status, &body));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        Ok(reply.response)
    }
}

#[async_trait::async_trait]
impl Translator for LocalTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<Translation, TranslationError> {
        let prompt = build_prompt(&request.schema_description()?, request.text());
        tracing::debug!(backend = %self.name, model = %self.model, "Querying local model");

        let text = self.generate(&prompt).await?;
        interpret_reply(&text, request.catalog(), self.min_confidence)
    }
}
