//! HTTP-backed `LlmClient` (§6 "LLM runtime"): an OpenAI-compatible
//! chat-completions caller. The client owns its own auth — no secret
//! is read by the pipeline crates themselves.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use evo_pipeline::LlmClient;
use serde_json::json;

pub struct HttpLlmClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl HttpLlmClient {
    /// Reads `EVOFORGE_LLM_ENDPOINT`, `EVOFORGE_LLM_API_KEY` and
    /// `EVOFORGE_LLM_MODEL` from the environment. Endpoint and model
    /// fall back to sensible OpenAI-compatible defaults; the API key is
    /// required.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("EVOFORGE_LLM_API_KEY").context("EVOFORGE_LLM_API_KEY not set")?;
        let endpoint = std::env::var("EVOFORGE_LLM_ENDPOINT")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
        let model = std::env::var("EVOFORGE_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
            temperature: 0.2,
        })
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": "You are an automated code improvement engine. Follow the output contract exactly."},
                {"role": "user", "content": prompt},
            ],
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("LLM request failed")?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await.context("LLM response was not valid JSON")?;
        if !status.is_success() {
            bail!("LLM endpoint returned {status}: {payload}");
        }

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .context("LLM response missing choices[0].message.content")
    }
}
