//! LLM roundtrip (§4.12 step 3): a thin client trait plus parsing of
//! the Prompt Builder's output contract (metadata JSON + fenced code).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub metadata: Value,
    pub code: String,
}

/// Extracts the metadata JSON block and the single fenced code block
/// from a raw LLM completion. Either missing is a parse failure (§4.12:
/// "extract metadata JSON + code block; on parse failure → FAILED").
pub fn extract_response(raw: &str) -> Result<LlmResponse> {
    let metadata = extract_json_block(raw).context("no metadata JSON block found")?;
    let code = extract_fenced_code(raw).context("no fenced code block found")?;
    Ok(LlmResponse { metadata, code })
}

fn extract_json_block(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in raw[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return serde_json::from_str(&raw[start..end]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_fenced_code(raw: &str) -> Option<String> {
    let start = raw.find("```")?;
    let after_open = &raw[start + 3..];
    let first_newline = after_open.find('\n')?;
    let body = &after_open[first_newline + 1..];
    let end = body.find("```")?;
    Some(body[..end].to_string())
}

/// Re-prompts with failure-aware constraints, per the category of the
/// prior failure.
pub fn failure_aware_addendum(category: &str) -> String {
    format!("The previous attempt failed validation with category {category}. Address that specific issue and resubmit the full output contract.")
}

pub struct EchoClient {
    pub fixed_response: String,
}

#[async_trait]
impl LlmClient for EchoClient {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.fixed_response.clone())
    }
}

pub async fn roundtrip(client: &dyn LlmClient, prompt: &str) -> Result<LlmResponse> {
    let raw = client.complete(prompt).await?;
    match extract_response(&raw) {
        Ok(response) => Ok(response),
        Err(e) => bail!("LLM response parse failure: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_metadata_and_code() {
        let raw = "Here is the change:\n{\"description\": \"tidy\"}\n```rust\nfn f() {}\n```\n";
        let response = extract_response(raw).unwrap();
        assert_eq!(response.metadata["description"], "tidy");
        assert_eq!(response.code.trim(), "fn f() {}");
    }

    #[test]
    fn missing_code_block_is_a_parse_failure() {
        let raw = "{\"description\": \"tidy\"}";
        assert!(extract_response(raw).is_err());
    }

    #[tokio::test]
    async fn roundtrip_uses_the_supplied_client() {
        let client = EchoClient { fixed_response: "{\"d\":1}\n```rust\nfn g() {}\n```".to_string() };
        let response = roundtrip(&client, "irrelevant").await.unwrap();
        assert_eq!(response.code.trim(), "fn g() {}");
    }
}
