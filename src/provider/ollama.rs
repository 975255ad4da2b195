//! Provider for Ollama's native API.
//!
//! Endpoint: `/api/chat`, non-streaming, with `format: "json"` when the
//! request asks for JSON output.

use super::{parse_retry_after, CompletionRequest, CompletionResponse, Provider};
use crate::error::{GenError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Provider for a local or remote Ollama daemon.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Default local daemon at `http://localhost:11434`.
    pub fn local() -> Self {
        Self::new("http://localhost:11434")
    }

    fn build_body(request: &CompletionRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            },
        });
        if request.json_mode {
            body["format"] = json!("json");
        }
        body
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(
        &self,
        client: &Client,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse> {
        let base = self.base_url.trim_end_matches('/');
        let url = format!("{}/api/chat", base);
        let body = Self::build_body(request);

        let resp = client.post(&url).json(&body).send().await?;
        let status = resp.status().as_u16();

        if status == 429 {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(GenError::RateLimit { retry_after });
        }
        if !resp.status().is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(GenError::Network {
                status: Some(status),
                detail,
            });
        }

        let json_resp: Value = resp.json().await?;
        let text = json_resp
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let mut meta = serde_json::Map::new();
        for key in ["model", "total_duration", "eval_count"] {
            if let Some(v) = json_resp.get(key) {
                meta.insert(key.into(), v.clone());
            }
        }

        Ok(CompletionResponse {
            text,
            metadata: if meta.is_empty() {
                None
            } else {
                Some(Value::Object(meta))
            },
        })
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
