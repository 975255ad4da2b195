//! Provider for OpenAI-compatible APIs.
//!
//! [`OpenAiProvider`] covers OpenAI itself plus the compatible surface of
//! vLLM, llama.cpp server, LM Studio, Together AI, Groq, Mistral, Fireworks,
//! and Ollama's `/v1/` endpoint.
//!
//! Endpoint: `/v1/chat/completions`, non-streaming.

use super::{parse_retry_after, CompletionRequest, CompletionResponse, Provider};
use crate::error::{GenError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Provider for any OpenAI-compatible API.
///
/// # Example
///
/// ```
/// use slidegen::provider::OpenAiProvider;
///
/// let provider = OpenAiProvider::new("https://api.openai.com").with_api_key("sk-...");
/// ```
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    /// Optional API key, sent as `Authorization: Bearer {key}`.
    api_key: Option<String>,
    /// Optional organization ID, sent as `OpenAI-Organization: {org}`.
    organization: Option<String>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &self.api_key.as_ref().map(|k| {
                    if k.len() > 6 {
                        format!("{}***", &k[..6])
                    } else {
                        "***".to_string()
                    }
                }),
            )
            .field("organization", &self.organization)
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider without authentication (local compatible servers).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            organization: None,
        }
    }

    /// Set the API key for authentication.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the organization ID header.
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
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
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false,
        });
        if request.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }

    fn build_http_request(
        &self,
        client: &Client,
        url: &str,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        let mut req = client.post(url).json(body);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        if let Some(ref org) = self.organization {
            req = req.header("OpenAI-Organization", org.as_str());
        }
        req
    }

    fn extract_metadata(json_resp: &Value) -> Option<Value> {
        let mut meta = serde_json::Map::new();
        for key in ["usage", "model", "id"] {
            if let Some(v) = json_resp.get(key) {
                meta.insert(key.into(), v.clone());
            }
        }
        if meta.is_empty() {
            None
        } else {
            Some(Value::Object(meta))
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        client: &Client,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse> {
        let base = self.base_url.trim_end_matches('/');
        let url = format!("{}/v1/chat/completions", base);
        let body = Self::build_body(request);

        let resp = self.build_http_request(client, &url, &body).send().await?;
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

        let choice = json_resp.get("choices").and_then(|c| c.get(0));
        if let Some("content_filter") = choice
            .and_then(|c| c.get("finish_reason"))
            .and_then(Value::as_str)
        {
            return Err(GenError::ContentFilter {
                detail: "completion stopped by provider content filter".into(),
            });
        }

        let text = choice
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        Ok(CompletionResponse {
            text,
            metadata: Self::extract_metadata(&json_resp),
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Role;

    fn request() -> CompletionRequest {
        CompletionRequest::chat("gpt-4o", "sys", "user")
    }

    #[test]
    fn body_carries_messages_and_json_mode() {
        let body = OpenAiProvider::build_body(&request());
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn body_omits_response_format_without_json_mode() {
        let mut req = request();
        req.json_mode = false;
        let body = OpenAiProvider::build_body(&req);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let provider = OpenAiProvider::new("https://api.openai.com")
            .with_api_key("sk-secret-key-material");
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("secret-key-material"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn assistant_role_serialized() {
        let mut req = request();
        req.messages.push(crate::provider::ChatMessage {
            role: Role::Assistant,
            content: "prior".into(),
        });
        let body = OpenAiProvider::build_body(&req);
        assert_eq!(body["messages"][2]["role"], "assistant");
    }
}
