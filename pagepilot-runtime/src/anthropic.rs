//! Anthropic Messages API backend.

use crate::interfaces::{ModelBackend, ModelRequest, ModelTurn, RuntimeError};
use crate::types::{ContentBlock, ResultContent, Role, Turn};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

pub const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Sent with every request, e.g. gateway auth.
    pub extra_headers: BTreeMap<String, String>,
}

#[derive(Clone)]
pub struct AnthropicBackend {
    client: reqwest::Client,
    config: AnthropicConfig,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl AnthropicBackend {
    pub fn new(config: AnthropicConfig) -> Result<Self, RuntimeError> {
        if config.api_key.trim().is_empty() {
            return Err(RuntimeError::ConfigError("API key cannot be empty".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(RuntimeError::ConfigError("Model cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RuntimeError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, request: &ModelRequest) -> Value {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "input_schema": spec.input_schema,
                })
            })
            .collect();

        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": request.system_prompt,
            "messages": wire_messages(request.transcript.turns()),
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools);
        }
        body
    }
}

/// Tool turns travel as `user` messages; adjacent same-role turns are merged
/// since the API expects strict alternation. Turns without blocks stay in the
/// transcript but are never sent.
fn wire_messages(turns: &[Turn]) -> Vec<Value> {
    let mut messages: Vec<(&'static str, Vec<Value>)> = Vec::new();
    for turn in turns {
        if turn.blocks.is_empty() {
            continue;
        }
        let role = match turn.role {
            Role::Assistant => "assistant",
            Role::User | Role::Tool => "user",
        };
        let blocks = turn.blocks.iter().map(wire_block);
        match messages.last_mut() {
            Some((last_role, content)) if *last_role == role => content.extend(blocks),
            _ => messages.push((role, blocks.collect())),
        }
    }
    messages
        .into_iter()
        .map(|(role, content)| json!({"role": role, "content": content}))
        .collect()
}

fn wire_block(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { text } => json!({"type": "text", "text": text}),
        ContentBlock::ToolUse { id, name, input } => {
            json!({"type": "tool_use", "id": id, "name": name, "input": input})
        }
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            let content: Vec<Value> = content
                .iter()
                .map(|item| match item {
                    ResultContent::Text { text } => json!({"type": "text", "text": text}),
                    ResultContent::Image { media_type, data } => json!({
                        "type": "image",
                        "source": {"type": "base64", "media_type": media_type, "data": data}
                    }),
                })
                .collect();
            json!({
                "type": "tool_result",
                "tool_use_id": tool_use_id,
                "content": content,
                "is_error": is_error,
            })
        }
    }
}

/// Map a non-success status to the error taxonomy.
pub fn classify_status(status: StatusCode, detail: String) -> RuntimeError {
    let message = format!("HTTP {}: {}", status.as_u16(), detail);
    match status.as_u16() {
        408 | 409 | 429 | 500..=599 => RuntimeError::Transient(message),
        _ => RuntimeError::FatalRequest(message),
    }
}

fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!("{}: {}", envelope.error.kind, envelope.error.message),
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.chars().take(500).collect(),
    }
}

#[async_trait]
impl ModelBackend for AnthropicBackend {
    async fn send(&self, request: &ModelRequest) -> Result<ModelTurn, RuntimeError> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.request_body(request));
        for (name, value) in &self.config.extra_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RuntimeError::Transient(format!("Request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RuntimeError::Transient(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_status(status, error_detail(&body)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| RuntimeError::Transient(format!("Malformed response body: {e}")))?;

        let content: Vec<ContentBlock> = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
                ResponseBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                ResponseBlock::Unsupported => None,
            })
            .collect();

        debug!(
            blocks = content.len(),
            stop_reason = parsed.stop_reason.as_deref().unwrap_or("none"),
            "model responded"
        );

        Ok(ModelTurn {
            content,
            stop_reason: parsed.stop_reason,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::Transcript;

    #[test]
    fn test_status_classification() {
        for code in [400, 401, 403, 404, 413] {
            let err = classify_status(StatusCode::from_u16(code).unwrap(), String::new());
            assert!(matches!(err, RuntimeError::FatalRequest(_)), "{code}");
        }
        for code in [408, 409, 429, 500, 503, 529] {
            let err = classify_status(StatusCode::from_u16(code).unwrap(), String::new());
            assert!(err.is_retryable(), "{code}");
        }
    }

    #[test]
    fn test_tool_turns_merge_into_user_message() {
        let turns = vec![
            Turn::user_text("open example.com"),
            Turn::new(
                Role::Assistant,
                vec![ContentBlock::tool_use("toolu_1", "navigate", json!({"url": "https://example.com"}))],
            ),
            Turn::new(
                Role::Tool,
                vec![ContentBlock::ToolResult {
                    tool_use_id: "toolu_1".into(),
                    content: vec![ResultContent::png(&[7])],
                    is_error: false,
                }],
            ),
            Turn::user_text("now summarize"),
        ];

        let messages = wire_messages(&turns);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"][0]["type"], "tool_result");
        assert_eq!(messages[2]["content"][0]["content"][0]["source"]["type"], "base64");
        assert_eq!(messages[2]["content"][1]["text"], "now summarize");
    }

    #[test]
    fn test_empty_turn_is_not_sent() {
        let turns = vec![
            Turn::user_text("task one"),
            Turn::new(Role::Assistant, Vec::new()),
            Turn::user_text("task two"),
        ];
        let messages = wire_messages(&turns);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"].as_array().unwrap().len(), 2);
        assert_eq!(messages[0]["content"][1]["text"], "task two");
    }

    #[test]
    fn test_error_detail_prefers_envelope() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(error_detail(body), "overloaded_error: Overloaded");
        assert_eq!(error_detail(""), "no response body");
    }

    #[test]
    fn test_empty_key_rejected() {
        let config = AnthropicConfig {
            base_url: "http://localhost".into(),
            api_key: " ".into(),
            model: "claude".into(),
            max_tokens: 16,
            timeout: Duration::from_secs(1),
            extra_headers: BTreeMap::new(),
        };
        assert!(matches!(
            AnthropicBackend::new(config),
            Err(RuntimeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_request_body_omits_empty_tools() {
        let backend = AnthropicBackend::new(AnthropicConfig {
            base_url: "http://localhost".into(),
            api_key: "key".into(),
            model: "claude".into(),
            max_tokens: 16,
            timeout: Duration::from_secs(1),
            extra_headers: BTreeMap::new(),
        })
        .unwrap();
        let body = backend.request_body(&ModelRequest {
            system_prompt: "sys".into(),
            transcript: Transcript::from(vec![Turn::user_text("hi")]),
            tools: vec![],
        });
        assert!(body.get("tools").is_none());
        assert_eq!(body["system"], "sys");
    }
}
