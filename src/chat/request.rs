//! Request types
//!
//! The inbound OpenAI request and the argument block sent to the upstream
//! chat driver. Messages travel upstream verbatim, so their content and any
//! unrecognized fields are kept as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

/// Chat message role
///
/// Roles outside the known set are kept verbatim in [`Role::Other`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
    Tool,
    Function,
    #[serde(untagged)]
    Other(String),
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    /// Plain string or an array of content parts
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    /// Plain-text message, mostly for tests and examples
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(Value::String(content.into())),
            name: None,
            tool_calls: None,
            tool_call_id: None,
            extra: Map::new(),
        }
    }
}

/// OpenAI chat completion request
///
/// Unknown fields (`top_p`, `stop`, `user`, ...) are accepted and not
/// forwarded upstream. A missing or null `model` or `stream` means the
/// default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatCompletionRequest {
    /// Reject requests the proxy cannot serve.
    pub fn validate(&self) -> AppResult<()> {
        if self.messages.is_empty() {
            return Err(AppError::BadRequest("messages must not be empty".to_string()));
        }
        if let Some(n) = self.n {
            if n != 1 {
                return Err(AppError::BadRequest(format!(
                    "n={} is not supported, only a single choice can be generated",
                    n
                )));
            }
        }
        Ok(())
    }
}

/// Arguments of an upstream `puter-chat-completion` driver call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpstreamRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    /// Driver that serves `model`; sent next to `args`, not inside it
    #[serde(skip)]
    pub driver: String,
    /// Selects the gateway entry point; the wire flag is set by the gateway
    #[serde(skip)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
}
