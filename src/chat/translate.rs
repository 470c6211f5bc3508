//! Translation between the OpenAI schema and upstream driver payloads
//!
//! Upstream answers come in several loosely related shapes depending on the
//! driver behind the model. Extraction therefore walks a fixed, ordered list
//! of known locations and takes the first one that yields something.

use serde_json::{json, Value};

use super::request::{ChatCompletionRequest, Role, UpstreamRequest};
use super::response::{
    ChatCompletionResponse, Choice, ChoiceMessage, CompletionMeta, Delta, FinishReason,
    StreamChoice, StreamChunk, Usage,
};
use crate::aliases::ResolvedModel;

/// Build the upstream driver arguments for a client request.
pub fn to_upstream(request: ChatCompletionRequest, target: ResolvedModel) -> UpstreamRequest {
    UpstreamRequest {
        messages: request.messages,
        model: target.model,
        driver: target.driver,
        stream: request.stream.unwrap_or_default(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        tools: request.tools,
    }
}

/// Places an upstream completion may keep its text, in priority order
#[derive(Debug, Clone, Copy)]
enum ContentSource {
    Message,
    ResultMessage,
    BareString,
    Text,
}

const CONTENT_SOURCES: [ContentSource; 4] = [
    ContentSource::Message,
    ContentSource::ResultMessage,
    ContentSource::BareString,
    ContentSource::Text,
];

impl ContentSource {
    fn locate(self, value: &Value) -> Option<&Value> {
        match self {
            ContentSource::Message => value.pointer("/message/content"),
            ContentSource::ResultMessage => value.pointer("/result/message/content"),
            ContentSource::BareString => value.is_string().then_some(value),
            ContentSource::Text => value.get("text"),
        }
    }
}

/// Flatten string content or an array of `{type, text}` blocks.
fn content_text(content: &Value) -> Option<String> {
    let text = match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Whether content is present at all, text or not
fn has_content(content: &Value) -> bool {
    match content {
        Value::String(s) => !s.is_empty(),
        Value::Array(blocks) => !blocks.is_empty(),
        Value::Null | Value::Bool(false) => false,
        _ => true,
    }
}

fn extract_content(value: &Value) -> String {
    CONTENT_SOURCES
        .iter()
        .filter_map(|source| source.locate(value))
        .find_map(content_text)
        .unwrap_or_default()
}

fn extract_tool_calls(value: &Value) -> Option<Value> {
    ["/message/tool_calls", "/result/message/tool_calls"]
        .iter()
        .filter_map(|pointer| value.pointer(pointer))
        .find(|calls| !calls.is_null())
        .cloned()
}

/// Convert a complete upstream answer into an OpenAI completion.
pub fn from_upstream(value: &Value, meta: &CompletionMeta) -> ChatCompletionResponse {
    let tool_calls = extract_tool_calls(value);
    let finish_reason = if tool_calls.is_some() {
        FinishReason::ToolCalls
    } else {
        FinishReason::Stop
    };

    ChatCompletionResponse {
        id: meta.id.clone(),
        object: "chat.completion".to_string(),
        created: meta.created,
        model: meta.model.clone(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: Role::Assistant,
                content: extract_content(value),
                tool_calls,
            },
            finish_reason,
        }],
        usage: Usage::default(),
    }
}

/// One client-visible streaming increment
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Text fragment
    Content(String),
    /// Tool-call fragment in OpenAI `tool_calls` shape
    ToolCalls(Value),
    /// Upstream delivered its final message
    Finished,
}

impl StreamEvent {
    pub fn into_chunk(self, meta: &CompletionMeta) -> StreamChunk {
        let (delta, finish_reason) = match self {
            StreamEvent::Content(text) => (
                Delta {
                    content: Some(text),
                    tool_calls: None,
                },
                None,
            ),
            StreamEvent::ToolCalls(calls) => (
                Delta {
                    content: None,
                    tool_calls: Some(calls),
                },
                None,
            ),
            StreamEvent::Finished => (Delta::default(), Some(FinishReason::Stop)),
        };

        StreamChunk {
            id: meta.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: meta.created,
            model: meta.model.clone(),
            choices: vec![StreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

/// Map one decoded upstream stream value to a client event.
///
/// Values matching none of the known shapes (heartbeats, usage reports)
/// produce nothing.
pub fn from_upstream_event(value: &Value) -> Option<StreamEvent> {
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        if !text.is_empty() {
            return Some(StreamEvent::Content(text.to_string()));
        }
    }

    if value.get("type").and_then(Value::as_str) == Some("tool_use") {
        let input = value
            .get("input")
            .filter(|input| !input.is_null())
            .cloned()
            .unwrap_or_else(|| json!({}));
        return Some(StreamEvent::ToolCalls(json!([{
            "id": value.get("id").cloned().unwrap_or(Value::Null),
            "type": "function",
            "function": {
                "name": value.get("name").cloned().unwrap_or(Value::Null),
                "arguments": input.to_string(),
            }
        }])));
    }

    if let Some(calls) = value.get("tool_calls").filter(|calls| !calls.is_null()) {
        return Some(StreamEvent::ToolCalls(calls.clone()));
    }

    if value.pointer("/message/content").is_some_and(has_content) {
        return Some(StreamEvent::Finished);
    }

    None
}
