//! OpenAI chat-completion schema and its translation to upstream driver calls

pub mod request;
pub mod response;
pub mod translate;

pub use request::{ChatCompletionRequest, ChatMessage, Role, UpstreamRequest};
pub use response::{
    ChatCompletionResponse, Choice, ChoiceMessage, CompletionMeta, Delta, FinishReason,
    StreamChoice, StreamChunk, Usage,
};
pub use translate::{from_upstream, from_upstream_event, to_upstream, StreamEvent};
