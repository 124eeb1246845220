use serde::{Deserialize, Serialize};

use crate::types::ChatTurn;

/// Body of a `POST /v1/chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier.
    pub model: String,

    /// The full conversation, oldest first.
    pub messages: Vec<ChatTurn>,

    /// Always `true`: responses are consumed as a stream.
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Create a streaming request for `model` over `messages`.
    pub fn streaming(model: impl Into<String>, messages: Vec<ChatTurn>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
        }
    }
}
