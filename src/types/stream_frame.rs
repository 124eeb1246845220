/// One decoded event from a chat-completion response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Text to append to the assistant message.
    ContentDelta {
        /// The fragment.
        text: String,
    },

    /// The `data: [DONE]` terminator.
    Done,

    /// A `data:` line whose payload was not valid JSON.
    Malformed {
        /// The trimmed line as received.
        raw: String,
    },
}

impl StreamFrame {
    /// Create a content delta.
    pub fn delta(text: impl Into<String>) -> Self {
        StreamFrame::ContentDelta { text: text.into() }
    }

    /// Create a malformed frame.
    pub fn malformed(raw: impl Into<String>) -> Self {
        StreamFrame::Malformed { raw: raw.into() }
    }

    /// The delta text, if this is a content delta.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamFrame::ContentDelta { text } => Some(text),
            _ => None,
        }
    }
}
