// Public modules
pub mod chat_completion_chunk;
pub mod chat_completion_request;
pub mod chat_turn;
pub mod conversation_history;
pub mod provider;
pub mod provider_config;
pub mod stream_frame;

// Re-exports
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
pub use chat_completion_request::ChatCompletionRequest;
pub use chat_turn::{ChatRole, ChatTurn};
pub use conversation_history::ConversationHistory;
pub use provider::{CHAT_COMPLETIONS_PATH, Provider, USER_INFO_PATH};
pub use provider_config::ProviderConfig;
pub use stream_frame::StreamFrame;
