// Public modules
pub mod chat;
pub mod config_channel;
pub mod error;
pub mod observability;
pub mod render;
pub mod session_logger;
pub mod sse;
pub mod transport;
pub mod trending;
pub mod types;

// Re-exports
pub use chat::{ChatSession, SessionState, SessionStats, SharedSession, TurnOutcome};
pub use config_channel::{
    CONFIG_TIMEOUT, ConfigClient, ConfigHost, ConfigMessage, ConfigProvider, ConfigSource,
    config_channel, fetch_config,
};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, RecordingRenderer, RenderEvent, Renderer};
pub use session_logger::{SessionLogger, StderrLogger};
pub use sse::{FrameDecoder, decode_frames, decode_line};
pub use transport::{ByteStream, HttpTransport, Transport};
pub use types::*;
