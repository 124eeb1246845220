//! Logging trait for chat session operations.
//!
//! This module provides the [`SessionLogger`] trait that lets the hosting shell capture every
//! request a [`ChatSession`](crate::ChatSession) makes and every frame it consumes, including the
//! malformed ones the session skips.

use crate::{ChatCompletionRequest, ChatTurn, Error, StreamFrame};

/// A trait for logging chat session operations.
///
/// # Example
///
/// ```rust,ignore
/// use sidechat::{ChatTurn, SessionLogger};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl SessionLogger for FileLogger {
///     fn log_turn(&self, turn: &ChatTurn) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "{}: {}", turn.role, turn.content).unwrap();
///     }
/// }
/// ```
pub trait SessionLogger: Send + Sync {
    /// Log a request just before it is sent.
    fn log_request(&self, url: &str, request: &ChatCompletionRequest) {
        _ = url;
        _ = request;
    }

    /// Log a decoded frame.  Called for every frame, malformed ones included.
    fn log_frame(&self, frame: &StreamFrame) {
        _ = frame;
    }

    /// Log a line the decoder could not parse.
    fn log_malformed(&self, error: &Error) {
        _ = error;
    }

    /// Log a turn appended to the conversation history.
    fn log_turn(&self, turn: &ChatTurn);

    /// Log a failed send.
    fn log_error(&self, error: &Error) {
        _ = error;
    }
}

/// Writes one line per event to stderr.
#[derive(Debug, Clone, Default)]
pub struct StderrLogger {
    frames: bool,
}

impl StderrLogger {
    /// Logs requests, turns, malformed lines and errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log every decoded frame.
    pub fn with_frames(mut self) -> Self {
        self.frames = true;
        self
    }
}

impl SessionLogger for StderrLogger {
    fn log_request(&self, url: &str, request: &ChatCompletionRequest) {
        eprintln!(
            "[sidechat] POST {url} model={} messages={}",
            request.model,
            request.messages.len()
        );
    }

    fn log_frame(&self, frame: &StreamFrame) {
        if self.frames {
            eprintln!("[sidechat] frame {frame:?}");
        }
    }

    fn log_malformed(&self, error: &Error) {
        eprintln!("[sidechat] skipped: {error}");
    }

    fn log_turn(&self, turn: &ChatTurn) {
        eprintln!(
            "[sidechat] recorded {} turn ({} chars)",
            turn.role,
            turn.content.chars().count()
        );
    }

    fn log_error(&self, error: &Error) {
        eprintln!("[sidechat] error: {error}");
    }
}
