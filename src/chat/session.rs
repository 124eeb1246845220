//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation history of one
//! sidebar and drives each turn: fetch the configuration, append the user turn, stream the
//! reply, append the assistant turn.
//!
//! States move `Idle → AwaitingConfig → Streaming → Idle`; a failure passes through `Error`
//! and still ends in `Idle`, so the session is always ready for the next send.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::{Mutex, MutexGuard, watch};
use url::Url;

use crate::config_channel::{CONFIG_TIMEOUT, ConfigProvider, fetch_config};
use crate::error::{Error, Result};
use crate::observability::{
    SESSION_BUSY, SESSION_TURNS, STREAM_DURATION, STREAM_FRAMES, STREAM_INTERRUPTED,
    STREAM_MALFORMED,
};
use crate::render::Renderer;
use crate::session_logger::SessionLogger;
use crate::sse::decode_frames;
use crate::transport::Transport;
use crate::types::{
    ChatCompletionRequest, ChatTurn, ConversationHistory, ProviderConfig, StreamFrame,
};

/// Where a session is in its turn cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Ready for a send.
    Idle,
    /// Waiting for the configuration provider.
    AwaitingConfig,
    /// Reading the reply stream.
    Streaming,
    /// A turn failed; the session is about to return to `Idle`.
    Error,
}

/// Result of a successful [`ChatSession::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The input was blank; nothing happened.
    Skipped,
    /// The reply was recorded.
    Completed {
        /// The full reply as appended to history.
        reply: String,
        /// True if the connection closed before the terminator.
        interrupted: bool,
    },
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// The number of turns in the conversation.
    pub message_count: usize,
    /// Sends that ended with a recorded reply.
    pub completed_turns: u64,
    /// Sends that ended in an error.
    pub failed_turns: u64,
    /// Requests that reached the transport.
    pub requests: u64,
    /// Stream lines skipped as malformed.
    pub malformed_frames: u64,
    /// Replies whose connection closed before the terminator.
    pub interrupted_streams: u64,
    /// Characters streamed across every reply.
    pub streamed_chars: u64,
}

/// A chat session that manages conversation state and API interactions.
///
/// `send` borrows the session mutably for the whole turn, so one session never has two
/// sends in flight.  Share a session between tasks with [`SharedSession`].
pub struct ChatSession {
    transport: Arc<dyn Transport>,
    config: Arc<dyn ConfigProvider>,
    config_timeout: Duration,
    logger: Option<Arc<dyn SessionLogger>>,
    history: ConversationHistory,
    state: Arc<watch::Sender<SessionState>>,
    stats: SessionStats,
}

impl ChatSession {
    /// Creates a new chat session.
    pub fn new(transport: Arc<dyn Transport>, config: Arc<dyn ConfigProvider>) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            transport,
            config,
            config_timeout: CONFIG_TIMEOUT,
            logger: None,
            history: ConversationHistory::new(),
            state: Arc::new(state),
            stats: SessionStats::default(),
        }
    }

    /// Sets how long to wait for the configuration provider.
    pub fn with_config_timeout(mut self, timeout: Duration) -> Self {
        self.config_timeout = timeout;
        self
    }

    /// Attaches a logger.
    pub fn with_logger(mut self, logger: Arc<dyn SessionLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sends a user message and streams the response.
    ///
    /// This method:
    /// 1. Fetches the provider configuration
    /// 2. Adds the user message to history and renders it
    /// 3. Sends a streaming request with the full history
    /// 4. Renders the accumulated reply each time it grows
    /// 5. Adds the complete assistant reply to history
    ///
    /// Blank input is skipped without any state change or network call.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the turn.  It has already been rendered as an
    /// assistant-role message, no assistant turn was recorded, and the session is idle again.
    pub async fn send(
        &mut self,
        user_text: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Ok(TurnOutcome::Skipped);
        }

        let turn = TurnGuard::enter(Arc::clone(&self.state));
        match self.take_turn(user_text, renderer, &turn).await {
            Ok(outcome) => {
                self.stats.completed_turns += 1;
                SESSION_TURNS.click();
                Ok(outcome)
            }
            Err(err) => {
                turn.set(SessionState::Error);
                self.stats.failed_turns += 1;
                if let Some(logger) = &self.logger {
                    logger.log_error(&err);
                }
                renderer.render_error(&err.to_string());
                Err(err)
            }
        }
    }

    async fn take_turn(
        &mut self,
        user_text: &str,
        renderer: &mut dyn Renderer,
        turn: &TurnGuard,
    ) -> Result<TurnOutcome> {
        let config = fetch_config(self.config.as_ref(), self.config_timeout).await?;
        let url = config.resolve_provider()?.chat_completions_url()?;

        self.record(ChatTurn::user(user_text));
        renderer.render_user(user_text);

        self.stream_reply(&url, &config, renderer, turn).await
    }

    async fn stream_reply(
        &mut self,
        url: &Url,
        config: &ProviderConfig,
        renderer: &mut dyn Renderer,
        turn: &TurnGuard,
    ) -> Result<TurnOutcome> {
        let request =
            ChatCompletionRequest::streaming(config.model.clone(), self.history.turns().to_vec());
        if let Some(logger) = &self.logger {
            logger.log_request(url.as_str(), &request);
        }

        self.stats.requests += 1;
        let body = self
            .transport
            .open_stream(url, &config.api_key, &request)
            .await?;

        turn.set(SessionState::Streaming);
        renderer.start_assistant();
        let start = Instant::now();
        let frames = decode_frames(body);
        futures::pin_mut!(frames);

        let mut reply = String::new();
        let mut interruption = None;
        while let Some(item) = frames.next().await {
            let frame = match item {
                Ok(frame) => frame,
                Err(err) => {
                    interruption = Some(err);
                    break;
                }
            };
            STREAM_FRAMES.click();
            if let Some(logger) = &self.logger {
                logger.log_frame(&frame);
            }
            match frame {
                StreamFrame::ContentDelta { text } => {
                    reply.push_str(&text);
                    self.stats.streamed_chars += text.chars().count() as u64;
                    renderer.render_assistant(&reply);
                }
                StreamFrame::Done => break,
                StreamFrame::Malformed { raw } => {
                    STREAM_MALFORMED.click();
                    self.stats.malformed_frames += 1;
                    if let Some(logger) = &self.logger {
                        logger.log_malformed(&Error::malformed_frame(
                            raw,
                            "payload is not a chat-completion chunk",
                        ));
                    }
                }
            }
        }
        STREAM_DURATION.add(start.elapsed().as_secs_f64());
        renderer.finish_assistant();

        let interrupted = interruption.is_some();
        if let Some(err) = interruption {
            STREAM_INTERRUPTED.click();
            self.stats.interrupted_streams += 1;
            if let Some(logger) = &self.logger {
                logger.log_error(&err);
            }
            renderer.render_error(&err.to_string());
        }

        self.record(ChatTurn::assistant(reply.clone()));
        Ok(TurnOutcome::Completed { reply, interrupted })
    }

    fn record(&mut self, turn: ChatTurn) {
        if let Some(logger) = &self.logger {
            logger.log_turn(&turn);
        }
        self.history.push(turn);
    }

    /// Tears the conversation down: clears the history and returns to `Idle`.
    pub fn clear(&mut self) {
        self.history.clear();
        self.state.send_replace(SessionState::Idle);
    }

    /// Returns the conversation history.
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Returns the number of turns in the conversation.
    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions, e.g. to disable a send button while a turn is in flight.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            message_count: self.history.len(),
            ..self.stats.clone()
        }
    }
}

/// Holds a session out of `Idle` for the duration of one turn.
///
/// Dropping it, including when the send future itself is dropped mid-turn, puts the session
/// back in `Idle`.
struct TurnGuard {
    state: Arc<watch::Sender<SessionState>>,
}

impl TurnGuard {
    fn enter(state: Arc<watch::Sender<SessionState>>) -> Self {
        state.send_replace(SessionState::AwaitingConfig);
        Self { state }
    }

    fn set(&self, state: SessionState) {
        self.state.send_replace(state);
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.state.send_replace(SessionState::Idle);
    }
}

/// A [`ChatSession`] shared between tasks.
///
/// A send made while another is in flight is refused with [`Error::Busy`] instead of
/// queueing behind it.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<ChatSession>>,
}

impl SharedSession {
    /// Wraps a session for sharing.
    pub fn new(session: ChatSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Sends a user message unless a send is already in flight.
    pub async fn send(&self, user_text: &str, renderer: &mut dyn Renderer) -> Result<TurnOutcome> {
        if user_text.trim().is_empty() {
            return Ok(TurnOutcome::Skipped);
        }
        let Ok(mut session) = self.inner.try_lock() else {
            SESSION_BUSY.click();
            return Err(Error::busy());
        };
        session.send(user_text, renderer).await
    }

    /// Waits for any in-flight send and returns the session.
    pub async fn lock(&self) -> MutexGuard<'_, ChatSession> {
        self.inner.lock().await
    }
}
