//! Chat sessions and the interactive shell around them.
//!
//! This module provides the streaming chat session and the pieces the
//! `sidechat` binary builds its REPL from:
//!
//! - Incremental rendering of the assistant reply as it streams
//! - Configuration fetched from a host task before every send
//! - A persisted provider configuration with credential checks
//! - Slash commands for session control and trending lists
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`session`]: Core chat session state machine and API interaction
//! - [`config`]: CLI argument parsing and configuration
//! - [`store`]: The YAML config store and the live shared configuration
//! - [`commands`]: Slash command parsing

mod commands;
mod config;
mod session;
mod store;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{API_KEY_ENV, CONFIG_PATH_ENV, ChatArgs, ChatConfig};
pub use session::{ChatSession, SessionState, SessionStats, SharedSession, TurnOutcome};
pub use store::{ConfigStore, SharedConfig, validate_for_save};
