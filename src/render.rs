//! Output rendering for chat sessions.
//!
//! A session tells its [`Renderer`] about every visible change: the user turn as soon as it is
//! sent, the whole accumulated assistant reply each time it grows, and failed turns as
//! assistant-role error messages.  Converting the reply's markdown to something displayable is
//! the renderer's business.

use std::io::{self, Stdout, Write};

/// ANSI escape code for dim text (used for echoed user turns).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering a conversation.
pub trait Renderer: Send {
    /// Called once with the literal user text when a turn is sent.
    fn render_user(&mut self, text: &str);

    /// Called when an assistant reply begins streaming.
    fn start_assistant(&mut self) {}

    /// Called each time the assistant reply grows, with the full text so far.
    fn render_assistant(&mut self, text: &str);

    /// Called when the assistant reply is complete.
    fn finish_assistant(&mut self) {}

    /// Show a failed turn as an assistant-role message.
    fn render_error(&mut self, message: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
///
/// A terminal cannot redraw a message in place, so this renderer prints only the part of the
/// accumulated reply it has not printed yet.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    echo_user: bool,
    shown: String,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            echo_user: false,
            shown: String::new(),
        }
    }

    /// Print user turns too.  Off by default because a line editor has already shown them.
    pub fn with_echo(mut self, echo_user: bool) -> Self {
        self.echo_user = echo_user;
        self
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// The part of `text` that still has to be printed.
    ///
    /// Falls back to reprinting everything on a new line if `text` no longer extends what was
    /// shown.
    fn unseen<'a>(&self, text: &'a str) -> (bool, &'a str) {
        if let Some(rest) = text.strip_prefix(self.shown.as_str()) {
            (false, rest)
        } else {
            (true, text)
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn render_user(&mut self, text: &str) {
        if !self.echo_user {
            return;
        }
        if self.use_color {
            println!("{ANSI_DIM}You: {text}{ANSI_RESET}");
        } else {
            println!("You: {text}");
        }
        self.flush();
    }

    fn start_assistant(&mut self) {
        self.shown.clear();
        if self.use_color {
            print!("{ANSI_CYAN}Assistant:{ANSI_RESET} ");
        } else {
            print!("Assistant: ");
        }
        self.flush();
    }

    fn render_assistant(&mut self, text: &str) {
        let (restart, unseen) = self.unseen(text);
        if restart {
            println!();
        }
        print!("{unseen}");
        self.shown.clear();
        self.shown.push_str(text);
        self.flush();
    }

    fn finish_assistant(&mut self) {
        self.shown.clear();
        println!();
        self.flush();
    }

    fn render_error(&mut self, message: &str) {
        self.shown.clear();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {message}{ANSI_RESET}");
        } else {
            eprintln!("Error: {message}");
        }
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }
}

/// Something a [`RecordingRenderer`] was asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    /// [`Renderer::render_user`]
    User(String),
    /// [`Renderer::start_assistant`]
    AssistantStart,
    /// [`Renderer::render_assistant`]
    Assistant(String),
    /// [`Renderer::finish_assistant`]
    AssistantFinish,
    /// [`Renderer::render_error`]
    Error(String),
    /// [`Renderer::print_info`]
    Info(String),
}

/// Renderer that records every call, for embedding shells that draw on their own schedule.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    events: Vec<RenderEvent>,
}

impl RecordingRenderer {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, in order.
    pub fn events(&self) -> &[RenderEvent] {
        &self.events
    }

    /// Payloads of the assistant updates, in order.
    pub fn assistant_updates(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Assistant(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Payloads of the error messages, in order.
    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Error(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Forget every recorded call.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Renderer for RecordingRenderer {
    fn render_user(&mut self, text: &str) {
        self.events.push(RenderEvent::User(text.to_string()));
    }

    fn start_assistant(&mut self) {
        self.events.push(RenderEvent::AssistantStart);
    }

    fn render_assistant(&mut self, text: &str) {
        self.events.push(RenderEvent::Assistant(text.to_string()));
    }

    fn finish_assistant(&mut self) {
        self.events.push(RenderEvent::AssistantFinish);
    }

    fn render_error(&mut self, message: &str) {
        self.events.push(RenderEvent::Error(message.to_string()));
    }

    fn print_info(&mut self, info: &str) {
        self.events.push(RenderEvent::Info(info.to_string()));
    }
}
