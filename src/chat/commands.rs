//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.

use crate::trending::HotListSource;
use crate::types::Provider;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Print the conversation so far.
    History,

    /// Switch provider.
    Provider(Provider),

    /// Change the model.
    Model(String),

    /// List the models of every provider.
    Models,

    /// Check and store a new API key.
    Key(String),

    /// Save the current configuration to the store.
    Save,

    /// Show trending lists, all of them or one.
    Trending(Option<HotListSource>),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use sidechat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model deepseek-coder").is_some());
/// assert!(parse_command("What does this paragraph mean?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "history" => ChatCommand::History,
        "provider" => match argument {
            Some(name) => match name.to_lowercase().parse::<Provider>() {
                Ok(provider) => ChatCommand::Provider(provider),
                Err(err) => ChatCommand::Invalid(err.to_string()),
            },
            None => ChatCommand::Invalid(format!(
                "/provider requires one of: {}",
                provider_names()
            )),
        },
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "models" => ChatCommand::Models,
        "key" => match argument {
            Some(key) => ChatCommand::Key(key.to_string()),
            None => ChatCommand::Invalid("/key requires an API key".to_string()),
        },
        "save" => ChatCommand::Save,
        "trending" | "hot" => match argument {
            None => ChatCommand::Trending(None),
            Some(name) => match name.parse::<HotListSource>() {
                Ok(source) => ChatCommand::Trending(Some(source)),
                Err(_) => ChatCommand::Invalid(format!(
                    "/trending expects one of: {}",
                    HotListSource::ALL.map(|s| s.name()).join(", ")
                )),
            },
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn provider_names() -> String {
    Provider::ALL.map(|p| p.name()).join(", ")
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear conversation history
  /history               Show the conversation so far
  /provider <name>       Switch provider (deepseek, siliconflow)
  /model <name>          Change the model (e.g., /model deepseek-coder)
  /models                List the models of every provider
  /key <api-key>         Verify and store an API key
  /save                  Save provider, model and key to the config file
  /trending [source]     Show hot lists (zhihu, juejin, weibo)
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
