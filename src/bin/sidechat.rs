//! Interactive sidebar chat in a terminal.
//!
//! This binary hosts a streaming chat session the way a browser sidebar would: a
//! configuration host task answers the session's `GET_CONFIG` requests from the saved
//! config, and the line editor stands in for the chat input.
//!
//! # Usage
//!
//! ```bash
//! # Use the saved configuration
//! sidechat
//!
//! # Pick a provider and model for this run
//! sidechat --provider deepseek --model deepseek-coder
//!
//! # Start the first message with some selected text
//! sidechat --selection "$(xclip -o)"
//!
//! # Disable colors (useful for piping output)
//! sidechat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/provider <name>` - Switch provider
//! - `/key <api-key>` - Verify and store an API key
//! - `/trending` - Show hot lists
//! - `/quit` - Exit the application

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::Notify;

use sidechat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, ConfigStore, PlainTextRenderer, Renderer,
    SessionStats, SharedConfig, help_text, parse_command,
};
use sidechat::trending::{REFRESH_PERIOD, TrendingClient, TrendingRefresher};
use sidechat::{HttpTransport, Provider, StderrLogger, config_channel};

/// Main entry point for the sidechat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("sidechat [OPTIONS]");
    let explicit_store = args.config.is_some();
    let config = ChatConfig::from(args).with_env(explicit_store, |name| std::env::var(name).ok());

    let store = ConfigStore::new(&config.store_path);
    let stored = store.load().unwrap_or_else(|err| {
        eprintln!("Ignoring {}: {err}", store.path().display());
        None
    });
    let shared = SharedConfig::new(config.provider_config(stored));

    let (config_client, config_host) = config_channel(8);
    let _host = config_host.spawn(shared.clone());

    let http = HttpTransport::new()?;
    let mut session = ChatSession::new(Arc::new(http.clone()), Arc::new(config_client))
        .with_config_timeout(config.config_timeout);
    if config.verbose {
        session = session.with_logger(Arc::new(StderrLogger::new().with_frames()));
    }

    let trending = if config.trending {
        Some(TrendingRefresher::spawn(
            Arc::new(TrendingClient::new()?),
            REFRESH_PERIOD,
        ))
    } else {
        None
    };

    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    // Ctrl+C while a reply streams abandons that reply.
    let interrupt = Arc::new(Notify::new());
    let interrupt_handler = Arc::clone(&interrupt);
    ctrlc::set_handler(move || {
        interrupt_handler.notify_waiters();
    })?;

    let current = shared.get();
    if current.is_complete() {
        println!("sidechat ({} / {})", current.provider, current.model);
    } else {
        println!("sidechat (not configured: use /provider, /model and /key)");
    }
    println!("Type /help for commands, /quit to exit\n");

    let mut selection = config.selection.clone();
    loop {
        let readline = match selection.take() {
            Some(text) => rl.readline_with_initial("You: ", (text.as_str(), "")),
            None => rl.readline("You: "),
        };

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.clear();
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::History => {
                            if session.history().is_empty() {
                                renderer.print_info("    (no messages yet)");
                            }
                            for turn in session.history().turns() {
                                println!("    {}: {}", turn.role, turn.content);
                            }
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Provider(provider) => {
                            shared.set_provider(provider);
                            renderer.print_info(&format!(
                                "Provider changed to {provider} (model: {})",
                                shared.get().model
                            ));
                        }
                        ChatCommand::Model(model) => {
                            match shared.get().resolve_provider() {
                                Ok(provider) if !provider.offers(&model) => {
                                    renderer.render_error(&format!(
                                        "{provider} does not offer {model}; try one of: {}",
                                        provider.models().join(", ")
                                    ));
                                }
                                _ => {
                                    shared.set_model(&model);
                                    renderer.print_info(&format!("Model changed to: {model}"));
                                }
                            }
                        }
                        ChatCommand::Models => print_models(),
                        ChatCommand::Key(key) => {
                            let provider = match shared.get().resolve_provider() {
                                Ok(provider) => provider,
                                Err(err) => {
                                    renderer.render_error(&format!(
                                        "Choose a provider before setting a key: {err}"
                                    ));
                                    continue;
                                }
                            };
                            match http.verify_credentials(provider, &key).await {
                                Ok(()) => {
                                    shared.set_api_key(&key);
                                    renderer.print_info("API key verified. Use /save to keep it.");
                                }
                                Err(err) => {
                                    renderer.render_error(&format!("API key rejected: {err}"))
                                }
                            }
                        }
                        ChatCommand::Save => match store.save(&shared.get()) {
                            Ok(()) => renderer.print_info(&format!(
                                "Configuration saved to {}",
                                store.path().display()
                            )),
                            Err(err) => renderer
                                .render_error(&format!("Failed to save configuration: {err}")),
                        },
                        ChatCommand::Trending(only) => match &trending {
                            Some(refresher) => match refresher.latest() {
                                Some(snapshot) => print!("{}", snapshot.render(only)),
                                None => {
                                    refresher.refresh();
                                    renderer.print_info("Trending lists are still loading.");
                                }
                            },
                            None => renderer
                                .print_info("Trending lists are disabled (--no-trending)."),
                        },
                        ChatCommand::Stats => {
                            print_stats(&session.stats());
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&shared, &store);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.render_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to API.  Errors have already been rendered.
                let interrupted = tokio::select! {
                    _ = session.send(line, &mut renderer) => false,
                    _ = interrupt.notified() => true,
                };
                if interrupted {
                    renderer.finish_assistant();
                    renderer.print_info("Interrupted.");
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.render_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats(stats: &SessionStats) {
    println!("    Session Statistics:");
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Turns: {} completed / {} failed ({} requests)",
        stats.completed_turns, stats.failed_turns, stats.requests
    );
    println!("      Streamed characters: {}", stats.streamed_chars);
    println!("      Malformed frames skipped: {}", stats.malformed_frames);
    println!("      Interrupted streams: {}", stats.interrupted_streams);
}

fn print_config(shared: &SharedConfig, store: &ConfigStore) {
    let config = shared.get();
    println!("    Current Configuration:");
    println!("      Provider: {}", describe(&config.provider));
    println!("      Model: {}", describe(&config.model));
    println!("      API key: {}", describe(&config.redacted_key()));
    println!("      Config file: {}", store.path().display());
    let missing = config.missing_fields();
    if !missing.is_empty() {
        println!("      Missing: {}", missing.join(", "));
    }
}

fn print_models() {
    println!("    Models:");
    for provider in Provider::ALL {
        println!("      {provider}: {}", provider.models().join(", "));
    }
}

fn describe(value: &str) -> &str {
    if value.trim().is_empty() {
        "(not set)"
    } else {
        value
    }
}
