//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! [`ChatConfig`] that the shell runs with.  Values given on the command line take
//! precedence over the environment, which takes precedence over the config store.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::config_channel::CONFIG_TIMEOUT;
use crate::types::ProviderConfig;

/// Environment variable holding an API key.
pub const API_KEY_ENV: &str = "SIDECHAT_API_KEY";

/// Environment variable holding the config store path.
pub const CONFIG_PATH_ENV: &str = "SIDECHAT_CONFIG";

/// Store file name, relative to the user's config directory.
const STORE_FILE: &str = "sidechat/config.yaml";

/// Command-line arguments for the sidechat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Provider to use.
    #[arrrg(optional, "Provider to use (deepseek or siliconflow)", "PROVIDER")]
    pub provider: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (see /models)", "MODEL")]
    pub model: Option<String>,

    /// API key for the provider.
    #[arrrg(optional, "API key (default: $SIDECHAT_API_KEY)", "KEY")]
    pub api_key: Option<String>,

    /// Path of the config store.
    #[arrrg(optional, "Config file (default: $SIDECHAT_CONFIG)", "PATH")]
    pub config: Option<String>,

    /// Text to place in the first prompt.
    #[arrrg(optional, "Selected text to start the first message with", "TEXT")]
    pub selection: Option<String>,

    /// Seconds to wait for a configuration answer.
    #[arrrg(optional, "Seconds to wait for configuration (default: 5)", "SECS")]
    pub config_timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Skip fetching the trending lists.
    #[arrrg(flag, "Do not fetch trending lists")]
    pub no_trending: bool,

    /// Log requests and stream events to stderr.
    #[arrrg(flag, "Log requests and stream events to stderr")]
    pub verbose: bool,
}

/// Configuration for the chat shell.
///
/// Provider fields here are overrides; see [`ChatConfig::provider_config`].
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Provider override.
    pub provider: Option<String>,

    /// Model override.
    pub model: Option<String>,

    /// API key override.
    pub api_key: Option<String>,

    /// Where the config store lives.
    pub store_path: PathBuf,

    /// Text to seed the first prompt with.
    pub selection: Option<String>,

    /// How long a send waits for configuration.
    pub config_timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to fetch and refresh trending lists.
    pub trending: bool,

    /// Whether to log to stderr.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - No overrides
    /// - Store: `$HOME/.config/sidechat/config.yaml`
    /// - Config timeout: 5 seconds
    /// - Color and trending: enabled
    pub fn new() -> Self {
        Self {
            provider: None,
            model: None,
            api_key: None,
            store_path: default_store_path(std::env::var_os("HOME").map(PathBuf::from)),
            selection: None,
            config_timeout: CONFIG_TIMEOUT,
            use_color: true,
            trending: true,
            verbose: false,
        }
    }

    /// Sets the provider override.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the model override.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the API key override.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the store path.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Sets the text to seed the first prompt with.
    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }

    /// Sets the configuration timeout.
    pub fn with_config_timeout(mut self, timeout: Duration) -> Self {
        self.config_timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Disables trending lists.
    pub fn without_trending(mut self) -> Self {
        self.trending = false;
        self
    }

    /// Enables stderr logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Fill unset values from the environment.
    ///
    /// `lookup` is `std::env::var(..).ok()` in the binary.
    pub fn with_env<F>(mut self, explicit_store: bool, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let nonblank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if self.api_key.is_none() {
            self.api_key = nonblank(API_KEY_ENV);
        }
        if !explicit_store {
            if let Some(path) = nonblank(CONFIG_PATH_ENV) {
                self.store_path = PathBuf::from(path);
            }
        }
        self
    }

    /// Lay the overrides over the stored configuration.
    pub fn provider_config(&self, stored: Option<ProviderConfig>) -> ProviderConfig {
        let mut config = stored.unwrap_or_default();
        if let Some(provider) = &self.provider {
            config.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.api_key = api_key.clone();
        }
        config
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            provider: args.provider,
            model: args.model,
            api_key: args.api_key,
            store_path: args.config.map(PathBuf::from).unwrap_or(defaults.store_path),
            selection: args.selection,
            config_timeout: args
                .config_timeout
                .map(Duration::from_secs)
                .unwrap_or(CONFIG_TIMEOUT),
            use_color: !args.no_color,
            trending: !args.no_trending,
            verbose: args.verbose,
        }
    }
}

fn default_store_path(home: Option<PathBuf>) -> PathBuf {
    match home {
        Some(home) => home.join(".config").join(STORE_FILE),
        None => PathBuf::from("sidechat.yaml"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.provider.is_none());
        assert!(config.model.is_none());
        assert!(config.api_key.is_none());
        assert!(config.selection.is_none());
        assert_eq!(config.config_timeout, Duration::from_secs(5));
        assert!(config.use_color);
        assert!(config.trending);
        assert!(!config.verbose);
    }

    #[test]
    fn store_path_defaults() {
        assert_eq!(
            default_store_path(Some(PathBuf::from("/home/u"))),
            PathBuf::from("/home/u/.config/sidechat/config.yaml")
        );
        assert_eq!(default_store_path(None), PathBuf::from("sidechat.yaml"));
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert!(config.provider.is_none());
        assert_eq!(config.config_timeout, CONFIG_TIMEOUT);
        assert!(config.use_color);
        assert!(config.trending);
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            provider: Some("siliconflow".to_string()),
            model: Some("deepseek-ai/DeepSeek-R1-Distill-Qwen-1.5B".to_string()),
            api_key: Some("sk-arg".to_string()),
            config: Some("/tmp/sidechat.yaml".to_string()),
            selection: Some("explain this".to_string()),
            config_timeout: Some(2),
            no_color: true,
            no_trending: true,
            verbose: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.provider.as_deref(), Some("siliconflow"));
        assert_eq!(config.api_key.as_deref(), Some("sk-arg"));
        assert_eq!(config.store_path, PathBuf::from("/tmp/sidechat.yaml"));
        assert_eq!(config.selection.as_deref(), Some("explain this"));
        assert_eq!(config.config_timeout, Duration::from_secs(2));
        assert!(!config.use_color);
        assert!(!config.trending);
        assert!(config.verbose);
    }

    #[test]
    fn env_fills_unset_values() {
        let lookup = |name: &str| match name {
            API_KEY_ENV => Some("sk-env".to_string()),
            CONFIG_PATH_ENV => Some("/etc/sidechat.yaml".to_string()),
            _ => None,
        };
        let config = ChatConfig::new().with_env(false, lookup);
        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.store_path, PathBuf::from("/etc/sidechat.yaml"));

        let config = ChatConfig::new()
            .with_api_key("sk-arg")
            .with_store_path("/tmp/x.yaml")
            .with_env(true, lookup);
        assert_eq!(config.api_key.as_deref(), Some("sk-arg"));
        assert_eq!(config.store_path, PathBuf::from("/tmp/x.yaml"));
    }

    #[test]
    fn blank_env_is_ignored() {
        let config = ChatConfig::new().with_env(false, |_| Some("  ".to_string()));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn overrides_lay_over_store() {
        let stored = ProviderConfig::new("deepseek", "deepseek-chat", "sk-stored");
        let config = ChatConfig::new().with_model("deepseek-coder");
        assert_eq!(
            config.provider_config(Some(stored)),
            ProviderConfig::new("deepseek", "deepseek-coder", "sk-stored")
        );
        assert_eq!(
            ChatConfig::new().provider_config(None),
            ProviderConfig::default()
        );
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_provider("deepseek")
            .with_model("deepseek-chat")
            .with_api_key("sk")
            .with_store_path("/tmp/s.yaml")
            .with_selection("text")
            .with_config_timeout(Duration::from_millis(100))
            .without_color()
            .without_trending()
            .with_verbose(true);
        assert_eq!(config.provider.as_deref(), Some("deepseek"));
        assert_eq!(config.model.as_deref(), Some("deepseek-chat"));
        assert_eq!(config.selection.as_deref(), Some("text"));
        assert_eq!(config.config_timeout, Duration::from_millis(100));
        assert!(!config.use_color);
        assert!(!config.trending);
        assert!(config.verbose);
    }
}
