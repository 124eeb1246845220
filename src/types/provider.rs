use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Path of the streaming chat-completions endpoint, relative to a provider's base URL.
pub const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";

/// Path of the account endpoint used to check a credential, relative to the base URL.
pub const USER_INFO_PATH: &str = "v1/user/info";

/// A chat-completion provider.
///
/// The set is closed: every variant has a base URL and a model list, so resolving an endpoint
/// for a `Provider` cannot fail.  Names that do not parse into a `Provider` are reported as
/// [`Error::UnknownProvider`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// DeepSeek's hosted API.
    DeepSeek,

    /// SiliconFlow's hosted API.
    SiliconFlow,
}

impl Provider {
    /// Every known provider, in display order.
    pub const ALL: [Provider; 2] = [Provider::DeepSeek, Provider::SiliconFlow];

    /// The provider's configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "deepseek",
            Provider::SiliconFlow => "siliconflow",
        }
    }

    /// The provider's base URL.
    pub fn base_url(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "https://api.deepseek.com",
            Provider::SiliconFlow => "https://api.siliconflow.cn",
        }
    }

    /// Models offered for this provider.
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            Provider::DeepSeek => &["deepseek-chat", "deepseek-coder"],
            Provider::SiliconFlow => &["deepseek-ai/DeepSeek-R1-Distill-Qwen-1.5B"],
        }
    }

    /// Returns true if `model` is in this provider's model list.
    pub fn offers(&self, model: &str) -> bool {
        self.models().contains(&model)
    }

    /// Join `path` onto the provider's base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(self.base_url())?.join(path)?)
    }

    /// The streaming chat-completions endpoint.
    pub fn chat_completions_url(&self) -> Result<Url> {
        self.endpoint(CHAT_COMPLETIONS_PATH)
    }

    /// The credential check endpoint.
    pub fn user_info_url(&self) -> Result<Url> {
        self.endpoint(USER_INFO_PATH)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Provider::ALL
            .into_iter()
            .find(|provider| provider.name() == s)
            .ok_or_else(|| Error::unknown_provider(s))
    }
}
