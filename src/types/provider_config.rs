use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Provider;

/// Credentials and model selection for one chat turn.
///
/// Every field defaults to empty on deserialization so that an incomplete configuration can be
/// received and then rejected by [`ProviderConfig::validate`] rather than failing to parse.
/// `provider` stays a plain string for the same reason: an unknown provider is a configuration
/// error reported when the endpoint is resolved.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name, e.g. `deepseek`.
    #[serde(default)]
    pub provider: String,

    /// Model identifier passed through to the API.
    #[serde(default)]
    pub model: String,

    /// Bearer credential.
    #[serde(default, rename = "apiKey")]
    pub api_key: String,
}

impl ProviderConfig {
    /// Create a new configuration.
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Returns true if no field is blank.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Names of the blank fields, in wire order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.provider.trim().is_empty() {
            missing.push("provider");
        }
        if self.model.trim().is_empty() {
            missing.push("model");
        }
        if self.api_key.trim().is_empty() {
            missing.push("apiKey");
        }
        missing
    }

    /// Check that every field is present.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::configuration_missing(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }

    /// Resolve the provider name against the catalog.
    pub fn resolve_provider(&self) -> Result<Provider> {
        self.provider.parse()
    }

    /// The API key with all but its last four characters hidden.
    pub fn redacted_key(&self) -> String {
        redact(&self.api_key)
    }
}

// The credential never reaches logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.redacted_key())
            .finish()
    }
}

fn redact(key: &str) -> String {
    if key.is_empty() {
        String::new()
    } else {
        let chars: Vec<char> = key.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!("***{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        let config = ProviderConfig::new("deepseek", "deepseek-chat", "sk-1");
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(
            json,
            r#"{"provider":"deepseek","model":"deepseek-chat","apiKey":"sk-1"}"#
        );
    }

    #[test]
    fn incomplete_config_parses_then_fails_validation() {
        let config: ProviderConfig = serde_json::from_str(r#"{"provider":"deepseek"}"#).unwrap();
        assert!(!config.is_complete());
        assert_eq!(config.missing_fields(), vec!["model", "apiKey"]);
        let err = config.validate().unwrap_err();
        assert!(err.is_configuration_missing());
    }

    #[test]
    fn blank_fields_are_missing() {
        let config = ProviderConfig::new("deepseek", "  ", "sk");
        assert_eq!(config.missing_fields(), vec!["model"]);
    }

    #[test]
    fn resolve_provider() {
        let config = ProviderConfig::new("siliconflow", "m", "k");
        assert_eq!(config.resolve_provider().unwrap(), Provider::SiliconFlow);
        let config = ProviderConfig::new("nope", "m", "k");
        assert!(config.resolve_provider().unwrap_err().is_unknown_provider());
    }

    #[test]
    fn debug_redacts_key() {
        let config = ProviderConfig::new("deepseek", "deepseek-chat", "sk-secret-abcd");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***abcd"));
    }
}
