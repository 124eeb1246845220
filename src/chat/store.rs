//! Persistent provider configuration.
//!
//! [`ConfigStore`] keeps one [`ProviderConfig`] in a YAML file.  [`SharedConfig`] is the
//! live copy the shell edits and the configuration host answers `GET_CONFIG` from.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::config_channel::ConfigSource;
use crate::error::{Error, Result};
use crate::types::{Provider, ProviderConfig};

/// A YAML file holding the saved provider configuration.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// A store backed by `path`.  The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Where the store lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved configuration.  A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<ProviderConfig>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::io(
                    format!("Failed to read {}", self.path.display()),
                    e,
                ));
            }
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        let config: ProviderConfig = serde_yaml::from_str(&text)?;
        Ok(Some(config))
    }

    /// Validate and write `config`, replacing what was saved.
    pub fn save(&self, config: &ProviderConfig) -> Result<()> {
        validate_for_save(config)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }
        let text = serde_yaml::to_string(config)?;
        fs::write(&self.path, text)
            .map_err(|e| Error::io(format!("Failed to write {}", self.path.display()), e))
    }
}

/// Checks a configuration is complete and names a model its provider offers.
pub fn validate_for_save(config: &ProviderConfig) -> Result<Provider> {
    config.validate()?;
    let provider = config.resolve_provider()?;
    if !provider.offers(config.model.trim()) {
        return Err(Error::validation(
            format!(
                "{provider} does not offer model {:?} (available: {})",
                config.model,
                provider.models().join(", ")
            ),
            Some("model".to_string()),
        ));
    }
    Ok(provider)
}

/// The configuration currently in effect, shared between the shell and the configuration
/// host.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<ProviderConfig>>,
}

impl SharedConfig {
    /// Share `config`.
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// A copy of the current configuration.
    pub fn get(&self) -> ProviderConfig {
        match self.inner.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Edit the configuration in place.
    pub fn update<F: FnOnce(&mut ProviderConfig)>(&self, f: F) {
        let mut config = match self.inner.write() {
            Ok(config) => config,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut config);
    }

    /// Switch provider.  The model moves to the new provider's default unless the current
    /// one is offered there too.
    pub fn set_provider(&self, provider: Provider) {
        self.update(|config| {
            config.provider = provider.name().to_string();
            if !provider.offers(config.model.trim()) {
                config.model = provider.models()[0].to_string();
            }
        });
    }

    /// Change the model.
    pub fn set_model(&self, model: &str) {
        self.update(|config| config.model = model.trim().to_string());
    }

    /// Change the API key.
    pub fn set_api_key(&self, api_key: &str) {
        self.update(|config| config.api_key = api_key.trim().to_string());
    }
}

impl ConfigSource for SharedConfig {
    fn current_config(&self) -> Option<ProviderConfig> {
        Some(self.get()).filter(|config| *config != ProviderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("sidechat-store-{}-{name}", std::process::id()))
            .join("config.yaml")
    }

    #[test]
    fn missing_file_loads_none() {
        let store = ConfigStore::new(temp_path("missing"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("roundtrip");
        let store = ConfigStore::new(&path);
        let config = ProviderConfig::new("deepseek", "deepseek-coder", "sk-saved");
        store.save(&config).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("apiKey: sk-saved"));
        assert_eq!(store.load().unwrap(), Some(config));
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn save_rejects_incomplete() {
        let store = ConfigStore::new(temp_path("incomplete"));
        let err = store
            .save(&ProviderConfig::new("deepseek", "", "sk"))
            .unwrap_err();
        assert!(err.is_configuration_missing());
        assert!(!store.path().exists());
    }

    #[test]
    fn save_rejects_foreign_model() {
        let err = validate_for_save(&ProviderConfig::new("siliconflow", "deepseek-chat", "sk"))
            .unwrap_err();
        assert!(err.is_validation());
        let err = validate_for_save(&ProviderConfig::new("acme", "m", "sk")).unwrap_err();
        assert!(err.is_unknown_provider());
        assert_eq!(
            validate_for_save(&ProviderConfig::new("deepseek", "deepseek-chat", "sk")).unwrap(),
            Provider::DeepSeek
        );
    }

    #[test]
    fn garbage_file_is_an_error() {
        let path = temp_path("garbage");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "provider: [unclosed").unwrap();
        assert!(ConfigStore::new(&path).load().is_err());
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn shared_config_switches_provider() {
        let shared = SharedConfig::new(ProviderConfig::new("deepseek", "deepseek-chat", "sk"));
        shared.set_provider(Provider::SiliconFlow);
        let config = shared.get();
        assert_eq!(config.provider, "siliconflow");
        assert_eq!(config.model, "deepseek-ai/DeepSeek-R1-Distill-Qwen-1.5B");
        assert_eq!(config.api_key, "sk");

        shared.set_provider(Provider::DeepSeek);
        shared.set_model(" deepseek-coder ");
        shared.set_provider(Provider::DeepSeek);
        assert_eq!(shared.get().model, "deepseek-coder");
    }

    #[test]
    fn empty_shared_config_answers_none() {
        let shared = SharedConfig::default();
        assert_eq!(shared.current_config(), None);
        shared.set_api_key("sk");
        assert_eq!(
            shared.current_config(),
            Some(ProviderConfig::new("", "", "sk"))
        );
    }
}
