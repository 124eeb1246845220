//! Configuration request/response channel.
//!
//! A session never owns credentials.  Before each turn it asks a [`ConfigProvider`] for the
//! current [`ProviderConfig`] and waits at most [`CONFIG_TIMEOUT`] for the answer.  The
//! message-passing implementation is a pair of endpoints created by [`config_channel`]: the
//! session holds the [`ConfigClient`], the hosting shell runs the [`ConfigHost`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::observability::{CONFIG_MISSING, CONFIG_REQUESTS, CONFIG_TIMEOUTS};
use crate::types::ProviderConfig;

/// How long a session waits for a configuration response.
pub const CONFIG_TIMEOUT: Duration = Duration::from_secs(5);

/// Messages exchanged over the configuration channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigMessage {
    /// `{"type":"GET_CONFIG"}`
    GetConfig,

    /// `{"type":"CONFIG_RESPONSE","config":{...}|null}`
    ConfigResponse {
        /// The configuration, or `None` when nothing has been configured.
        config: Option<ProviderConfig>,
    },

    /// Any message type this crate does not handle.
    #[serde(other)]
    Unrecognized,
}

/// Source of configuration for a session.
#[async_trait::async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Ask for the current configuration.
    ///
    /// Resolves to `Ok(None)` when nothing has been configured.  May never resolve; callers
    /// bound the wait with [`fetch_config`].
    async fn request_config(&self) -> Result<Option<ProviderConfig>>;
}

#[async_trait::async_trait]
impl ConfigProvider for Option<ProviderConfig> {
    async fn request_config(&self) -> Result<Option<ProviderConfig>> {
        Ok(self.clone())
    }
}

#[async_trait::async_trait]
impl ConfigProvider for ProviderConfig {
    async fn request_config(&self) -> Result<Option<ProviderConfig>> {
        Ok(Some(self.clone()))
    }
}

/// Request a configuration and wait at most `wait` for it.
///
/// Every way of not getting a complete configuration (no answer, an empty answer, a blank
/// field, a closed channel) is reported as [`Error::ConfigurationMissing`].
///
/// ```
/// # use std::time::Duration;
/// # use sidechat::{ProviderConfig, fetch_config};
/// # tokio_test::block_on(async {
/// let config = ProviderConfig::new("deepseek", "deepseek-chat", "sk-test");
/// let fetched = fetch_config(&config, Duration::from_secs(5)).await.unwrap();
/// assert_eq!(fetched, config);
///
/// let missing = fetch_config(&None::<ProviderConfig>, Duration::from_secs(5)).await.unwrap_err();
/// assert!(missing.is_configuration_missing());
/// # });
/// ```
pub async fn fetch_config(provider: &dyn ConfigProvider, wait: Duration) -> Result<ProviderConfig> {
    CONFIG_REQUESTS.click();
    let config = match tokio::time::timeout(wait, provider.request_config()).await {
        Ok(Ok(Some(config))) => config,
        Ok(Ok(None)) => {
            CONFIG_MISSING.click();
            return Err(Error::configuration_missing(
                "please configure a provider, model and API key first",
            ));
        }
        Ok(Err(err)) => {
            CONFIG_MISSING.click();
            return Err(Error::configuration_missing(format!(
                "configuration unavailable: {err}"
            )));
        }
        Err(_) => {
            CONFIG_TIMEOUTS.click();
            return Err(Error::configuration_missing(format!(
                "no configuration received within {} seconds",
                wait.as_secs_f64()
            )));
        }
    };
    config.validate().inspect_err(|_| CONFIG_MISSING.click())?;
    Ok(config)
}

/// Answers configuration requests on the host side of the channel.
pub trait ConfigSource: Send + Sync + 'static {
    /// The configuration to hand out right now.
    fn current_config(&self) -> Option<ProviderConfig>;
}

impl<F> ConfigSource for F
where
    F: Fn() -> Option<ProviderConfig> + Send + Sync + 'static,
{
    fn current_config(&self) -> Option<ProviderConfig> {
        self()
    }
}

/// Create the two ends of a configuration channel.
pub fn config_channel(buffer: usize) -> (ConfigClient, ConfigHost) {
    let (to_host, from_client) = mpsc::channel(buffer);
    let (to_client, from_host) = mpsc::channel(buffer);
    let client = ConfigClient {
        outbound: to_host,
        inbound: Mutex::new(Pending {
            rx: from_host,
            unanswered: 0,
        }),
    };
    let host = ConfigHost {
        inbound: from_client,
        outbound: to_client,
    };
    (client, host)
}

/// Session end of a configuration channel.
///
/// The host answers requests in order, so the client pairs responses with requests by
/// counting: a request abandoned by a timeout still owns the next response, and that
/// response is skipped when it finally arrives.
#[derive(Debug)]
pub struct ConfigClient {
    outbound: mpsc::Sender<ConfigMessage>,
    inbound: Mutex<Pending>,
}

#[derive(Debug)]
struct Pending {
    rx: mpsc::Receiver<ConfigMessage>,
    /// Requests sent whose response has not been received yet.
    unanswered: usize,
}

impl Pending {
    /// Count a response against the oldest unanswered request.  Returns true when it
    /// answers the most recent one.
    fn answer(&mut self) -> bool {
        self.unanswered = self.unanswered.saturating_sub(1);
        self.unanswered == 0
    }
}

#[async_trait::async_trait]
impl ConfigProvider for ConfigClient {
    async fn request_config(&self) -> Result<Option<ProviderConfig>> {
        let mut pending = self.inbound.lock().await;
        // Anything already queued answers an abandoned request or nothing at all.
        while let Ok(message) = pending.rx.try_recv() {
            if matches!(message, ConfigMessage::ConfigResponse { .. }) {
                pending.answer();
            }
        }
        self.outbound
            .send(ConfigMessage::GetConfig)
            .await
            .map_err(|_| Error::configuration_missing("configuration host is gone"))?;
        pending.unanswered += 1;
        loop {
            match pending.rx.recv().await {
                Some(ConfigMessage::ConfigResponse { config }) => {
                    if pending.answer() {
                        return Ok(config);
                    }
                }
                Some(_) => continue,
                None => return Err(Error::configuration_missing("configuration host is gone")),
            }
        }
    }
}

/// Host end of a configuration channel.
#[derive(Debug)]
pub struct ConfigHost {
    inbound: mpsc::Receiver<ConfigMessage>,
    outbound: mpsc::Sender<ConfigMessage>,
}

impl ConfigHost {
    /// Receive the next message from the session.
    pub async fn recv(&mut self) -> Option<ConfigMessage> {
        self.inbound.recv().await
    }

    /// Send a configuration response to the session.
    pub async fn respond(&self, config: Option<ProviderConfig>) -> Result<()> {
        self.outbound
            .send(ConfigMessage::ConfigResponse { config })
            .await
            .map_err(|_| Error::configuration_missing("session end of the channel is gone"))
    }

    /// Answer every `GET_CONFIG` from `source` until the session end is dropped.
    pub async fn serve<S: ConfigSource>(mut self, source: S) {
        while let Some(message) = self.recv().await {
            if message != ConfigMessage::GetConfig {
                continue;
            }
            if self.respond(source.current_config()).await.is_err() {
                break;
            }
        }
    }

    /// Run [`ConfigHost::serve`] on the current tokio runtime.
    pub fn spawn<S: ConfigSource>(self, source: S) -> JoinHandle<()> {
        tokio::spawn(self.serve(source))
    }
}
