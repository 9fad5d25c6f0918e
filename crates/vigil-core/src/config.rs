//! Configuration loading from files and environment variables.
//!
//! Sources, later ones win:
//! - `vigil.toml` (or `.json`/`.yaml`) in the working directory, optional
//! - `VIGIL__SECTION__KEY` environment variables

use std::sync::Arc;
use std::time::Duration;

use config::{Config, Environment, File, Source};
use serde::Deserialize;

use crate::client::ClientBuilder;
use crate::impls::DEFAULT_API_VERSION;
use crate::poller::BackoffPolicy;
use crate::ports::KeyCredential;

const CONFIG_FILE: &str = "vigil";
const ENV_PREFIX: &str = "VIGIL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub service: ServiceSettings,

    #[serde(default)]
    pub polling: PollingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    pub endpoint: Option<String>,
    pub key: Option<String>,

    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            key: None,
            api_version: default_api_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    pub max_delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,

    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: None,
            max_attempts: None,
            grace_period_secs: default_grace_period_secs(),
        }
    }
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_grace_period_secs() -> u64 {
    60
}

impl PollingSettings {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        let mut policy = BackoffPolicy::new(Duration::from_millis(self.base_delay_ms));
        if let Some(max) = self.max_delay_ms {
            policy = policy.with_max_delay(Duration::from_millis(max));
        }
        if let Some(max) = self.max_attempts {
            policy = policy.with_max_attempts(max);
        }
        policy
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Settings {
    /// Builder for the configured service, with polling settings applied.
    pub fn client_builder(&self) -> Result<ClientBuilder, ConfigError> {
        let endpoint = self
            .service
            .endpoint
            .clone()
            .ok_or(ConfigError::Missing("service.endpoint"))?;
        let key = self
            .service
            .key
            .clone()
            .ok_or(ConfigError::Missing("service.key"))?;

        Ok(ClientBuilder::new(endpoint, Arc::new(KeyCredential::new(key)))
            .api_version(self.service.api_version.clone())
            .backoff(self.polling.backoff_policy())
            .grace_period(self.polling.grace_period()))
    }
}

/// Load settings from `vigil.*` and `VIGIL__*` environment variables.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_from(
        File::with_name(CONFIG_FILE).required(false),
        env_source(),
    )
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

fn load_from(
    file: impl Source + Send + Sync + 'static,
    env: Environment,
) -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        .add_source(file)
        .add_source(env)
        .build()?
        .try_deserialize()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env_source().source(Some(map))
    }

    fn toml(text: &str) -> File<config::FileSourceString, FileFormat> {
        File::from_str(text, FileFormat::Toml)
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = load_from(toml(""), env(&[])).unwrap();

        assert_eq!(settings.service.endpoint, None);
        assert_eq!(settings.service.api_version, "2022-08-31");
        assert_eq!(settings.polling.base_delay_ms, 1000);
        assert_eq!(settings.polling.grace_period(), Duration::from_secs(60));
        assert_eq!(settings.polling.backoff_policy(), BackoffPolicy::default());
    }

    #[test]
    fn file_values_are_read() {
        let settings = load_from(
            toml(
                r#"
                [service]
                endpoint = "https://x.example.com/"
                key = "k"

                [polling]
                base_delay_ms = 250
                max_delay_ms = 4000
                max_attempts = 12
                "#,
            ),
            env(&[]),
        )
        .unwrap();

        let policy = settings.polling.backoff_policy();
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Some(Duration::from_secs(4)));
        assert_eq!(policy.max_attempts, Some(12));
    }

    #[test]
    fn environment_overrides_file() {
        let settings = load_from(
            toml("[polling]\nbase_delay_ms = 250\n"),
            env(&[
                ("VIGIL__POLLING__BASE_DELAY_MS", "500"),
                ("VIGIL__SERVICE__ENDPOINT", "https://env.example.com/"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.polling.base_delay_ms, 500);
        assert_eq!(
            settings.service.endpoint.as_deref(),
            Some("https://env.example.com/")
        );
    }

    #[test]
    fn client_builder_requires_endpoint_and_key() {
        let settings = Settings::default();
        assert!(matches!(
            settings.client_builder(),
            Err(ConfigError::Missing("service.endpoint"))
        ));

        let settings = Settings {
            service: ServiceSettings {
                endpoint: Some("https://x.example.com/".into()),
                ..ServiceSettings::default()
            },
            ..Settings::default()
        };
        assert!(matches!(
            settings.client_builder(),
            Err(ConfigError::Missing("service.key"))
        ));
    }

    #[test]
    fn configured_builder_builds() {
        let settings = Settings {
            service: ServiceSettings {
                endpoint: Some("https://x.example.com/".into()),
                key: Some("k".into()),
                ..ServiceSettings::default()
            },
            ..Settings::default()
        };

        let client = settings.client_builder().unwrap().build().unwrap();
        assert_eq!(client.endpoint().as_str(), "https://x.example.com/");
    }
}
