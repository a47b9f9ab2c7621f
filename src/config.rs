use std::fmt;

use anyhow::{Context, Error};
use config::{Config, Environment};

use crate::{domain::AppRunnerSettings, infra::receptor::redacted_target};

const DEFAULT_CONFIG_FILE: &str = "ltc";

#[derive(Clone, Debug, Default, serde_derive::Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub receptor: ReceptorConfig,
    pub routing: RoutingConfig,
    pub health_probe: HealthProbeConfig,
    pub web: WebConfig,
}

#[derive(Clone, serde_derive::Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReceptorConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug, serde_derive::Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoutingConfig {
    pub domain: String,
}

#[derive(Clone, Debug, serde_derive::Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HealthProbeConfig {
    pub download_url: String,
    pub destination: String,
}

#[derive(Clone, Debug, serde_derive::Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WebConfig {
    pub listen: String,
}

impl Default for ReceptorConfig {
    fn default() -> Self {
        Self {
            url: "http://receptor.192.168.11.11.xip.io".to_string(),
            username: None,
            password: None,
        }
    }
}

impl fmt::Debug for ReceptorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceptorConfig")
            .field("url", &redacted_target(&self.url))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            domain: "192.168.11.11.xip.io".to_string(),
        }
    }
}

impl Default for HealthProbeConfig {
    fn default() -> Self {
        Self {
            download_url:
                "http://file_server.service.dc1.consul:8080/v1/static/docker-circus/docker-circus.tgz"
                    .to_string(),
            destination: "/tmp".to_string(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
        }
    }
}

impl From<&AppConfig> for AppRunnerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            domain: config.routing.domain.clone(),
            health_probe_url: config.health_probe.download_url.clone(),
            health_probe_dir: config.health_probe.destination.clone(),
        }
    }
}

/// `LTC_ROUTING__DOMAIN` sets `routing.domain`: `_` after the prefix, `__`
/// between section and key so `health_probe` keeps its underscore.
fn environment() -> Environment {
    Environment::with_prefix("ltc")
        .prefix_separator("_")
        .separator("__")
}

/// File first (`path` or `ltc.*` in the working directory, both optional
/// unless `path` is given), then `LTC_*` environment variables on top.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, Error> {
    let file = match path {
        Some(path) => config::File::with_name(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };
    let config = Config::builder()
        .add_source(file)
        .add_source(environment())
        .build()
        .context("Can't load configuration")?;

    config
        .try_deserialize()
        .context("Can't deserialize AppConfig from loaded configuration")
}
