use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::store::StalePolicy;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_EVENTS_URL: &str = "ws://localhost:8000";
pub const DEFAULT_CREDENTIAL_FILE: &str = ".sitedesk/credentials.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub sitedesk: SiteDeskConfig,
}

/// How commands reach the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// One REST route per command
    #[default]
    Rest,
    /// Every command posted to a single `/invoke` endpoint
    Command,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default = "default_events_url")]
    pub events_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            transport: Transport::default(),
            events_url: default_events_url(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_credential_file")]
    pub credential_file: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credential_file: default_credential_file(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub stale_responses: StalePolicy,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SiteDeskConfig {
    #[serde(default)]
    pub(crate) api: ApiConfig,
    #[serde(default)]
    pub(crate) session: SessionConfig,
    #[serde(default)]
    pub(crate) store: StoreConfig,
}

impl SiteDeskConfig {
    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    pub fn store(&self) -> &StoreConfig {
        &self.store
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_events_url() -> String {
    DEFAULT_EVENTS_URL.to_string()
}

fn default_credential_file() -> PathBuf {
    PathBuf::from(DEFAULT_CREDENTIAL_FILE)
}

impl Config {
    /// Reads `path` (any extension the config crate knows, optional) and then
    /// `SITEDESK__` environment variables, e.g. `SITEDESK__SITEDESK__API__BASE_URL`.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let s = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SITEDESK").separator("__"))
            .build()?;

        Ok(s.try_deserialize()?)
    }
}
