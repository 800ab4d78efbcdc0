//! Configuration management
//!
//! Settings come from an optional JSON file and are then overridden by the
//! environment, which is how the frontend is configured in its deployment:
//! ```json
//! {
//!   "transactionsApiAddr": "ledgerwriter:8080",
//!   "userserviceApiAddr": "userservice:8080",
//!   "localRoutingNum": "883745000",
//!   "backendTimeout": 4
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Session cookie name
pub const TOKEN_COOKIE: &str = "token";
/// OAuth consent cookie name (cleared on logout)
pub const CONSENT_COOKIE: &str = "consented";

const DEFAULT_BANK_NAME: &str = "Bank of Anthos";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 4;

/// Raw settings file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFile {
    #[serde(default)]
    pub transactions_api_addr: Option<String>,
    #[serde(default)]
    pub userservice_api_addr: Option<String>,
    #[serde(default)]
    pub balances_api_addr: Option<String>,
    #[serde(default)]
    pub history_api_addr: Option<String>,
    #[serde(default)]
    pub contacts_api_addr: Option<String>,
    #[serde(default)]
    pub pub_key_path: Option<PathBuf>,
    #[serde(default)]
    pub local_routing_num: Option<String>,
    #[serde(default)]
    pub backend_timeout: Option<u64>,
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub pod_zone: Option<String>,
    #[serde(default)]
    pub env_platform: Option<String>,
}

/// Hosting platform shown in the page footer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Alibaba,
    Aws,
    Azure,
    Gcp,
    Local,
    Onprem,
}

impl Platform {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "alibaba" => Some(Platform::Alibaba),
            "aws" => Some(Platform::Aws),
            "azure" => Some(Platform::Azure),
            "gcp" => Some(Platform::Gcp),
            "local" => Some(Platform::Local),
            "onprem" => Some(Platform::Onprem),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Alibaba => "Alibaba Cloud",
            Platform::Aws => "AWS",
            Platform::Azure => "Azure",
            Platform::Gcp => "Google Cloud",
            Platform::Local => "Local",
            Platform::Onprem => "On-Premises",
        }
    }
}

/// Frontend configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub transactions_uri: String,
    pub userservice_uri: String,
    pub login_uri: String,
    pub balances_uri: String,
    pub history_uri: String,
    pub contacts_uri: String,
    pub public_key_path: Option<PathBuf>,
    pub local_routing: String,
    pub backend_timeout: Duration,
    pub scheme: String,
    pub bank_name: String,
    pub cluster_name: String,
    pub pod_name: String,
    pub pod_zone: String,
    pub platform: Option<Platform>,
    pub version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_sources(SettingsFile::default(), |_| None)
    }
}

impl Config {
    /// Load config from an optional settings file plus the process environment
    pub fn load(settings_path: Option<&Path>) -> Result<Self> {
        let settings = match settings_path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings file {:?}", path))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("Invalid settings file {:?}", path))?
            }
            _ => SettingsFile::default(),
        };
        Ok(Self::from_sources(settings, |key| std::env::var(key).ok()))
    }

    /// Build config from settings, letting `env` override each value
    pub fn from_sources(settings: SettingsFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |key: &str, file: Option<String>| env(key).or(file);

        let addr = |key: &str, file: Option<String>| {
            pick(key, file).unwrap_or_else(|| "localhost:8080".to_string())
        };
        let transactions_addr = addr("TRANSACTIONS_API_ADDR", settings.transactions_api_addr);
        let userservice_addr = addr("USERSERVICE_API_ADDR", settings.userservice_api_addr);
        let balances_addr = addr("BALANCES_API_ADDR", settings.balances_api_addr);
        let history_addr = addr("HISTORY_API_ADDR", settings.history_api_addr);
        let contacts_addr = addr("CONTACTS_API_ADDR", settings.contacts_api_addr);

        let backend_timeout = env("BACKEND_TIMEOUT")
            .and_then(|v| v.parse::<u64>().ok())
            .or(settings.backend_timeout)
            .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS);

        let platform = match pick("ENV_PLATFORM", settings.env_platform) {
            Some(raw) => match Platform::parse(&raw) {
                Some(platform) => {
                    info!("Platform is set to '{}'", raw.to_lowercase());
                    Some(platform)
                }
                None => {
                    error!("Platform '{}' not supported, defaulting to None", raw);
                    None
                }
            },
            None => {
                info!("ENV_PLATFORM environment variable is not set");
                None
            }
        };

        Self {
            transactions_uri: format!("http://{}/transactions", transactions_addr),
            userservice_uri: format!("http://{}/users", userservice_addr),
            login_uri: format!("http://{}/login", userservice_addr),
            balances_uri: format!("http://{}/balances", balances_addr),
            history_uri: format!("http://{}/transactions", history_addr),
            contacts_uri: format!("http://{}/contacts", contacts_addr),
            public_key_path: env("PUB_KEY_PATH")
                .map(PathBuf::from)
                .or(settings.pub_key_path),
            local_routing: pick("LOCAL_ROUTING_NUM", settings.local_routing_num)
                .unwrap_or_else(|| "883745000".to_string()),
            backend_timeout: Duration::from_secs(backend_timeout),
            scheme: pick("SCHEME", settings.scheme).unwrap_or_else(|| "http".to_string()),
            bank_name: pick("BANK_NAME", settings.bank_name)
                .unwrap_or_else(|| DEFAULT_BANK_NAME.to_string()),
            cluster_name: pick("CLUSTER_NAME", settings.cluster_name)
                .unwrap_or_else(|| "unknown".to_string()),
            pod_name: env("HOSTNAME").unwrap_or_else(|| "unknown".to_string()),
            pod_zone: pick("POD_ZONE", settings.pod_zone).unwrap_or_else(|| "unknown".to_string()),
            platform,
            version: env("VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        }
    }

    /// Read the PEM public key used to verify session tokens
    pub fn read_public_key(&self) -> Result<Vec<u8>> {
        let path = self
            .public_key_path
            .as_ref()
            .context("PUB_KEY_PATH is not set")?;
        std::fs::read(path).with_context(|| format!("Failed to read public key {:?}", path))
    }
}
