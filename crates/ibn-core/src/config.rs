//! Settings loaded from the environment (and an optional `.env` file).
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{IbnError, Result};

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_CONSOLE_TIMEOUT_SECS: u64 = 10;

/// Topology controller connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ControllerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}/v2", self.host, self.port)
    }

    /// Basic-auth credentials, only when both halves are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

/// Language-model service settings. Only required for translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}

/// On-disk locations of the topology, policy store and inventory snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub root: PathBuf,
    pub topology: PathBuf,
    pub policy_store: PathBuf,
    pub inventory: PathBuf,
}

impl Paths {
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            topology: root.join("topology.yaml"),
            policy_store: root.join("policies").join("ibn_policies.yaml"),
            inventory: root.join("inventory").join("gns3_inventory.json"),
            root,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub controller: ControllerConfig,
    pub paths: Paths,
    pub console_timeout: Duration,
}

impl Settings {
    /// Load settings from the process environment after reading `.env`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("GNS3_SERVER_IP")
            .ok_or_else(|| IbnError::Configuration("GNS3_SERVER_IP is not configured".to_string()))?;
        let port = match get("GNS3_SERVER_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                IbnError::Configuration(format!("GNS3_SERVER_PORT '{}' is not a valid port", raw))
            })?,
            None => 80,
        };
        let console_timeout = match get("IBN_CONSOLE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                IbnError::Configuration(format!("IBN_CONSOLE_TIMEOUT_SECS '{}' is not a number", raw))
            })?,
            None => DEFAULT_CONSOLE_TIMEOUT_SECS,
        };
        let root = get("IBN_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            controller: ControllerConfig {
                host,
                port,
                username: get("GNS3_SERVER_USER"),
                password: get("GNS3_SERVER_PASSWORD"),
            },
            paths: Paths::under(root),
            console_timeout: Duration::from_secs(console_timeout),
        })
    }

    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.paths = Paths::under(root);
        self
    }
}

impl LlmConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| IbnError::Configuration("OPENAI_API_KEY is not configured".to_string()))?;
        Ok(Self {
            api_key,
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL"),
        })
    }
}
