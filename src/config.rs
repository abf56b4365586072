//! Configuration for the `devops` binary
//!
//! Loaded from a TOML file; every section is optional. Secrets can instead be
//! supplied through the environment, see [`crate::util`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::grafana::ClientOptions;
use crate::jira::AuthOptions;
use crate::util;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    #[serde(default)]
    pub grafana: GrafanaConfig,

    #[serde(default)]
    pub jira: JiraConfig,

    #[serde(default)]
    pub ssh: SshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Prometheus server for queries
    #[serde(default = "default_prometheus_address")]
    pub address: String,

    /// PushGateway for pushes
    #[serde(default = "default_pushgateway")]
    pub pushgateway: String,

    /// Server-side query evaluation timeout in seconds
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrafanaConfig {
    /// Query endpoint, e.g. `https://grafana.example.com/api/ds/query`
    pub address: Option<String>,

    /// Full `Authorization` header value, e.g. `Bearer <key>`
    pub token: Option<String>,

    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_grafana_timeout")]
    pub timeout_secs: u64,

    /// Accept self-signed certificates (default: false)
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JiraConfig {
    pub address: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SshConfig {
    /// `host:port` of the target
    pub address: Option<String>,
    pub user: Option<String>,

    /// Private key; password auth is used when unset
    pub key_file: Option<PathBuf>,

    /// Session timeout in seconds
    pub timeout_secs: Option<u64>,
}

fn default_prometheus_address() -> String {
    "http://localhost:9090".to_string()
}

fn default_pushgateway() -> String {
    "localhost:9091".to_string()
}

fn default_grafana_timeout() -> u64 {
    10
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            address: default_prometheus_address(),
            pushgateway: default_pushgateway(),
            timeout_secs: None,
        }
    }
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            address: None,
            token: None,
            timeout_secs: default_grafana_timeout(),
            insecure_skip_verify: false,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from
    /// `~/.config/devops-tools/config.toml` when no path is given. Without any
    /// file the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            let default_path = dirs::home_dir()?.join(".config/devops-tools/config.toml");
            default_path.exists().then_some(default_path)
        });

        let Some(path) = config_path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        trace!("loaded config from {}", path.display());

        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(util::get_env);
    }

    /// Apply overrides looked up through `lookup`, keyed by the variable names
    /// in [`crate::util`].
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(address) = lookup(util::PROMETHEUS_ADDR) {
            self.prometheus.address = address;
        }
        if let Some(pushgateway) = lookup(util::PUSHGATEWAY_ADDR) {
            self.prometheus.pushgateway = pushgateway;
        }
        if let Some(token) = lookup(util::GRAFANA_TOKEN) {
            self.grafana.token = Some(token);
        }
        if let Some(token) = lookup(util::JIRA_TOKEN) {
            self.jira.token = token;
        }
        if let Some(username) = lookup(util::JIRA_USERNAME) {
            self.jira.username = username;
        }
        if let Some(password) = lookup(util::JIRA_PASSWORD) {
            self.jira.password = password;
        }
    }
}

impl From<&GrafanaConfig> for ClientOptions {
    fn from(config: &GrafanaConfig) -> Self {
        ClientOptions {
            timeout: Duration::from_secs(config.timeout_secs),
            insecure_skip_verify: config.insecure_skip_verify,
            ..ClientOptions::default()
        }
    }
}

impl From<&JiraConfig> for AuthOptions {
    fn from(config: &JiraConfig) -> Self {
        AuthOptions {
            username: config.username.clone(),
            password: config.password.clone(),
            token: config.token.clone(),
        }
    }
}
