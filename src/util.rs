//! Environment variables that override the configuration file

pub const PROMETHEUS_ADDR: &str = "DEVOPS_PROMETHEUS_ADDR";

pub const PUSHGATEWAY_ADDR: &str = "DEVOPS_PUSHGATEWAY_ADDR";

pub const GRAFANA_TOKEN: &str = "DEVOPS_GRAFANA_TOKEN";

pub const JIRA_TOKEN: &str = "DEVOPS_JIRA_TOKEN";

pub const JIRA_USERNAME: &str = "DEVOPS_JIRA_USERNAME";

pub const JIRA_PASSWORD: &str = "DEVOPS_JIRA_PASSWORD";

pub const SSH_PASSWORD: &str = "DEVOPS_SSH_PASSWORD";

/// Value of `key`, ignoring unset and blank variables.
pub fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
