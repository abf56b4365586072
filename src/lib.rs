//! Thin clients for everyday operations tooling: Prometheus (push and query),
//! Grafana (open-source and Alibaba Cloud hosted), Jira issues and one-shot
//! SSH commands.
//!
//! [`Devops`] hands out each client behind a trait object; the clients can
//! also be constructed directly from their modules.

pub mod common;
pub mod config;
pub mod error;
pub mod grafana;
pub mod jira;
pub mod prometheus;
pub mod util;

use reqwest::Client;

use crate::common::{DevopsHttpClient, HttpResult, Ssh};
use crate::grafana::{AliGrafana, ClientOptions, Grafana};
use crate::jira::{AuthOptions, Jira, JiraResult, OpsJira};
use crate::prometheus::Prometheus;

pub use crate::error::{Error, Result};

/// Entry points to every client.
pub trait Tools {
    fn prometheus(&self) -> Box<dyn crate::prometheus::MetricsInterface>;

    fn http(&self, client: Client) -> Box<dyn DevopsHttpClient>;

    fn grafana(&self) -> HttpResult<Box<dyn crate::grafana::MetricsInterface>>;

    fn ali_grafana(&self) -> HttpResult<Box<dyn crate::grafana::MetricsInterface>>;

    fn jira(&self, addr: &str, auth: AuthOptions) -> JiraResult<Box<dyn OpsJira>>;

    fn ssh(&self, addr: &str, user: &str) -> Ssh;
}

#[derive(Debug, Clone, Default)]
pub struct Devops {
    /// Used for both Grafana flavours
    pub grafana_options: ClientOptions,
}

impl Devops {
    pub fn with_grafana_options(grafana_options: ClientOptions) -> Self {
        Self { grafana_options }
    }
}

/// A [`Devops`] with default settings.
pub fn new_devops() -> Devops {
    Devops::default()
}

impl Tools for Devops {
    fn prometheus(&self) -> Box<dyn crate::prometheus::MetricsInterface> {
        Box::new(Prometheus::default())
    }

    fn http(&self, client: Client) -> Box<dyn DevopsHttpClient> {
        common::new_client(client)
    }

    fn grafana(&self) -> HttpResult<Box<dyn crate::grafana::MetricsInterface>> {
        Ok(Box::new(Grafana::with_options(&self.grafana_options)?))
    }

    fn ali_grafana(&self) -> HttpResult<Box<dyn crate::grafana::MetricsInterface>> {
        Ok(Box::new(AliGrafana::with_options(&self.grafana_options)?))
    }

    fn jira(&self, addr: &str, auth: AuthOptions) -> JiraResult<Box<dyn OpsJira>> {
        Ok(Box::new(Jira::new(addr, auth)?))
    }

    fn ssh(&self, addr: &str, user: &str) -> Ssh {
        Ssh::new(addr, user)
    }
}
