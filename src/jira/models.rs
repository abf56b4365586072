//! Issue representation and request options
//!
//! Only the commonly used system fields are typed; everything else, custom
//! fields included, ends up in [`IssueFields::unknowns`].

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expand: String,
    pub id: String,
    #[serde(rename = "self", default)]
    pub self_link: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IssueFields>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "issuetype", default)]
    pub issue_type: Option<IssueType>,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assignee: Option<User>,
    #[serde(default)]
    pub reporter: Option<User>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Jira timestamps, e.g. `2023-04-23T10:40:33.146+0800`
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(flatten)]
    pub unknowns: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueType {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subtask: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default)]
    pub active: bool,
}

/// Query options for fetching a single issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetQueryOptions {
    /// Comma separated field names; `*all` and `-field` work as in Jira.
    pub fields: Option<String>,
    pub expand: Option<String>,
    pub properties: Option<String>,
    pub fields_by_keys: bool,
    pub update_history: bool,
}

impl GetQueryOptions {
    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(fields) = &self.fields {
            query.push(("fields", fields.clone()));
        }
        if let Some(expand) = &self.expand {
            query.push(("expand", expand.clone()));
        }
        if let Some(properties) = &self.properties {
            query.push(("properties", properties.clone()));
        }
        if self.fields_by_keys {
            query.push(("fieldsByKeys", "true".to_string()));
        }
        if self.update_history {
            query.push(("updateHistory", "true".to_string()));
        }
        query
    }
}

/// Paging and projection for JQL searches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub start_at: Option<u32>,
    pub max_results: Option<u32>,
    pub expand: Option<String>,
    pub fields: Vec<String>,
    /// `strict`, `warn` or `none`
    pub validate_query: Option<String>,
}

impl SearchOptions {
    pub(crate) fn to_query(&self, jql: &str) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if !jql.is_empty() {
            query.push(("jql", jql.to_string()));
        }
        if let Some(start_at) = self.start_at {
            query.push(("startAt", start_at.to_string()));
        }
        if let Some(max_results) = self.max_results {
            query.push(("maxResults", max_results.to_string()));
        }
        if let Some(expand) = &self.expand {
            query.push(("expand", expand.clone()));
        }
        if !self.fields.is_empty() {
            query.push(("fields", self.fields.join(",")));
        }
        if let Some(validate_query) = &self.validate_query {
            query.push(("validateQuery", validate_query.clone()));
        }
        query
    }
}

/// Response metadata. Paging fields are only filled in by searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub start_at: u32,
    pub max_results: u32,
    pub total: u32,
}

impl Response {
    pub(crate) fn from_status(status: StatusCode) -> Self {
        Self {
            status,
            start_at: 0,
            max_results: 0,
            total: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResult {
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
}
