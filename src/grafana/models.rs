//! Request body of Grafana's `/api/ds/query`
//!
//! Grafana accepts the body as free-form JSON; these types cover the fields
//! the Prometheus, CloudWatch and SQL datasources use so callers can build the
//! body instead of hand-writing it. Unset optional fields are omitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datasource {
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: String,
}

impl Datasource {
    pub fn new(kind: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            uid: uid.into(),
        }
    }
}

/// CloudWatch dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(rename = "DomainName", default, skip_serializing_if = "Vec::is_empty")]
    pub domain_name: Vec<String>,
    #[serde(rename = "NodeId", default, skip_serializing_if = "Vec::is_empty")]
    pub node_id: Vec<String>,
}

impl Dimensions {
    pub fn is_empty(&self) -> bool {
        self.domain_name.is_empty() && self.node_id.is_empty()
    }
}

/// One entry of `queries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub ref_id: String,
    pub datasource: Datasource,
    #[serde(default)]
    pub interval_ms: i64,
    #[serde(default)]
    pub max_data_points: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub instant: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub range: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exemplar: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub utc_offset_sec: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub interval_factor: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub datasource_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub step: i64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    // CloudWatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Dimensions::is_empty")]
    pub dimensions: Dimensions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub metric_query_type: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub metric_editor_mode: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub match_exact: bool,
    #[serde(rename = "sqlExpression", default, skip_serializing_if = "Option::is_none")]
    pub sql_expression: Option<String>,

    // SQL datasources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_sql: Option<String>,
}

impl Query {
    /// A Prometheus expression against `datasource`.
    pub fn prometheus(
        ref_id: impl Into<String>,
        datasource: Datasource,
        expr: impl Into<String>,
    ) -> Self {
        Self {
            ref_id: ref_id.into(),
            datasource,
            expr: Some(expr.into()),
            ..Self::default()
        }
    }
}

/// Relative form of a range, e.g. `now-30m` .. `now`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub raw: RawRange,
}

/// Body of `POST /api/ds/query`. `from` and `to` are epoch milliseconds as
/// strings, which is what the Grafana frontend sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsQueryRequest {
    pub queries: Vec<Query>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    pub from: String,
    pub to: String,
}

impl DsQueryRequest {
    pub fn new(queries: Vec<Query>, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            queries,
            range: None,
            from: from.timestamp_millis().to_string(),
            to: to.timestamp_millis().to_string(),
        }
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
