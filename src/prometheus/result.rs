//! Query result types
//!
//! Prometheus encodes every sample as a two element array
//! `[<unix seconds as number>, "<value as string>"]`. These types decode that
//! shape and encode back into it, so printed results look like the API's.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::error::{PrometheusError, PrometheusResult};

/// Label set of a series.
pub type Metric = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Scalar,
    Vector,
    Matrix,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Scalar => "scalar",
            ValueType::Vector => "vector",
            ValueType::Matrix => "matrix",
            ValueType::String => "string",
        };
        f.write_str(name)
    }
}

/// A single sample. `timestamp` is in milliseconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePair {
    pub timestamp: i64,
    pub value: f64,
}

/// Scalar results are a bare sample.
pub type Scalar = SamplePair;

/// A string result, timestamp in milliseconds since the epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringSample {
    pub timestamp: i64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixResult {
    #[serde(default)]
    pub metric: Metric,
    #[serde(default)]
    pub values: Vec<SamplePair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorResult {
    #[serde(default)]
    pub metric: Metric,
    pub value: SamplePair,
}

/// Decoded `data` of a query response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryValue {
    Scalar(Scalar),
    Vector(Vec<VectorResult>),
    Matrix(Vec<MatrixResult>),
    String(StringSample),
}

#[derive(Debug, Deserialize)]
struct RawQueryResult {
    #[serde(rename = "resultType")]
    result_type: String,
    #[serde(default)]
    result: Value,
}

impl QueryValue {
    /// Decode the `data` member of a successful query response.
    pub fn from_data(data: Value) -> PrometheusResult<QueryValue> {
        let raw: RawQueryResult = serde_json::from_value(data)?;

        let value = match raw.result_type.as_str() {
            "scalar" => QueryValue::Scalar(serde_json::from_value(raw.result)?),
            "vector" => QueryValue::Vector(serde_json::from_value(raw.result)?),
            "matrix" => QueryValue::Matrix(serde_json::from_value(raw.result)?),
            "string" => QueryValue::String(serde_json::from_value(raw.result)?),
            _ => return Err(PrometheusError::UnexpectedValueType(raw.result_type)),
        };

        Ok(value)
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            QueryValue::Scalar(_) => ValueType::Scalar,
            QueryValue::Vector(_) => ValueType::Vector,
            QueryValue::Matrix(_) => ValueType::Matrix,
            QueryValue::String(_) => ValueType::String,
        }
    }

    pub fn into_matrix(self) -> PrometheusResult<Vec<MatrixResult>> {
        match self {
            QueryValue::Matrix(matrix) => Ok(matrix),
            other => Err(PrometheusError::NotMatrix(other.value_type())),
        }
    }
}

impl SamplePair {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

fn seconds_to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

/// Milliseconds written as unix seconds: an integer for whole seconds, a
/// fraction otherwise, the way Prometheus writes them.
struct UnixSeconds(i64);

impl Serialize for UnixSeconds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 1000 == 0 {
            serializer.serialize_i64(self.0 / 1000)
        } else {
            serializer.serialize_f64(self.0 as f64 / 1000.0)
        }
    }
}

/// Parse a sample value the way Prometheus writes them, including `NaN`,
/// `+Inf` and `-Inf`.
pub fn parse_sample_value(value: &str) -> Option<f64> {
    value.parse::<f64>().ok()
}

pub fn format_sample_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

impl<'de> Deserialize<'de> for SamplePair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (seconds, value) = <(f64, String)>::deserialize(deserializer)?;
        let value = parse_sample_value(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid sample value {value:?}")))?;

        Ok(SamplePair {
            timestamp: seconds_to_millis(seconds),
            value,
        })
    }
}

impl Serialize for SamplePair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (UnixSeconds(self.timestamp), format_sample_value(self.value)).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StringSample {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (seconds, value) = <(f64, String)>::deserialize(deserializer)?;
        Ok(StringSample {
            timestamp: seconds_to_millis(seconds),
            value,
        })
    }
}

impl Serialize for StringSample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (UnixSeconds(self.timestamp), &self.value).serialize(serializer)
    }
}
