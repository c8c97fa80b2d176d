//! Request and response payloads exchanged with the analytics backend
//!
//! Responses are deliberately lenient: every field is optional or defaulted so a
//! partially-formed success payload still deserializes and is later classified
//! as an empty result rather than an error.

use crate::report::{Aggregator, ChartKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar cell or filter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Cross-filters as sent on the wire
pub type FilterMap = BTreeMap<String, Scalar>;

/// Body of `POST chart-data`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRequest {
    pub x_column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_column: Option<String>,
    pub chart_type: ChartKind,
    pub filters: FilterMap,
}

/// One value-zone field of a pivot request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueField {
    pub column: String,
    pub aggregator: Aggregator,
}

/// Body of `POST pivot-data`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRequest {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<ValueField>,
    pub filters: FilterMap,
}

/// One column change of a recast request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Modification {
    pub column: String,
    #[serde(rename = "type")]
    pub target: String,
}

/// Body of `POST recast`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecastRequest {
    pub modifications: Vec<Modification>,
}

/// Column entry of the `columns-info` response
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(alias = "type", default)]
    pub dtype: String,
}

/// `GET columns-info` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnsResponse {
    #[serde(default)]
    pub columns_info: Vec<ColumnInfo>,
}

/// Raw `chart-data` success payload, shape depends on `chart_type`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartResponse {
    #[serde(default)]
    pub chart_type: Option<String>,
    /// bar / line / area category labels
    #[serde(default)]
    pub labels: Vec<Scalar>,
    /// bar / line / area values, aligned with `labels`
    #[serde(default)]
    pub values: Vec<Option<f64>>,
    /// Area-fill hint on a line-shaped payload
    #[serde(default)]
    pub area_fill: Option<bool>,
    #[serde(default)]
    pub x_name: Option<String>,
    #[serde(default)]
    pub y_name: Option<String>,
    /// pie slices, scatter points or boxplot statistics
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// boxplot categories
    #[serde(default)]
    pub categories: Vec<Scalar>,
    /// boxplot outliers as `[category_index, value]`
    #[serde(default)]
    pub outliers: Vec<(f64, f64)>,
}

/// Raw `pivot-data` success payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PivotResponse {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Scalar>>,
    #[serde(default)]
    pub totals: Option<Vec<Scalar>>,
    #[serde(default)]
    pub row_count: Option<usize>,
}

/// Status envelope shared by every response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}
