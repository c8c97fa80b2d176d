//! Query dispatch and result normalization
//!
//! The dispatcher sends one request per query and turns the backend's loosely
//! shaped payloads into closed result types:
//!
//! - bar / line / area → [`ChartResult::Series`]
//! - pie → [`ChartResult::Pie`]
//! - scatter → [`ChartResult::Scatter`]
//! - boxplot → [`ChartResult::Boxplot`]
//! - pivot → [`PivotResult`] with the totals row appended
//!
//! The kind declared by the response is authoritative. The backend may normalize
//! kinds (an area chart comes back as a line payload with an `area_fill` hint),
//! so the request kind is only used for logging a mismatch.
//!
//! Success payloads that cannot be interpreted are an empty result, not an error.

use super::validator::ChartKind;
use crate::backend::columns::ColumnCatalog;
use crate::backend::error::Result;
use crate::backend::wire::{
    ChartRequest, ChartResponse, PivotRequest, PivotResponse, RecastRequest, Scalar,
};
use async_trait::async_trait;
use serde::Deserialize;

/// The analytics backend as seen by the engine
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Column metadata for the active dataset
    async fn columns_info(&self) -> Result<ColumnCatalog>;

    async fn chart_data(&self, request: &ChartRequest) -> Result<ChartResponse>;

    async fn pivot_data(&self, request: &PivotRequest) -> Result<PivotResponse>;

    async fn recast(&self, request: &RecastRequest) -> Result<()>;
}

/// A successful query either has data or is an explicit "no data" state
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome<T> {
    Data(T),
    Empty,
}

impl<T> QueryOutcome<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryOutcome::Data(data) => Some(data),
            QueryOutcome::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, QueryOutcome::Empty)
    }
}

/// Series shapes sharing the category/value layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Bar,
    Line,
    Area,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub name: String,
    pub value: f64,
}

/// Outlier point of a boxplot, positioned by category index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outlier {
    pub category: usize,
    pub value: f64,
}

/// Normalized chart result
#[derive(Debug, Clone, PartialEq)]
pub enum ChartResult {
    Series {
        kind: SeriesKind,
        labels: Vec<String>,
        values: Vec<Option<f64>>,
        y_name: String,
    },
    Pie {
        slices: Vec<PieSlice>,
    },
    Scatter {
        points: Vec<[f64; 2]>,
        x_name: String,
        y_name: String,
    },
    Boxplot {
        categories: Vec<String>,
        /// `[min, q1, median, q3, max]` per category
        stats: Vec<[f64; 5]>,
        outliers: Vec<Outlier>,
        y_name: String,
    },
}

impl ChartResult {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartResult::Series { kind, .. } => match kind {
                SeriesKind::Bar => ChartKind::Bar,
                SeriesKind::Line => ChartKind::Line,
                SeriesKind::Area => ChartKind::Area,
            },
            ChartResult::Pie { .. } => ChartKind::Pie,
            ChartResult::Scatter { .. } => ChartKind::Scatter,
            ChartResult::Boxplot { .. } => ChartKind::Boxplot,
        }
    }
}

/// One row of a pivot result
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub cells: Vec<Scalar>,
    /// Synthesized totals row
    pub is_total: bool,
}

/// Normalized pivot result
#[derive(Debug, Clone, PartialEq)]
pub struct PivotResult {
    pub headers: Vec<String>,
    /// Data rows, followed by the totals row when the backend sent totals
    pub rows: Vec<PivotRow>,
    /// Number of data rows reported by the backend (totals excluded)
    pub row_count: usize,
    /// Number of leading columns that hold row-field labels
    pub row_fields: usize,
}

impl PivotResult {
    pub fn totals(&self) -> Option<&PivotRow> {
        self.rows.last().filter(|r| r.is_total)
    }

    pub fn data_rows(&self) -> impl Iterator<Item = &PivotRow> {
        self.rows.iter().filter(|r| !r.is_total)
    }
}

/// Issue one chart query and normalize the response
pub async fn dispatch_chart_query(
    backend: &dyn QueryBackend,
    request: &ChartRequest,
) -> Result<QueryOutcome<ChartResult>> {
    let response = backend.chart_data(request).await?;
    Ok(normalize_chart(request, response))
}

/// Issue one pivot query and normalize the response
pub async fn dispatch_pivot_query(
    backend: &dyn QueryBackend,
    request: &PivotRequest,
) -> Result<QueryOutcome<PivotResult>> {
    let response = backend.pivot_data(request).await?;
    Ok(normalize_pivot(request, response))
}

#[derive(Deserialize)]
struct RawSlice {
    name: Scalar,
    value: Option<f64>,
}

/// Interpret a chart payload according to its declared kind
pub fn normalize_chart(request: &ChartRequest, response: ChartResponse) -> QueryOutcome<ChartResult> {
    let Some(declared) = response
        .chart_type
        .as_deref()
        .and_then(|t| t.parse::<ChartKind>().ok())
    else {
        tracing::warn!(chart_type = ?response.chart_type, "Chart payload has no usable kind");
        return QueryOutcome::Empty;
    };

    let declared = if declared == ChartKind::Line && response.area_fill == Some(true) {
        ChartKind::Area
    } else {
        declared
    };
    if declared != request.chart_type {
        tracing::warn!(
            requested = %request.chart_type,
            received = %declared,
            "Backend normalized chart kind, rendering as received"
        );
    }

    let x_name = response
        .x_name
        .clone()
        .unwrap_or_else(|| request.x_column.clone());
    let y_name = response
        .y_name
        .clone()
        .or_else(|| request.y_column.clone())
        .unwrap_or_else(|| "count".to_string());

    let result = match declared {
        ChartKind::Bar | ChartKind::Line | ChartKind::Area => {
            series_result(declared, response, y_name)
        }
        ChartKind::Pie => pie_result(response),
        ChartKind::Scatter => scatter_result(response, x_name, y_name),
        ChartKind::Boxplot => boxplot_result(response, y_name),
    };

    match result {
        Some(result) => QueryOutcome::Data(result),
        None => QueryOutcome::Empty,
    }
}

fn series_result(kind: ChartKind, response: ChartResponse, y_name: String) -> Option<ChartResult> {
    if response.labels.is_empty() {
        return None;
    }
    if response.labels.len() != response.values.len() {
        tracing::warn!(
            labels = response.labels.len(),
            values = response.values.len(),
            "Series labels and values are misaligned"
        );
        return None;
    }
    let kind = match kind {
        ChartKind::Line => SeriesKind::Line,
        ChartKind::Area => SeriesKind::Area,
        _ => SeriesKind::Bar,
    };
    Some(ChartResult::Series {
        kind,
        labels: response.labels.iter().map(Scalar::to_string).collect(),
        values: response.values,
        y_name,
    })
}

fn pie_result(response: ChartResponse) -> Option<ChartResult> {
    let raw: Vec<RawSlice> = serde_json::from_value(response.data?).ok()?;
    let slices: Vec<PieSlice> = raw
        .into_iter()
        .filter_map(|s| {
            s.value.map(|value| PieSlice {
                name: s.name.to_string(),
                value,
            })
        })
        .collect();
    (!slices.is_empty()).then_some(ChartResult::Pie { slices })
}

fn scatter_result(response: ChartResponse, x_name: String, y_name: String) -> Option<ChartResult> {
    let raw: Vec<(Option<f64>, Option<f64>)> = serde_json::from_value(response.data?).ok()?;
    let points: Vec<[f64; 2]> = raw
        .into_iter()
        .filter_map(|(x, y)| Some([x?, y?]))
        .collect();
    (!points.is_empty()).then_some(ChartResult::Scatter {
        points,
        x_name,
        y_name,
    })
}

fn boxplot_result(response: ChartResponse, y_name: String) -> Option<ChartResult> {
    let stats: Vec<[f64; 5]> = serde_json::from_value(response.data?).ok()?;
    if stats.is_empty() || stats.len() != response.categories.len() {
        return None;
    }
    let outliers = response
        .outliers
        .into_iter()
        .filter_map(|(index, value)| {
            let category = index as usize;
            if index < 0.0 || index.fract() != 0.0 || category >= stats.len() {
                tracing::warn!(index, "Dropping outlier with invalid category index");
                return None;
            }
            Some(Outlier { category, value })
        })
        .collect();
    Some(ChartResult::Boxplot {
        categories: response.categories.iter().map(Scalar::to_string).collect(),
        stats,
        outliers,
        y_name,
    })
}

/// Align pivot rows to the headers and append the totals row
pub fn normalize_pivot(request: &PivotRequest, response: PivotResponse) -> QueryOutcome<PivotResult> {
    if response.rows.is_empty() || response.headers.is_empty() {
        return QueryOutcome::Empty;
    }

    let width = response.headers.len();
    let align = |mut cells: Vec<Scalar>| {
        cells.resize(width, Scalar::Null);
        cells
    };

    let row_count = response.row_count.unwrap_or(response.rows.len());
    let mut rows: Vec<PivotRow> = response
        .rows
        .into_iter()
        .map(|cells| PivotRow {
            cells: align(cells),
            is_total: false,
        })
        .collect();

    if let Some(totals) = response.totals.filter(|t| !t.is_empty()) {
        rows.push(PivotRow {
            cells: align(totals),
            is_total: true,
        });
    }

    QueryOutcome::Data(PivotResult {
        headers: response.headers,
        rows,
        row_count,
        row_fields: request.rows.len().min(width),
    })
}
