//! Report configuration and cross-filter engine
//!
//! Structure:
//! - `validator.rs`: chart kinds permitted per column-type pairing
//! - `chart.rs`: X/Y/kind/title selection
//! - `pivot.rs`: exclusive rows/columns/values assignment
//! - `filters.rs`: cross-filter set
//! - `dispatcher.rs`: backend trait, queries and result normalization
//! - `render.rs`: render state, plot specifications and pivot grids
//! - `view.rs`: one view instance tying the above together

pub mod chart;
pub mod dispatcher;
pub mod filters;
pub mod palette;
pub mod pivot;
pub mod preferences;
pub mod render;
pub mod validator;
pub mod view;

pub use chart::ChartConfig;
pub use dispatcher::{
    dispatch_chart_query, dispatch_pivot_query, ChartResult, PivotResult, QueryBackend,
    QueryOutcome,
};
pub use filters::{filter_value, CrossFilterSet};
pub use pivot::{Aggregator, PivotAssignment, Zone};
pub use preferences::{PreferenceStore, ReportTab};
pub use render::{render_chart, render_pivot, PivotGrid, PlotSpec, RenderState};
pub use validator::{valid_chart_kinds, ChartKind};
pub use view::{Refresh, ReportView};
