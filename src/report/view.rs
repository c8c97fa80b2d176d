//! Report view: the chart and pivot sections sharing one cross-filter set
//!
//! A [`ReportView`] owns all mutable state of one view instance. Every query
//! goes through a ticket carrying a per-section sequence number:
//!
//! 1. `begin_*` validates the configuration, bumps the sequence and returns the
//!    ticket (the section enters `Loading`)
//! 2. the ticket is run against the backend, possibly concurrently with others
//! 3. `complete_*` applies the outcome only if the ticket is still the latest
//!
//! A newer `begin_*` therefore supersedes anything still in flight for that
//! section: its late response is logged and dropped.
//!
//! Filter changes re-issue the last query of each section that is showing a
//! result or still loading one, chart and pivot concurrently.

use super::chart::ChartConfig;
use super::dispatcher::{
    dispatch_chart_query, dispatch_pivot_query, ChartResult, PivotResult, QueryBackend,
    QueryOutcome,
};
use super::filters::{filter_value, CrossFilterSet};
use super::pivot::{Aggregator, PivotAssignment, Zone};
use super::preferences::{PreferenceStore, Preferences, ReportTab};
use super::render::{render_chart, render_pivot, PivotGrid, PlotSpec, RenderState, ResultSlot};
use super::validator::ChartKind;
use crate::backend::columns::{ColumnCatalog, RecastTarget};
use crate::backend::error::{Result, ValidationError};
use crate::backend::wire::{ChartRequest, Modification, PivotRequest, RecastRequest, Scalar};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// A dispatched chart query
#[derive(Debug, Clone)]
pub struct ChartTicket {
    seq: u64,
    request: ChartRequest,
    title: Option<String>,
    span: tracing::Span,
}

impl ChartTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn request(&self) -> &ChartRequest {
        &self.request
    }

    pub async fn run(&self, backend: &dyn QueryBackend) -> Result<QueryOutcome<ChartResult>> {
        dispatch_chart_query(backend, &self.request)
            .instrument(self.span.clone())
            .await
    }
}

/// A dispatched pivot query
#[derive(Debug, Clone)]
pub struct PivotTicket {
    seq: u64,
    request: PivotRequest,
    span: tracing::Span,
}

impl PivotTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn request(&self) -> &PivotRequest {
        &self.request
    }

    pub async fn run(&self, backend: &dyn QueryBackend) -> Result<QueryOutcome<PivotResult>> {
        dispatch_pivot_query(backend, &self.request)
            .instrument(self.span.clone())
            .await
    }
}

/// Re-queries triggered by a cross-filter change
///
/// Each ticket has already superseded its section's previous query; pass the
/// refresh to [`ReportView::refresh`] or the section stays `Loading`.
#[derive(Debug, Default)]
#[must_use = "pass the refresh to ReportView::refresh"]
pub struct Refresh {
    pub chart: Option<ChartTicket>,
    pub pivot: Option<PivotTicket>,
}

impl Refresh {
    pub fn is_empty(&self) -> bool {
        self.chart.is_none() && self.pivot.is_none()
    }
}

pub struct ReportView {
    id: Uuid,
    backend: Arc<dyn QueryBackend>,
    preferences: PreferenceStore,
    active_tab: ReportTab,
    catalog: ColumnCatalog,
    chart: ChartConfig,
    pivot: PivotAssignment,
    filters: CrossFilterSet,
    chart_slot: ResultSlot<ChartResult>,
    chart_title: Option<String>,
    last_chart: Option<ChartRequest>,
    last_chart_title: Option<String>,
    chart_seq: u64,
    pivot_slot: ResultSlot<PivotResult>,
    last_pivot: Option<PivotRequest>,
    pivot_seq: u64,
}

impl ReportView {
    /// Create a view with no dataset loaded
    ///
    /// The last active tab is restored from the preference store.
    pub fn new(backend: Arc<dyn QueryBackend>, preferences: PreferenceStore) -> Self {
        let active_tab = preferences.load().last_tab;
        Self {
            id: Uuid::new_v4(),
            backend,
            preferences,
            active_tab,
            catalog: ColumnCatalog::default(),
            chart: ChartConfig::new(),
            pivot: PivotAssignment::new(),
            filters: CrossFilterSet::new(),
            chart_slot: ResultSlot::default(),
            chart_title: None,
            last_chart: None,
            last_chart_title: None,
            chart_seq: 0,
            pivot_slot: ResultSlot::default(),
            last_pivot: None,
            pivot_seq: 0,
        }
    }

    /// Create a view and load the column metadata
    pub async fn mount(backend: Arc<dyn QueryBackend>, preferences: PreferenceStore) -> Result<Self> {
        let mut view = Self::new(backend, preferences);
        view.load_columns().await?;
        Ok(view)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn catalog(&self) -> &ColumnCatalog {
        &self.catalog
    }

    pub fn chart(&self) -> &ChartConfig {
        &self.chart
    }

    pub fn pivot(&self) -> &PivotAssignment {
        &self.pivot
    }

    pub fn filters(&self) -> &CrossFilterSet {
        &self.filters
    }

    pub fn active_tab(&self) -> ReportTab {
        self.active_tab
    }

    // ---- column metadata -------------------------------------------------

    /// Fetch the column metadata and reconcile all state against it
    pub async fn load_columns(&mut self) -> Result<()> {
        let catalog = self.backend.columns_info().await?;
        self.apply_catalog(catalog);
        Ok(())
    }

    /// Change column types server-side, then reload the metadata
    pub async fn recast(&mut self, changes: &[(String, RecastTarget)]) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        if let Some((column, _)) = changes.iter().find(|(c, _)| !self.catalog.contains(c)) {
            return Err(ValidationError::UnknownColumn {
                column: column.clone(),
            }
            .into());
        }

        let request = RecastRequest {
            modifications: changes
                .iter()
                .map(|(column, target)| Modification {
                    column: column.clone(),
                    target: target.backend_tag().to_string(),
                })
                .collect(),
        };
        tracing::info!(view_id = %self.id, columns = changes.len(), "Recasting columns");
        self.backend.recast(&request).await?;
        self.load_columns().await
    }

    /// Displayed results were computed against the previous schema and are
    /// dropped along with anything still in flight.
    fn apply_catalog(&mut self, catalog: ColumnCatalog) {
        self.catalog = catalog;
        self.chart.reconcile(&self.catalog);
        let unassigned = self.pivot.reconcile(&self.catalog);
        let dropped = self.filters.reconcile(&self.catalog);
        tracing::info!(
            view_id = %self.id,
            columns = self.catalog.len(),
            unassigned = unassigned.len(),
            dropped_filters = dropped.len(),
            "Column metadata loaded"
        );
        self.invalidate_chart();
        self.invalidate_pivot();
    }

    // ---- chart section ---------------------------------------------------

    pub fn set_x(&mut self, column: Option<&str>) -> Result<()> {
        self.chart.set_x(column, &self.catalog)?;
        Ok(())
    }

    pub fn set_y(&mut self, column: Option<&str>) -> Result<()> {
        self.chart.set_y(column, &self.catalog)?;
        Ok(())
    }

    pub fn set_kind(&mut self, kind: ChartKind) -> Result<()> {
        self.chart.set_kind(kind)?;
        Ok(())
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.chart.set_title(title);
    }

    pub fn chart_state(&self) -> RenderState {
        self.chart_slot.state()
    }

    pub fn chart_outcome(&self) -> Option<&QueryOutcome<ChartResult>> {
        self.chart_slot.outcome()
    }

    pub fn chart_error(&self) -> Option<&str> {
        self.chart_slot.error()
    }

    /// Plot specification of the displayed chart, if it has data
    pub fn plot_spec(&self) -> Option<PlotSpec> {
        let result = self.chart_slot.outcome()?.data()?;
        Some(render_chart(result, self.chart_title.clone()))
    }

    /// Validate the chart configuration and take a ticket for its query
    ///
    /// A validation failure clears the displayed chart.
    pub fn begin_chart(&mut self) -> Result<ChartTicket> {
        let built = if self.catalog.is_empty() {
            Err(ValidationError::NoDataset)
        } else {
            self.chart.request(self.filters.snapshot())
        };
        match built {
            Ok(request) => {
                let title = self.chart.effective_title();
                Ok(self.chart_ticket(request, title))
            }
            Err(e) => {
                tracing::info!(view_id = %self.id, error = %e, "Chart configuration rejected");
                self.chart_seq += 1;
                self.chart_title = None;
                self.chart_slot.fail_and_clear(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Apply a chart outcome; returns whether the ticket was still current
    pub fn complete_chart(
        &mut self,
        ticket: ChartTicket,
        outcome: Result<QueryOutcome<ChartResult>>,
    ) -> Result<bool> {
        let _guard = ticket.span.enter();
        if ticket.seq != self.chart_seq {
            tracing::warn!(latest = self.chart_seq, "Discarding superseded chart response");
            return Ok(false);
        }
        match outcome {
            Ok(outcome) => {
                tracing::info!(empty = outcome.is_empty(), "Chart result applied");
                self.chart_slot.display(outcome);
                self.chart_title = ticket.title;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chart query failed");
                self.chart_slot.fail(e.user_message());
                Err(e)
            }
        }
    }

    /// Validate, query and display the chart
    pub async fn generate_chart(&mut self) -> Result<()> {
        let ticket = self.begin_chart()?;
        let outcome = ticket.run(self.backend.as_ref()).await;
        self.complete_chart(ticket, outcome).map(|_| ())
    }

    /// Turn a click on a chart element into a cross-filter on the X column
    ///
    /// Only bar and pie elements are filterable; other kinds ignore clicks.
    /// The label is typed after the X column.
    pub fn on_element_click(&mut self, label: &str) -> Result<Refresh> {
        let kind = self
            .chart_slot
            .outcome()
            .and_then(QueryOutcome::data)
            .map(ChartResult::kind);
        let x_column = match (kind, &self.last_chart) {
            (Some(kind), Some(request)) if kind.is_filterable() => request.x_column.clone(),
            _ => {
                tracing::debug!(?kind, "Ignoring click on non-filterable chart");
                return Ok(Refresh::default());
            }
        };
        let value = filter_value(self.catalog.dtype_of(&x_column), label);
        self.add_filter(&x_column, value)
    }

    fn chart_ticket(&mut self, request: ChartRequest, title: Option<String>) -> ChartTicket {
        self.chart_seq += 1;
        let span = tracing::info_span!(
            "chart_query",
            view = "chart",
            view_id = %self.id,
            seq = self.chart_seq,
            kind = %request.chart_type
        );
        span.in_scope(|| tracing::info!(filters = request.filters.len(), "Dispatching chart query"));
        self.last_chart = Some(request.clone());
        self.last_chart_title = title.clone();
        self.chart_slot.begin();
        ChartTicket {
            seq: self.chart_seq,
            request,
            title,
            span,
        }
    }

    fn invalidate_chart(&mut self) {
        self.chart_seq += 1;
        self.chart_slot.clear();
        self.chart_title = None;
        self.last_chart = None;
        self.last_chart_title = None;
    }

    // ---- pivot section ---------------------------------------------------

    pub fn assign(&mut self, column: &str, zone: Zone) -> Result<()> {
        self.require_column(column)?;
        self.pivot.assign(column, zone);
        Ok(())
    }

    pub fn unassign(&mut self, column: &str) -> bool {
        self.pivot.unassign(column)
    }

    /// Route an unassigned column to its natural zone, or unassign it
    pub fn toggle(&mut self, column: &str) -> Result<Option<Zone>> {
        let dtype = self
            .catalog
            .dtype_of(column)
            .ok_or_else(|| ValidationError::UnknownColumn {
                column: column.to_string(),
            })?;
        Ok(self.pivot.toggle(column, dtype))
    }

    pub fn set_aggregator(&mut self, column: &str, aggregator: Aggregator) -> Result<()> {
        self.pivot.set_aggregator(column, aggregator)?;
        Ok(())
    }

    /// Empty all zones and return the pivot section to idle
    pub fn reset_pivot(&mut self) {
        self.pivot.reset();
        self.invalidate_pivot();
    }

    pub fn pivot_state(&self) -> RenderState {
        self.pivot_slot.state()
    }

    pub fn pivot_outcome(&self) -> Option<&QueryOutcome<PivotResult>> {
        self.pivot_slot.outcome()
    }

    pub fn pivot_error(&self) -> Option<&str> {
        self.pivot_slot.error()
    }

    /// Grid of the displayed pivot, if it has data
    pub fn pivot_grid(&self) -> Option<PivotGrid> {
        self.pivot_slot.outcome()?.data().map(render_pivot)
    }

    /// Validate the pivot assignment and take a ticket for its query
    ///
    /// A validation failure leaves the displayed pivot in place.
    pub fn begin_pivot(&mut self) -> Result<PivotTicket> {
        let built = if self.catalog.is_empty() {
            Err(ValidationError::NoDataset)
        } else {
            self.pivot.request(self.filters.snapshot(), &self.catalog)
        };
        match built {
            Ok(request) => Ok(self.pivot_ticket(request)),
            Err(e) => {
                tracing::info!(view_id = %self.id, error = %e, "Pivot assignment rejected");
                self.pivot_seq += 1;
                self.pivot_slot.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Apply a pivot outcome; returns whether the ticket was still current
    pub fn complete_pivot(
        &mut self,
        ticket: PivotTicket,
        outcome: Result<QueryOutcome<PivotResult>>,
    ) -> Result<bool> {
        let _guard = ticket.span.enter();
        if ticket.seq != self.pivot_seq {
            tracing::warn!(latest = self.pivot_seq, "Discarding superseded pivot response");
            return Ok(false);
        }
        match outcome {
            Ok(outcome) => {
                tracing::info!(empty = outcome.is_empty(), "Pivot result applied");
                self.pivot_slot.display(outcome);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Pivot query failed");
                self.pivot_slot.fail(e.user_message());
                Err(e)
            }
        }
    }

    /// Validate, query and display the pivot table
    pub async fn generate_pivot(&mut self) -> Result<()> {
        let ticket = self.begin_pivot()?;
        let outcome = ticket.run(self.backend.as_ref()).await;
        self.complete_pivot(ticket, outcome).map(|_| ())
    }

    fn pivot_ticket(&mut self, request: PivotRequest) -> PivotTicket {
        self.pivot_seq += 1;
        let span = tracing::info_span!(
            "pivot_query",
            view = "pivot",
            view_id = %self.id,
            seq = self.pivot_seq
        );
        span.in_scope(|| {
            tracing::info!(
                rows = request.rows.len(),
                columns = request.columns.len(),
                values = request.values.len(),
                filters = request.filters.len(),
                "Dispatching pivot query"
            )
        });
        self.last_pivot = Some(request.clone());
        self.pivot_slot.begin();
        PivotTicket {
            seq: self.pivot_seq,
            request,
            span,
        }
    }

    fn invalidate_pivot(&mut self) {
        self.pivot_seq += 1;
        self.pivot_slot.clear();
        self.last_pivot = None;
    }

    fn require_column(&self, column: &str) -> Result<()> {
        if self.catalog.contains(column) {
            Ok(())
        } else {
            Err(ValidationError::UnknownColumn {
                column: column.to_string(),
            }
            .into())
        }
    }

    // ---- cross-filters ---------------------------------------------------

    /// Upsert a filter; re-adding an identical value triggers nothing
    pub fn add_filter(&mut self, column: &str, value: impl Into<Scalar>) -> Result<Refresh> {
        let changed = self.filters.add(column, value.into(), &self.catalog)?;
        Ok(self.filters_changed(changed))
    }

    pub fn remove_filter(&mut self, column: &str) -> Refresh {
        let changed = self.filters.remove(column);
        self.filters_changed(changed)
    }

    /// Remove every filter; sections with nothing displayed or in flight
    /// return to idle
    pub fn clear_filters(&mut self) -> Refresh {
        let changed = self.filters.clear();
        if !self.chart_slot.has_result() && self.chart_slot.state() != RenderState::Loading {
            self.chart_slot.clear();
        }
        if !self.pivot_slot.has_result() && self.pivot_slot.state() != RenderState::Loading {
            self.pivot_slot.clear();
        }
        self.filters_changed(changed)
    }

    /// Run the re-queries of a filter change, chart and pivot concurrently
    ///
    /// Both outcomes are applied; the first failure is returned.
    pub async fn refresh(&mut self, refresh: Refresh) -> Result<()> {
        if refresh.is_empty() {
            return Ok(());
        }
        let Refresh { chart, pivot } = refresh;
        let backend = Arc::clone(&self.backend);

        let chart_run = async {
            match &chart {
                Some(ticket) => Some(ticket.run(&*backend).await),
                None => None,
            }
        };
        let pivot_run = async {
            match &pivot {
                Some(ticket) => Some(ticket.run(&*backend).await),
                None => None,
            }
        };
        let (chart_outcome, pivot_outcome) = futures::join!(chart_run, pivot_run);

        let mut first_error = None;
        if let (Some(ticket), Some(outcome)) = (chart, chart_outcome) {
            if let Err(e) = self.complete_chart(ticket, outcome) {
                first_error.get_or_insert(e);
            }
        }
        if let (Some(ticket), Some(outcome)) = (pivot, pivot_outcome) {
            if let Err(e) = self.complete_pivot(ticket, outcome) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Re-issue every section showing a result or waiting on one; an
    /// in-flight query carries the old filters and is superseded.
    fn filters_changed(&mut self, changed: bool) -> Refresh {
        let mut refresh = Refresh::default();
        if !changed {
            return refresh;
        }
        let filters = self.filters.snapshot();

        if needs_requery(&self.chart_slot) {
            if let Some(mut request) = self.last_chart.clone() {
                request.filters = filters.clone();
                let title = self.last_chart_title.clone();
                refresh.chart = Some(self.chart_ticket(request, title));
            }
        }
        if needs_requery(&self.pivot_slot) {
            if let Some(mut request) = self.last_pivot.clone() {
                request.filters = filters;
                refresh.pivot = Some(self.pivot_ticket(request));
            }
        }
        refresh
    }

    // ---- tabs ------------------------------------------------------------

    /// Switch the active tab and persist it
    ///
    /// The switch takes effect even if the preference file cannot be written.
    pub fn switch_tab(&mut self, tab: ReportTab) -> Result<()> {
        if tab == self.active_tab {
            return Ok(());
        }
        self.active_tab = tab;
        self.preferences.save(&Preferences { last_tab: tab })
    }
}

fn needs_requery<T>(slot: &ResultSlot<T>) -> bool {
    slot.has_result() || slot.state() == RenderState::Loading
}
