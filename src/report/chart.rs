//! Chart configuration state
//!
//! Holds the X/Y selection, chart kind and title. The set of valid kinds is a
//! derived value: it is recomputed from the column types after every X/Y change
//! and the active kind is snapped to the first valid one whenever it falls out.

use super::validator::{valid_chart_kinds, ChartKind};
use crate::backend::columns::ColumnCatalog;
use crate::backend::error::ValidationError;
use crate::backend::wire::{ChartRequest, FilterMap};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct ChartConfig {
    x_column: Option<String>,
    y_column: Option<String>,
    kind: ChartKind,
    title: String,
    valid_kinds: BTreeSet<ChartKind>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            x_column: None,
            y_column: None,
            kind: ChartKind::Bar,
            title: String::new(),
            valid_kinds: BTreeSet::new(),
        }
    }
}

impl ChartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x_column(&self) -> Option<&str> {
        self.x_column.as_deref()
    }

    pub fn y_column(&self) -> Option<&str> {
        self.y_column.as_deref()
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn valid_kinds(&self) -> &BTreeSet<ChartKind> {
        &self.valid_kinds
    }

    /// Select the X column (`None` clears it)
    pub fn set_x(
        &mut self,
        column: Option<&str>,
        catalog: &ColumnCatalog,
    ) -> Result<(), ValidationError> {
        self.x_column = checked_column(column, catalog)?;
        self.rederive(catalog);
        Ok(())
    }

    /// Select the Y column (`None` switches to count mode)
    pub fn set_y(
        &mut self,
        column: Option<&str>,
        catalog: &ColumnCatalog,
    ) -> Result<(), ValidationError> {
        self.y_column = checked_column(column, catalog)?;
        self.rederive(catalog);
        Ok(())
    }

    /// Select a chart kind; kinds outside the valid set are rejected
    pub fn set_kind(&mut self, kind: ChartKind) -> Result<(), ValidationError> {
        if !self.valid_kinds.contains(&kind) {
            return Err(ValidationError::KindNotAllowed {
                kind: kind.to_string(),
            });
        }
        self.kind = kind;
        Ok(())
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Title shown above the chart
    ///
    /// The user title wins; otherwise "{Y} by {X}" or "Distribution of {X}".
    /// `None` until X is chosen.
    pub fn effective_title(&self) -> Option<String> {
        if !self.title.trim().is_empty() {
            return Some(self.title.clone());
        }
        let x = self.x_column.as_deref()?;
        Some(match self.y_column.as_deref() {
            Some(y) => format!("{} by {}", y, x),
            None => format!("Distribution of {}", x),
        })
    }

    /// Whether the current configuration can be rendered
    pub fn is_renderable(&self) -> bool {
        self.x_column.is_some() && self.valid_kinds.contains(&self.kind)
    }

    /// Re-apply the catalog after a metadata reload
    ///
    /// Selections of columns that no longer exist are cleared, then the valid
    /// kinds are recomputed for the (possibly retyped) columns.
    pub fn reconcile(&mut self, catalog: &ColumnCatalog) {
        if self.x_column.as_deref().is_some_and(|c| !catalog.contains(c)) {
            tracing::info!(column = ?self.x_column, "X column no longer exists, clearing");
            self.x_column = None;
        }
        if self.y_column.as_deref().is_some_and(|c| !catalog.contains(c)) {
            tracing::info!(column = ?self.y_column, "Y column no longer exists, clearing");
            self.y_column = None;
        }
        self.rederive(catalog);
    }

    /// Build the chart-data request for this configuration
    pub fn request(&self, filters: FilterMap) -> Result<ChartRequest, ValidationError> {
        let x_column = self.x_column.clone().ok_or(ValidationError::XRequired)?;
        if !self.valid_kinds.contains(&self.kind) {
            return Err(ValidationError::KindNotAllowed {
                kind: self.kind.to_string(),
            });
        }
        Ok(ChartRequest {
            x_column,
            y_column: self.y_column.clone(),
            chart_type: self.kind,
            filters,
        })
    }

    fn rederive(&mut self, catalog: &ColumnCatalog) {
        let x_type = self.x_column.as_deref().and_then(|c| catalog.dtype_of(c));
        let y_type = self.y_column.as_deref().and_then(|c| catalog.dtype_of(c));
        self.valid_kinds = valid_chart_kinds(x_type, y_type);

        if !self.valid_kinds.contains(&self.kind) {
            if let Some(&first) = self.valid_kinds.iter().next() {
                tracing::debug!(from = %self.kind, to = %first, "Chart kind no longer valid, switching");
                self.kind = first;
            }
        }
    }
}

fn checked_column(
    column: Option<&str>,
    catalog: &ColumnCatalog,
) -> Result<Option<String>, ValidationError> {
    match column.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(None),
        Some(c) if catalog.contains(c) => Ok(Some(c.to_string())),
        Some(c) => Err(ValidationError::UnknownColumn {
            column: c.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::columns::ColumnDescriptor;

    fn catalog() -> ColumnCatalog {
        ColumnCatalog::new(vec![
            ColumnDescriptor::new("region", "Utf8"),
            ColumnDescriptor::new("revenue", "Float64"),
            ColumnDescriptor::new("cost", "Float64"),
            ColumnDescriptor::new("city", "String"),
        ])
    }

    #[test]
    fn test_defaults() {
        let config = ChartConfig::new();
        assert_eq!(config.kind(), ChartKind::Bar);
        assert!(config.valid_kinds().is_empty());
        assert!(!config.is_renderable());
        assert_eq!(config.effective_title(), None);
    }

    #[test]
    fn test_kind_snaps_when_invalidated() {
        let catalog = catalog();
        let mut config = ChartConfig::new();
        config.set_x(Some("region"), &catalog).unwrap();
        config.set_y(Some("revenue"), &catalog).unwrap();
        config.set_kind(ChartKind::Boxplot).unwrap();

        // Numeric X drops boxplot; first valid kind is bar
        config.set_x(Some("cost"), &catalog).unwrap();
        assert_eq!(config.kind(), ChartKind::Bar);
        assert!(config.valid_kinds().contains(&ChartKind::Scatter));
    }

    #[test]
    fn test_pie_survives_when_still_valid() {
        let catalog = catalog();
        let mut config = ChartConfig::new();
        config.set_x(Some("region"), &catalog).unwrap();
        config.set_kind(ChartKind::Pie).unwrap();
        config.set_y(Some("revenue"), &catalog).unwrap();
        assert_eq!(config.kind(), ChartKind::Pie);
    }

    #[test]
    fn test_set_kind_rejects_invalid() {
        let catalog = catalog();
        let mut config = ChartConfig::new();
        config.set_x(Some("region"), &catalog).unwrap();
        let err = config.set_kind(ChartKind::Scatter).unwrap_err();
        assert!(matches!(err, ValidationError::KindNotAllowed { .. }));
        assert_eq!(config.kind(), ChartKind::Bar);
    }

    #[test]
    fn test_empty_valid_set_keeps_kind_and_suppresses_render() {
        let catalog = catalog();
        let mut config = ChartConfig::new();
        config.set_x(Some("region"), &catalog).unwrap();
        config.set_kind(ChartKind::Pie).unwrap();
        config.set_y(Some("city"), &catalog).unwrap();

        assert!(config.valid_kinds().is_empty());
        assert_eq!(config.kind(), ChartKind::Pie);
        assert!(!config.is_renderable());
        assert!(matches!(
            config.request(FilterMap::new()),
            Err(ValidationError::KindNotAllowed { .. })
        ));
    }

    #[test]
    fn test_effective_title() {
        let catalog = catalog();
        let mut config = ChartConfig::new();
        config.set_x(Some("region"), &catalog).unwrap();
        assert_eq!(
            config.effective_title().as_deref(),
            Some("Distribution of region")
        );

        config.set_y(Some("revenue"), &catalog).unwrap();
        assert_eq!(config.effective_title().as_deref(), Some("revenue by region"));

        config.set_title("Quarterly revenue");
        assert_eq!(config.effective_title().as_deref(), Some("Quarterly revenue"));

        config.set_title("   ");
        assert_eq!(config.effective_title().as_deref(), Some("revenue by region"));
    }

    #[test]
    fn test_request_requires_x() {
        let config = ChartConfig::new();
        assert_eq!(
            config.request(FilterMap::new()),
            Err(ValidationError::XRequired)
        );
    }

    #[test]
    fn test_unknown_column_rejected() {
        let catalog = catalog();
        let mut config = ChartConfig::new();
        let err = config.set_x(Some("profit"), &catalog).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownColumn {
                column: "profit".into()
            }
        );
        assert_eq!(config.x_column(), None);

        // Empty selection clears
        config.set_x(Some("region"), &catalog).unwrap();
        config.set_x(Some(""), &catalog).unwrap();
        assert_eq!(config.x_column(), None);
    }

    #[test]
    fn test_reconcile_drops_missing_columns() {
        let mut config = ChartConfig::new();
        config.set_x(Some("region"), &catalog()).unwrap();
        config.set_y(Some("revenue"), &catalog()).unwrap();

        let recast = ColumnCatalog::new(vec![
            ColumnDescriptor::new("region", "Utf8"),
            ColumnDescriptor::new("cost", "Float64"),
        ]);
        config.reconcile(&recast);
        assert_eq!(config.x_column(), Some("region"));
        assert_eq!(config.y_column(), None);
        assert!(config.valid_kinds().contains(&ChartKind::Pie));
    }

    #[test]
    fn test_request_payload() {
        let catalog = catalog();
        let mut config = ChartConfig::new();
        config.set_x(Some("region"), &catalog).unwrap();
        config.set_y(Some("revenue"), &catalog).unwrap();
        let request = config.request(FilterMap::new()).unwrap();
        assert_eq!(request.x_column, "region");
        assert_eq!(request.y_column.as_deref(), Some("revenue"));
        assert_eq!(request.chart_type, ChartKind::Bar);
    }
}
