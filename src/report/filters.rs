//! Cross-filter set shared by the chart and the pivot table
//!
//! Every mutator reports whether the set actually changed; the view only
//! re-issues queries for real changes, so re-adding an identical filter is a
//! no-op end to end.

use crate::backend::columns::{ColumnCatalog, SemanticType};
use crate::backend::error::ValidationError;
use crate::backend::wire::{FilterMap, Scalar};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossFilterSet {
    filters: FilterMap,
}

impl CrossFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the filter on `column`
    ///
    /// Only columns of the active dataset may be filtered.
    pub fn add(
        &mut self,
        column: &str,
        value: Scalar,
        catalog: &ColumnCatalog,
    ) -> Result<bool, ValidationError> {
        if !catalog.contains(column) {
            return Err(ValidationError::UnknownColumn {
                column: column.to_string(),
            });
        }
        if self.filters.get(column) == Some(&value) {
            return Ok(false);
        }
        self.filters.insert(column.to_string(), value);
        Ok(true)
    }

    pub fn remove(&mut self, column: &str) -> bool {
        self.filters.remove(column).is_some()
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.filters.is_empty();
        self.filters.clear();
        changed
    }

    /// Drop filters on columns missing from the catalog
    pub fn reconcile(&mut self, catalog: &ColumnCatalog) -> Vec<String> {
        let missing: Vec<String> = self
            .filters
            .keys()
            .filter(|c| !catalog.contains(c))
            .cloned()
            .collect();
        for column in &missing {
            tracing::warn!(column = %column, "Dropping cross-filter on missing column");
            self.filters.remove(column);
        }
        missing
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.filters.get(column)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy of the current filters for a request payload
    pub fn snapshot(&self) -> FilterMap {
        self.filters.clone()
    }
}

/// Interpret a raw filter value (a clicked label or a typed argument)
/// according to the column type
///
/// Values that do not parse as the column type stay text.
pub fn filter_value(dtype: Option<SemanticType>, raw: &str) -> Scalar {
    match dtype {
        Some(t) if t.is_numeric() => raw
            .trim()
            .parse::<f64>()
            .map(Scalar::Number)
            .unwrap_or_else(|_| Scalar::from(raw)),
        Some(SemanticType::Boolean) => raw
            .trim()
            .parse::<bool>()
            .map(Scalar::Bool)
            .unwrap_or_else(|_| Scalar::from(raw)),
        _ => Scalar::from(raw),
    }
}
