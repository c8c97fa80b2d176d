//! Pivot field assignment
//!
//! Columns are assigned to one of three zones (rows, columns, values), in the
//! manner of a spreadsheet pivot-table builder. Zone membership is stored as a
//! single ordered map `column -> placement`, so a column can never sit in two
//! zones: moving it is one overwrite.
//!
//! Aggregator compatibility is checked lazily, when a request is built, not when
//! a field is assigned. A text column may sit in the values zone with `sum`
//! until the user tries to generate.

use crate::backend::columns::{ColumnCatalog, SemanticType};
use crate::backend::error::ValidationError;
use crate::backend::wire::{FilterMap, PivotRequest, ValueField};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Reduction applied to a value-zone column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    #[default]
    Sum,
    Mean,
    Count,
    Min,
    Max,
}

impl Aggregator {
    pub fn as_str(self) -> &'static str {
        match self {
            Aggregator::Sum => "sum",
            Aggregator::Mean => "mean",
            Aggregator::Count => "count",
            Aggregator::Min => "min",
            Aggregator::Max => "max",
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregator::Sum),
            "mean" | "avg" | "average" => Ok(Aggregator::Mean),
            "count" => Ok(Aggregator::Count),
            "min" => Ok(Aggregator::Min),
            "max" => Ok(Aggregator::Max),
            other => Err(format!("unknown aggregator '{}'", other)),
        }
    }
}

/// The three pivot roles a column can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Rows,
    Columns,
    Values,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Rows,
    Columns,
    Values(Aggregator),
}

impl Placement {
    fn zone(self) -> Zone {
        match self {
            Placement::Rows => Zone::Rows,
            Placement::Columns => Zone::Columns,
            Placement::Values(_) => Zone::Values,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PivotAssignment {
    fields: IndexMap<String, Placement>,
}

impl PivotAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `column` into `zone`, removing it from wherever it was
    ///
    /// The column goes to the end of the target zone. Entering the values zone
    /// always starts with the `sum` aggregator.
    pub fn assign(&mut self, column: impl Into<String>, zone: Zone) {
        let column = column.into();
        let placement = match zone {
            Zone::Rows => Placement::Rows,
            Zone::Columns => Placement::Columns,
            Zone::Values => Placement::Values(Aggregator::default()),
        };
        self.fields.shift_remove(&column);
        self.fields.insert(column, placement);
    }

    /// Remove `column` from every zone; returns whether it was assigned
    pub fn unassign(&mut self, column: &str) -> bool {
        self.fields.shift_remove(column).is_some()
    }

    /// Change the aggregator of a value-zone column
    pub fn set_aggregator(
        &mut self,
        column: &str,
        aggregator: Aggregator,
    ) -> Result<(), ValidationError> {
        match self.fields.get_mut(column) {
            Some(Placement::Values(current)) => {
                *current = aggregator;
                Ok(())
            }
            _ => Err(ValidationError::NotAValueField {
                column: column.to_string(),
            }),
        }
    }

    /// Assign an unassigned column to its natural zone, or unassign it
    ///
    /// Categorical-like columns go to rows, everything else to values.
    /// Returns the zone the column ended up in.
    pub fn toggle(&mut self, column: &str, dtype: SemanticType) -> Option<Zone> {
        if self.unassign(column) {
            return None;
        }
        let zone = if dtype.is_categorical_like() {
            Zone::Rows
        } else {
            Zone::Values
        };
        self.assign(column, zone);
        Some(zone)
    }

    /// Empty all three zones
    pub fn reset(&mut self) {
        self.fields.clear();
    }

    pub fn zone_of(&self, column: &str) -> Option<Zone> {
        self.fields.get(column).map(|p| p.zone())
    }

    pub fn aggregator_of(&self, column: &str) -> Option<Aggregator> {
        match self.fields.get(column) {
            Some(Placement::Values(agg)) => Some(*agg),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn rows(&self) -> Vec<&str> {
        self.in_zone(Zone::Rows)
    }

    pub fn columns(&self) -> Vec<&str> {
        self.in_zone(Zone::Columns)
    }

    pub fn values(&self) -> Vec<ValueField> {
        self.fields
            .iter()
            .filter_map(|(column, placement)| match placement {
                Placement::Values(aggregator) => Some(ValueField {
                    column: column.clone(),
                    aggregator: *aggregator,
                }),
                _ => None,
            })
            .collect()
    }

    /// Drop assignments of columns missing from the catalog
    ///
    /// Returns the names that were dropped.
    pub fn reconcile(&mut self, catalog: &ColumnCatalog) -> Vec<String> {
        let missing: Vec<String> = self
            .fields
            .keys()
            .filter(|c| !catalog.contains(c))
            .cloned()
            .collect();
        for column in &missing {
            tracing::info!(column = %column, "Pivot field no longer exists, unassigning");
            self.fields.shift_remove(column);
        }
        missing
    }

    /// Build the pivot-data request, checking the assignment first
    ///
    /// Checks run in order and the first failure wins:
    /// 1. rows must be non-empty
    /// 2. values must be non-empty
    /// 3. non-numeric value fields must use `count`
    /// 4. no column in more than one zone
    pub fn request(
        &self,
        filters: FilterMap,
        catalog: &ColumnCatalog,
    ) -> Result<PivotRequest, ValidationError> {
        let rows: Vec<String> = self.rows().into_iter().map(String::from).collect();
        let columns: Vec<String> = self.columns().into_iter().map(String::from).collect();
        let values = self.values();

        if rows.is_empty() {
            return Err(ValidationError::RowsRequired);
        }
        if values.is_empty() {
            return Err(ValidationError::ValuesRequired);
        }

        let offending: Vec<String> = values
            .iter()
            .filter(|v| !catalog.is_numeric(&v.column) && v.aggregator != Aggregator::Count)
            .map(|v| v.column.clone())
            .collect();
        if !offending.is_empty() {
            return Err(ValidationError::NonNumericValueField { columns: offending });
        }

        let mut seen = HashSet::new();
        let all = rows
            .iter()
            .chain(columns.iter())
            .chain(values.iter().map(|v| &v.column));
        for column in all {
            if !seen.insert(column.as_str()) {
                return Err(ValidationError::DuplicateField {
                    column: column.clone(),
                });
            }
        }

        Ok(PivotRequest {
            rows,
            columns,
            values,
            filters,
        })
    }

    fn in_zone(&self, zone: Zone) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, placement)| placement.zone() == zone)
            .map(|(column, _)| column.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::columns::ColumnDescriptor;

    fn catalog() -> ColumnCatalog {
        ColumnCatalog::new(vec![
            ColumnDescriptor::new("region", "Utf8"),
            ColumnDescriptor::new("year", "Int64"),
            ColumnDescriptor::new("revenue", "Float64"),
            ColumnDescriptor::new("product", "Utf8"),
        ])
    }

    fn zone_count(assignment: &PivotAssignment, column: &str) -> usize {
        let in_rows = assignment.rows().contains(&column) as usize;
        let in_columns = assignment.columns().contains(&column) as usize;
        let in_values = assignment.values().iter().any(|v| v.column == column) as usize;
        in_rows + in_columns + in_values
    }

    #[test]
    fn test_assign_moves_between_zones() {
        let mut assignment = PivotAssignment::new();
        assignment.assign("region", Zone::Rows);
        assignment.assign("region", Zone::Values);

        assert!(assignment.rows().is_empty());
        assert_eq!(assignment.zone_of("region"), Some(Zone::Values));
        assert_eq!(assignment.aggregator_of("region"), Some(Aggregator::Sum));
        assert_eq!(zone_count(&assignment, "region"), 1);
    }

    #[test]
    fn test_exclusive_membership_over_sequences() {
        let zones = [Zone::Rows, Zone::Columns, Zone::Values];
        let columns = ["region", "year", "revenue"];
        let dtypes = [SemanticType::Text, SemanticType::Integer, SemanticType::Decimal];
        let mut assignment = PivotAssignment::new();

        // Deterministic pseudo-random walk over assign/toggle calls
        let mut state: u32 = 7;
        for _ in 0..500 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let c = (state >> 8) as usize % columns.len();
            let z = (state >> 16) as usize % zones.len();
            if state % 3 == 0 {
                assignment.toggle(columns[c], dtypes[c]);
            } else {
                assignment.assign(columns[c], zones[z]);
            }
            for column in columns {
                assert!(zone_count(&assignment, column) <= 1);
            }
        }
    }

    #[test]
    fn test_order_within_zone() {
        let mut assignment = PivotAssignment::new();
        assignment.assign("region", Zone::Rows);
        assignment.assign("product", Zone::Rows);
        assignment.assign("year", Zone::Columns);
        assignment.assign("region", Zone::Rows);
        assert_eq!(assignment.rows(), vec!["product", "region"]);
        assert_eq!(assignment.columns(), vec!["year"]);
    }

    #[test]
    fn test_toggle_routes_by_type() {
        let mut assignment = PivotAssignment::new();
        assert_eq!(
            assignment.toggle("region", SemanticType::Text),
            Some(Zone::Rows)
        );
        assert_eq!(
            assignment.toggle("revenue", SemanticType::Decimal),
            Some(Zone::Values)
        );
        assert_eq!(assignment.aggregator_of("revenue"), Some(Aggregator::Sum));

        // Toggling an assigned column unassigns it, whichever zone it is in
        assignment.assign("region", Zone::Columns);
        assert_eq!(assignment.toggle("region", SemanticType::Text), None);
        assert_eq!(assignment.zone_of("region"), None);
    }

    #[test]
    fn test_set_aggregator_requires_value_field() {
        let mut assignment = PivotAssignment::new();
        assignment.assign("region", Zone::Rows);
        assert_eq!(
            assignment.set_aggregator("region", Aggregator::Count),
            Err(ValidationError::NotAValueField {
                column: "region".into()
            })
        );
        assert!(assignment.set_aggregator("missing", Aggregator::Max).is_err());

        assignment.assign("revenue", Zone::Values);
        assignment.set_aggregator("revenue", Aggregator::Max).unwrap();
        assert_eq!(assignment.aggregator_of("revenue"), Some(Aggregator::Max));
    }

    #[test]
    fn test_rows_required_first() {
        let assignment = PivotAssignment::new();
        assert_eq!(
            assignment.request(FilterMap::new(), &catalog()),
            Err(ValidationError::RowsRequired)
        );

        let mut assignment = PivotAssignment::new();
        assignment.assign("revenue", Zone::Values);
        assert_eq!(
            assignment.request(FilterMap::new(), &catalog()),
            Err(ValidationError::RowsRequired)
        );
    }

    #[test]
    fn test_values_required() {
        let mut assignment = PivotAssignment::new();
        assignment.assign("region", Zone::Rows);
        assert_eq!(
            assignment.request(FilterMap::new(), &catalog()),
            Err(ValidationError::ValuesRequired)
        );
    }

    #[test]
    fn test_non_numeric_value_needs_count() {
        let mut assignment = PivotAssignment::new();
        assignment.assign("region", Zone::Rows);
        assignment.assign("product", Zone::Values);
        assignment
            .set_aggregator("product", Aggregator::Mean)
            .unwrap();

        assert_eq!(
            assignment.request(FilterMap::new(), &catalog()),
            Err(ValidationError::NonNumericValueField {
                columns: vec!["product".into()]
            })
        );

        assignment
            .set_aggregator("product", Aggregator::Count)
            .unwrap();
        let request = assignment.request(FilterMap::new(), &catalog()).unwrap();
        assert_eq!(request.rows, vec!["region"]);
        assert_eq!(
            request.values,
            vec![ValueField {
                column: "product".into(),
                aggregator: Aggregator::Count
            }]
        );
    }

    #[test]
    fn test_reset_and_reconcile() {
        let mut assignment = PivotAssignment::new();
        assignment.assign("region", Zone::Rows);
        assignment.assign("gone", Zone::Columns);
        assignment.assign("revenue", Zone::Values);

        let dropped = assignment.reconcile(&catalog());
        assert_eq!(dropped, vec!["gone".to_string()]);
        assert!(assignment.columns().is_empty());

        assignment.reset();
        assert!(assignment.is_empty());
    }

    #[test]
    fn test_parse_aggregator() {
        assert_eq!("MEAN".parse::<Aggregator>(), Ok(Aggregator::Mean));
        assert_eq!("avg".parse::<Aggregator>(), Ok(Aggregator::Mean));
        assert!("median".parse::<Aggregator>().is_err());
    }
}
