//! Chart kind compatibility
//!
//! Decides, from column semantic types alone, which chart kinds are
//! statistically meaningful for an X/Y pairing. An absent Y means the backend
//! counts rows per X value.

use crate::backend::columns::SemanticType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Chart kinds, declared in fallback order
///
/// The derived `Ord` follows declaration order, so the first element of a
/// `BTreeSet<ChartKind>` is the kind adopted when the current one becomes invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Area,
    Scatter,
    Boxplot,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Pie,
        ChartKind::Area,
        ChartKind::Scatter,
        ChartKind::Boxplot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Area => "area",
            ChartKind::Scatter => "scatter",
            ChartKind::Boxplot => "boxplot",
        }
    }

    /// Whether clicking an element of this chart can add a cross-filter
    pub fn is_filterable(self) -> bool {
        matches!(self, ChartKind::Bar | ChartKind::Pie)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown chart kind '{}'", s))
    }
}

/// Chart kinds permitted for the given X and Y column types
///
/// `None` means the column is not chosen. Each kind is decided by its own rule:
/// - bar, line, area: X chosen, Y absent or numeric
/// - pie: X categorical-like, Y absent or numeric
/// - scatter: X and Y both chosen and numeric
/// - boxplot: X categorical-like, Y chosen and numeric
pub fn valid_chart_kinds(
    x_type: Option<SemanticType>,
    y_type: Option<SemanticType>,
) -> BTreeSet<ChartKind> {
    let mut kinds = BTreeSet::new();

    let Some(x) = x_type else {
        return kinds;
    };
    let y_absent_or_numeric = y_type.map_or(true, SemanticType::is_numeric);
    let y_numeric = y_type.is_some_and(SemanticType::is_numeric);

    if y_absent_or_numeric {
        kinds.extend([ChartKind::Bar, ChartKind::Line, ChartKind::Area]);
    }
    if x.is_categorical_like() && y_absent_or_numeric {
        kinds.insert(ChartKind::Pie);
    }
    if x.is_numeric() && y_numeric {
        kinds.insert(ChartKind::Scatter);
    }
    if x.is_categorical_like() && y_numeric {
        kinds.insert(ChartKind::Boxplot);
    }

    kinds
}
