//! Result rendering
//!
//! [`ResultSlot`] tracks the Idle → Loading → Displayed/Failed cycle of one
//! view section. [`render_chart`] turns a normalized [`ChartResult`] into a
//! declarative [`PlotSpec`]; [`render_pivot`] turns a [`PivotResult`] into a
//! [`PivotGrid`] with the totals row flagged.

use super::dispatcher::{ChartResult, PivotResult, QueryOutcome, SeriesKind};
use super::palette;
use crate::backend::wire::Scalar;
use serde::Serialize;

/// Render cycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Loading,
    Displayed,
    Failed,
}

/// Render state plus the last successfully displayed outcome
///
/// A failed attempt keeps the previous outcome; only [`ResultSlot::clear`]
/// drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSlot<T> {
    state: RenderState,
    outcome: Option<QueryOutcome<T>>,
    error: Option<String>,
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self {
            state: RenderState::Idle,
            outcome: None,
            error: None,
        }
    }
}

impl<T> ResultSlot<T> {
    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn outcome(&self) -> Option<&QueryOutcome<T>> {
        self.outcome.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a result (data or an explicit empty state) is showing
    pub fn has_result(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn begin(&mut self) {
        self.state = RenderState::Loading;
        self.error = None;
    }

    pub fn display(&mut self, outcome: QueryOutcome<T>) {
        self.state = RenderState::Displayed;
        self.outcome = Some(outcome);
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = RenderState::Failed;
        self.error = Some(message.into());
    }

    /// Fail and drop the displayed outcome
    pub fn fail_and_clear(&mut self, message: impl Into<String>) {
        self.outcome = None;
        self.fail(message);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TooltipTrigger {
    Axis,
    Item,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisPointer {
    Shadow,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tooltip {
    pub trigger: TooltipTrigger,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_pointer: Option<AxisPointer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    Category,
    Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    #[serde(rename = "type")]
    pub axis_type: AxisType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<String>,
}

impl Axis {
    fn category(labels: &[String]) -> Self {
        Self {
            axis_type: AxisType::Category,
            name: None,
            data: labels.to_vec(),
        }
    }

    fn value(name: &str) -> Self {
        Self {
            axis_type: AxisType::Value,
            name: Some(name.to_string()),
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    #[serde(rename = "type")]
    pub legend_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaStyle {
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStyle {
    pub color: String,
    pub border_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxDatum {
    pub value: [f64; 5],
    pub item_style: ItemStyle,
}

/// One plotted series
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Series {
    Bar {
        name: String,
        data: Vec<Option<f64>>,
    },
    Line {
        name: String,
        data: Vec<Option<f64>>,
        #[serde(rename = "areaStyle", skip_serializing_if = "Option::is_none")]
        area_style: Option<AreaStyle>,
    },
    Pie {
        radius: [String; 2],
        data: Vec<NamedValue>,
    },
    Scatter {
        name: String,
        data: Vec<[f64; 2]>,
        #[serde(rename = "symbolSize")]
        symbol_size: u32,
    },
    Boxplot {
        name: String,
        data: Vec<BoxDatum>,
    },
}

/// Declarative plot specification handed to the charting surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub color: Vec<String>,
    pub tooltip: Tooltip,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<Axis>,
    pub series: Vec<Series>,
    /// Elements emit category clicks that become cross-filters
    pub clickable: bool,
}

const AREA_OPACITY: f64 = 0.15;
const SCATTER_SYMBOL_SIZE: u32 = 8;
const PIE_RADIUS: [&str; 2] = ["35%", "65%"];

/// Build the plot specification for a chart result
pub fn render_chart(result: &ChartResult, title: Option<String>) -> PlotSpec {
    let color = palette::CATEGORICAL.iter().map(|c| c.to_string()).collect();
    let clickable = result.kind().is_filterable();

    let (tooltip, legend, x_axis, y_axis, series) = match result {
        ChartResult::Series {
            kind,
            labels,
            values,
            y_name,
        } => {
            let pointer = match kind {
                SeriesKind::Bar => AxisPointer::Shadow,
                SeriesKind::Line | SeriesKind::Area => AxisPointer::Line,
            };
            let series = match kind {
                SeriesKind::Bar => Series::Bar {
                    name: y_name.clone(),
                    data: values.clone(),
                },
                SeriesKind::Line => Series::Line {
                    name: y_name.clone(),
                    data: values.clone(),
                    area_style: None,
                },
                SeriesKind::Area => Series::Line {
                    name: y_name.clone(),
                    data: values.clone(),
                    area_style: Some(AreaStyle {
                        opacity: AREA_OPACITY,
                    }),
                },
            };
            (
                Tooltip {
                    trigger: TooltipTrigger::Axis,
                    axis_pointer: Some(pointer),
                },
                None,
                Some(Axis::category(labels)),
                Some(Axis::value(y_name)),
                vec![series],
            )
        }
        ChartResult::Pie { slices } => (
            item_tooltip(),
            Some(Legend {
                legend_type: "scroll".to_string(),
            }),
            None,
            None,
            vec![Series::Pie {
                radius: PIE_RADIUS.map(String::from),
                data: slices
                    .iter()
                    .map(|s| NamedValue {
                        name: s.name.clone(),
                        value: s.value,
                    })
                    .collect(),
            }],
        ),
        ChartResult::Scatter {
            points,
            x_name,
            y_name,
        } => (
            item_tooltip(),
            None,
            Some(Axis::value(x_name)),
            Some(Axis::value(y_name)),
            vec![Series::Scatter {
                name: y_name.clone(),
                data: points.clone(),
                symbol_size: SCATTER_SYMBOL_SIZE,
            }],
        ),
        ChartResult::Boxplot {
            categories,
            stats,
            outliers,
            y_name,
        } => {
            let boxes = stats
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    let base = palette::color(i);
                    BoxDatum {
                        value: *value,
                        item_style: ItemStyle {
                            color: palette::with_alpha(base, palette::BOX_FILL_ALPHA),
                            border_color: base.to_string(),
                        },
                    }
                })
                .collect();
            let mut series = vec![Series::Boxplot {
                name: y_name.clone(),
                data: boxes,
            }];
            if !outliers.is_empty() {
                series.push(Series::Scatter {
                    name: "Outliers".to_string(),
                    data: outliers
                        .iter()
                        .map(|o| [o.category as f64, o.value])
                        .collect(),
                    symbol_size: SCATTER_SYMBOL_SIZE,
                });
            }
            (
                item_tooltip(),
                None,
                Some(Axis::category(categories)),
                Some(Axis::value(y_name)),
                series,
            )
        }
    };

    PlotSpec {
        title,
        color,
        tooltip,
        legend,
        x_axis,
        y_axis,
        series,
        clickable,
    }
}

fn item_tooltip() -> Tooltip {
    Tooltip {
        trigger: TooltipTrigger::Item,
        axis_pointer: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    RowField,
    Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridColumn {
    pub name: String,
    pub role: ColumnRole,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub cells: Vec<Scalar>,
    pub is_total: bool,
}

/// Tabular rendering of a pivot result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotGrid {
    pub columns: Vec<GridColumn>,
    pub rows: Vec<GridRow>,
    pub row_count: usize,
}

/// Build the grid for a pivot result
///
/// The totals row is labelled "Total" in its first row-field cell when the
/// backend left that cell empty.
pub fn render_pivot(result: &PivotResult) -> PivotGrid {
    let columns = result
        .headers
        .iter()
        .enumerate()
        .map(|(i, name)| GridColumn {
            name: name.clone(),
            role: if i < result.row_fields {
                ColumnRole::RowField
            } else {
                ColumnRole::Value
            },
        })
        .collect();

    let rows = result
        .rows
        .iter()
        .map(|row| {
            let mut cells = row.cells.clone();
            if row.is_total && result.row_fields > 0 {
                if let Some(first) = cells.first_mut().filter(|c| c.is_null()) {
                    *first = Scalar::from("Total");
                }
            }
            GridRow {
                cells,
                is_total: row.is_total,
            }
        })
        .collect();

    PivotGrid {
        columns,
        rows,
        row_count: result.row_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::dispatcher::{Outlier, PieSlice, PivotRow};
    use serde_json::json;

    #[test]
    fn test_slot_cycle_keeps_prior_result_on_failure() {
        let mut slot: ResultSlot<u32> = ResultSlot::default();
        assert_eq!(slot.state(), RenderState::Idle);
        assert!(!slot.has_result());

        slot.begin();
        assert_eq!(slot.state(), RenderState::Loading);
        slot.display(QueryOutcome::Data(7));
        assert_eq!(slot.state(), RenderState::Displayed);

        slot.begin();
        slot.fail("cannot reach server");
        assert_eq!(slot.state(), RenderState::Failed);
        assert_eq!(slot.error(), Some("cannot reach server"));
        assert_eq!(slot.outcome(), Some(&QueryOutcome::Data(7)));

        slot.fail_and_clear("X required");
        assert!(!slot.has_result());

        slot.display(QueryOutcome::Empty);
        assert!(slot.has_result());
        slot.clear();
        assert_eq!(slot.state(), RenderState::Idle);
        assert!(!slot.has_result());
    }

    #[test]
    fn test_bar_spec() {
        let result = ChartResult::Series {
            kind: SeriesKind::Bar,
            labels: vec!["North".into(), "South".into()],
            values: vec![Some(100.0), Some(200.0)],
            y_name: "revenue".into(),
        };
        let spec = render_chart(&result, Some("revenue by region".into()));
        assert!(spec.clickable);
        assert_eq!(spec.color.len(), 8);
        assert_eq!(spec.tooltip.axis_pointer, Some(AxisPointer::Shadow));

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["xAxis"]["type"], "category");
        assert_eq!(value["xAxis"]["data"], json!(["North", "South"]));
        assert_eq!(value["yAxis"]["name"], "revenue");
        assert_eq!(value["series"][0]["type"], "bar");
        assert_eq!(value["title"], "revenue by region");
    }

    #[test]
    fn test_area_renders_as_filled_line() {
        let result = ChartResult::Series {
            kind: SeriesKind::Area,
            labels: vec!["2024".into()],
            values: vec![Some(1.0)],
            y_name: "count".into(),
        };
        let spec = render_chart(&result, None);
        assert!(!spec.clickable);
        assert_eq!(spec.tooltip.axis_pointer, Some(AxisPointer::Line));

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["series"][0]["type"], "line");
        assert_eq!(value["series"][0]["areaStyle"]["opacity"], 0.15);
        assert!(value.get("title").is_none());
    }

    #[test]
    fn test_pie_spec() {
        let result = ChartResult::Pie {
            slices: vec![PieSlice {
                name: "North".into(),
                value: 3.0,
            }],
        };
        let spec = render_chart(&result, None);
        assert!(spec.clickable);
        assert_eq!(spec.tooltip.trigger, TooltipTrigger::Item);
        assert!(spec.x_axis.is_none());

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["legend"]["type"], "scroll");
        assert_eq!(value["series"][0]["radius"], json!(["35%", "65%"]));
        assert_eq!(value["series"][0]["data"][0]["name"], "North");
    }

    #[test]
    fn test_scatter_spec() {
        let result = ChartResult::Scatter {
            points: vec![[1.0, 2.0]],
            x_name: "revenue".into(),
            y_name: "cost".into(),
        };
        let spec = render_chart(&result, None);
        assert!(!spec.clickable);
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["xAxis"]["type"], "value");
        assert_eq!(value["xAxis"]["name"], "revenue");
        assert_eq!(value["series"][0]["symbolSize"], 8);
    }

    #[test]
    fn test_boxplot_spec_with_outliers() {
        let result = ChartResult::Boxplot {
            categories: vec!["North".into(), "South".into()],
            stats: vec![[1.0, 2.0, 3.0, 4.0, 5.0], [2.0, 3.0, 4.0, 5.0, 6.0]],
            outliers: vec![Outlier {
                category: 1,
                value: 40.0,
            }],
            y_name: "revenue".into(),
        };
        let spec = render_chart(&result, None);
        assert_eq!(spec.series.len(), 2);
        match &spec.series[0] {
            Series::Boxplot { data, .. } => {
                assert_eq!(data[0].item_style.color, "#5470c630");
                assert_eq!(data[1].item_style.border_color, "#91cc75");
            }
            other => panic!("unexpected series {:?}", other),
        }
        match &spec.series[1] {
            Series::Scatter { name, data, .. } => {
                assert_eq!(name, "Outliers");
                assert_eq!(data, &vec![[1.0, 40.0]]);
            }
            other => panic!("unexpected series {:?}", other),
        }
    }

    #[test]
    fn test_pivot_grid_totals_row() {
        let result = PivotResult {
            headers: vec!["region".into(), "revenue".into()],
            rows: vec![
                PivotRow {
                    cells: vec!["North".into(), 100.0.into()],
                    is_total: false,
                },
                PivotRow {
                    cells: vec!["South".into(), 200.0.into()],
                    is_total: false,
                },
                PivotRow {
                    cells: vec![Scalar::Null, 300.0.into()],
                    is_total: true,
                },
            ],
            row_count: 2,
            row_fields: 1,
        };

        let grid = render_pivot(&result);
        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.row_count, 2);
        assert_eq!(grid.columns[0].role, ColumnRole::RowField);
        assert_eq!(grid.columns[1].role, ColumnRole::Value);

        let totals = &grid.rows[2];
        assert!(totals.is_total);
        assert_eq!(totals.cells[0], Scalar::from("Total"));
        assert_eq!(totals.cells[1], Scalar::Number(300.0));
        assert!(!grid.rows[0].is_total);
    }
}
