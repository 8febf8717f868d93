//! Materialize a [`ChartSpec`] against a [`Table`] into plottable data.

use crate::chart::{ChartKind, ChartSpec};
use crate::error::{Error, Result};
use crate::stats::{self, CorrelationMatrix, HistogramBin};
use crate::types::{CellValue, Column, ColumnKind, Table};
use serde::{Deserialize, Serialize};

/// Maximum number of data rows in a preview table.
pub const PREVIEW_ROWS: usize = 5;

/// An x-axis position: either a number or a category label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum XValue {
    Number(f64),
    Label(String),
}

impl XValue {
    /// Text shown in labels and preview tables.
    pub fn display(&self) -> String {
        match self {
            XValue::Number(value) => crate::types::format_number(*value),
            XValue::Label(label) => label.clone(),
        }
    }
}

/// One named sequence of `(x, y)` points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<(XValue, f64)>,
}

impl Series {
    /// Whether every x value is numeric.
    pub fn has_numeric_x(&self) -> bool {
        self.points
            .iter()
            .all(|(x, _)| matches!(x, XValue::Number(_)))
    }
}

/// Plottable values for one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Values {
    Series { series: Vec<Series> },
    Histogram { bins: Vec<HistogramBin> },
    Correlation { matrix: CorrelationMatrix },
}

/// Chart values plus axis titles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub x_title: Option<String>,
    pub y_title: Option<String>,
    pub values: Values,
}

impl ChartData {
    /// Resolve a spec against a table.
    ///
    /// Fails when a referenced column is missing or has the wrong kind.
    pub fn resolve(spec: &ChartSpec, table: &Table) -> Result<Self> {
        match spec.kind {
            ChartKind::Histogram => resolve_histogram(spec, table),
            ChartKind::CorrelationMatrix => resolve_correlation(spec, table),
            _ => resolve_series(spec, table),
        }
    }

    /// Header row for a preview table, defaulting to `X` / `Y`.
    pub fn preview_header(&self) -> (String, String) {
        (
            self.x_title.clone().unwrap_or_else(|| "X".to_string()),
            self.y_title.clone().unwrap_or_else(|| "Y".to_string()),
        )
    }

    /// Up to [`PREVIEW_ROWS`] two-column rows summarizing the data.
    pub fn preview_rows(&self) -> Vec<(String, String)> {
        match &self.values {
            Values::Series { series } => series
                .first()
                .map(|s| {
                    s.points
                        .iter()
                        .take(PREVIEW_ROWS)
                        .map(|(x, y)| (x.display(), crate::types::format_number(*y)))
                        .collect()
                })
                .unwrap_or_default(),
            Values::Histogram { bins } => bins
                .iter()
                .take(PREVIEW_ROWS)
                .map(|bin| (bin.label(), bin.count.to_string()))
                .collect(),
            Values::Correlation { matrix } => {
                let mut rows = Vec::new();
                'pairs: for i in 0..matrix.len() {
                    for j in (i + 1)..matrix.len() {
                        if rows.len() == PREVIEW_ROWS {
                            break 'pairs;
                        }
                        rows.push((
                            format!("{} / {}", matrix.columns[i], matrix.columns[j]),
                            format_coefficient(matrix.get(i, j)),
                        ));
                    }
                }
                rows
            }
        }
    }

    /// Whether there is anything to draw.
    pub fn is_empty(&self) -> bool {
        match &self.values {
            Values::Series { series } => series.iter().all(|s| s.points.is_empty()),
            Values::Histogram { bins } => bins.is_empty(),
            Values::Correlation { matrix } => matrix.is_empty(),
        }
    }
}

/// Two-decimal coefficient, `nan` when undefined.
pub fn format_coefficient(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.2}", value)
    }
}

fn require_x<'a>(spec: &ChartSpec, table: &'a Table) -> Result<&'a Column> {
    let name = spec.x.as_deref().ok_or_else(|| {
        Error::InvalidChart(format!("{} needs an X-axis column", spec.kind.label()))
    })?;
    table.require_column(name)
}

fn require_numeric<'a>(table: &'a Table, name: &str) -> Result<&'a Column> {
    let column = table.require_column(name)?;
    if column.kind != ColumnKind::Numeric {
        return Err(Error::InvalidChart(format!(
            "column '{}' is {}, expected numeric",
            name,
            column.kind.as_str()
        )));
    }
    Ok(column)
}

fn resolve_histogram(spec: &ChartSpec, table: &Table) -> Result<ChartData> {
    let column = require_x(spec, table)?;
    let column = require_numeric(table, &column.name)?;
    let values: Vec<f64> = column.numbers().flatten().collect();

    Ok(ChartData {
        x_title: Some(column.name.clone()),
        y_title: Some("count".to_string()),
        values: Values::Histogram {
            bins: stats::histogram(&values),
        },
    })
}

fn resolve_correlation(spec: &ChartSpec, table: &Table) -> Result<ChartData> {
    if spec.y.len() < 2 {
        return Err(Error::InvalidChart(
            "correlation matrix needs at least two numeric columns".to_string(),
        ));
    }

    let mut data = Vec::with_capacity(spec.y.len());
    for name in &spec.y {
        let column = require_numeric(table, name)?;
        data.push(column.numbers().collect::<Vec<_>>());
    }

    Ok(ChartData {
        x_title: None,
        y_title: None,
        values: Values::Correlation {
            matrix: CorrelationMatrix::compute(spec.y.clone(), &data),
        },
    })
}

fn resolve_series(spec: &ChartSpec, table: &Table) -> Result<ChartData> {
    let x = require_x(spec, table)?;
    let y_names: &[String] = if spec.kind.single_series() {
        &spec.y[..spec.y.len().min(1)]
    } else {
        &spec.y
    };
    if y_names.is_empty() {
        return Err(Error::InvalidChart(format!(
            "{} needs at least one Y-axis column",
            spec.kind.label()
        )));
    }

    let color = match spec.color.as_deref() {
        Some(name) if spec.kind.supports_color() => Some(table.require_column(name)?),
        _ => None,
    };

    let mut series = Vec::new();
    for name in y_names {
        let y = require_numeric(table, name)?;
        match color {
            Some(color) => {
                for group in distinct_labels(color) {
                    let points = collect_points(x, y, |row| color.values[row].display() == group);
                    let label = if y_names.len() > 1 {
                        format!("{}, {}", name, group)
                    } else {
                        group
                    };
                    series.push(Series {
                        name: label,
                        points,
                    });
                }
            }
            None => series.push(Series {
                name: name.clone(),
                points: collect_points(x, y, |_| true),
            }),
        }
    }

    Ok(ChartData {
        x_title: Some(x.name.clone()),
        y_title: y_names.first().cloned(),
        values: Values::Series { series },
    })
}

fn collect_points<F>(x: &Column, y: &Column, keep: F) -> Vec<(XValue, f64)>
where
    F: Fn(usize) -> bool,
{
    x.values
        .iter()
        .zip(y.values.iter())
        .enumerate()
        .filter(|(row, _)| keep(*row))
        .filter_map(|(_, (x, y))| {
            let y = y.as_number()?;
            let x = match x {
                CellValue::Number(value) => XValue::Number(*value),
                other if other.is_empty() => return None,
                other => XValue::Label(other.display()),
            };
            Some((x, y))
        })
        .collect()
}

/// Distinct non-empty display values of a column, in first-seen order.
fn distinct_labels(column: &Column) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for value in &column.values {
        if value.is_empty() {
            continue;
        }
        let label = value.display();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue::{Empty, Number, Text};

    fn sales_table() -> Table {
        Table::from_columns(
            "test",
            vec![
                (
                    "Region".to_string(),
                    vec![
                        Text("North".into()),
                        Text("South".into()),
                        Text("North".into()),
                        Empty,
                    ],
                ),
                (
                    "Sales".to_string(),
                    vec![Number(10.0), Number(20.0), Empty, Number(40.0)],
                ),
                (
                    "Cost".to_string(),
                    vec![Number(1.0), Number(2.0), Number(3.0), Number(4.0)],
                ),
            ],
        )
    }

    #[test]
    fn test_bar_series_skips_missing_values() {
        let data = ChartData::resolve(&ChartSpec::bar("Region", "Sales"), &sales_table()).unwrap();

        assert_eq!(data.x_title.as_deref(), Some("Region"));
        assert_eq!(data.y_title.as_deref(), Some("Sales"));
        match &data.values {
            Values::Series { series } => {
                assert_eq!(series.len(), 1);
                assert_eq!(
                    series[0].points,
                    vec![
                        (XValue::Label("North".into()), 10.0),
                        (XValue::Label("South".into()), 20.0)
                    ]
                );
            }
            other => panic!("unexpected values: {:?}", other),
        }
    }

    #[test]
    fn test_color_splits_series() {
        let spec = ChartSpec {
            kind: ChartKind::Scatter,
            x: Some("Cost".into()),
            y: vec!["Sales".into()],
            color: Some("Region".into()),
            title: None,
        };
        let data = ChartData::resolve(&spec, &sales_table()).unwrap();

        match &data.values {
            Values::Series { series } => {
                let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
                assert_eq!(names, vec!["North", "South"]);
                assert_eq!(series[0].points.len(), 1);
                assert!(series[0].has_numeric_x());
            }
            other => panic!("unexpected values: {:?}", other),
        }
    }

    #[test]
    fn test_histogram_and_preview() {
        let data = ChartData::resolve(&ChartSpec::histogram("Cost"), &sales_table()).unwrap();
        assert_eq!(data.preview_header(), ("Cost".to_string(), "count".to_string()));
        let rows = data.preview_rows();
        assert!(!rows.is_empty());
        assert!(rows.len() <= PREVIEW_ROWS);
    }

    #[test]
    fn test_correlation_preview_uses_default_header() {
        let spec = ChartSpec::correlation_matrix(&["Sales", "Cost"]);
        let data = ChartData::resolve(&spec, &sales_table()).unwrap();

        assert_eq!(data.preview_header(), ("X".to_string(), "Y".to_string()));
        assert_eq!(
            data.preview_rows(),
            vec![("Sales / Cost".to_string(), "1.00".to_string())]
        );
    }

    #[test]
    fn test_preview_is_capped() {
        let values: Vec<CellValue> = (0..20).map(|v| Number(v as f64)).collect();
        let table = Table::from_columns(
            "wide",
            vec![("A".to_string(), values.clone()), ("B".to_string(), values)],
        );
        let data = ChartData::resolve(&ChartSpec::scatter("A", "B"), &table).unwrap();
        assert_eq!(data.preview_rows().len(), PREVIEW_ROWS);
        assert_eq!(data.preview_rows()[0], ("0".to_string(), "0".to_string()));
    }

    #[test]
    fn test_resolve_errors() {
        let table = sales_table();
        assert!(matches!(
            ChartData::resolve(&ChartSpec::histogram("Missing"), &table),
            Err(Error::ColumnNotFound(_))
        ));
        assert!(matches!(
            ChartData::resolve(&ChartSpec::histogram("Region"), &table),
            Err(Error::InvalidChart(_))
        ));
        assert!(matches!(
            ChartData::resolve(&ChartSpec::correlation_matrix(&["Sales"]), &table),
            Err(Error::InvalidChart(_))
        ));
    }
}
