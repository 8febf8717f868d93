//! Manual chart builder: one chart from user-picked columns.

use crate::chart::{ChartKind, ChartSpec};
use crate::error::{Error, Result};
use crate::types::{ColumnKind, Table};

/// A user request for a single chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualChart {
    pub kind: ChartKind,
    pub x: String,
    pub y: Vec<String>,
    pub color: Option<String>,
    pub title: Option<String>,
}

impl ManualChart {
    /// Create a request for `kind` over `x` and the given y columns.
    pub fn new(kind: ChartKind, x: impl Into<String>, y: Vec<String>) -> Self {
        Self {
            kind,
            x: x.into(),
            y,
            color: None,
            title: None,
        }
    }

    /// Split series by the values of this column.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Set the chart title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Validate the request against a table and produce a chart spec.
    pub fn build(&self, table: &Table) -> Result<ChartSpec> {
        if !ChartKind::MANUAL.contains(&self.kind) {
            return Err(Error::InvalidChart(format!(
                "{} is not available in the manual builder",
                self.kind.label()
            )));
        }
        if self.y.is_empty() {
            return Err(Error::InvalidChart(
                "select at least one Y-axis column".to_string(),
            ));
        }

        table.require_column(&self.x)?;
        for name in &self.y {
            let column = table.require_column(name)?;
            if column.kind != ColumnKind::Numeric {
                return Err(Error::InvalidChart(format!(
                    "Y-axis column '{}' is not numeric",
                    name
                )));
            }
        }

        let mut y = self.y.clone();
        if self.kind.single_series() && y.len() > 1 {
            log::warn!(
                "{} draws one series; ignoring {:?}",
                self.kind.label(),
                &y[1..]
            );
            y.truncate(1);
        }

        let color = match &self.color {
            Some(name) if self.kind.supports_color() => {
                table.require_column(name)?;
                Some(name.clone())
            }
            Some(name) => {
                log::debug!(
                    "{} does not use a color column; ignoring '{}'",
                    self.kind.label(),
                    name
                );
                None
            }
            None => None,
        };

        Ok(ChartSpec {
            kind: self.kind,
            x: Some(self.x.clone()),
            y,
            color,
            title: self.title.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue::{Number, Text};

    fn table() -> Table {
        Table::from_columns(
            "test",
            vec![
                ("Month".to_string(), vec![Text("Jan".into()), Text("Feb".into())]),
                ("Sales".to_string(), vec![Number(1.0), Number(2.0)]),
                ("Cost".to_string(), vec![Number(3.0), Number(4.0)]),
            ],
        )
    }

    #[test]
    fn test_build_line_chart() {
        let spec = ManualChart::new(ChartKind::Line, "Month", vec!["Sales".into(), "Cost".into()])
            .with_color("Month")
            .build(&table())
            .unwrap();

        assert_eq!(spec.kind, ChartKind::Line);
        assert_eq!(spec.x.as_deref(), Some("Month"));
        assert_eq!(spec.y, vec!["Sales".to_string(), "Cost".to_string()]);
        assert_eq!(spec.color.as_deref(), Some("Month"));
        assert_eq!(spec.display_title(), "No Title");
    }

    #[test]
    fn test_single_series_kinds_drop_extra_columns() {
        let spec = ManualChart::new(ChartKind::Pie, "Month", vec!["Sales".into(), "Cost".into()])
            .with_color("Month")
            .with_title("Share")
            .build(&table())
            .unwrap();

        assert_eq!(spec.y, vec!["Sales".to_string()]);
        assert_eq!(spec.color, None);
        assert_eq!(spec.title.as_deref(), Some("Share"));
    }

    #[test]
    fn test_validation_errors() {
        let table = table();
        assert!(matches!(
            ManualChart::new(ChartKind::Bar, "Month", Vec::new()).build(&table),
            Err(Error::InvalidChart(_))
        ));
        assert!(matches!(
            ManualChart::new(ChartKind::Bar, "Nope", vec!["Sales".into()]).build(&table),
            Err(Error::ColumnNotFound(_))
        ));
        assert!(matches!(
            ManualChart::new(ChartKind::Bar, "Sales", vec!["Month".into()]).build(&table),
            Err(Error::InvalidChart(_))
        ));
        assert!(matches!(
            ManualChart::new(ChartKind::Histogram, "Sales", vec!["Cost".into()]).build(&table),
            Err(Error::InvalidChart(_))
        ));
        assert!(matches!(
            ManualChart::new(ChartKind::Bar, "Month", vec!["Sales".into()])
                .with_color("Nope")
                .build(&table),
            Err(Error::ColumnNotFound(_))
        ));
    }
}
