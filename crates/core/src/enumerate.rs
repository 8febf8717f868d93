//! Automatic chart selection.
//!
//! Produces every "reasonable" chart for a table from its column kinds:
//! categorical × numeric bars, one histogram per numeric column, scatter
//! plots for each numeric pair and a correlation matrix last.
//!
//! Enumeration is uncapped unless a cap is set with
//! [`ChartEnumerator::with_max_charts`]. A capped run keeps the correlation
//! matrix as its last spec.

use crate::chart::ChartSpec;
use crate::types::Table;

/// Suggested cap for front ends that opt into one.
pub const DEFAULT_MAX_CHARTS: usize = 200;

/// Enumerates chart specs for a table.
#[derive(Debug, Clone)]
pub struct ChartEnumerator {
    /// Maximum number of specs to return; 0 means unlimited.
    max_charts: usize,
}

impl ChartEnumerator {
    /// Create an uncapped enumerator.
    pub fn new() -> Self {
        Self { max_charts: 0 }
    }

    /// Set the chart cap. 0 disables it.
    pub fn with_max_charts(mut self, max_charts: usize) -> Self {
        self.max_charts = max_charts;
        self
    }

    /// Number of specs a full enumeration of `table` yields, before capping.
    pub fn count(&self, table: &Table) -> usize {
        let numeric = table.numeric_columns().len();
        let categorical = table.categorical_columns().len();
        let pairs = numeric * numeric.saturating_sub(1) / 2;
        let correlation = usize::from(numeric > 1);
        categorical * numeric + numeric + pairs + correlation
    }

    /// Enumerate chart specs in a fixed order.
    ///
    /// Empty when the table has no numeric column.
    pub fn enumerate(&self, table: &Table) -> Vec<ChartSpec> {
        let numeric: Vec<&str> = table
            .numeric_columns()
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        let categorical: Vec<&str> = table
            .categorical_columns()
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();

        let total = self.count(table);
        let limit = if self.max_charts == 0 {
            total
        } else {
            total.min(self.max_charts)
        };
        if limit < total {
            log::warn!(
                "Table '{}' yields {} charts; keeping the first {}",
                table.source,
                total,
                limit
            );
        }

        let bars = categorical
            .iter()
            .flat_map(|cat| numeric.iter().map(move |num| ChartSpec::bar(cat, num)));
        let histograms = numeric.iter().map(|num| ChartSpec::histogram(num));
        let scatters = numeric.iter().enumerate().flat_map(|(i, a)| {
            numeric[i + 1..]
                .iter()
                .map(move |b| ChartSpec::scatter(a, b))
        });
        let correlation = (numeric.len() > 1).then(|| ChartSpec::correlation_matrix(&numeric));

        // A cap cuts the charts before the correlation matrix, never the matrix.
        let kept = limit - usize::from(correlation.is_some());
        let charts: Vec<ChartSpec> = bars
            .chain(histograms)
            .chain(scatters)
            .take(kept)
            .chain(correlation)
            .collect();

        log::debug!(
            "Enumerated {} charts ({} numeric, {} categorical columns)",
            charts.len(),
            numeric.len(),
            categorical.len()
        );

        charts
    }
}

impl Default for ChartEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Enumerate every chart for a table, uncapped.
pub fn enumerate(table: &Table) -> Vec<ChartSpec> {
    ChartEnumerator::new().enumerate(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;
    use crate::types::CellValue::{self, Bool, Number, Text};

    fn titles(charts: &[ChartSpec]) -> Vec<&str> {
        charts.iter().map(|c| c.display_title()).collect()
    }

    fn numbers(values: &[f64]) -> Vec<CellValue> {
        values.iter().map(|v| Number(*v)).collect()
    }

    #[test]
    fn test_one_categorical_one_numeric() {
        let table = Table::from_columns(
            "sales",
            vec![
                ("Product".to_string(), vec![Text("A".into()), Text("B".into())]),
                ("Sales".to_string(), numbers(&[100.0, 200.0])),
            ],
        );
        let charts = enumerate(&table);

        assert_eq!(titles(&charts), vec!["Product vs Sales", "Histogram of Sales"]);
        assert_eq!(charts[0].kind, ChartKind::Bar);
        assert_eq!(charts[1].kind, ChartKind::Histogram);
    }

    #[test]
    fn test_two_numeric_columns() {
        let table = Table::from_columns(
            "nums",
            vec![
                ("A".to_string(), numbers(&[1.0, 2.0])),
                ("B".to_string(), numbers(&[3.0, 5.0])),
            ],
        );
        let charts = enumerate(&table);
        let kinds: Vec<ChartKind> = charts.iter().map(|c| c.kind).collect();

        assert_eq!(
            kinds,
            vec![
                ChartKind::Histogram,
                ChartKind::Histogram,
                ChartKind::Scatter,
                ChartKind::CorrelationMatrix
            ]
        );
        assert_eq!(charts[2].display_title(), "A vs B");
        assert_eq!(charts[3].y, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_full_order() {
        let table = Table::from_columns(
            "mixed",
            vec![
                ("Region".to_string(), vec![Text("N".into())]),
                ("A".to_string(), numbers(&[1.0])),
                ("Flag".to_string(), vec![Bool(true)]),
                ("Store".to_string(), vec![Text("S1".into())]),
                ("B".to_string(), numbers(&[2.0])),
                ("C".to_string(), numbers(&[3.0])),
            ],
        );
        let charts = enumerate(&table);

        assert_eq!(
            titles(&charts),
            vec![
                "Region vs A",
                "Region vs B",
                "Region vs C",
                "Store vs A",
                "Store vs B",
                "Store vs C",
                "Histogram of A",
                "Histogram of B",
                "Histogram of C",
                "A vs B",
                "A vs C",
                "B vs C",
                "Correlation Matrix",
            ]
        );
        assert_eq!(ChartEnumerator::new().count(&table), charts.len());
    }

    #[test]
    fn test_no_numeric_columns() {
        let table = Table::from_columns(
            "text",
            vec![("Name".to_string(), vec![Text("x".into())])],
        );
        assert!(enumerate(&table).is_empty());

        let empty = Table::from_columns("empty", Vec::new());
        assert!(enumerate(&empty).is_empty());
    }

    #[test]
    fn test_enumeration_is_idempotent() {
        let table = Table::from_columns(
            "nums",
            vec![
                ("A".to_string(), numbers(&[1.0, 2.0, 3.0])),
                ("B".to_string(), numbers(&[3.0, 1.0, 2.0])),
                ("C".to_string(), numbers(&[0.0, 0.0, 1.0])),
            ],
        );
        assert_eq!(enumerate(&table), enumerate(&table));
    }

    #[test]
    fn test_max_charts_truncates_in_order() {
        let columns = (0..30)
            .map(|i| (format!("N{}", i), numbers(&[i as f64])))
            .collect();
        let table = Table::from_columns("wide", columns);
        let enumerator = ChartEnumerator::new().with_max_charts(10);

        let charts = enumerator.enumerate(&table);
        assert_eq!(charts.len(), 10);
        assert_eq!(charts[0].display_title(), "Histogram of N0");
        assert_eq!(charts[8].display_title(), "Histogram of N8");
        assert_eq!(charts[9].kind, ChartKind::CorrelationMatrix);
        assert_eq!(charts[9].y.len(), 30);

        let all = ChartEnumerator::new().with_max_charts(0).enumerate(&table);
        assert_eq!(all.len(), 30 + 435 + 1);
        assert_eq!(&all[..9], &charts[..9]);
    }

    #[test]
    fn test_cap_of_one_keeps_correlation() {
        let table = Table::from_columns(
            "nums",
            vec![
                ("A".to_string(), numbers(&[1.0, 2.0])),
                ("B".to_string(), numbers(&[3.0, 5.0])),
            ],
        );
        let charts = ChartEnumerator::new().with_max_charts(1).enumerate(&table);
        assert_eq!(titles(&charts), vec!["Correlation Matrix"]);

        let single = Table::from_columns("one", vec![("A".to_string(), numbers(&[1.0]))]);
        let charts = ChartEnumerator::new().with_max_charts(1).enumerate(&single);
        assert_eq!(titles(&charts), vec!["Histogram of A"]);
    }

    #[test]
    fn test_wide_table_is_not_capped_by_default() {
        let columns = (0..20)
            .map(|i| (format!("N{}", i), numbers(&[i as f64, 1.0])))
            .collect();
        let table = Table::from_columns("wide", columns);

        let charts = enumerate(&table);
        assert_eq!(charts.len(), 20 + 190 + 1);
        assert_eq!(charts[209].display_title(), "N18 vs N19");
        assert_eq!(
            charts.last().map(|c| c.display_title()),
            Some("Correlation Matrix")
        );
        assert_eq!(ChartEnumerator::default().enumerate(&table), charts);
    }
}
