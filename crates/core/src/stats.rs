//! Histogram binning and Pearson correlation.

use serde::{Deserialize, Serialize};

/// Upper bound on automatically chosen histogram bins.
const MAX_BINS: usize = 50;

/// One histogram bin covering `[start, end)` (the last bin is closed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl HistogramBin {
    /// Range label such as `[10, 20)`.
    pub fn label(&self) -> String {
        format!(
            "[{}, {})",
            crate::types::format_number(round_to(self.start, 4)),
            crate::types::format_number(round_to(self.end, 4))
        )
    }
}

/// Bin values into equal-width bins (Sturges' rule).
///
/// Non-finite values are ignored. Returns no bins for no values.
pub fn histogram(values: &[f64]) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        return vec![HistogramBin {
            start: min - 0.5,
            end: max + 0.5,
            count: finite.len(),
        }];
    }

    let bin_count = sturges_bins(finite.len());
    let width = (max - min) / bin_count as f64;
    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bin_count {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for value in finite {
        let index = (((value - min) / width) as usize).min(bin_count - 1);
        bins[index].count += 1;
    }

    bins
}

fn sturges_bins(n: usize) -> usize {
    let bins = (n as f64).log2().ceil() as usize + 1;
    bins.clamp(1, MAX_BINS)
}

/// Square matrix of pairwise Pearson coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Column names, in row/column order.
    pub columns: Vec<String>,

    /// `values[i][j]` is the coefficient of columns `i` and `j`; NaN when undefined.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Compute the matrix over pairwise-complete observations.
    ///
    /// `data[i]` holds column `i`'s cells in row order, `None` for missing.
    pub fn compute(columns: Vec<String>, data: &[Vec<Option<f64>>]) -> Self {
        let n = data.len();
        let mut values = vec![vec![f64::NAN; n]; n];

        for i in 0..n {
            for j in i..n {
                let r = pearson(&data[i], &data[j]);
                values[i][j] = r;
                values[j][i] = r;
            }
        }

        Self { columns, values }
    }

    /// Coefficient for a pair of column indexes.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values
            .get(i)
            .and_then(|row| row.get(j))
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the matrix has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Pearson coefficient over rows where both values are present.
///
/// NaN if fewer than two pairs remain or either side has zero variance.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let count = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / count;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / count;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }

    if variance_x == 0.0 || variance_y == 0.0 {
        return f64::NAN;
    }

    (covariance / (variance_x.sqrt() * variance_y.sqrt())).clamp(-1.0, 1.0)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pearson_perfect() {
        let a = vec![Some(1.0), Some(2.0), Some(3.0)];
        let b = vec![Some(2.0), Some(4.0), Some(6.0)];
        let c = vec![Some(3.0), Some(2.0), Some(1.0)];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &c) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_pairwise_complete() {
        let a = vec![Some(1.0), None, Some(2.0), Some(3.0)];
        let b = vec![Some(1.0), Some(100.0), Some(2.0), Some(3.0)];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_undefined() {
        assert!(pearson(&[Some(1.0)], &[Some(2.0)]).is_nan());
        assert!(pearson(&[Some(1.0), Some(1.0)], &[Some(2.0), Some(3.0)]).is_nan());
    }

    #[test]
    fn test_correlation_matrix_is_symmetric() {
        let data = vec![
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            vec![Some(2.0), Some(1.0), Some(4.0), Some(3.0)],
        ];
        let matrix = CorrelationMatrix::compute(vec!["A".into(), "B".into()], &data);

        assert_eq!(matrix.len(), 2);
        assert!((matrix.get(0, 0) - 1.0).abs() < 1e-12);
        assert_eq!(matrix.get(0, 1), matrix.get(1, 0));
        assert!((matrix.get(0, 1) - 0.6).abs() < 1e-12);
        assert!(matrix.get(5, 0).is_nan());
    }

    #[test]
    fn test_histogram_bins() {
        let values: Vec<f64> = (0..8).map(|v| v as f64).collect();
        let bins = histogram(&values);

        // ceil(log2(8)) + 1 = 4 bins of width 1.75
        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0].start, 0.0);
        assert_eq!(bins[3].end, 7.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 8);
        // max lands in the closed last bin
        assert_eq!(bins[3].count, 2);
    }

    #[test]
    fn test_histogram_constant_and_empty() {
        let bins = histogram(&[5.0, 5.0, f64::NAN]);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[0].label(), "[4.5, 5.5)");

        assert!(histogram(&[]).is_empty());
    }
}
