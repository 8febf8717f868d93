//! Declarative chart descriptions.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Characters that may not appear in generated file names.
static FILE_NAME_UNSAFE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-]+").unwrap());

/// Every kind of chart the tool can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Histogram,
    Scatter,
    CorrelationMatrix,
    Line,
    Area,
    Pie,
    Donut,
    Bubble,
    Radar,
    Mixed,
    Funnel,
}

impl ChartKind {
    /// Kinds offered by the manual chart builder, in menu order.
    pub const MANUAL: [ChartKind; 10] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Scatter,
        ChartKind::Pie,
        ChartKind::Donut,
        ChartKind::Bubble,
        ChartKind::Area,
        ChartKind::Radar,
        ChartKind::Mixed,
        ChartKind::Funnel,
    ];

    /// Human-readable name, e.g. "Bar Chart".
    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar Chart",
            ChartKind::Histogram => "Histogram",
            ChartKind::Scatter => "Scatter Plot",
            ChartKind::CorrelationMatrix => "Correlation Matrix",
            ChartKind::Line => "Line Chart",
            ChartKind::Area => "Area Chart",
            ChartKind::Pie => "Pie Chart",
            ChartKind::Donut => "Donut Chart",
            ChartKind::Bubble => "Bubble Chart",
            ChartKind::Radar => "Radar Chart",
            ChartKind::Mixed => "Mixed Chart",
            ChartKind::Funnel => "Funnel Chart",
        }
    }

    /// Whether a color column splits this kind into several series.
    pub fn supports_color(&self) -> bool {
        matches!(
            self,
            ChartKind::Bar
                | ChartKind::Line
                | ChartKind::Scatter
                | ChartKind::Bubble
                | ChartKind::Area
        )
    }

    /// Whether this kind draws a single value series only.
    pub fn single_series(&self) -> bool {
        matches!(
            self,
            ChartKind::Pie | ChartKind::Donut | ChartKind::Radar | ChartKind::Funnel
        )
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    /// Accepts `bar`, `bar-chart`, `Bar Chart`, `scatter_plot`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == '_' { ' ' } else { c })
            .collect();
        let key = key.split_whitespace().collect::<Vec<_>>().join(" ");
        let key = key
            .strip_suffix(" chart")
            .or_else(|| key.strip_suffix(" plot"))
            .unwrap_or(&key);

        match key {
            "bar" => Ok(ChartKind::Bar),
            "histogram" => Ok(ChartKind::Histogram),
            "scatter" => Ok(ChartKind::Scatter),
            "correlation matrix" | "correlation" | "heatmap" => Ok(ChartKind::CorrelationMatrix),
            "line" => Ok(ChartKind::Line),
            "area" => Ok(ChartKind::Area),
            "pie" => Ok(ChartKind::Pie),
            "donut" | "doughnut" => Ok(ChartKind::Donut),
            "bubble" => Ok(ChartKind::Bubble),
            "radar" => Ok(ChartKind::Radar),
            "mixed" => Ok(ChartKind::Mixed),
            "funnel" => Ok(ChartKind::Funnel),
            _ => Err(format!("unknown chart kind '{}'", s)),
        }
    }
}

/// A declarative description of one chart.
///
/// For [`ChartKind::CorrelationMatrix`] `x` is `None` and `y` lists every
/// column in the matrix. For [`ChartKind::Histogram`] `x` is the binned column
/// and `y` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub y: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ChartSpec {
    /// Bar chart of a numeric column broken down by a categorical one.
    pub fn bar(category: &str, value: &str) -> Self {
        Self {
            kind: ChartKind::Bar,
            x: Some(category.to_string()),
            y: vec![value.to_string()],
            color: None,
            title: Some(format!("{} vs {}", category, value)),
        }
    }

    /// Distribution of one numeric column.
    pub fn histogram(column: &str) -> Self {
        Self {
            kind: ChartKind::Histogram,
            x: Some(column.to_string()),
            y: Vec::new(),
            color: None,
            title: Some(format!("Histogram of {}", column)),
        }
    }

    /// Scatter plot of two numeric columns.
    pub fn scatter(x: &str, y: &str) -> Self {
        Self {
            kind: ChartKind::Scatter,
            x: Some(x.to_string()),
            y: vec![y.to_string()],
            color: None,
            title: Some(format!("{} vs {}", x, y)),
        }
    }

    /// Pairwise correlation heatmap over the given columns.
    pub fn correlation_matrix<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            kind: ChartKind::CorrelationMatrix,
            x: None,
            y: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            color: None,
            title: Some("Correlation Matrix".to_string()),
        }
    }

    /// Every column the chart reads, x first.
    pub fn columns(&self) -> Vec<&str> {
        self.x
            .iter()
            .chain(self.y.iter())
            .chain(self.color.iter())
            .map(String::as_str)
            .collect()
    }

    /// Title as shown on slides.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => "No Title",
        }
    }

    /// File name for a PNG download of this chart, e.g. `Region_Sales_chart.png`.
    pub fn png_file_name(&self) -> String {
        let stem = match (self.kind, &self.x) {
            (ChartKind::CorrelationMatrix, _) | (_, None) => {
                self.kind.label().replace(' ', "_").to_lowercase()
            }
            (_, Some(x)) => std::iter::once(x.as_str())
                .chain(self.y.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join("_"),
        };
        format!("{}_chart.png", sanitize_file_component(&stem))
    }
}

/// Replace characters that are unsafe in file names with `_`.
pub fn sanitize_file_component(text: &str) -> String {
    let cleaned = FILE_NAME_UNSAFE_REGEX.replace_all(text.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "chart".to_string()
    } else {
        cleaned.to_string()
    }
}
