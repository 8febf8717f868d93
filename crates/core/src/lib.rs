//! Core table model, chart enumeration and chart data for turning
//! spreadsheets into chart decks.

pub mod chart;
pub mod data;
pub mod enumerate;
pub mod error;
pub mod manual;
pub mod numfmt;
pub mod render;
pub mod stats;
pub mod types;

pub use chart::{ChartKind, ChartSpec};
pub use data::{ChartData, Series, Values, XValue};
pub use enumerate::{enumerate, ChartEnumerator};
pub use error::{Error, Result};
pub use manual::ManualChart;
pub use numfmt::DateStyles;
pub use render::{render_charts, ChartRenderer, RenderedChart};
pub use stats::{CorrelationMatrix, HistogramBin};
pub use types::{CellGrid, CellValue, Column, ColumnKind, SpreadsheetFormat, Table};
