//! Export settings: output naming, caption and slide size.

use chartdeck_core::chart::sanitize_file_component;
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};

/// Default file name prefix.
pub const DEFAULT_PREFIX: &str = "Chart_Deck";

/// Default deck label.
pub const DEFAULT_LABEL: &str = "Chart_Analysis";

/// Default caption placed on every slide.
pub const DEFAULT_CAPTION: &str = "Interactive chart available in the app or as a PNG download.\n\
     Use the chart image or the data preview to recreate this chart in PowerPoint.";

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// Timestamp format for unique output names, down to milliseconds.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Settings for one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub prefix: String,
    pub label: String,

    /// Append a local timestamp to the file name and never replace an
    /// existing file.
    pub unique: bool,

    /// Caption text; lines become separate paragraphs.
    pub caption: String,

    /// Slide width in EMU.
    pub slide_width: i64,

    /// Slide height in EMU.
    pub slide_height: i64,
}

impl ExportOptions {
    /// Defaults: `Chart_Deck_Chart_Analysis.pptx`, 10in × 7.5in slides.
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            label: DEFAULT_LABEL.to_string(),
            unique: false,
            caption: DEFAULT_CAPTION.to_string(),
            slide_width: 10 * EMU_PER_INCH,
            slide_height: 7 * EMU_PER_INCH + EMU_PER_INCH / 2,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Output file name, timestamped now when `unique` is set.
    pub fn file_name(&self) -> String {
        self.file_name_at(Local::now().naive_local())
    }

    /// Output file name using `timestamp` for the unique suffix.
    pub fn file_name_at(&self, timestamp: NaiveDateTime) -> String {
        let stem = format!(
            "{}_{}",
            sanitize_file_component(&self.prefix),
            sanitize_file_component(&self.label)
        );
        if self.unique {
            format!("{}_{}.pptx", stem, timestamp.format(TIMESTAMP_FORMAT))
        } else {
            format!("{}.pptx", stem)
        }
    }

    /// Full output path inside `dir`.
    pub fn output_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_milli_opt(14, 5, 7, 42))
            .unwrap()
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(
            ExportOptions::new().file_name_at(timestamp()),
            "Chart_Deck_Chart_Analysis.pptx"
        );
    }

    #[test]
    fn test_unique_file_name() {
        let options = ExportOptions::new().with_unique(true);
        assert_eq!(
            options.file_name_at(timestamp()),
            "Chart_Deck_Chart_Analysis_20240309_140507_042.pptx"
        );
    }

    #[test]
    fn test_unique_names_differ_within_one_second() {
        let options = ExportOptions::new().with_unique(true);
        let later = timestamp() + chrono::Duration::milliseconds(1);
        assert_ne!(options.file_name_at(timestamp()), options.file_name_at(later));
    }

    #[test]
    fn test_unsafe_characters_are_replaced() {
        let options = ExportOptions::new()
            .with_prefix("Q3 report")
            .with_label("sales/2024");
        assert_eq!(options.file_name_at(timestamp()), "Q3_report_sales_2024.pptx");
    }

    #[test]
    fn test_slide_size_is_four_by_three() {
        let options = ExportOptions::new();
        assert_eq!(options.slide_width, 9_144_000);
        assert_eq!(options.slide_height, 6_858_000);
    }
}
