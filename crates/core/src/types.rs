//! Domain types for representing a loaded spreadsheet table.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use unicode_normalization::UnicodeNormalization;

/// A single cell value as read from a worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    /// Blank cell, error cell or missing value.
    Empty,
    /// Numeric cell.
    Number(f64),
    /// Number formatted as a date or time, as a 1900-system serial.
    Date(f64),
    /// Text cell.
    Text(String),
    /// Boolean cell.
    Bool(bool),
}

impl CellValue {
    /// Whether the cell carries no value.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// The numeric value, if this is a number cell. Dates are not numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Text shown for this cell in labels and preview tables.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(value) => format_number(*value),
            CellValue::Date(serial) => crate::numfmt::format_serial_date(*serial),
            CellValue::Text(text) => text.clone(),
            CellValue::Bool(true) => "True".to_string(),
            CellValue::Bool(false) => "False".to_string(),
        }
    }
}

/// Format a number without a trailing `.0` for integral values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// How a column takes part in chart selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Every non-empty cell is a number.
    Numeric,
    /// Text, or a mix of value types.
    Categorical,
    /// Booleans or dates only, or no values at all. Ignored for charts.
    Other,
}

impl ColumnKind {
    /// Classify a column from its cells.
    pub fn classify(values: &[CellValue]) -> Self {
        let mut numbers = 0usize;
        let mut bools = 0usize;
        let mut texts = 0usize;
        let mut dates = 0usize;

        for value in values {
            match value {
                CellValue::Number(_) => numbers += 1,
                CellValue::Bool(_) => bools += 1,
                CellValue::Date(_) => dates += 1,
                CellValue::Text(text) if !text.is_empty() => texts += 1,
                _ => {}
            }
        }

        match (numbers, bools + dates, texts) {
            (0, _, 0) => ColumnKind::Other,
            (_, 0, 0) => ColumnKind::Numeric,
            _ => ColumnKind::Categorical,
        }
    }

    /// Lowercase name used in listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Other => "other",
        }
    }
}

/// A named, classified column of cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Header name (unique within the table).
    pub name: String,

    /// Classification, computed once when the column is created.
    pub kind: ColumnKind,

    /// Cells in row order.
    pub values: Vec<CellValue>,
}

impl Column {
    /// Create a column and classify it.
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        let kind = ColumnKind::classify(&values);
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    /// Iterate numeric cells, `None` for everything else.
    pub fn numbers(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values.iter().map(CellValue::as_number)
    }
}

/// A table loaded from one worksheet. Read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Where the table came from (file and sheet name).
    pub source: String,

    columns: Vec<Column>,

    row_count: usize,
}

impl Table {
    /// Build a table from worksheet rows. The first row is the header.
    pub fn from_rows(source: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let source = source.into();
        let mut rows = rows.into_iter();
        let header = rows.next().ok_or_else(|| Error::EmptySheet(source.clone()))?;

        let mut body: Vec<Vec<CellValue>> = rows.collect();
        while body
            .last()
            .map(|row| row.iter().all(CellValue::is_empty))
            .unwrap_or(false)
        {
            body.pop();
        }

        let width = body
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);
        if width == 0 {
            return Err(Error::EmptySheet(source));
        }

        let names = header_names(&header, width);
        let mut columns: Vec<Vec<CellValue>> = vec![Vec::with_capacity(body.len()); width];
        for row in body {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.push(cells.next().unwrap_or(CellValue::Empty));
            }
        }

        let columns = names
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name, values))
            .collect::<Vec<_>>();

        log::debug!(
            "Loaded table '{}' with {} columns",
            source,
            columns.len()
        );

        Ok(Self::from_parts(source, columns))
    }

    /// Build a table from named columns. Shorter columns are padded with
    /// empty cells.
    pub fn from_columns(
        source: impl Into<String>,
        columns: Vec<(String, Vec<CellValue>)>,
    ) -> Self {
        let columns = columns
            .into_iter()
            .map(|(name, values)| Column::new(name, values))
            .collect();
        Self::from_parts(source.into(), columns)
    }

    fn from_parts(source: String, mut columns: Vec<Column>) -> Self {
        let row_count = columns.iter().map(|c| c.values.len()).max().unwrap_or(0);
        for column in columns.iter_mut() {
            column.values.resize(row_count, CellValue::Empty);
        }
        Self {
            source,
            columns,
            row_count,
        }
    }

    /// All columns in sheet order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column by name, failing with `ColumnNotFound`.
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Number of data rows (header excluded).
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Columns classified as numeric, in sheet order.
    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns_of_kind(ColumnKind::Numeric)
    }

    /// Columns classified as categorical, in sheet order.
    pub fn categorical_columns(&self) -> Vec<&Column> {
        self.columns_of_kind(ColumnKind::Categorical)
    }

    fn columns_of_kind(&self, kind: ColumnKind) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.kind == kind).collect()
    }
}

/// Turn header cells into unique column names.
///
/// Blank headers become `Unnamed: <index>`; repeated names get `.1`, `.2`, ...
fn header_names(header: &[CellValue], width: usize) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(width);

    for index in 0..width {
        let raw = header
            .get(index)
            .map(CellValue::display)
            .unwrap_or_default();
        let base: String = raw.trim().nfc().collect();
        let base = if base.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            base
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        names.push(name);
    }

    names
}

/// Sparse cell collector used by the sheet readers.
///
/// Cells can arrive in any order; `into_rows` anchors the grid at the first
/// non-empty row and column.
#[derive(Debug, Default)]
pub struct CellGrid {
    cells: BTreeMap<(u32, u32), CellValue>,
}

impl CellGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cell. Empty values are not stored.
    pub fn insert(&mut self, row: u32, col: u32, value: CellValue) {
        if !value.is_empty() {
            self.cells.insert((row, col), value);
        }
    }

    /// Number of stored cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell has been stored.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Convert to dense rows.
    pub fn into_rows(self) -> Vec<Vec<CellValue>> {
        let first_row = match self.cells.keys().next() {
            Some((row, _)) => *row,
            None => return Vec::new(),
        };
        let first_col = self.cells.keys().map(|(_, col)| *col).min().unwrap_or(0);
        let last_row = self.cells.keys().map(|(row, _)| *row).max().unwrap_or(0);

        let mut rows: Vec<Vec<CellValue>> =
            vec![Vec::new(); (last_row - first_row) as usize + 1];
        for ((row, col), value) in self.cells {
            let cells = &mut rows[(row - first_row) as usize];
            let index = (col - first_col) as usize;
            if cells.len() <= index {
                cells.resize(index + 1, CellValue::Empty);
            }
            cells[index] = value;
        }
        rows
    }
}

/// The format of the source spreadsheet file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadsheetFormat {
    /// Modern XLSX (Office Open XML).
    Xlsx,
    /// Legacy XLS (OLE/CFB binary).
    Xls,
}

impl SpreadsheetFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // XLSX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Xlsx);
        }

        // XLS is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::Xls);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_classify_columns() {
        use CellValue::*;
        assert_eq!(
            ColumnKind::classify(&[Number(1.0), Empty, Number(2.5)]),
            ColumnKind::Numeric
        );
        assert_eq!(
            ColumnKind::classify(&[text("a"), Number(1.0)]),
            ColumnKind::Categorical
        );
        assert_eq!(
            ColumnKind::classify(&[Bool(true), Number(1.0)]),
            ColumnKind::Categorical
        );
        assert_eq!(ColumnKind::classify(&[Bool(true), Empty]), ColumnKind::Other);
        assert_eq!(ColumnKind::classify(&[Date(45361.0), Empty]), ColumnKind::Other);
        assert_eq!(
            ColumnKind::classify(&[Date(45361.0), Number(1.0)]),
            ColumnKind::Categorical
        );
        assert_eq!(ColumnKind::classify(&[Empty, text("")]), ColumnKind::Other);
        assert_eq!(ColumnKind::classify(&[]), ColumnKind::Other);
    }

    #[test]
    fn test_from_rows_header_and_padding() {
        let rows = vec![
            vec![text("Product"), text("Sales")],
            vec![text("A"), CellValue::Number(100.0)],
            vec![text("B")],
            vec![CellValue::Empty, CellValue::Empty],
        ];
        let table = Table::from_rows("test", rows).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.columns()[0].kind, ColumnKind::Categorical);
        assert_eq!(table.columns()[1].kind, ColumnKind::Numeric);
        assert_eq!(table.columns()[1].values[1], CellValue::Empty);
    }

    #[test]
    fn test_header_names_are_unique() {
        let rows = vec![
            vec![text(" Sales "), text("Sales"), CellValue::Empty, CellValue::Number(2023.0)],
            vec![
                CellValue::Number(1.0),
                CellValue::Number(2.0),
                CellValue::Number(3.0),
                CellValue::Number(4.0),
            ],
        ];
        let table = Table::from_rows("test", rows).unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec!["Sales", "Sales.1", "Unnamed: 2", "2023"]);
    }

    #[test]
    fn test_header_is_nfc_normalized() {
        let rows = vec![vec![text("Cafe\u{301}")], vec![CellValue::Number(1.0)]];
        let table = Table::from_rows("test", rows).unwrap();
        assert_eq!(table.columns()[0].name, "Caf\u{e9}");
    }

    #[test]
    fn test_empty_sheet_is_an_error() {
        assert!(matches!(
            Table::from_rows("empty", Vec::new()),
            Err(Error::EmptySheet(_))
        ));
        assert!(matches!(
            Table::from_rows("empty", vec![Vec::new()]),
            Err(Error::EmptySheet(_))
        ));
    }

    #[test]
    fn test_header_only_table() {
        let table = Table::from_rows("test", vec![vec![text("A")]]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns()[0].kind, ColumnKind::Other);
    }

    #[test]
    fn test_cell_grid_anchors_at_first_cell() {
        let mut grid = CellGrid::new();
        grid.insert(3, 2, text("B"));
        grid.insert(2, 1, text("A"));
        grid.insert(2, 2, CellValue::Empty);
        grid.insert(4, 1, CellValue::Number(1.0));

        assert_eq!(grid.len(), 3);
        let rows = grid.into_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![text("A")]);
        assert_eq!(rows[1], vec![CellValue::Empty, text("B")]);
        assert_eq!(rows[2], vec![CellValue::Number(1.0)]);
    }

    #[test]
    fn test_date_cells_display_as_dates() {
        let date = CellValue::Date(45361.0);
        assert_eq!(date.as_number(), None);
        assert_eq!(date.display(), "2024-03-10");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            SpreadsheetFormat::from_magic(&[0x50, 0x4B, 0x03, 0x04, 0, 0, 0, 0]),
            Some(SpreadsheetFormat::Xlsx)
        );
        assert_eq!(
            SpreadsheetFormat::from_magic(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
            Some(SpreadsheetFormat::Xls)
        );
        assert_eq!(SpreadsheetFormat::from_magic(b"abc"), None);
        assert_eq!(
            SpreadsheetFormat::from_extension("XLSX"),
            Some(SpreadsheetFormat::Xlsx)
        );
        assert_eq!(SpreadsheetFormat::from_extension("csv"), None);
    }
}
