//! XLSX workbook reader implementation.

use chartdeck_core::numfmt::serial_from_iso;
use chartdeck_core::{CellGrid, CellValue, DateStyles, Error, Result, Table};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
const STYLES_PATH: &str = "xl/styles.xml";

/// Reader for XLSX (Office Open XML) workbooks.
pub struct XlsxReader;

impl XlsxReader {
    /// Create a new XLSX reader.
    pub fn new() -> Self {
        Self
    }

    /// List worksheet names in workbook order.
    pub fn sheet_names<R: Read + Seek>(&self, reader: R) -> Result<Vec<String>> {
        let mut archive = open_archive(reader)?;
        let sheets = self.get_sheets(&mut archive)?;
        Ok(sheets.into_iter().map(|(name, _)| name).collect())
    }

    /// Read one worksheet into a table. `sheet` defaults to the first sheet.
    pub fn read<R: Read + Seek>(
        &self,
        reader: R,
        filename: &str,
        sheet: Option<&str>,
    ) -> Result<Table> {
        let mut archive = open_archive(reader)?;

        let sheets = self.get_sheets(&mut archive)?;
        let (sheet_name, sheet_path) = match sheet {
            Some(wanted) => sheets
                .into_iter()
                .find(|(name, _)| name == wanted)
                .ok_or_else(|| Error::SheetNotFound(wanted.to_string()))?,
            None => sheets.into_iter().next().ok_or_else(|| {
                Error::XlsxParseError("Workbook has no worksheets".to_string())
            })?,
        };
        log::debug!("Reading sheet '{}' from {}", sheet_name, sheet_path);

        let shared_strings = self.get_shared_strings(&mut archive)?;
        let styles = self.get_date_styles(&mut archive)?;
        let content = self.read_file_from_archive(&mut archive, &sheet_path)?;
        let grid = self.parse_worksheet(&content, &shared_strings, &styles)?;

        log::debug!("Sheet '{}' has {} non-empty cells", sheet_name, grid.len());

        let source = format!("{} [{}]", filename, sheet_name);
        Table::from_rows(source.clone(), grid.into_rows()).map_err(|e| match e {
            Error::EmptySheet(_) => Error::EmptySheet(source),
            other => other,
        })
    }

    /// Get `(name, archive path)` for every worksheet, in workbook order.
    fn get_sheets<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<Vec<(String, String)>> {
        let rels_content = self.read_file_from_archive(archive, WORKBOOK_RELS_PATH)?;
        let mut targets: Vec<(String, String)> = Vec::new();

        let mut reader = Reader::from_str(&rels_content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    let id = attribute(e, b"Id").unwrap_or_default();
                    let target = attribute(e, b"Target").unwrap_or_default();
                    let full_path = if let Some(stripped) = target.strip_prefix('/') {
                        stripped.to_string()
                    } else {
                        format!("xl/{}", target)
                    };
                    targets.push((id, full_path));
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing workbook relationships: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        let workbook_content = self.read_file_from_archive(archive, WORKBOOK_PATH)?;
        let mut reader = Reader::from_str(&workbook_content);
        reader.trim_text(true);
        let mut sheets = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"sheet" =>
                {
                    let name = attribute(e, b"name").unwrap_or_default();
                    let rel_id = attribute(e, b"id").unwrap_or_default();
                    match targets.iter().find(|(id, _)| *id == rel_id) {
                        Some((_, path)) => sheets.push((name, path.clone())),
                        None => log::warn!("Sheet '{}' has no relationship target", name),
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!("Error parsing workbook: {}", e)));
                }
                _ => {}
            }
        }

        Ok(sheets)
    }

    /// Load the shared string table. Missing table means no shared strings.
    fn get_shared_strings<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<Vec<String>> {
        if archive.by_name(SHARED_STRINGS_PATH).is_err() {
            return Ok(Vec::new());
        }
        let content = self.read_file_from_archive(archive, SHARED_STRINGS_PATH)?;
        parse_shared_strings(&content)
    }

    /// Which cell styles format numbers as dates. Missing styles mean none.
    fn get_date_styles<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<DateStyles> {
        let workbook = self.read_file_from_archive(archive, WORKBOOK_PATH)?;
        let date1904 = uses_1904_dates(&workbook)?;

        if archive.by_name(STYLES_PATH).is_err() {
            return Ok(DateStyles::default().with_1904(date1904));
        }
        let content = self.read_file_from_archive(archive, STYLES_PATH)?;
        Ok(parse_date_styles(&content)?.with_1904(date1904))
    }

    /// Collect the cells of a worksheet.
    fn parse_worksheet(
        &self,
        xml_content: &str,
        shared_strings: &[String],
        styles: &DateStyles,
    ) -> Result<CellGrid> {
        let mut grid = CellGrid::new();
        let mut reader = Reader::from_str(xml_content);

        let mut row: u32 = 0;
        let mut next_col: u32 = 0;
        let mut current_cell: Option<CellInfo> = None;
        let mut in_value = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                    b"row" => {
                        row = row_start(e, row);
                        next_col = 0;
                    }
                    b"c" => {
                        let cell = CellInfo::from_element(e, row, next_col);
                        next_col = cell.col + 1;
                        current_cell = Some(cell);
                    }
                    b"v" | b"t" if current_cell.is_some() => {
                        in_value = true;
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                    b"row" => {
                        row = row_start(e, row);
                        next_col = 0;
                    }
                    b"c" => {
                        // Styled but empty cell; only advances the column
                        let cell = CellInfo::from_element(e, row, next_col);
                        next_col = cell.col + 1;
                    }
                    _ => {}
                },
                Ok(Event::Text(ref e)) => {
                    if in_value {
                        if let Some(ref mut cell) = current_cell {
                            let text = e.unescape().unwrap_or_default();
                            cell.raw.push_str(&text);
                        }
                    }
                }
                Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                    b"v" | b"t" => {
                        in_value = false;
                    }
                    b"c" => {
                        if let Some(cell) = current_cell.take() {
                            let (r, c) = (cell.row, cell.col);
                            grid.insert(r, c, cell.into_value(shared_strings, styles));
                        }
                    }
                    b"row" => {
                        row += 1;
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing worksheet at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(grid)
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for XlsxReader {
    fn default() -> Self {
        Self::new()
    }
}

fn open_archive<R: Read + Seek>(reader: R) -> Result<ZipArchive<R>> {
    ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))
}

/// Parse `sharedStrings.xml`. Rich text runs are concatenated; phonetic
/// runs are skipped.
fn parse_shared_strings(xml_content: &str) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut reader = Reader::from_str(xml_content);

    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if local_name(e.name().as_ref()) == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(ref e)) => {
                if in_text {
                    if let Some(ref mut text) = current {
                        text.push_str(&e.unescape().unwrap_or_default());
                    }
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"si" => {
                    if let Some(text) = current.take() {
                        strings.push(text);
                    }
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing shared strings: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(strings)
}

/// Whether `<workbookPr date1904="1">` switches the workbook to the 1904
/// date system.
fn uses_1904_dates(workbook: &str) -> Result<bool> {
    let mut reader = Reader::from_str(workbook);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"workbookPr" =>
            {
                let flag = attribute(e, b"date1904").unwrap_or_default();
                return Ok(flag == "1" || flag.eq_ignore_ascii_case("true"));
            }
            Ok(Event::Eof) => return Ok(false),
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing workbook: {}", e)));
            }
            _ => {}
        }
    }
}

/// Parse `styles.xml`: custom number formats from `numFmts` and the number
/// format of every cell style in `cellXfs`.
fn parse_date_styles(xml_content: &str) -> Result<DateStyles> {
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);

    let mut custom: HashMap<u16, String> = HashMap::new();
    let mut format_ids: Vec<u16> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"cellXfs" => {
                in_cell_xfs = true;
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match local_name(e.name().as_ref()) {
                    b"numFmt" => {
                        let id = attribute(e, b"numFmtId").and_then(|id| id.trim().parse().ok());
                        if let (Some(id), Some(code)) = (id, attribute(e, b"formatCode")) {
                            custom.insert(id, code);
                        }
                    }
                    b"xf" if in_cell_xfs => {
                        let id = attribute(e, b"numFmtId")
                            .and_then(|id| id.trim().parse().ok())
                            .unwrap_or(0);
                        format_ids.push(id);
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) if local_name(e.name().as_ref()) == b"cellXfs" => {
                in_cell_xfs = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing styles: {}", e)));
            }
            _ => {}
        }
    }

    log::debug!(
        "Styles: {} cell formats, {} custom number formats",
        format_ids.len(),
        custom.len()
    );
    Ok(DateStyles::new(&format_ids, &custom))
}

/// A cell being collected from worksheet XML.
#[derive(Debug)]
struct CellInfo {
    row: u32,
    col: u32,
    cell_type: String,
    style: usize,
    raw: String,
}

impl CellInfo {
    fn from_element(e: &BytesStart, row: u32, next_col: u32) -> Self {
        let (row, col) = attribute(e, b"r")
            .and_then(|r| parse_cell_reference(&r))
            .unwrap_or((row, next_col));
        Self {
            row,
            col,
            cell_type: attribute(e, b"t").unwrap_or_default(),
            style: attribute(e, b"s")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0),
            raw: String::new(),
        }
    }

    fn into_value(self, shared_strings: &[String], styles: &DateStyles) -> CellValue {
        match self.cell_type.as_str() {
            "s" => match self.raw.trim().parse::<usize>() {
                Ok(index) => match shared_strings.get(index) {
                    Some(text) => CellValue::Text(text.clone()),
                    None => {
                        log::warn!("Shared string index {} out of range", index);
                        CellValue::Empty
                    }
                },
                Err(_) => CellValue::Empty,
            },
            "str" | "inlineStr" => CellValue::Text(self.raw),
            "d" => match serial_from_iso(&self.raw) {
                Some(serial) => CellValue::Date(serial),
                None => CellValue::Text(self.raw),
            },
            "b" => CellValue::Bool(self.raw.trim() == "1"),
            "e" => CellValue::Empty,
            _ => {
                if self.raw.trim().is_empty() {
                    CellValue::Empty
                } else {
                    match self.raw.trim().parse::<f64>() {
                        Ok(value) => styles.value(self.style, value),
                        Err(_) => CellValue::Text(self.raw),
                    }
                }
            }
        }
    }
}

/// Row index from a `<row r="..">` element, or the running row.
fn row_start(e: &BytesStart, running: u32) -> u32 {
    attribute(e, b"r")
        .and_then(|r| r.trim().parse::<u32>().ok())
        .and_then(|r| r.checked_sub(1))
        .unwrap_or(running)
}

/// Read an attribute by local name.
fn attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == name)
        .map(|attr| {
            attr.unescape_value()
                .map(|v| v.to_string())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string())
        })
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Parse a cell reference like "B3" into zero-based `(row, col)`.
fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.trim().trim_start_matches('$');
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut col: u32 = 0;
    for c in letters.trim_end_matches('$').chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }

    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartdeck_core::ColumnKind;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Summary" sheetId="1" r:id="rId2"/>
    <sheet name="Data" sheetId="2" r:id="rId1"/>
  </sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet1.xml"/>
</Relationships>"#;

    const SHARED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
  <si><t>Product</t></si>
  <si><t>Sales</t></si>
  <si><r><t>Wid</t></r><r><t>get &amp; Co</t></r><rPh><t>ignored</t></rPh></si>
  <si><t xml:space="preserve">Gadget</t></si>
</sst>"#;

    const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="inlineStr"><is><t>Active</t></is></c></row>
    <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>100</v></c><c r="C2" t="b"><v>1</v></c></row>
    <row r="3"><c r="A3" t="s"><v>3</v></c><c r="B3"><v>200.5</v></c><c r="C3" t="b"><v>0</v></c></row>
    <row r="4"><c r="A4" s="1"/><c r="B4" t="e"><v>#DIV/0!</v></c></row>
  </sheetData>
</worksheet>"#;

    const SHEET2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row><c><v>1</v></c><c><v>2</v></c></row>
    <row><c><v>3</v></c><c><v>4</v></c></row>
  </sheetData>
</worksheet>"#;

    fn build_xlsx(with_shared: bool) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        let mut parts = vec![
            (WORKBOOK_PATH, WORKBOOK),
            (WORKBOOK_RELS_PATH, RELS),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ];
        if with_shared {
            parts.push((SHARED_STRINGS_PATH, SHARED));
        }
        for (path, content) in parts {
            zip.start_file(path, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_sheet_names_in_workbook_order() {
        let names = XlsxReader::new()
            .sheet_names(Cursor::new(build_xlsx(true)))
            .unwrap();
        assert_eq!(names, vec!["Summary", "Data"]);
    }

    #[test]
    fn test_read_first_sheet() {
        let table = XlsxReader::new()
            .read(Cursor::new(build_xlsx(true)), "book.xlsx", None)
            .unwrap();

        assert_eq!(table.source, "book.xlsx [Summary]");
        assert_eq!(table.row_count(), 2);

        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Product", "Sales", "Active"]);

        let product = table.column("Product").unwrap();
        assert_eq!(product.kind, ColumnKind::Categorical);
        assert_eq!(product.values[0], CellValue::Text("Widget & Co".to_string()));
        assert_eq!(product.values[1], CellValue::Text("Gadget".to_string()));

        let sales = table.column("Sales").unwrap();
        assert_eq!(sales.kind, ColumnKind::Numeric);
        assert_eq!(sales.values, vec![CellValue::Number(100.0), CellValue::Number(200.5)]);

        assert_eq!(table.column("Active").unwrap().kind, ColumnKind::Other);
    }

    #[test]
    fn test_read_named_sheet_without_references() {
        let table = XlsxReader::new()
            .read(Cursor::new(build_xlsx(false)), "book.xlsx", Some("Data"))
            .unwrap();

        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["1", "2"]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.numeric_columns().len(), 2);
    }

    #[test]
    fn test_missing_sheet() {
        let result = XlsxReader::new().read(Cursor::new(build_xlsx(true)), "book.xlsx", Some("Nope"));
        assert!(matches!(result, Err(Error::SheetNotFound(_))));
    }

    #[test]
    fn test_not_a_zip() {
        let result = XlsxReader::new().read(Cursor::new(b"not a zip".to_vec()), "bad.xlsx", None);
        assert!(matches!(result, Err(Error::ZipError(_))));
    }

    const DATED_WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <workbookPr date1904="false"/>
  <sheets><sheet name="Log" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

    const DATED_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

    const STYLES: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="2">
    <numFmt numFmtId="164" formatCode="yyyy\-mm\-dd\ hh:mm"/>
    <numFmt numFmtId="165" formatCode="#,##0.0 &quot;kg&quot;"/>
  </numFmts>
  <cellStyleXfs count="1"><xf numFmtId="14"/></cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" xfId="0"/>
    <xf numFmtId="14" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="164" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="165" xfId="0" applyNumberFormat="1"/>
  </cellXfs>
</styleSheet>"##;

    const DATED_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="inlineStr"><is><t>Day</t></is></c><c r="B1" t="inlineStr"><is><t>Sales</t></is></c><c r="C1" t="inlineStr"><is><t>Logged</t></is></c></row>
    <row r="2"><c r="A2" s="1"><v>45361</v></c><c r="B2" s="3"><v>120.5</v></c><c r="C2" s="2"><v>45361.75</v></c></row>
    <row r="3"><c r="A3" s="1"><v>45362</v></c><c r="B3" s="0"><v>80</v></c><c r="C3" t="d"><v>2024-03-11T09:30:00</v></c></row>
  </sheetData>
</worksheet>"#;

    fn build_dated_xlsx(workbook: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        for (path, content) in [
            (WORKBOOK_PATH, workbook),
            (WORKBOOK_RELS_PATH, DATED_RELS),
            (STYLES_PATH, STYLES),
            ("xl/worksheets/sheet1.xml", DATED_SHEET),
        ] {
            zip.start_file(path, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_date_formatted_cells_are_not_numeric() {
        let table = XlsxReader::new()
            .read(Cursor::new(build_dated_xlsx(DATED_WORKBOOK)), "log.xlsx", None)
            .unwrap();

        let day = table.column("Day").unwrap();
        assert_eq!(day.kind, ColumnKind::Other);
        assert_eq!(day.values, vec![CellValue::Date(45361.0), CellValue::Date(45362.0)]);
        assert_eq!(day.values[0].display(), "2024-03-10");

        let logged = table.column("Logged").unwrap();
        assert_eq!(logged.kind, ColumnKind::Other);
        assert!(matches!(logged.values[1], CellValue::Date(_)));
        assert_eq!(logged.values[1].display(), "2024-03-11 09:30:00");
        assert_eq!(logged.values[0].display(), "2024-03-10 18:00:00");

        // a custom format with a quoted unit stays numeric
        let sales = table.column("Sales").unwrap();
        assert_eq!(sales.kind, ColumnKind::Numeric);

        let titles: Vec<String> = chartdeck_core::enumerate(&table)
            .iter()
            .map(|spec| spec.display_title().to_string())
            .collect();
        assert_eq!(titles, vec!["Histogram of Sales"]);
    }

    #[test]
    fn test_1904_workbook_dates() {
        let workbook = DATED_WORKBOOK.replace("date1904=\"false\"", "date1904=\"1\"");
        let table = XlsxReader::new()
            .read(Cursor::new(build_dated_xlsx(&workbook)), "mac.xlsx", None)
            .unwrap();

        let day = table.column("Day").unwrap();
        assert_eq!(day.values[0], CellValue::Date(45361.0 + 1462.0));
    }

    #[test]
    fn test_parse_cell_reference() {
        assert_eq!(parse_cell_reference("A1"), Some((0, 0)));
        assert_eq!(parse_cell_reference("B3"), Some((2, 1)));
        assert_eq!(parse_cell_reference("AA10"), Some((9, 26)));
        assert_eq!(parse_cell_reference("$C$7"), Some((6, 2)));
        assert_eq!(parse_cell_reference("12"), None);
        assert_eq!(parse_cell_reference("A0"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"x:row"), b"row");
        assert_eq!(local_name(b"r:id"), b"id");
        assert_eq!(local_name(b"c"), b"c");
    }
}
