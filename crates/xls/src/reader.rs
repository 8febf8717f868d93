//! XLS workbook reader implementation.
//!
//! Reads Excel 97-2003 workbooks: an OLE/CFB container whose `Workbook`
//! stream is a sequence of BIFF8 records. Records longer than one block
//! continue in CONTINUE records; a string split at such a boundary restarts
//! with a fresh option byte in the continuation.
//!
//! Numbers whose cell format (XF) points at a date format come out as
//! dates. 8-bit strings are decoded with the workbook's CODEPAGE, except
//! for the Unicode code page where they are plain Latin-1.

use cfb::CompoundFile;
use chartdeck_core::{CellGrid, CellValue, DateStyles, Error, Result, Table};
use encoding_rs::Encoding;
use std::collections::HashMap;
use std::io::{Read, Seek};

/// Minimum stream size for a valid workbook: one complete BOF record.
const MIN_STREAM_SIZE: usize = 20;

/// BOF version field for BIFF8.
const BIFF8_VERSION: u16 = 0x0600;

/// BOUNDSHEET sheet type for ordinary worksheets.
const SHEET_TYPE_WORKSHEET: u8 = 0x00;

/// Record type constants for the BIFF8 format.
mod record_types {
    pub const RT_FORMULA: u16 = 0x0006;
    pub const RT_EOF: u16 = 0x000A;
    pub const RT_DATE1904: u16 = 0x0022;
    pub const RT_FILEPASS: u16 = 0x002F;
    pub const RT_CONTINUE: u16 = 0x003C;
    pub const RT_CODEPAGE: u16 = 0x0042;
    pub const RT_BOUNDSHEET: u16 = 0x0085;
    pub const RT_MULRK: u16 = 0x00BD;
    pub const RT_XF: u16 = 0x00E0;
    pub const RT_SST: u16 = 0x00FC;
    pub const RT_LABELSST: u16 = 0x00FD;
    pub const RT_NUMBER: u16 = 0x0203;
    pub const RT_LABEL: u16 = 0x0204;
    pub const RT_BOOLERR: u16 = 0x0205;
    pub const RT_STRING: u16 = 0x0207;
    pub const RT_RK: u16 = 0x027E;
    pub const RT_FORMAT: u16 = 0x041E;
    pub const RT_BOF: u16 = 0x0809;
}

use record_types::*;

/// A worksheet listed in the workbook globals.
#[derive(Debug)]
struct SheetEntry {
    name: String,
    /// Stream offset of the sheet's BOF record.
    offset: usize,
}

/// Workbook-level data from the globals substream.
#[derive(Debug, Default)]
struct Globals {
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    styles: DateStyles,
    /// Decoder for 8-bit strings; `None` reads them as Latin-1.
    encoding: Option<&'static Encoding>,
}

/// Reader for legacy XLS (OLE/CFB) workbooks.
pub struct XlsReader;

impl XlsReader {
    /// Create a new XLS reader.
    pub fn new() -> Self {
        Self
    }

    /// List worksheet names in workbook order.
    pub fn sheet_names<R: Read + Seek>(&self, reader: R) -> Result<Vec<String>> {
        let data = self.read_workbook_stream(reader)?;
        let globals = self.read_globals(&data)?;
        Ok(globals.sheets.into_iter().map(|s| s.name).collect())
    }

    /// Read one worksheet into a table. `sheet` defaults to the first sheet.
    pub fn read<R: Read + Seek>(
        &self,
        reader: R,
        filename: &str,
        sheet: Option<&str>,
    ) -> Result<Table> {
        let data = self.read_workbook_stream(reader)?;
        let globals = self.read_globals(&data)?;

        let entry = match sheet {
            Some(wanted) => globals
                .sheets
                .iter()
                .find(|s| s.name == wanted)
                .ok_or_else(|| Error::SheetNotFound(wanted.to_string()))?,
            None => globals
                .sheets
                .first()
                .ok_or_else(|| Error::XlsParseError("Workbook has no worksheets".to_string()))?,
        };

        log::debug!(
            "XLS globals: sheets={}, shared_strings={}, reading '{}' at offset {}",
            globals.sheets.len(),
            globals.shared_strings.len(),
            entry.name,
            entry.offset
        );

        let grid = self.read_cells(&data, entry.offset, &globals)?;
        let source = format!("{} [{}]", filename, entry.name);
        Table::from_rows(source.clone(), grid.into_rows()).map_err(|e| match e {
            Error::EmptySheet(_) => Error::EmptySheet(source),
            other => other,
        })
    }

    /// Read the Workbook stream from the CFB container.
    fn read_workbook_stream<R: Read + Seek>(&self, reader: R) -> Result<Vec<u8>> {
        let mut cfb = CompoundFile::open(reader)
            .map_err(|e| Error::CfbError(format!("Failed to open CFB container: {}", e)))?;

        if !cfb.exists("/Workbook") {
            if cfb.exists("/Book") {
                return Err(Error::UnsupportedFormat(
                    "Excel 5.0/95 workbooks (BIFF5) are not supported".to_string(),
                ));
            }
            return Err(Error::UnsupportedFormat(
                "Missing 'Workbook' stream. This may not be an Excel file \
                 or may be a different Office format."
                    .to_string(),
            ));
        }

        let mut stream = cfb
            .open_stream("/Workbook")
            .map_err(|e| Error::CfbError(format!("Failed to open Workbook stream: {}", e)))?;

        let mut data = Vec::new();
        stream
            .read_to_end(&mut data)
            .map_err(|e| Error::CfbError(format!("Failed to read stream: {}", e)))?;

        self.validate_stream(&data)?;
        Ok(data)
    }

    /// Check the stream starts with a BIFF8 BOF record.
    fn validate_stream(&self, data: &[u8]) -> Result<()> {
        if data.len() < MIN_STREAM_SIZE {
            return Err(Error::XlsParseError(format!(
                "Workbook stream too small ({} bytes). File may be corrupted or truncated.",
                data.len()
            )));
        }

        if read_u16_le(data, 0) != RT_BOF {
            return Err(Error::XlsParseError(
                "Workbook stream does not start with a BOF record".to_string(),
            ));
        }

        let version = read_u16_le(data, 4);
        if version != BIFF8_VERSION {
            return Err(Error::UnsupportedFormat(format!(
                "BIFF version 0x{:04X} is not supported; expected BIFF8 (Excel 97-2003)",
                version
            )));
        }

        Ok(())
    }

    /// Read sheet entries, the shared string table, cell formats and the
    /// code page.
    fn read_globals(&self, data: &[u8]) -> Result<Globals> {
        let mut globals = Globals::default();
        let mut date1904 = false;
        let mut custom_formats: HashMap<u16, String> = HashMap::new();
        let mut format_ids: Vec<u16> = Vec::new();

        for record in Records::new(data, 0) {
            let record = record?;
            match record.kind {
                RT_EOF => break,
                RT_FILEPASS => {
                    return Err(Error::UnsupportedFormat(
                        "Workbook is password protected".to_string(),
                    ));
                }
                RT_CODEPAGE => {
                    let codepage = record.cursor().read_u16()?;
                    globals.encoding = string_encoding(codepage);
                }
                RT_DATE1904 => {
                    date1904 = record.cursor().read_u16()? == 1;
                }
                RT_FORMAT => {
                    let mut cursor = record.cursor_with(globals.encoding);
                    let id = cursor.read_u16()?;
                    let cch = cursor.read_u16()? as usize;
                    custom_formats.insert(id, cursor.read_string(cch)?);
                }
                RT_XF => {
                    let mut cursor = record.cursor();
                    cursor.skip(2)?;
                    format_ids.push(cursor.read_u16()?);
                }
                RT_BOUNDSHEET => {
                    let mut cursor = record.cursor_with(globals.encoding);
                    let offset = cursor.read_u32()? as usize;
                    let _visibility = cursor.read_u8()?;
                    let sheet_type = cursor.read_u8()?;
                    let cch = cursor.read_u8()? as usize;
                    let name = cursor.read_string(cch)?;

                    if sheet_type == SHEET_TYPE_WORKSHEET {
                        globals.sheets.push(SheetEntry { name, offset });
                    } else {
                        log::debug!("Skipping sheet '{}' of type {}", name, sheet_type);
                    }
                }
                RT_SST => {
                    globals.shared_strings = read_shared_strings(&record, globals.encoding)?;
                }
                _ => {}
            }
        }

        globals.styles = DateStyles::new(&format_ids, &custom_formats).with_1904(date1904);

        if globals.sheets.is_empty() {
            return Err(Error::XlsParseError(
                "Workbook has no worksheets".to_string(),
            ));
        }

        Ok(globals)
    }

    /// Collect the cells of the worksheet substream starting at `offset`.
    fn read_cells(&self, data: &[u8], offset: usize, globals: &Globals) -> Result<CellGrid> {
        let shared_strings = &globals.shared_strings;
        let styles = &globals.styles;
        let mut grid = CellGrid::new();
        let mut records = Records::new(data, offset);

        match records.next() {
            Some(Ok(record)) if record.kind == RT_BOF => {}
            _ => {
                return Err(Error::XlsParseError(format!(
                    "No BOF record at sheet offset {}",
                    offset
                )));
            }
        }

        // FORMULA cells with a string result are followed by a STRING record
        let mut pending_string: Option<(u32, u32)> = None;

        for record in records {
            let record = record?;
            let mut cursor = record.cursor_with(globals.encoding);

            match record.kind {
                RT_EOF => break,
                RT_NUMBER => {
                    let (row, col, xf) = cursor.read_position()?;
                    let value = cursor.read_f64()?;
                    grid.insert(row, col, styles.value(xf, value));
                }
                RT_RK => {
                    let (row, col, xf) = cursor.read_position()?;
                    let value = decode_rk(cursor.read_u32()?);
                    grid.insert(row, col, styles.value(xf, value));
                }
                RT_MULRK => {
                    let row = cursor.read_u16()? as u32;
                    let first_col = cursor.read_u16()? as u32;
                    let count = record.len().saturating_sub(6) / 6;
                    for i in 0..count as u32 {
                        let xf = cursor.read_u16()? as usize;
                        let value = decode_rk(cursor.read_u32()?);
                        grid.insert(row, first_col + i, styles.value(xf, value));
                    }
                }
                RT_LABELSST => {
                    let (row, col, _) = cursor.read_position()?;
                    let index = cursor.read_u32()? as usize;
                    match shared_strings.get(index) {
                        Some(text) => grid.insert(row, col, CellValue::Text(text.clone())),
                        None => log::warn!("Shared string index {} out of range", index),
                    }
                }
                RT_LABEL => {
                    let (row, col, _) = cursor.read_position()?;
                    let cch = cursor.read_u16()? as usize;
                    let text = cursor.read_string(cch)?;
                    grid.insert(row, col, CellValue::Text(text));
                }
                RT_BOOLERR => {
                    let (row, col, _) = cursor.read_position()?;
                    let value = cursor.read_u8()?;
                    let is_error = cursor.read_u8()?;
                    if is_error == 0 {
                        grid.insert(row, col, CellValue::Bool(value != 0));
                    }
                }
                RT_FORMULA => {
                    let (row, col, xf) = cursor.read_position()?;
                    let result: [u8; 8] = cursor.read_array()?;
                    if result[6] == 0xFF && result[7] == 0xFF {
                        match result[0] {
                            0x00 => pending_string = Some((row, col)),
                            0x01 => grid.insert(row, col, CellValue::Bool(result[2] != 0)),
                            // error or empty string
                            _ => {}
                        }
                    } else {
                        grid.insert(row, col, styles.value(xf, f64::from_le_bytes(result)));
                    }
                }
                RT_STRING => {
                    if let Some((row, col)) = pending_string.take() {
                        let cch = cursor.read_u16()? as usize;
                        let text = cursor.read_string(cch)?;
                        grid.insert(row, col, CellValue::Text(text));
                    }
                }
                _ => {}
            }
        }

        Ok(grid)
    }
}

impl Default for XlsReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoder for 8-bit strings under a CODEPAGE value. The Unicode code page
/// and unknown ones fall back to Latin-1.
fn string_encoding(codepage: u16) -> Option<&'static Encoding> {
    match codepage::to_encoding(codepage) {
        Some(encoding) if encoding == encoding_rs::UTF_16LE || encoding == encoding_rs::UTF_16BE => {
            None
        }
        Some(encoding) => {
            log::debug!("Decoding 8-bit strings as {}", encoding.name());
            Some(encoding)
        }
        None => {
            log::warn!("Unknown code page {}, reading 8-bit strings as Latin-1", codepage);
            None
        }
    }
}

/// Read the SST record body.
fn read_shared_strings(record: &Record, encoding: Option<&'static Encoding>) -> Result<Vec<String>> {
    let mut cursor = record.cursor_with(encoding);
    let _total = cursor.read_u32()?;
    let unique = cursor.read_u32()? as usize;

    let mut strings = Vec::with_capacity(unique.min(u16::MAX as usize));
    for index in 0..unique {
        let cch = match cursor.read_u16() {
            Ok(cch) => cch as usize,
            Err(_) => {
                log::warn!(
                    "Shared string table ends after {} of {} strings",
                    index,
                    unique
                );
                break;
            }
        };
        strings.push(cursor.read_string(cch)?);
    }

    Ok(strings)
}

/// Decode an RK number: a 30-bit integer or the high bits of a double,
/// optionally scaled by 1/100.
fn decode_rk(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk & 0xFFFF_FFFC) as u64) << 32)
    };

    if rk & 0x01 != 0 {
        value / 100.0
    } else {
        value
    }
}

/// One logical record: the record body plus any CONTINUE bodies.
struct Record<'a> {
    kind: u16,
    chunks: Vec<&'a [u8]>,
}

impl<'a> Record<'a> {
    fn cursor(&self) -> RecordCursor<'_, 'a> {
        self.cursor_with(None)
    }

    fn cursor_with(&self, encoding: Option<&'static Encoding>) -> RecordCursor<'_, 'a> {
        RecordCursor {
            chunks: &self.chunks,
            chunk: 0,
            pos: 0,
            encoding,
        }
    }

    /// Total body length across chunks.
    fn len(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum()
    }
}

/// Iterates records from a stream offset, folding CONTINUE records into
/// the record they extend.
struct Records<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Records<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn body(&mut self) -> Option<std::result::Result<(u16, &'a [u8]), usize>> {
        if self.pos + 4 > self.data.len() {
            return None;
        }
        let offset = self.pos;
        let kind = read_u16_le(self.data, offset);
        let len = read_u16_le(self.data, offset + 2) as usize;
        let start = offset + 4;
        let end = start + len;

        if end > self.data.len() {
            self.pos = self.data.len();
            return Some(Err(offset));
        }

        self.pos = end;
        Some(Ok((kind, &self.data[start..end])))
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let (kind, body) = match self.body()? {
            Ok(found) => found,
            Err(offset) => {
                return Some(Err(Error::XlsParseError(format!(
                    "Record at offset {} runs past the end of the stream",
                    offset
                ))));
            }
        };

        let mut chunks = vec![body];
        while self.pos + 4 <= self.data.len() && read_u16_le(self.data, self.pos) == RT_CONTINUE {
            match self.body()? {
                Ok((_, body)) => chunks.push(body),
                Err(offset) => {
                    return Some(Err(Error::XlsParseError(format!(
                        "CONTINUE record at offset {} runs past the end of the stream",
                        offset
                    ))));
                }
            }
        }

        Some(Ok(Record { kind, chunks }))
    }
}

/// Reads little-endian values across the chunks of one record.
struct RecordCursor<'r, 'a> {
    chunks: &'r [&'a [u8]],
    chunk: usize,
    pos: usize,
    encoding: Option<&'static Encoding>,
}

impl<'r, 'a> RecordCursor<'r, 'a> {
    fn remaining_in_chunk(&self) -> usize {
        self.chunks
            .get(self.chunk)
            .map(|c| c.len() - self.pos)
            .unwrap_or(0)
    }

    fn next_chunk(&mut self) -> bool {
        if self.chunk + 1 < self.chunks.len() {
            self.chunk += 1;
            self.pos = 0;
            true
        } else {
            false
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        while self.remaining_in_chunk() == 0 {
            if !self.next_chunk() {
                return Err(truncated());
            }
        }
        let byte = self.chunks[self.chunk][self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        for byte in out.iter_mut() {
            *byte = self.read_u8()?;
        }
        Ok(out)
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    fn read_f64(&mut self) -> Result<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// Row, column and cell format (XF) index of a cell record.
    fn read_position(&mut self) -> Result<(u32, u32, usize)> {
        let row = self.read_u16()? as u32;
        let col = self.read_u16()? as u32;
        let xf = self.read_u16()? as usize;
        Ok((row, col, xf))
    }

    fn skip(&mut self, mut count: usize) -> Result<()> {
        while count > 0 {
            let available = self.remaining_in_chunk();
            if available == 0 {
                if !self.next_chunk() {
                    return Err(truncated());
                }
                continue;
            }
            let step = available.min(count);
            self.pos += step;
            count -= step;
        }
        Ok(())
    }

    /// Read a BIFF8 Unicode string body of `char_count` characters,
    /// starting at its option byte. Rich-text runs and phonetic data are
    /// skipped.
    fn read_string(&mut self, char_count: usize) -> Result<String> {
        let flags = self.read_u8()?;
        let mut high_byte = flags & 0x01 != 0;
        let runs = if flags & 0x08 != 0 {
            self.read_u16()? as usize
        } else {
            0
        };
        let phonetic_size = if flags & 0x04 != 0 {
            self.read_u32()? as usize
        } else {
            0
        };

        let mut text = String::with_capacity(char_count);
        let mut remaining = char_count;
        while remaining > 0 {
            if self.remaining_in_chunk() == 0 {
                if !self.next_chunk() {
                    return Err(truncated());
                }
                // Continuation restarts with its own option byte
                high_byte = self.read_u8()? & 0x01 != 0;
                continue;
            }

            let width = if high_byte { 2 } else { 1 };
            let take = (self.remaining_in_chunk() / width).min(remaining);
            if take == 0 {
                return Err(Error::XlsParseError(
                    "String character split across records".to_string(),
                ));
            }

            let chunk = self.chunks[self.chunk];
            let bytes = &chunk[self.pos..self.pos + take * width];
            self.pos += take * width;

            if high_byte {
                let units = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
                text.extend(
                    char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
                );
            } else if let Some(encoding) = self.encoding {
                text.push_str(&encoding.decode_without_bom_handling(bytes).0);
            } else {
                text.extend(bytes.iter().map(|&b| b as char));
            }
            remaining -= take;
        }

        self.skip(runs * 4 + phonetic_size)?;
        Ok(text)
    }
}

fn truncated() -> Error {
    Error::XlsParseError("Record ended unexpectedly".to_string())
}

/// Read a little-endian u16 from a byte slice.
fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}
