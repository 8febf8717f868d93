//! Number formats that turn a numeric cell into a date or time.
//!
//! Spreadsheets store dates as serial day numbers and only the cell's style
//! says whether a number is a date. Both readers collect the workbook's
//! style table into [`DateStyles`] and ask it how to type each number.

use crate::types::CellValue;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::collections::HashMap;

/// Days between the 1900 and 1904 date systems.
pub const DATE1904_OFFSET: f64 = 1462.0;

/// Largest serial chrono can place (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

/// Whether a built-in number format id is a date or time format.
pub fn is_builtin_date_format(id: u16) -> bool {
    matches!(id, 14..=22 | 45..=47)
}

/// Whether a custom format code shows a date or time.
///
/// Quoted literals, bracketed sections (colors, locales, elapsed-time
/// markers) and escaped characters are ignored. `m` alone is ambiguous
/// between months and minutes and does not decide anything.
pub fn is_date_format_code(code: &str) -> bool {
    let mut escaped = false;
    let mut literal = false;
    let mut bracket = false;

    for c in code.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' | '_' if !literal => escaped = true,
            '"' => literal = !literal,
            _ if literal => {}
            '[' => bracket = true,
            ']' => bracket = false,
            _ if bracket => {}
            'y' | 'Y' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}

/// Date flags for every cell style of a workbook, indexed by style (XF)
/// number.
#[derive(Debug, Clone, Default)]
pub struct DateStyles {
    dates: Vec<bool>,
    offset: f64,
}

impl DateStyles {
    /// Build from each style's number format id and the workbook's custom
    /// format codes. Custom codes win over built-in ids.
    pub fn new(format_ids: &[u16], custom: &HashMap<u16, String>) -> Self {
        let dates = format_ids
            .iter()
            .map(|id| match custom.get(id) {
                Some(code) => is_date_format_code(code),
                None => is_builtin_date_format(*id),
            })
            .collect();
        Self { dates, offset: 0.0 }
    }

    /// Mark the workbook as using the 1904 date system.
    pub fn with_1904(mut self, date1904: bool) -> Self {
        self.offset = if date1904 { DATE1904_OFFSET } else { 0.0 };
        self
    }

    /// Whether cells with this style hold dates.
    pub fn is_date(&self, style: usize) -> bool {
        self.dates.get(style).copied().unwrap_or(false)
    }

    /// Type a numeric cell by its style. Dates come out as 1900-system
    /// serials.
    pub fn value(&self, style: usize, number: f64) -> CellValue {
        if self.is_date(style) {
            CellValue::Date(number + self.offset)
        } else {
            CellValue::Number(number)
        }
    }
}

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Render a 1900-system serial as `YYYY-MM-DD`, `HH:MM:SS` for pure
/// times, or both. Serials chrono cannot place print as plain numbers.
pub fn format_serial_date(serial: f64) -> String {
    if !(0.0..=MAX_SERIAL).contains(&serial) {
        return crate::types::format_number(serial);
    }

    let mut days = serial.floor() as i64;
    let seconds = ((serial - serial.floor()) * 86_400.0).round() as i64;
    // Serials before March 1900 count the phantom 1900-02-29
    if days > 0 && days < 61 {
        days += 1;
    }

    let moment = epoch() + Duration::days(days) + Duration::seconds(seconds);
    if days == 0 {
        moment.format("%H:%M:%S").to_string()
    } else if seconds == 0 {
        moment.format("%Y-%m-%d").to_string()
    } else {
        moment.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Parse an ISO 8601 date, date-time or time into a 1900-system serial.
pub fn serial_from_iso(text: &str) -> Option<f64> {
    let text = text.trim();
    let moment = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });

    if let Some(moment) = moment {
        let elapsed = moment - epoch();
        let mut serial = elapsed.num_milliseconds() as f64 / 86_400_000.0;
        if serial < 61.0 {
            serial -= 1.0;
        }
        return Some(serial);
    }

    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .ok()
        .map(|time| f64::from(time.num_seconds_from_midnight()) / 86_400.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_date_ids() {
        assert!(is_builtin_date_format(14));
        assert!(is_builtin_date_format(22));
        assert!(is_builtin_date_format(47));
        assert!(!is_builtin_date_format(0));
        assert!(!is_builtin_date_format(4));
        assert!(!is_builtin_date_format(49));
    }

    #[test]
    fn test_custom_format_codes() {
        assert!(is_date_format_code("yyyy-mm-dd"));
        assert!(is_date_format_code("[$-409]d-mmm-yy;@"));
        assert!(is_date_format_code("[h]:mm:ss"));
        assert!(is_date_format_code("hh:mm AM/PM"));
        assert!(!is_date_format_code("General"));
        assert!(!is_date_format_code("#,##0.00"));
        assert!(!is_date_format_code("[Red]0.00"));
        assert!(!is_date_format_code("0 \"days\""));
        assert!(!is_date_format_code("0\\d"));
        assert!(!is_date_format_code("mm"));
    }

    #[test]
    fn test_custom_codes_override_builtin_ids() {
        let custom = HashMap::from([(164, "dd/mm/yyyy".to_string()), (14, "0.00".to_string())]);
        let styles = DateStyles::new(&[0, 164, 14, 15], &custom);

        assert!(!styles.is_date(0));
        assert!(styles.is_date(1));
        assert!(!styles.is_date(2));
        assert!(styles.is_date(3));
        assert!(!styles.is_date(99));
        assert_eq!(styles.value(1, 45000.0), CellValue::Date(45000.0));
        assert_eq!(styles.value(0, 45000.0), CellValue::Number(45000.0));
    }

    #[test]
    fn test_1904_serials_are_shifted() {
        let styles = DateStyles::new(&[14], &HashMap::new()).with_1904(true);
        assert_eq!(styles.value(0, 0.0), CellValue::Date(DATE1904_OFFSET));
        assert_eq!(format_serial_date(DATE1904_OFFSET), "1904-01-01");
    }

    #[test]
    fn test_format_serial_date() {
        assert_eq!(format_serial_date(1.0), "1900-01-01");
        assert_eq!(format_serial_date(59.0), "1900-02-28");
        assert_eq!(format_serial_date(61.0), "1900-03-01");
        assert_eq!(format_serial_date(45361.0), "2024-03-10");
        assert_eq!(format_serial_date(45361.75), "2024-03-10 18:00:00");
        assert_eq!(format_serial_date(0.5), "12:00:00");
        assert_eq!(format_serial_date(-3.0), "-3");
    }

    #[test]
    fn test_serial_from_iso() {
        assert_eq!(serial_from_iso("2024-03-10"), Some(45361.0));
        assert_eq!(serial_from_iso("2024-03-10T18:00:00"), Some(45361.75));
        assert_eq!(serial_from_iso("1900-01-01"), Some(1.0));
        assert_eq!(serial_from_iso("06:00:00"), Some(0.25));
        assert_eq!(serial_from_iso("next tuesday"), None);
    }
}
