//! XLSX (Office Open XML) reader backend for loading chart tables.
//!
//! Reads .xlsx files, which are ZIP archives containing XML worksheets.

pub mod reader;

pub use reader::XlsxReader;
