//! Legacy XLS (OLE/CFB) reader backend for loading chart tables.

pub mod reader;

pub use reader::XlsReader;
