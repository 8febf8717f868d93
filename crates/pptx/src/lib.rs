//! PowerPoint (PPTX) output for chart decks.
//!
//! [`PptxExporter`] writes one slide per chart into a minimal
//! PresentationML package; [`PptxInspector`] reads a deck back into slide
//! summaries.

pub mod exporter;
pub mod inspector;
pub mod options;
mod package;
mod slide;

pub use exporter::PptxExporter;
pub use inspector::{Deck, PptxInspector, SlideSummary};
pub use options::ExportOptions;
