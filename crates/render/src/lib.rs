//! PNG rendering for chart specs.
//!
//! [`PlottersRenderer`] implements the core `ChartRenderer` seam: it draws
//! resolved chart data into an in-memory RGB bitmap and encodes it as PNG.

mod cartesian;
mod error;
mod palette;
mod radial;
pub mod renderer;

pub use error::RenderError;
pub use renderer::{PlottersRenderer, DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_SIDE};
