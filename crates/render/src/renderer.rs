//! Plotters-backed chart renderer.

use crate::cartesian::{self, LineKind};
use crate::error::{RenderError, Result};
use crate::radial;
use chartdeck_core::{ChartData, ChartKind, ChartRenderer, ChartSpec, Series, Values};
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::io::Cursor;

/// Default image width in pixels.
pub const DEFAULT_WIDTH: u32 = 960;

/// Default image height in pixels (4:3, matching the slide shape).
pub const DEFAULT_HEIGHT: u32 = 720;

/// Smallest accepted image side.
const MIN_SIDE: u32 = 200;

/// Largest accepted image side; 8192×8192 RGB is a 192 MiB buffer.
pub const MAX_SIDE: u32 = 8192;

/// Drawing area every chart is drawn on.
pub(crate) type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Renders charts to PNG with `plotters`.
#[derive(Debug, Clone)]
pub struct PlottersRenderer {
    width: u32,
    height: u32,
}

impl PlottersRenderer {
    /// Create a renderer producing 960×720 images.
    pub fn new() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }

    /// Set the image size in pixels. Each side is clamped to 200..=8192.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.clamp(MIN_SIDE, MAX_SIDE);
        self.height = height.clamp(MIN_SIDE, MAX_SIDE);
        if (self.width, self.height) != (width, height) {
            log::warn!(
                "Image size {}x{} clamped to {}x{}",
                width,
                height,
                self.width,
                self.height
            );
        }
        self
    }

    /// Image size as `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Draw `data` for `spec` and return PNG bytes.
    pub fn render_png(&self, spec: &ChartSpec, data: &ChartData) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Err(RenderError::Empty(spec.display_title().to_string()));
        }

        let mut buffer = vec![255u8; self.width as usize * self.height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height))
                .into_drawing_area();
            root.fill(&WHITE)?;
            draw(&root, spec, data)?;
            root.present()?;
        }

        log::debug!(
            "Rendered '{}' ({}) at {}x{}",
            spec.display_title(),
            spec.kind,
            self.width,
            self.height
        );

        encode_png(buffer, self.width, self.height)
    }
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, spec: &ChartSpec, data: &ChartData) -> chartdeck_core::Result<Vec<u8>> {
        Ok(self.render_png(spec, data)?)
    }
}

fn draw(root: &Area, spec: &ChartSpec, data: &ChartData) -> Result<()> {
    let title = spec.display_title();

    match &data.values {
        Values::Histogram { bins } => cartesian::histogram(root, title, data, bins),
        Values::Correlation { matrix } => cartesian::heatmap(root, title, matrix),
        Values::Series { series } => match spec.kind {
            ChartKind::Bar => cartesian::bars(root, title, data, series),
            ChartKind::Line => cartesian::lines(root, title, data, series, LineKind::Line),
            ChartKind::Area => cartesian::lines(root, title, data, series, LineKind::Area),
            ChartKind::Mixed => cartesian::lines(root, title, data, series, LineKind::Mixed),
            ChartKind::Scatter => cartesian::points(root, title, data, series, false),
            ChartKind::Bubble => cartesian::points(root, title, data, series, true),
            ChartKind::Pie => radial::pie(root, title, first_series(spec, series)?, 0.0),
            ChartKind::Donut => radial::pie(root, title, first_series(spec, series)?, 0.5),
            ChartKind::Radar => radial::radar(root, title, first_series(spec, series)?),
            ChartKind::Funnel => radial::funnel(root, title, first_series(spec, series)?),
            ChartKind::Histogram | ChartKind::CorrelationMatrix => Err(RenderError::Mismatch {
                kind: spec.kind.label().to_string(),
                values: "series".to_string(),
            }),
        },
    }
}

fn first_series<'a>(spec: &ChartSpec, series: &'a [Series]) -> Result<&'a Series> {
    series
        .first()
        .filter(|s| !s.points.is_empty())
        .ok_or_else(|| RenderError::Empty(spec.display_title().to_string()))
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>> {
    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| RenderError::Encoding("bitmap size does not match image size".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartdeck_core::{CellValue, ChartEnumerator, ManualChart, Table};

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn table() -> Table {
        let text = |s: &str| CellValue::Text(s.to_string());
        Table::from_columns(
            "sales.xlsx [Sheet1]",
            vec![
                (
                    "Region".to_string(),
                    vec![text("North"), text("South"), text("East"), text("North")],
                ),
                (
                    "Sales".to_string(),
                    [120.0, 80.0, 45.5, 60.0].map(CellValue::Number).to_vec(),
                ),
                (
                    "Units".to_string(),
                    [12.0, 9.0, 4.0, 7.0].map(CellValue::Number).to_vec(),
                ),
            ],
        )
    }

    fn render(spec: &ChartSpec, table: &Table) -> Result<Vec<u8>> {
        let data = ChartData::resolve(spec, table).unwrap();
        PlottersRenderer::new().with_size(320, 240).render_png(spec, &data)
    }

    #[test]
    fn test_size_builder() {
        assert_eq!(PlottersRenderer::new().size(), (960, 720));
        assert_eq!(PlottersRenderer::new().with_size(10, 400).size(), (200, 400));
        assert_eq!(
            PlottersRenderer::new().with_size(100_000, u32::MAX).size(),
            (MAX_SIDE, MAX_SIDE)
        );
    }

    #[test]
    fn test_enumerated_charts_render_png() {
        let table = table();
        for spec in ChartEnumerator::new().enumerate(&table) {
            let png = render(&spec, &table).unwrap();
            assert_eq!(&png[..8], &PNG_MAGIC, "{}", spec.display_title());
        }
    }

    #[test]
    fn test_manual_kinds_render_png() {
        let table = table();
        for kind in ChartKind::MANUAL {
            let spec = ManualChart::new(kind, "Region", vec!["Sales".to_string(), "Units".to_string()])
                .build(&table)
                .unwrap();
            let png = render(&spec, &table).unwrap();
            assert_eq!(&png[..8], &PNG_MAGIC, "{}", kind);
        }
    }

    #[test]
    fn test_png_has_requested_size() {
        let table = table();
        let spec = ChartSpec::scatter("Sales", "Units");
        let png = render(&spec, &table).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 240));
    }

    #[test]
    fn test_empty_data_is_an_error() {
        let spec = ChartSpec::bar("Region", "Sales");
        let data = ChartData {
            x_title: None,
            y_title: None,
            values: Values::Series { series: Vec::new() },
        };
        let result = PlottersRenderer::new().render(&spec, &data);
        assert!(matches!(result, Err(chartdeck_core::Error::RenderError(_))));
    }
}
