//! Chart deck writer.

use crate::options::ExportOptions;
use crate::package::{self, Relationships, REL_IMAGE, REL_SLIDE_LAYOUT, STATIC_PARTS};
use crate::slide::{self, Content, Layout};
use chartdeck_core::{render_charts, ChartRenderer, ChartSpec, Error, RenderedChart, Result, Table};
use image::codecs::png::PngDecoder;
use image::ImageDecoder;
use std::io::{self, Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// How many numbered names `unique` exports try before giving up.
const MAX_UNIQUE_ATTEMPTS: usize = 100;

/// Writes one slide per chart into a PPTX file.
#[derive(Debug, Clone, Default)]
pub struct PptxExporter {
    options: ExportOptions,
}

impl PptxExporter {
    /// Create an exporter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Write `charts` to `path` and return the path written.
    ///
    /// The deck is assembled in a temporary file next to `path` and renamed
    /// into place, so `path` never holds a partial deck. An existing file is
    /// replaced, unless the options ask for unique output: then the deck goes
    /// to the first free name among `path`, `<stem>_1.pptx`, `<stem>_2.pptx`...
    pub fn export(&self, charts: &[RenderedChart], path: &Path) -> Result<PathBuf> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::Builder::new()
            .prefix(".chartdeck-")
            .suffix(".pptx.tmp")
            .tempfile_in(dir)?;
        self.write_package(charts, temp.as_file_mut())?;
        temp.as_file_mut().sync_all()?;
        let written = self.persist(temp, path)?;

        log::debug!("Wrote {} slides to {}", charts.len(), written.display());
        Ok(written)
    }

    fn persist(&self, temp: NamedTempFile, path: &Path) -> Result<PathBuf> {
        if !self.options.unique {
            temp.persist(path).map_err(|e| Error::IoError(e.error))?;
            return Ok(path.to_path_buf());
        }

        let mut temp = temp;
        let mut candidate = path.to_path_buf();
        for attempt in 1..=MAX_UNIQUE_ATTEMPTS {
            match temp.persist_noclobber(&candidate) {
                Ok(_) => return Ok(candidate),
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    log::debug!("{} exists, trying the next name", candidate.display());
                    temp = e.file;
                    candidate = numbered_path(path, attempt);
                }
                Err(e) => return Err(Error::IoError(e.error)),
            }
        }

        Err(Error::ExportError(format!(
            "No free file name next to {}",
            path.display()
        )))
    }

    /// Write `charts` into `dir` under the configured file name.
    pub fn export_to_dir(&self, charts: &[RenderedChart], dir: &Path) -> Result<PathBuf> {
        self.export(charts, &self.options.output_path(dir))
    }

    /// Materialize `specs` against `table`, then export them.
    ///
    /// Without a renderer every slide gets a data preview table.
    pub fn export_specs(
        &self,
        specs: &[ChartSpec],
        table: &Table,
        renderer: Option<&dyn ChartRenderer>,
        path: &Path,
    ) -> Result<PathBuf> {
        let charts = render_charts(specs, table, renderer);
        self.export(&charts, path)
    }

    /// Write the complete package for `charts` to `writer`.
    pub fn write_package<W: Write + Seek>(&self, charts: &[RenderedChart], writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);

        let (presentation, presentation_rels) = package::presentation(
            charts.len(),
            self.options.slide_width,
            self.options.slide_height,
        )
        .map_err(xml_error)?;
        let created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let parts = [
            ("[Content_Types].xml", package::content_types(charts.len()).map_err(xml_error)?),
            ("_rels/.rels", package::root_relationships().map_err(xml_error)?),
            (
                "docProps/core.xml",
                package::core_properties(&self.options.label, &created).map_err(xml_error)?,
            ),
            ("docProps/app.xml", package::app_properties(charts.len()).map_err(xml_error)?),
            (package::PRESENTATION_PATH, presentation),
            (package::PRESENTATION_RELS_PATH, presentation_rels),
        ];
        for (name, content) in &parts {
            write_part(&mut zip, name, content.as_bytes(), deflated)?;
        }
        for (name, content) in STATIC_PARTS {
            write_part(&mut zip, name, content.as_bytes(), deflated)?;
        }

        let layout = Layout::new(self.options.slide_width, self.options.slide_height);
        let mut image_count = 0;
        for (index, chart) in charts.iter().enumerate() {
            let number = index + 1;
            let mut rels = Relationships::new();
            rels.add(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");

            let content = match picture_size(number, chart) {
                Some((png, pixels)) => {
                    image_count += 1;
                    let media = format!("image{}.png", image_count);
                    write_part(&mut zip, &format!("ppt/media/{}", media), png, stored)?;
                    Content::Picture {
                        rel_id: rels.add(REL_IMAGE, format!("../media/{}", media)),
                        pixels,
                        description: chart.spec.display_title().to_string(),
                    }
                }
                None => preview_table(number, chart),
            };

            let title = format!("Chart {}: {}", number, chart.spec.display_title());
            let xml = slide::slide_xml(&layout, &title, &self.options.caption, &content)
                .map_err(xml_error)?;
            write_part(
                &mut zip,
                &format!("ppt/slides/slide{}.xml", number),
                xml.as_bytes(),
                deflated,
            )?;
            write_part(
                &mut zip,
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                rels.to_xml().map_err(xml_error)?.as_bytes(),
                deflated,
            )?;
        }

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))?;
        log::debug!(
            "Packaged {} slides ({} with images)",
            charts.len(),
            image_count
        );
        Ok(())
    }
}

/// `<stem>_<n>.<ext>` next to `path`.
fn numbered_path(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("deck");
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => path.with_file_name(format!("{}_{}.{}", stem, n, ext)),
        None => path.with_file_name(format!("{}_{}", stem, n)),
    }
}

/// The chart image with its pixel size, if it decodes as PNG.
fn picture_size(number: usize, chart: &RenderedChart) -> Option<(&[u8], (u32, u32))> {
    let png = chart.image.as_deref()?;
    match PngDecoder::new(Cursor::new(png)) {
        Ok(decoder) => Some((png, decoder.dimensions())),
        Err(e) => {
            log::warn!(
                "Chart {} ({}): image is not a valid PNG, using data preview: {}",
                number,
                chart.spec.display_title(),
                e
            );
            None
        }
    }
}

fn preview_table(number: usize, chart: &RenderedChart) -> Content {
    match &chart.data {
        Some(data) => Content::Table {
            header: data.preview_header(),
            rows: data.preview_rows(),
        },
        None => {
            log::warn!(
                "Chart {} ({}): no image or data, slide has title and caption only",
                number,
                chart.spec.display_title()
            );
            Content::None
        }
    }
}

fn write_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    content: &[u8],
    options: FileOptions,
) -> Result<()> {
    zip.start_file(name, options)
        .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
    zip.write_all(content)?;
    Ok(())
}

fn xml_error(e: std::fmt::Error) -> Error {
    Error::XmlError(format!("Failed to build slide XML: {}", e))
}
