//! Read a PPTX deck back into per-slide summaries.

use chartdeck_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::package::{PRESENTATION_PATH, PRESENTATION_RELS_PATH};

/// Text and content kinds found on one slide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideSummary {
    /// 1-based position in the deck.
    pub number: usize,

    /// Text of the title placeholder, if any.
    pub title: Option<String>,

    /// Non-empty paragraphs outside tables, top-to-bottom then left-to-right.
    pub lines: Vec<String>,

    pub has_picture: bool,
    pub has_table: bool,

    /// Cell text of every table row, header included.
    pub table_rows: Vec<Vec<String>>,
}

impl SlideSummary {
    fn new(number: usize) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    /// Title placeholder text, else the first line.
    pub fn title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or_else(|| self.lines.first().map(String::as_str))
    }

    /// Short description of what the slide holds: `picture`, `table`,
    /// `picture+table` or `text`.
    pub fn content_kind(&self) -> &'static str {
        match (self.has_picture, self.has_table) {
            (true, true) => "picture+table",
            (true, false) => "picture",
            (false, true) => "table",
            (false, false) => "text",
        }
    }
}

/// A deck read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    pub source: String,
    pub slides: Vec<SlideSummary>,
}

/// Reader for PPTX decks.
pub struct PptxInspector;

impl PptxInspector {
    /// Create a new inspector.
    pub fn new() -> Self {
        Self
    }

    /// Read every slide of a deck, in presentation order.
    pub fn inspect<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Deck> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let slide_order = self.get_slide_order(&mut archive)?;
        log::debug!("{} lists {} slides", filename, slide_order.len());

        let mut slides = Vec::with_capacity(slide_order.len());
        for (idx, slide_path) in slide_order.iter().enumerate() {
            slides.push(self.parse_slide(&mut archive, slide_path, idx + 1)?);
        }

        Ok(Deck {
            source: filename.to_string(),
            slides,
        })
    }

    /// Slide part paths in the order `presentation.xml` lists them.
    ///
    /// Decks without a readable slide list fall back to the numbers in the
    /// relationship ids and targets.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = self.read_file_from_archive(archive, PRESENTATION_RELS_PATH)?;
        let mut targets: HashMap<String, String> = HashMap::new();
        let mut fallback: Vec<(String, Option<usize>)> = Vec::new();

        let mut reader = Reader::from_str(&rels_content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    let id = attribute(e, b"Id").unwrap_or_default();
                    let target = attribute(e, b"Target").unwrap_or_default();
                    let rel_type = attribute(e, b"Type").unwrap_or_default();

                    if rel_type.ends_with("/slide") {
                        let full_path = match target.strip_prefix('/') {
                            Some(absolute) => absolute.to_string(),
                            None => format!("ppt/{}", target),
                        };
                        let order_num =
                            extract_slide_number(&target).or_else(|| extract_slide_number(&id));
                        fallback.push((full_path.clone(), order_num));
                        targets.insert(id, full_path);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing relationships: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        let listed = match self.read_file_from_archive(archive, PRESENTATION_PATH) {
            Ok(content) => slide_id_list(&content)?,
            Err(e) => {
                log::warn!("No readable slide list, ordering by part name: {}", e);
                Vec::new()
            }
        };

        if !listed.is_empty() {
            return listed
                .iter()
                .map(|rel_id| {
                    targets.get(rel_id).cloned().ok_or_else(|| {
                        Error::XmlError(format!("Slide relationship '{}' not found", rel_id))
                    })
                })
                .collect();
        }

        fallback.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });
        Ok(fallback.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a single slide from the archive.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        slide_number: usize,
    ) -> Result<SlideSummary> {
        let content = self.read_file_from_archive(archive, slide_path)?;
        let mut slide = SlideSummary::new(slide_number);

        let mut shapes = self.extract_shapes_from_xml(&content, &mut slide)?;
        shapes.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

        for shape in shapes {
            if shape.is_title && slide.title.is_none() {
                slide.title = Some(shape.paragraphs.join(" "));
            }
            slide.lines.extend(shape.paragraphs);
        }

        Ok(slide)
    }

    /// Collect text shapes with their positions; pictures and tables are
    /// recorded on `slide` directly.
    fn extract_shapes_from_xml(
        &self,
        xml_content: &str,
        slide: &mut SlideSummary,
    ) -> Result<Vec<ShapeInfo>> {
        let mut shapes = Vec::new();
        let mut reader = Reader::from_str(xml_content);
        reader.trim_text(true);

        let mut current_shape: Option<ShapeInfo> = None;
        let mut in_table = false;
        let mut in_paragraph = false;
        let mut current_text = String::new();
        let mut current_row: Vec<String> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                    b"sp" => current_shape = Some(ShapeInfo::default()),
                    b"pic" => slide.has_picture = true,
                    b"tbl" => {
                        slide.has_table = true;
                        in_table = true;
                    }
                    b"tr" if in_table => current_row.clear(),
                    b"p" => {
                        in_paragraph = true;
                        current_text.clear();
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                    b"off" => {
                        if let Some(ref mut shape) = current_shape {
                            shape.x = number_attribute(e, b"x").unwrap_or(shape.x);
                            shape.y = number_attribute(e, b"y").unwrap_or(shape.y);
                        }
                    }
                    b"ph" => {
                        if let Some(ref mut shape) = current_shape {
                            let kind = attribute(e, b"type").unwrap_or_default();
                            shape.is_title = kind == "title" || kind == "ctrTitle";
                        }
                    }
                    b"p" if in_table => current_row.push(String::new()),
                    _ => {}
                },
                Ok(Event::Text(ref e)) => {
                    if in_paragraph {
                        let text = e.unescape().unwrap_or_default();
                        current_text.push_str(&text);
                    }
                }
                Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                    b"p" => {
                        in_paragraph = false;
                        let text = current_text.trim().to_string();
                        if in_table {
                            current_row.push(text);
                        } else if let Some(ref mut shape) = current_shape {
                            if !text.is_empty() {
                                shape.paragraphs.push(text);
                            }
                        }
                    }
                    b"sp" => {
                        if let Some(shape) = current_shape.take() {
                            if !shape.paragraphs.is_empty() {
                                shapes.push(shape);
                            }
                        }
                    }
                    b"tr" if in_table => {
                        slide.table_rows.push(std::mem::take(&mut current_row));
                    }
                    b"tbl" => in_table = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!("Error parsing slide: {}", e)));
                }
                _ => {}
            }
        }

        Ok(shapes)
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

impl Default for PptxInspector {
    fn default() -> Self {
        Self::new()
    }
}

/// A text shape extracted from slide XML.
#[derive(Debug, Default)]
struct ShapeInfo {
    paragraphs: Vec<String>,
    x: f64,
    y: f64,
    is_title: bool,
}

/// Relationship ids of `p:sldId` entries, in order.
fn slide_id_list(xml_content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                if let Some(id) = attribute(e, b"r:id") {
                    ids.push(id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

fn attribute(element: &BytesStart, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

fn number_attribute(element: &BytesStart, key: &[u8]) -> Option<f64> {
    attribute(element, key).and_then(|value| value.parse().ok())
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const SLIDE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

    fn deck(presentation: Option<&str>, slides: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        let mut rels = String::from("<Relationships>");
        for (index, (name, _)) in slides.iter().enumerate() {
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{}" Target="slides/{}"/>"#,
                index + 2,
                SLIDE_REL,
                name
            ));
        }
        rels.push_str("</Relationships>");
        zip.start_file(PRESENTATION_RELS_PATH, options).unwrap();
        zip.write_all(rels.as_bytes()).unwrap();

        if let Some(presentation) = presentation {
            zip.start_file(PRESENTATION_PATH, options).unwrap();
            zip.write_all(presentation.as_bytes()).unwrap();
        }
        for (name, xml) in slides {
            zip.start_file(format!("ppt/slides/{}", name), options).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }

        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    fn text_slide(title: &str) -> String {
        format!(
            r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            title
        )
    }

    #[test]
    fn test_slide_order_follows_presentation_list() {
        let first = text_slide("First");
        let second = text_slide("Second");
        let presentation = r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst><p:sldId id="256" r:id="rId3"/><p:sldId id="257" r:id="rId2"/></p:sldIdLst></p:presentation>"#;
        let deck = PptxInspector::new()
            .inspect(
                deck(Some(presentation), &[("slide2.xml", second.as_str()), ("slide1.xml", first.as_str())]),
                "deck.pptx",
            )
            .unwrap();

        let titles: Vec<_> = deck.slides.iter().map(|s| s.title()).collect();
        assert_eq!(titles, vec![Some("First"), Some("Second")]);
        assert_eq!(deck.slides[1].number, 2);
    }

    #[test]
    fn test_slide_order_without_presentation() {
        let first = text_slide("First");
        let tenth = text_slide("Tenth");
        let deck = PptxInspector::new()
            .inspect(deck(None, &[("slide10.xml", tenth.as_str()), ("slide1.xml", first.as_str())]), "deck.pptx")
            .unwrap();

        let titles: Vec<_> = deck.slides.iter().map(|s| s.title()).collect();
        assert_eq!(titles, vec![Some("First"), Some("Tenth")]);
    }

    #[test]
    fn test_lines_sorted_by_position() {
        let slide = r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree>
            <p:sp><p:spPr><a:xfrm><a:off x="0" y="500"/></a:xfrm></p:spPr><p:txBody><a:p><a:r><a:t>Bottom</a:t></a:r></a:p></p:txBody></p:sp>
            <p:sp><p:spPr><a:xfrm><a:off x="900" y="100"/></a:xfrm></p:spPr><p:txBody><a:p><a:r><a:t>Top right</a:t></a:r></a:p></p:txBody></p:sp>
            <p:sp><p:spPr><a:xfrm><a:off x="100" y="100"/></a:xfrm></p:spPr><p:txBody><a:p><a:r><a:t>Top left</a:t></a:r></a:p><a:p><a:endParaRPr/></a:p><a:p><a:r><a:t>second</a:t></a:r></a:p></p:txBody></p:sp>
            </p:spTree></p:cSld></p:sld>"#;
        let deck = PptxInspector::new()
            .inspect(deck(None, &[("slide1.xml", slide)]), "deck.pptx")
            .unwrap();

        let summary = &deck.slides[0];
        assert_eq!(summary.lines, vec!["Top left", "second", "Top right", "Bottom"]);
        assert_eq!(summary.title, None);
        assert_eq!(summary.title(), Some("Top left"));
        assert_eq!(summary.content_kind(), "text");
    }

    #[test]
    fn test_table_and_picture_detection() {
        let slide = r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree>
            <p:pic><p:nvPicPr><p:cNvPr id="4" name="Chart 1"/></p:nvPicPr></p:pic>
            <p:graphicFrame><a:graphic><a:graphicData><a:tbl>
            <a:tr><a:tc><a:txBody><a:p><a:r><a:t>X</a:t></a:r></a:p></a:txBody></a:tc><a:tc><a:txBody><a:p><a:r><a:t>Y</a:t></a:r></a:p></a:txBody></a:tc></a:tr>
            <a:tr><a:tc><a:txBody><a:p><a:r><a:t>1</a:t></a:r></a:p></a:txBody></a:tc><a:tc><a:txBody><a:p><a:endParaRPr/></a:p></a:txBody></a:tc></a:tr>
            </a:tbl></a:graphicData></a:graphic></p:graphicFrame>
            </p:spTree></p:cSld></p:sld>"#;
        let deck = PptxInspector::new()
            .inspect(deck(None, &[("slide1.xml", slide)]), "deck.pptx")
            .unwrap();

        let summary = &deck.slides[0];
        assert_eq!(summary.content_kind(), "picture+table");
        assert_eq!(
            summary.table_rows,
            vec![vec!["X", "Y"], vec!["1", ""]]
        );
        assert!(summary.lines.is_empty());
    }

    #[test]
    fn test_not_a_zip() {
        let result = PptxInspector::new().inspect(Cursor::new(b"not a deck".to_vec()), "x.pptx");
        assert!(matches!(result, Err(Error::ZipError(_))));
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slides/slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }
}
