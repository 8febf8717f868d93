//! Slide part XML: title, caption and one content block per chart.

use crate::options::EMU_PER_INCH;
use crate::package::{escape, NS_A, NS_P, NS_R};
use std::fmt::{self, Write};

/// Height of one preview table row in EMU (0.37in).
const TABLE_ROW_HEIGHT: i64 = 338_328;

/// What fills the content area of a slide.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Content {
    /// A picture related as `rel_id`, `pixels` wide and high.
    Picture {
        rel_id: String,
        pixels: (u32, u32),
        description: String,
    },

    /// A header row plus data rows of two cells each.
    Table {
        header: (String, String),
        rows: Vec<(String, String)>,
    },

    None,
}

/// A rectangle on the slide, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

/// Where the title, caption and content go on a slide of a given size.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub title: Frame,
    pub caption: Frame,
    pub content: Frame,
}

impl Layout {
    pub(crate) fn new(slide_width: i64, slide_height: i64) -> Self {
        let margin = EMU_PER_INCH;
        let inner_width = (slide_width - 2 * margin).max(EMU_PER_INCH);
        let content_top = EMU_PER_INCH * 23 / 10;

        Self {
            title: Frame {
                x: EMU_PER_INCH / 2,
                y: EMU_PER_INCH * 3 / 10,
                cx: (slide_width - EMU_PER_INCH).max(EMU_PER_INCH),
                cy: EMU_PER_INCH,
            },
            caption: Frame {
                x: margin,
                y: EMU_PER_INCH * 14 / 10,
                cx: inner_width,
                cy: EMU_PER_INCH * 8 / 10,
            },
            content: Frame {
                x: margin,
                y: content_top,
                cx: inner_width,
                cy: (slide_height - content_top - EMU_PER_INCH * 4 / 10).max(EMU_PER_INCH),
            },
        }
    }
}

/// Largest frame with the image's aspect ratio that fits `area`, centered.
pub(crate) fn fit_picture(area: Frame, pixels: (u32, u32)) -> Frame {
    let (width, height) = (pixels.0.max(1) as f64, pixels.1.max(1) as f64);
    let scale = (area.cx as f64 / width).min(area.cy as f64 / height);
    let cx = (width * scale).round() as i64;
    let cy = (height * scale).round() as i64;

    Frame {
        x: area.x + (area.cx - cx) / 2,
        y: area.y + (area.cy - cy) / 2,
        cx,
        cy,
    }
}

/// Build `ppt/slides/slideN.xml`.
pub(crate) fn slide_xml(
    layout: &Layout,
    title: &str,
    caption: &str,
    content: &Content,
) -> Result<String, fmt::Error> {
    let mut xml = String::with_capacity(4096);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    write!(
        xml,
        r#"<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:spTree>"#,
        NS_A, NS_R, NS_P
    )?;
    xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#);
    xml.push_str(r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#);

    write_title(&mut xml, 2, layout.title, title)?;
    write_text_box(&mut xml, 3, "Caption", layout.caption, caption)?;

    match content {
        Content::Picture {
            rel_id,
            pixels,
            description,
        } => write_picture(
            &mut xml,
            4,
            fit_picture(layout.content, *pixels),
            rel_id,
            description,
        )?,
        Content::Table { header, rows } => {
            write_table(&mut xml, 4, layout.content, header, rows)?
        }
        Content::None => {}
    }

    xml.push_str("</p:spTree></p:cSld>");
    xml.push_str(r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#);
    Ok(xml)
}

fn write_title(xml: &mut String, id: u32, frame: Frame, text: &str) -> fmt::Result {
    xml.push_str("<p:sp><p:nvSpPr>");
    write!(xml, r#"<p:cNvPr id="{}" name="Title {}"/>"#, id, id - 1)?;
    xml.push_str(r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>"#);
    xml.push_str("<p:spPr>");
    write_xfrm(xml, frame)?;
    xml.push_str("</p:spPr>");
    xml.push_str(r#"<p:txBody><a:bodyPr/><a:lstStyle/>"#);
    write_paragraph(xml, text, None)?;
    xml.push_str("</p:txBody></p:sp>");
    Ok(())
}

fn write_text_box(xml: &mut String, id: u32, name: &str, frame: Frame, text: &str) -> fmt::Result {
    xml.push_str("<p:sp><p:nvSpPr>");
    write!(xml, r#"<p:cNvPr id="{}" name="{}"/>"#, id, escape(name))?;
    xml.push_str(r#"<p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#);
    xml.push_str("<p:spPr>");
    write_xfrm(xml, frame)?;
    xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>"#);
    xml.push_str(r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>"#);
    for line in text.lines() {
        write_paragraph(xml, line, Some(1400))?;
    }
    if text.lines().next().is_none() {
        write_paragraph(xml, "", None)?;
    }
    xml.push_str("</p:txBody></p:sp>");
    Ok(())
}

fn write_picture(
    xml: &mut String,
    id: u32,
    frame: Frame,
    rel_id: &str,
    description: &str,
) -> fmt::Result {
    xml.push_str("<p:pic><p:nvPicPr>");
    write!(
        xml,
        r#"<p:cNvPr id="{}" name="Chart {}" descr="{}"/>"#,
        id,
        id - 3,
        escape(description)
    )?;
    xml.push_str(r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#);
    write!(
        xml,
        r#"<p:blipFill><a:blip r:embed="{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
        rel_id
    )?;
    xml.push_str("<p:spPr>");
    write_xfrm(xml, frame)?;
    xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#);
    Ok(())
}

fn write_table(
    xml: &mut String,
    id: u32,
    area: Frame,
    header: &(String, String),
    rows: &[(String, String)],
) -> fmt::Result {
    let row_count = rows.len() as i64 + 1;
    let frame = Frame {
        cy: TABLE_ROW_HEIGHT * row_count,
        ..area
    };
    let column_width = frame.cx / 2;

    xml.push_str("<p:graphicFrame><p:nvGraphicFramePr>");
    write!(xml, r#"<p:cNvPr id="{}" name="Data Preview"/>"#, id)?;
    xml.push_str(r#"<p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr>"#);
    write!(
        xml,
        r#"<p:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></p:xfrm>"#,
        frame.x, frame.y, frame.cx, frame.cy
    )?;
    xml.push_str(r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl>"#);
    xml.push_str(r#"<a:tblPr firstRow="1" bandRow="1"/>"#);
    write!(
        xml,
        r#"<a:tblGrid><a:gridCol w="{0}"/><a:gridCol w="{0}"/></a:tblGrid>"#,
        column_width
    )?;

    write_table_row(xml, header)?;
    for row in rows {
        write_table_row(xml, row)?;
    }

    xml.push_str("</a:tbl></a:graphicData></a:graphic></p:graphicFrame>");
    Ok(())
}

fn write_table_row(xml: &mut String, (left, right): &(String, String)) -> fmt::Result {
    write!(xml, r#"<a:tr h="{}">"#, TABLE_ROW_HEIGHT)?;
    for cell in [left, right] {
        xml.push_str("<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>");
        write_paragraph(xml, cell, Some(1200))?;
        xml.push_str("</a:txBody><a:tcPr/></a:tc>");
    }
    xml.push_str("</a:tr>");
    Ok(())
}

/// One `a:p`; empty text becomes an empty paragraph.
fn write_paragraph(xml: &mut String, text: &str, size: Option<u32>) -> fmt::Result {
    let size = size.map(|s| format!(r#" sz="{}""#, s)).unwrap_or_default();
    if text.is_empty() {
        return write!(xml, r#"<a:p><a:endParaRPr lang="en-US"{}/></a:p>"#, size);
    }
    write!(
        xml,
        r#"<a:p><a:r><a:rPr lang="en-US"{} dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
        size,
        escape(text)
    )
}

fn write_xfrm(xml: &mut String, frame: Frame) -> fmt::Result {
    write!(
        xml,
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        frame.x, frame.y, frame.cx, frame.cy
    )
}
