//! Series colors, the correlation color scale and text styles.

use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, IntoFont, RGBColor, TextStyle};

const FONT_FAMILY: &str = "sans-serif";
const CAPTION_SIZE: u32 = 28;

const SERIES: [RGBColor; 10] = [
    RGBColor(99, 110, 250),
    RGBColor(239, 85, 59),
    RGBColor(0, 204, 150),
    RGBColor(171, 99, 250),
    RGBColor(255, 161, 90),
    RGBColor(25, 211, 243),
    RGBColor(255, 102, 146),
    RGBColor(182, 232, 128),
    RGBColor(255, 151, 255),
    RGBColor(254, 203, 82),
];

const NEGATIVE: (f64, f64, f64) = (33.0, 102.0, 172.0);
const POSITIVE: (f64, f64, f64) = (178.0, 24.0, 43.0);
const UNDEFINED: RGBColor = RGBColor(220, 220, 220);

/// Color for the `index`-th series, cycling.
pub(crate) fn series_color(index: usize) -> RGBColor {
    SERIES[index % SERIES.len()]
}

/// Blue-white-red color for a coefficient in `[-1, 1]`; gray for NaN.
pub(crate) fn correlation_color(value: f64) -> RGBColor {
    if value.is_nan() {
        return UNDEFINED;
    }
    let t = value.clamp(-1.0, 1.0);
    let (r, g, b) = if t < 0.0 { NEGATIVE } else { POSITIVE };
    let weight = t.abs();
    let mix = |channel: f64| (255.0 + (channel - 255.0) * weight).round() as u8;
    RGBColor(mix(r), mix(g), mix(b))
}

/// Chart title font.
pub(crate) fn caption_font() -> FontDesc<'static> {
    (FONT_FAMILY, CAPTION_SIZE).into_font()
}

/// Plain label font of the given size.
pub(crate) fn label_font(size: u32) -> FontDesc<'static> {
    (FONT_FAMILY, size).into_font()
}

/// Label style anchored at its center point.
pub(crate) fn centered_text(size: u32) -> TextStyle<'static> {
    TextStyle::from(label_font(size)).pos(Pos::new(HPos::Center, VPos::Center))
}

/// Label style anchored at its left edge, vertically centered.
pub(crate) fn left_text(size: u32) -> TextStyle<'static> {
    TextStyle::from(label_font(size)).pos(Pos::new(HPos::Left, VPos::Center))
}
