//! Charts drawn on x/y axes: bars, lines, areas, scatter, bubbles,
//! histograms and the correlation heatmap.

use crate::error::{RenderError, Result};
use crate::palette::{caption_font, centered_text, correlation_color, series_color};
use crate::renderer::Area;
use chartdeck_core::data::format_coefficient;
use chartdeck_core::types::format_number;
use chartdeck_core::{ChartData, CorrelationMatrix, HistogramBin, Series, XValue};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use std::collections::HashMap;
use std::ops::Range;

const MARGIN: u32 = 20;
const X_LABEL_AREA: u32 = 50;
const Y_LABEL_AREA: u32 = 70;

/// Most category labels shown on one axis.
const MAX_SLOT_LABELS: usize = 30;

type XyChart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// How a line-like chart is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    Line,
    Area,
    /// Line plus point markers.
    Mixed,
}

/// Category labels placed at integer slots 0, 1, 2, ...
struct Slots {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl Slots {
    fn from_series(series: &[Series]) -> Self {
        let mut slots = Slots {
            labels: Vec::new(),
            index: HashMap::new(),
        };
        for (x, _) in series.iter().flat_map(|s| &s.points) {
            let label = x.display();
            if !slots.index.contains_key(&label) {
                slots.index.insert(label.clone(), slots.labels.len());
                slots.labels.push(label);
            }
        }
        slots
    }

    fn len(&self) -> usize {
        self.labels.len()
    }

    fn position(&self, x: &XValue) -> usize {
        self.index.get(&x.display()).copied().unwrap_or(0)
    }

    fn range(&self) -> Range<f64> {
        -0.5..(self.labels.len() as f64 - 0.5)
    }

    fn label_at(&self, value: f64) -> String {
        let nearest = value.round();
        if (value - nearest).abs() > 1e-6 || nearest < 0.0 {
            return String::new();
        }
        self.labels.get(nearest as usize).cloned().unwrap_or_default()
    }
}

/// The x axis of a series chart: numeric when every x is a number.
enum XAxis {
    Numeric(Range<f64>),
    Slots(Slots),
}

impl XAxis {
    fn from_series(series: &[Series]) -> Self {
        if series.iter().all(Series::has_numeric_x) {
            let values = series.iter().flat_map(|s| &s.points).map(|(x, _)| match x {
                XValue::Number(value) => *value,
                XValue::Label(_) => f64::NAN,
            });
            XAxis::Numeric(padded_range(values, false))
        } else {
            XAxis::Slots(Slots::from_series(series))
        }
    }

    fn position(&self, x: &XValue) -> f64 {
        match (self, x) {
            (XAxis::Numeric(_), XValue::Number(value)) => *value,
            (XAxis::Numeric(_), XValue::Label(_)) => f64::NAN,
            (XAxis::Slots(slots), x) => slots.position(x) as f64,
        }
    }

    fn range(&self) -> Range<f64> {
        match self {
            XAxis::Numeric(range) => range.clone(),
            XAxis::Slots(slots) => slots.range(),
        }
    }

    fn label(&self, value: f64) -> String {
        match self {
            XAxis::Numeric(_) => tick_label(value),
            XAxis::Slots(slots) => slots.label_at(value),
        }
    }

    fn label_count(&self) -> usize {
        match self {
            XAxis::Numeric(_) => 10,
            XAxis::Slots(slots) => slots.len().clamp(1, MAX_SLOT_LABELS),
        }
    }
}

/// Bars per category slot, one group member per series. Repeated
/// categories within a series are summed.
pub(crate) fn bars(root: &Area, title: &str, data: &ChartData, series: &[Series]) -> Result<()> {
    let slots = Slots::from_series(series);
    let totals: Vec<Vec<f64>> = series
        .iter()
        .map(|s| {
            let mut totals = vec![0.0; slots.len()];
            for (x, y) in &s.points {
                totals[slots.position(x)] += y;
            }
            totals
        })
        .collect();

    let axis = XAxis::Slots(slots);
    let y_range = padded_range(totals.iter().flatten().copied(), true);
    let mut chart = build_chart(root, title, axis.range(), y_range)?;
    draw_mesh(&mut chart, &axis, data)?;

    let width = 0.8 / series.len().max(1) as f64;
    for (index, (s, totals)) in series.iter().zip(&totals).enumerate() {
        let color = series_color(index);
        let offset = -0.4 + width * index as f64;
        chart
            .draw_series(totals.iter().enumerate().map(|(slot, &value)| {
                let left = slot as f64 + offset;
                Rectangle::new([(left, 0.0), (left + width, value)], color.filled())
            }))?
            .label(s.name.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
    }

    draw_legend(&mut chart, series.len())
}

/// Polylines in row order, optionally filled to zero or marked.
pub(crate) fn lines(
    root: &Area,
    title: &str,
    data: &ChartData,
    series: &[Series],
    kind: LineKind,
) -> Result<()> {
    let axis = XAxis::from_series(series);
    let y_range = padded_range(y_values(series), kind == LineKind::Area);
    let mut chart = build_chart(root, title, axis.range(), y_range)?;
    draw_mesh(&mut chart, &axis, data)?;

    for (index, s) in series.iter().enumerate() {
        let color = series_color(index);
        let points: Vec<(f64, f64)> = s.points.iter().map(|(x, y)| (axis.position(x), *y)).collect();

        let anno = match kind {
            LineKind::Line => chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?,
            LineKind::Area => chart.draw_series(
                AreaSeries::new(points, 0.0, color.mix(0.3)).border_style(color.stroke_width(2)),
            )?,
            LineKind::Mixed => {
                chart.draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?;
                chart.draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))?
            }
        };
        anno.label(s.name.clone()).legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
        });
    }

    draw_legend(&mut chart, series.len())
}

/// Dots; with `sized` each dot's area follows its y value.
pub(crate) fn points(
    root: &Area,
    title: &str,
    data: &ChartData,
    series: &[Series],
    sized: bool,
) -> Result<()> {
    let axis = XAxis::from_series(series);
    let y_range = padded_range(y_values(series), false);
    let largest = y_values(series).map(f64::abs).fold(0.0, f64::max);
    let mut chart = build_chart(root, title, axis.range(), y_range)?;
    draw_mesh(&mut chart, &axis, data)?;

    for (index, s) in series.iter().enumerate() {
        let color = series_color(index);
        chart
            .draw_series(s.points.iter().map(|(x, y)| {
                let (radius, style) = if sized {
                    (bubble_radius(*y, largest), color.mix(0.6).filled())
                } else {
                    (4, color.filled())
                };
                Circle::new((axis.position(x), *y), radius, style)
            }))?
            .label(s.name.clone())
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    draw_legend(&mut chart, series.len())
}

/// Adjacent bars, one per bin.
pub(crate) fn histogram(
    root: &Area,
    title: &str,
    data: &ChartData,
    bins: &[HistogramBin],
) -> Result<()> {
    let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
        return Err(RenderError::Empty(title.to_string()));
    };
    let tallest = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;

    let mut chart = build_chart(root, title, first.start..last.end, 0.0..(tallest * 1.1).max(1.0))?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|v: &f64| tick_label(*v))
        .y_label_formatter(&|v: &f64| format!("{:.0}", v))
        .x_desc(data.x_title.clone().unwrap_or_default())
        .y_desc(data.y_title.clone().unwrap_or_default())
        .draw()?;

    let color = series_color(0);
    chart.draw_series(bins.iter().map(|bin| {
        Rectangle::new([(bin.start, 0.0), (bin.end, bin.count as f64)], color.filled())
    }))?;
    chart.draw_series(bins.iter().map(|bin| {
        Rectangle::new([(bin.start, 0.0), (bin.end, bin.count as f64)], WHITE.stroke_width(1))
    }))?;

    Ok(())
}

/// Square heatmap with the coefficient printed in every cell. The first
/// column is drawn in the top row.
pub(crate) fn heatmap(root: &Area, title: &str, matrix: &CorrelationMatrix) -> Result<()> {
    let n = matrix.len() as i32;
    let mut chart = ChartBuilder::on(root)
        .caption(title, caption_font())
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(Y_LABEL_AREA * 2)
        .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n as usize)
        .y_labels(n as usize)
        .x_label_formatter(&|v: &SegmentValue<i32>| segment_label(v, &matrix.columns, false))
        .y_label_formatter(&|v: &SegmentValue<i32>| segment_label(v, &matrix.columns, true))
        .draw()?;

    let cells: Vec<(i32, i32, f64)> = (0..n)
        .flat_map(|row| (0..n).map(move |col| (row, col)))
        .map(|(row, col)| (row, col, matrix.get(row as usize, col as usize)))
        .collect();

    chart.draw_series(cells.iter().map(|&(row, col, value)| {
        let y = n - 1 - row;
        Rectangle::new(
            [
                (SegmentValue::Exact(col), SegmentValue::Exact(y)),
                (SegmentValue::Exact(col + 1), SegmentValue::Exact(y + 1)),
            ],
            correlation_color(value).filled(),
        )
    }))?;

    let style = centered_text(16);
    chart.draw_series(cells.iter().map(|&(row, col, value)| {
        Text::new(
            format_coefficient(value),
            (SegmentValue::CenterOf(col), SegmentValue::CenterOf(n - 1 - row)),
            style.clone(),
        )
    }))?;

    Ok(())
}

fn build_chart<'a, 'b>(
    root: &'a Area<'b>,
    title: &str,
    x_range: Range<f64>,
    y_range: Range<f64>,
) -> Result<XyChart<'a, 'b>> {
    Ok(ChartBuilder::on(root)
        .caption(title, caption_font())
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(x_range, y_range)?)
}

fn draw_mesh(chart: &mut XyChart<'_, '_>, axis: &XAxis, data: &ChartData) -> Result<()> {
    chart
        .configure_mesh()
        .x_labels(axis.label_count())
        .x_label_formatter(&|v: &f64| axis.label(*v))
        .y_label_formatter(&|v: &f64| tick_label(*v))
        .x_desc(data.x_title.clone().unwrap_or_default())
        .y_desc(data.y_title.clone().unwrap_or_default())
        .draw()?;
    Ok(())
}

fn draw_legend<'a, 'b: 'a>(chart: &mut XyChart<'a, 'b>, series_count: usize) -> Result<()> {
    if series_count > 1 {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }
    Ok(())
}

fn y_values(series: &[Series]) -> impl Iterator<Item = f64> + '_ {
    series.iter().flat_map(|s| s.points.iter().map(|(_, y)| *y))
}

/// Value range padded by 5% on each side; with `include_zero` the range
/// always covers zero and does not pad past it.
fn padded_range(values: impl Iterator<Item = f64>, include_zero: bool) -> Range<f64> {
    let (mut low, mut high) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if low > high {
        return 0.0..1.0;
    }
    if include_zero {
        low = low.min(0.0);
        high = high.max(0.0);
    }
    if low == high {
        low -= 1.0;
        high += 1.0;
    }

    let pad = (high - low) * 0.05;
    let start = if include_zero && low == 0.0 { 0.0 } else { low - pad };
    let end = if include_zero && high == 0.0 { 0.0 } else { high + pad };
    start..end
}

fn bubble_radius(value: f64, largest: f64) -> i32 {
    if largest <= 0.0 {
        return 6;
    }
    (6.0 + 24.0 * (value.abs() / largest).sqrt()).round() as i32
}

fn tick_label(value: f64) -> String {
    format_number((value * 100.0).round() / 100.0)
}

fn segment_label(value: &SegmentValue<i32>, columns: &[String], reversed: bool) -> String {
    match value {
        SegmentValue::CenterOf(index) => {
            let index = if reversed {
                columns.len() as i32 - 1 - index
            } else {
                *index
            };
            usize::try_from(index)
                .ok()
                .and_then(|i| columns.get(i))
                .cloned()
                .unwrap_or_default()
        }
        _ => String::new(),
    }
}
