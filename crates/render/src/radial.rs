//! Charts drawn in pixel space around a center: pie, donut, radar and
//! funnel.

use crate::error::{RenderError, Result};
use crate::palette::{caption_font, centered_text, label_font, left_text, series_color};
use crate::renderer::Area;
use chartdeck_core::types::format_number;
use chartdeck_core::Series;
use plotters::prelude::*;
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, TAU};

/// Slices narrower than this (radians) get no percentage label.
const MIN_LABELED_SWEEP: f64 = 0.2;

const LEGEND_ROW: i32 = 24;

type Point = (i32, i32);

/// Wedges sized by each label's share of the total. Repeated labels are
/// summed; non-positive totals are left out. `hole` is the inner radius as
/// a fraction of the outer one (0 for a pie).
pub(crate) fn pie(root: &Area, title: &str, series: &Series, hole: f64) -> Result<()> {
    let slices = slices(series);
    let total: f64 = slices.iter().map(|(_, value)| value).sum();
    if total <= 0.0 {
        return Err(RenderError::Empty(title.to_string()));
    }

    let area = root.titled(title, caption_font())?;
    let (width, height) = dimensions(&area);
    let legend_width = (width / 4).min(240);
    let center = ((width - legend_width) / 2, height / 2);
    let radius = (width - legend_width).min(height) as f64 * 0.42;

    let mut start = -FRAC_PI_2;
    let mut sweeps = Vec::with_capacity(slices.len());
    for (index, (_, value)) in slices.iter().enumerate() {
        let sweep = value / total * TAU;
        area.draw(&Polygon::new(
            wedge(center, radius, start, sweep),
            series_color(index).filled(),
        ))?;
        sweeps.push((start, sweep, value / total));
        start += sweep;
    }

    if hole > 0.0 {
        area.draw(&Circle::new(
            center,
            (radius * hole).round() as i32,
            WHITE.filled(),
        ))?;
    }

    let label_radius = if hole > 0.0 {
        radius * (1.0 + hole) / 2.0
    } else {
        radius * 0.65
    };
    let percent_style = centered_text(15);
    for &(start, sweep, share) in &sweeps {
        if sweep < MIN_LABELED_SWEEP {
            continue;
        }
        area.draw(&Text::new(
            format!("{:.1}%", share * 100.0),
            polar(center, label_radius, start + sweep / 2.0),
            percent_style.clone(),
        ))?;
    }

    let legend_x = width - legend_width + 10;
    let visible = ((height - 20) / LEGEND_ROW).max(0) as usize;
    for (index, (label, _)) in slices.iter().take(visible).enumerate() {
        let top = 20 + index as i32 * LEGEND_ROW;
        area.draw(&Rectangle::new(
            [(legend_x, top), (legend_x + 14, top + 14)],
            series_color(index).filled(),
        ))?;
        area.draw(&Text::new(
            label.clone(),
            (legend_x + 20, top),
            label_font(14),
        ))?;
    }
    if slices.len() > visible {
        log::debug!(
            "Pie legend shows {} of {} labels",
            visible,
            slices.len()
        );
    }

    Ok(())
}

/// A closed polygon over one spoke per point, scaled to the largest value.
pub(crate) fn radar(root: &Area, title: &str, series: &Series) -> Result<()> {
    let count = series.points.len();
    if count == 0 {
        return Err(RenderError::Empty(title.to_string()));
    }
    let largest = series
        .points
        .iter()
        .map(|(_, y)| *y)
        .fold(0.0, f64::max);
    let scale = if largest > 0.0 { largest } else { 1.0 };

    let area = root.titled(title, caption_font())?;
    let (width, height) = dimensions(&area);
    let center = (width / 2, height / 2);
    let radius = width.min(height) as f64 * 0.36;
    let angle = |i: usize| -FRAC_PI_2 + TAU * i as f64 / count as f64;

    let grid = BLACK.mix(0.2);
    let sides = count.max(3);
    for step in 1..=4 {
        let r = radius * step as f64 / 4.0;
        let ring: Vec<Point> = (0..=sides)
            .map(|i| polar(center, r, -FRAC_PI_2 + TAU * i as f64 / sides as f64))
            .collect();
        area.draw(&PathElement::new(ring, grid))?;
    }

    let label_style = centered_text(14);
    for (i, (x, _)) in series.points.iter().enumerate() {
        area.draw(&PathElement::new(
            vec![center, polar(center, radius, angle(i))],
            grid,
        ))?;
        area.draw(&Text::new(
            x.display(),
            polar(center, radius + 24.0, angle(i)),
            label_style.clone(),
        ))?;
    }
    area.draw(&Text::new(
        format_number(scale),
        (center.0 + 6, center.1 - radius.round() as i32),
        label_font(12),
    ))?;

    let outline: Vec<Point> = series
        .points
        .iter()
        .enumerate()
        .map(|(i, (_, y))| polar(center, radius * y.max(0.0) / scale, angle(i)))
        .collect();
    let color = series_color(0);
    area.draw(&Polygon::new(outline.clone(), color.mix(0.3).filled()))?;

    let mut closed = outline;
    if let Some(&first) = closed.first() {
        closed.push(first);
    }
    area.draw(&PathElement::new(closed, color.stroke_width(2)))?;

    Ok(())
}

/// Horizontal bars centered on a common axis, one per stage, in row order.
pub(crate) fn funnel(root: &Area, title: &str, series: &Series) -> Result<()> {
    let count = series.points.len() as i32;
    if count == 0 {
        return Err(RenderError::Empty(title.to_string()));
    }
    let largest = series
        .points
        .iter()
        .map(|(_, y)| *y)
        .fold(0.0, f64::max);
    let scale = if largest > 0.0 { largest } else { 1.0 };

    let area = root.titled(title, caption_font())?;
    let (width, height) = dimensions(&area);
    let label_width = (width / 4).min(200);
    let plot_width = (width - label_width - 20).max(1);
    let center_x = label_width + plot_width / 2;
    let row = ((height - 20) / count).max(1);
    let bar_height = ((row as f64 * 0.8).round() as i32).max(1);

    let color = series_color(0);
    let value_style = centered_text(14);
    let stage_style = left_text(14);
    for (i, (x, y)) in series.points.iter().enumerate() {
        let top = 10 + i as i32 * row;
        let middle = top + bar_height / 2;
        let half = (plot_width as f64 * y.max(0.0) / scale / 2.0).round() as i32;

        area.draw(&Rectangle::new(
            [(center_x - half, top), (center_x + half, top + bar_height)],
            color.filled(),
        ))?;
        area.draw(&Text::new(x.display(), (10, middle), stage_style.clone()))?;
        area.draw(&Text::new(
            format_number(*y),
            (center_x, middle),
            value_style.clone(),
        ))?;
    }

    Ok(())
}

/// Positive per-label totals in first-seen order.
fn slices(series: &Series) -> Vec<(String, f64)> {
    let mut slices: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (x, y) in &series.points {
        let label = x.display();
        match index.get(&label) {
            Some(&i) => slices[i].1 += y,
            None => {
                index.insert(label.clone(), slices.len());
                slices.push((label, *y));
            }
        }
    }

    let before = slices.len();
    slices.retain(|(_, value)| *value > 0.0);
    if slices.len() < before {
        log::debug!(
            "Dropped {} non-positive slices from '{}'",
            before - slices.len(),
            series.name
        );
    }
    slices
}

fn dimensions(area: &Area) -> (i32, i32) {
    let (width, height) = area.dim_in_pixel();
    (width as i32, height as i32)
}

fn polar(center: Point, radius: f64, angle: f64) -> Point {
    (
        center.0 + (radius * angle.cos()).round() as i32,
        center.1 + (radius * angle.sin()).round() as i32,
    )
}

/// Polygon for a circular sector starting at `start` and spanning `sweep`.
fn wedge(center: Point, radius: f64, start: f64, sweep: f64) -> Vec<Point> {
    let steps = ((sweep / TAU * 180.0).ceil() as usize).max(2);
    let mut points = Vec::with_capacity(steps + 2);
    points.push(center);
    for step in 0..=steps {
        points.push(polar(center, radius, start + sweep * step as f64 / steps as f64));
    }
    points
}
