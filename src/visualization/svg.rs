//! Standalone SVG rendering

use std::fmt::Write;
use std::fs;
use std::path::PathBuf;

use tracing::info;

use super::{Chart, ChartKind, ChartSink};
use crate::dataset::DescribeStats;
use crate::error::Result;
use crate::explainability::PDPResult;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 480.0;
const PANEL_WIDTH: f64 = 300.0;
const PANEL_HEIGHT: f64 = 240.0;
const MARGIN_LEFT: f64 = 64.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 52.0;
const N_TICKS: usize = 5;

const STROKE: &str = "#333333";
const FILL: &str = "#1f77b4";

/// Writes each chart as `<output_dir>/<file_name>`
#[derive(Debug)]
pub struct SvgChartSink {
    output_dir: PathBuf,
}

impl SvgChartSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl ChartSink for SvgChartSink {
    fn emit(&mut self, chart: &Chart) -> Result<()> {
        let svg = render_svg(chart)?;
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(&chart.file_name);
        fs::write(&path, svg)?;
        info!(path = %path.display(), "Saved chart");
        Ok(())
    }
}

/// Render a chart to an SVG document
pub fn render_svg(chart: &Chart) -> Result<String> {
    let mut out = String::new();
    match &chart.kind {
        ChartKind::BoxPlot { label, stats } => {
            let frame = Frame::new(0.0, 0.0, WIDTH, HEIGHT, (0.0, 2.0), padded(stats.min, stats.max));
            open_document(&mut out, WIDTH, HEIGHT, &chart.title)?;
            frame.axes(&mut out, "", label, false)?;
            draw_box(&mut out, &frame, stats)?;
        }
        ChartKind::Scatter {
            points,
            x_label,
            y_label,
        } => {
            let xs = bounds(points.iter().map(|p| p.0));
            let ys = bounds(points.iter().map(|p| p.1));
            let frame = Frame::new(0.0, 0.0, WIDTH, HEIGHT, padded(xs.0, xs.1), padded(ys.0, ys.1));
            open_document(&mut out, WIDTH, HEIGHT, &chart.title)?;
            frame.axes(&mut out, x_label, y_label, true)?;
            for &(x, y) in points {
                writeln!(
                    out,
                    r#"<circle cx="{:.2}" cy="{:.2}" r="4" fill="{}"/>"#,
                    frame.sx(x),
                    frame.sy(y),
                    FILL
                )?;
            }
        }
        ChartKind::PartialDependenceGrid { panels, n_cols } => {
            let n_cols = (*n_cols).max(1).min(panels.len().max(1));
            let n_rows = panels.len().div_ceil(n_cols).max(1);
            let width = PANEL_WIDTH * n_cols as f64;
            let height = PANEL_HEIGHT * n_rows as f64 + MARGIN_TOP;
            let ys = padded_range(bounds(
                panels.iter().flat_map(|p| p.average_predictions.iter().copied()),
            ));

            open_document(&mut out, width, height, &chart.title)?;
            for (i, panel) in panels.iter().enumerate() {
                let (row, col) = (i / n_cols, i % n_cols);
                let xs = padded_range(bounds(panel.grid_values.iter().copied()));
                let frame = Frame::new(
                    col as f64 * PANEL_WIDTH,
                    MARGIN_TOP / 2.0 + row as f64 * PANEL_HEIGHT,
                    PANEL_WIDTH,
                    PANEL_HEIGHT,
                    xs,
                    ys,
                );
                let y_label = if col == 0 { "Partial dependence" } else { "" };
                frame.axes(&mut out, &panel_name(panel), y_label, true)?;
                draw_line(&mut out, &frame, panel)?;
            }
        }
    }
    writeln!(out, "</svg>")?;
    Ok(out)
}

/// Plot area inside a rectangle of the document
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Frame {
    fn new(x: f64, y: f64, width: f64, height: f64, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self {
            left: x + MARGIN_LEFT,
            top: y + MARGIN_TOP,
            width: width - MARGIN_LEFT - MARGIN_RIGHT,
            height: height - MARGIN_TOP - MARGIN_BOTTOM,
            x_range,
            y_range,
        }
    }

    fn sx(&self, x: f64) -> f64 {
        let (lo, hi) = self.x_range;
        self.left + (x - lo) / (hi - lo) * self.width
    }

    fn sy(&self, y: f64) -> f64 {
        let (lo, hi) = self.y_range;
        self.top + self.height - (y - lo) / (hi - lo) * self.height
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn axes(&self, out: &mut String, x_label: &str, y_label: &str, x_ticks: bool) -> Result<()> {
        writeln!(
            out,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="none" stroke="{}"/>"#,
            self.left, self.top, self.width, self.height, STROKE
        )?;

        for value in ticks(self.y_range) {
            let y = self.sy(value);
            writeln!(
                out,
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}"/>"#,
                self.left - 4.0,
                y,
                self.left,
                y,
                STROKE
            )?;
            writeln!(
                out,
                r#"<text x="{:.2}" y="{:.2}" font-size="11" text-anchor="end">{}</text>"#,
                self.left - 6.0,
                y + 4.0,
                format_tick(value)
            )?;
        }

        if x_ticks {
            for value in ticks(self.x_range) {
                let x = self.sx(value);
                writeln!(
                    out,
                    r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}"/>"#,
                    x,
                    self.bottom(),
                    x,
                    self.bottom() + 4.0,
                    STROKE
                )?;
                writeln!(
                    out,
                    r#"<text x="{:.2}" y="{:.2}" font-size="11" text-anchor="middle">{}</text>"#,
                    x,
                    self.bottom() + 16.0,
                    format_tick(value)
                )?;
            }
        }

        if !x_label.is_empty() {
            writeln!(
                out,
                r#"<text x="{:.2}" y="{:.2}" font-size="13" text-anchor="middle">{}</text>"#,
                self.left + self.width / 2.0,
                self.bottom() + 36.0,
                escape(x_label)
            )?;
        }
        if !y_label.is_empty() {
            let (x, y) = (self.left - 48.0, self.top + self.height / 2.0);
            writeln!(
                out,
                r#"<text x="{:.2}" y="{:.2}" font-size="13" text-anchor="middle" transform="rotate(-90 {:.2} {:.2})">{}</text>"#,
                x,
                y,
                x,
                y,
                escape(y_label)
            )?;
        }
        Ok(())
    }
}

fn open_document(out: &mut String, width: f64, height: f64, title: &str) -> Result<()> {
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = width,
        h = height
    )?;
    writeln!(out, "<title>{}</title>", escape(title))?;
    writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        out,
        r#"<text x="{:.2}" y="20" font-size="15" text-anchor="middle">{}</text>"#,
        width / 2.0,
        escape(title)
    )?;
    Ok(())
}

fn draw_box(out: &mut String, frame: &Frame, stats: &DescribeStats) -> Result<()> {
    let (x_lo, x_mid, x_hi) = (frame.sx(0.6), frame.sx(1.0), frame.sx(1.4));
    let (q1, q3) = (frame.sy(stats.q1), frame.sy(stats.q3));

    writeln!(
        out,
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" fill-opacity="0.4" stroke="{}"/>"#,
        x_lo,
        q3,
        x_hi - x_lo,
        (q1 - q3).max(1.0),
        FILL,
        STROKE
    )?;
    let median = frame.sy(stats.median);
    writeln!(
        out,
        r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="2"/>"#,
        x_lo, median, x_hi, median, STROKE
    )?;

    for (edge, whisker) in [(q3, stats.upper_whisker), (q1, stats.lower_whisker)] {
        let end = frame.sy(whisker);
        writeln!(
            out,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}"/>"#,
            x_mid, edge, x_mid, end, STROKE
        )?;
        writeln!(
            out,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}"/>"#,
            frame.sx(0.8),
            end,
            frame.sx(1.2),
            end,
            STROKE
        )?;
    }

    for &outlier in &stats.outliers {
        writeln!(
            out,
            r#"<circle cx="{:.2}" cy="{:.2}" r="3" fill="none" stroke="{}"/>"#,
            x_mid,
            frame.sy(outlier),
            STROKE
        )?;
    }
    Ok(())
}

fn draw_line(out: &mut String, frame: &Frame, panel: &PDPResult) -> Result<()> {
    let mut points = String::new();
    for (&x, &y) in panel.grid_values.iter().zip(&panel.average_predictions) {
        write!(points, "{:.2},{:.2} ", frame.sx(x), frame.sy(y))?;
    }
    writeln!(
        out,
        r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="1.5"/>"#,
        points.trim_end(),
        FILL
    )?;
    Ok(())
}

fn panel_name(panel: &PDPResult) -> String {
    panel
        .feature_name
        .clone()
        .unwrap_or_else(|| format!("feature {}", panel.feature_index))
}

/// Min and max of finite values, `(0, 1)` when there are none
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo.is_finite() {
        (lo, hi)
    } else {
        (0.0, 1.0)
    }
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    padded_range((lo, hi))
}

/// Widen by 5% each side; a degenerate range gets a unit window
fn padded_range((lo, hi): (f64, f64)) -> (f64, f64) {
    let span = hi - lo;
    if span.abs() < f64::EPSILON {
        return (lo - 0.5, hi + 0.5);
    }
    (lo - span * 0.05, hi + span * 0.05)
}

fn ticks((lo, hi): (f64, f64)) -> impl Iterator<Item = f64> {
    let step = (hi - lo) / (N_TICKS - 1) as f64;
    (0..N_TICKS).map(move |i| lo + step * i as f64)
}

fn format_tick(value: f64) -> String {
    if value.abs() >= 100.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
