// src/sink/chart.rs
//! Headless grouped bar chart: one group per year, one bar per quarter.
//!
//! Rendering produces SVG text and never touches a display, so it runs the
//! same way in a terminal session, a cron job or a test.

use std::{fmt::Write as _, io::Write as _, path::Path};
use tracing::{debug, instrument};

use super::{persist, staging_file};
use crate::config::ChartConfig;
use crate::error::{Error, Result};
use crate::process::PivotTable;

/// Matplotlib's default categorical cycle.
const PALETTE: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 130.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: f64 = 5.0;
/// Upper bound on grid lines; `nice_step` keeps real axes near `Y_TICKS`.
const MAX_TICKS: f64 = 100.0;
/// Share of each year's slot covered by bars.
const GROUP_FILL: f64 = 0.8;

/// Render `table` as an SVG document.
pub fn render(table: &PivotTable, opts: &ChartConfig) -> Result<String> {
    let width = f64::from(opts.width);
    let height = f64::from(opts.height);
    let plot = Rect {
        x: MARGIN_LEFT,
        y: MARGIN_TOP,
        w: (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0),
        h: (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
    };
    let axis = ValueAxis::fit(table)?;

    let mut svg = String::new();
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
        w = opts.width,
        h = opts.height
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        svg,
        r#"<text class="title" x="{}" y="{}" text-anchor="middle" font-size="16">{}</text>"#,
        width / 2.0,
        MARGIN_TOP / 2.0 + 5.0,
        escape(&opts.title)
    )?;

    // grid + y tick labels
    for tick in axis.ticks() {
        let y = axis.project(tick, &plot);
        writeln!(
            svg,
            r##"<line x1="{x1:.1}" y1="{y:.1}" x2="{x2:.1}" y2="{y:.1}" stroke="#e0e0e0"/>"##,
            x1 = plot.x,
            x2 = plot.x + plot.w
        )?;
        writeln!(
            svg,
            r#"<text class="y-tick" x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
            plot.x - 6.0,
            y + 4.0,
            format_tick(tick)
        )?;
    }

    // bars
    let years = table.years().len();
    let quarters = table.quarters().len();
    if years > 0 && quarters > 0 {
        let slot = plot.w / years as f64;
        let bar_w = slot * GROUP_FILL / quarters as f64;
        let zero = axis.project(0.0, &plot);

        for (r, (year, row)) in table.rows().enumerate() {
            let group_x = plot.x + slot * r as f64;
            for (c, cell) in row.iter().enumerate() {
                let Some(value) = *cell else { continue };
                let top = axis.project(value.max(0.0), &plot);
                let bottom = axis.project(value.min(0.0), &plot);
                writeln!(
                    svg,
                    r#"<rect class="bar" data-year="{}" data-quarter="{}" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{} {}: {}</title></rect>"#,
                    escape(&year.to_string()),
                    escape(&table.quarters()[c]),
                    group_x + slot * (1.0 - GROUP_FILL) / 2.0 + bar_w * c as f64,
                    top,
                    bar_w,
                    (bottom - top).max(0.0),
                    color(c),
                    escape(&year.to_string()),
                    escape(&table.quarters()[c]),
                    value
                )?;
            }
            writeln!(
                svg,
                r#"<text class="x-tick" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                group_x + slot / 2.0,
                plot.y + plot.h + 18.0,
                escape(&year.to_string())
            )?;
        }
        writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{zero:.1}" x2="{:.1}" y2="{zero:.1}" stroke="black"/>"#,
            plot.x,
            plot.x + plot.w
        )?;
    }

    // axes + labels
    writeln!(
        svg,
        r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="black"/>"#,
        plot.y,
        plot.y + plot.h,
        x = plot.x
    )?;
    writeln!(
        svg,
        r#"<text class="x-label" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
        plot.x + plot.w / 2.0,
        height - 15.0,
        escape(&opts.x_label)
    )?;
    writeln!(
        svg,
        r#"<text class="y-label" x="20" y="{y:.1}" text-anchor="middle" transform="rotate(-90 20 {y:.1})">{}</text>"#,
        escape(&opts.y_label),
        y = plot.y + plot.h / 2.0
    )?;

    // legend
    let lx = plot.x + plot.w + 20.0;
    writeln!(
        svg,
        r#"<text class="legend-title" x="{lx:.1}" y="{:.1}" font-weight="bold">{}</text>"#,
        plot.y + 12.0,
        escape(&opts.legend_title)
    )?;
    for (c, quarter) in table.quarters().iter().enumerate() {
        let ly = plot.y + 24.0 + 20.0 * c as f64;
        writeln!(
            svg,
            r#"<rect class="legend-swatch" x="{lx:.1}" y="{ly:.1}" width="12" height="12" fill="{}"/>"#,
            color(c)
        )?;
        writeln!(
            svg,
            r#"<text class="legend-label" x="{:.1}" y="{:.1}">{}</text>"#,
            lx + 18.0,
            ly + 10.0,
            escape(quarter)
        )?;
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

/// Render and write the SVG to `path`, replacing any existing file.
#[instrument(level = "info", skip(table, opts, path), fields(path = %path.as_ref().display()))]
pub fn render_to_file(
    table: &PivotTable,
    opts: &ChartConfig,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let svg = render(table, opts)?;
    let mut tmp = staging_file(path)?;
    tmp.as_file_mut()
        .write_all(svg.as_bytes())
        .map_err(|e| Error::io(path, e))?;
    persist(tmp, path)?;
    debug!(bytes = svg.len(), "chart written");
    Ok(())
}

struct Rect {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

/// Vertical value range, always including zero, rounded out to tick steps.
struct ValueAxis {
    lo: f64,
    hi: f64,
    step: f64,
}

impl ValueAxis {
    fn fit(table: &PivotTable) -> Result<Self> {
        let (min, max) = table
            .rows()
            .flat_map(|(_, row)| row.iter().flatten().copied())
            .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let span = if max > min { max - min } else { 1.0 };
        let step = nice_step(span / Y_TICKS);
        let axis = Self {
            lo: (min / step).floor() * step,
            hi: ((max / step).ceil() * step).max(step),
            step,
        };

        let ticks = (axis.hi - axis.lo) / axis.step;
        if !(axis.lo.is_finite() && axis.hi.is_finite() && ticks.is_finite()) || ticks > MAX_TICKS
        {
            return Err(Error::AxisRange(format!(
                "values {min}..{max} cannot be placed on a finite axis"
            )));
        }
        Ok(axis)
    }

    /// Tick positions from `lo` to `hi` inclusive.
    fn ticks(&self) -> impl Iterator<Item = f64> + '_ {
        let count = ((self.hi - self.lo) / self.step).round() as usize;
        (0..=count).map(move |i| self.lo + self.step * i as f64)
    }

    fn project(&self, v: f64, plot: &Rect) -> f64 {
        plot.y + plot.h * (self.hi - v) / (self.hi - self.lo)
    }
}

/// Round `raw` up to 1, 2 or 5 times a power of ten.
fn nice_step(raw: f64) -> f64 {
    if !(raw.is_finite() && raw > 0.0) {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let frac = raw / magnitude;
    let nice = if frac <= 1.0 {
        1.0
    } else if frac <= 2.0 {
        2.0
    } else if frac <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn format_tick(v: f64) -> String {
    // steps are multiples of powers of ten; trim float noise
    let rounded = (v * 1e6).round() / 1e6;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

fn color(idx: usize) -> &'static str {
    PALETTE[idx % PALETTE.len()]
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
