//! Inline SVG rendering for the bar and scatter charts.

use std::fmt::Write;

use crate::html::escape;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 340.0;
const LEFT: f64 = 56.0;
const RIGHT: f64 = 16.0;
const TOP: f64 = 36.0;
const BOTTOM: f64 = 84.0;
const TICKS: usize = 5;

const BAR_FILL: &str = "#4c78a8";
const POINT_FILL: &str = "#f58518";
const GRID: &str = "#e6e6e6";

/// Bar chart over categorical labels, drawn in the order given.
pub fn bar_chart(title: Option<&str>, bars: &[(String, f64)], y_label: &str) -> String {
    let mut out = String::new();
    open(&mut out, title);

    let (lo, hi) = value_range(bars.iter().map(|(_, v)| *v), true);
    let plot_w = WIDTH - LEFT - RIGHT;
    let plot_h = HEIGHT - TOP - BOTTOM;
    let y = |v: f64| TOP + plot_h - (v - lo) / (hi - lo) * plot_h;

    y_axis(&mut out, lo, hi, &y);
    let _ = writeln!(
        out,
        r#"<text x="14" y="{:.1}" transform="rotate(-90 14 {:.1})" text-anchor="middle" font-size="12">{}</text>"#,
        TOP + plot_h / 2.0,
        TOP + plot_h / 2.0,
        escape(y_label)
    );

    if !bars.is_empty() {
        let slot = plot_w / bars.len() as f64;
        let bar_w = (slot * 0.8).max(1.0);
        let rotate = bars.len() > 6;
        for (i, (label, value)) in bars.iter().enumerate() {
            let x = LEFT + slot * i as f64 + (slot - bar_w) / 2.0;
            let (top, bottom) = if *value >= 0.0 {
                (y(*value), y(0.0))
            } else {
                (y(0.0), y(*value))
            };
            let _ = writeln!(
                out,
                r#"<rect x="{x:.1}" y="{top:.1}" width="{bar_w:.1}" height="{:.1}" fill="{BAR_FILL}"><title>{}: {}</title></rect>"#,
                (bottom - top).max(0.0),
                escape(label),
                format_number(*value)
            );
            let cx = x + bar_w / 2.0;
            let ly = TOP + plot_h + 14.0;
            if rotate {
                let _ = writeln!(
                    out,
                    r#"<text x="{cx:.1}" y="{ly:.1}" transform="rotate(-45 {cx:.1} {ly:.1})" text-anchor="end" font-size="10">{}</text>"#,
                    escape(label)
                );
            } else {
                let _ = writeln!(
                    out,
                    r#"<text x="{cx:.1}" y="{ly:.1}" text-anchor="middle" font-size="11">{}</text>"#,
                    escape(label)
                );
            }
        }
    }

    close(&mut out);
    out
}

pub fn scatter_plot(title: &str, points: &[(f64, f64)], x_label: &str, y_label: &str) -> String {
    let mut out = String::new();
    open(&mut out, Some(title));

    let (x_lo, x_hi) = value_range(points.iter().map(|p| p.0), false);
    let (y_lo, y_hi) = value_range(points.iter().map(|p| p.1), false);
    let plot_w = WIDTH - LEFT - RIGHT;
    let plot_h = HEIGHT - TOP - BOTTOM;
    let x = |v: f64| LEFT + (v - x_lo) / (x_hi - x_lo) * plot_w;
    let y = |v: f64| TOP + plot_h - (v - y_lo) / (y_hi - y_lo) * plot_h;

    y_axis(&mut out, y_lo, y_hi, &y);
    for i in 0..=TICKS {
        let value = x_lo + (x_hi - x_lo) * i as f64 / TICKS as f64;
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>"#,
            x(value),
            TOP + plot_h + 16.0,
            format_number(value)
        );
    }

    for &(px, py) in points {
        let _ = writeln!(
            out,
            r#"<circle cx="{:.1}" cy="{:.1}" r="4" fill="{POINT_FILL}" fill-opacity="0.8"><title>({}, {})</title></circle>"#,
            x(px),
            y(py),
            format_number(px),
            format_number(py)
        );
    }

    let _ = writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12">{}</text>"#,
        LEFT + plot_w / 2.0,
        TOP + plot_h + 40.0,
        escape(x_label)
    );
    let _ = writeln!(
        out,
        r#"<text x="14" y="{:.1}" transform="rotate(-90 14 {:.1})" text-anchor="middle" font-size="12">{}</text>"#,
        TOP + plot_h / 2.0,
        TOP + plot_h / 2.0,
        escape(y_label)
    );

    close(&mut out);
    out
}

fn open(out: &mut String, title: Option<&str>) {
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" width="{WIDTH}" height="{HEIGHT}" font-family="sans-serif">"#
    );
    if let Some(title) = title {
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="20" text-anchor="middle" font-size="14" font-weight="bold">{}</text>"#,
            WIDTH / 2.0,
            escape(title)
        );
    }
}

fn close(out: &mut String) {
    let _ = writeln!(out, "</svg>");
}

fn y_axis(out: &mut String, lo: f64, hi: f64, y: &impl Fn(f64) -> f64) {
    for i in 0..=TICKS {
        let value = lo + (hi - lo) * i as f64 / TICKS as f64;
        let py = y(value);
        let _ = writeln!(
            out,
            r#"<line x1="{LEFT}" y1="{py:.1}" x2="{:.1}" y2="{py:.1}" stroke="{GRID}"/>"#,
            WIDTH - RIGHT
        );
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
            LEFT - 6.0,
            py + 4.0,
            format_number(value)
        );
    }
}

/// Axis range with a little headroom. Bar charts always include zero.
fn value_range(values: impl Iterator<Item = f64>, include_zero: bool) -> (f64, f64) {
    let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if lo == hi {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    if !(include_zero && lo == 0.0) {
        lo -= pad;
    }
    hi += pad;
    (lo, hi)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{value:.2}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
