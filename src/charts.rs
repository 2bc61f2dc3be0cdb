use std::collections::BTreeSet;

use crate::models::{Table, AGE_COLUMN, HOURS_COLUMN, MAJOR_COLUMN};

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

impl HistogramBin {
    /// Right-closed interval label, e.g. `(19.998, 20.4]`.
    pub fn label(&self) -> String {
        format!("({}, {}]", format_edge(self.lower), format_edge(self.upper))
    }
}

fn format_edge(value: f64) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgeHistogram {
    NoColumn,
    NoValues,
    Ready(Vec<HistogramBin>),
}

pub fn age_histogram(table: Option<&Table>, bins: usize) -> AgeHistogram {
    let Some(ages) = table.and_then(|t| t.numeric_column(AGE_COLUMN)) else {
        return AgeHistogram::NoColumn;
    };
    let values: Vec<f64> = ages.into_iter().flatten().collect();
    match histogram(&values, bins) {
        Some(bins) => AgeHistogram::Ready(bins),
        None => AgeHistogram::NoValues,
    }
}

/// Equal-width binning over `[min, max]`. Intervals are right-closed; the
/// lowest edge sits 0.1% of the range below the minimum so the minimum is
/// counted, and a zero-width range is widened by 0.1% on both sides.
pub fn histogram(values: &[f64], bins: usize) -> Option<Vec<HistogramBin>> {
    if values.is_empty() || bins == 0 {
        return None;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let edges = if min == max {
        let widen = |v: f64| if v == 0.0 { 0.001 } else { 0.001 * v.abs() };
        linspace(min - widen(min), max + widen(max), bins)
    } else {
        let mut edges = linspace(min, max, bins);
        edges[0] -= (max - min) * 0.001;
        edges
    };

    let mut counts = vec![0usize; bins];
    for &value in values {
        let index = edges[1..].partition_point(|&edge| edge < value);
        counts[index.min(bins - 1)] += 1;
    }

    Some(
        edges
            .windows(2)
            .zip(counts)
            .map(|(pair, count)| HistogramBin {
                lower: pair[0],
                upper: pair[1],
                count,
            })
            .collect(),
    )
}

fn linspace(start: f64, end: f64, bins: usize) -> Vec<f64> {
    let step = (end - start) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| start + step * i as f64).collect();
    edges[bins] = end;
    edges
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPlan {
    /// Distinct majors present after coercion; `None` without a Major column.
    pub options: Option<Vec<String>>,
    /// The selection actually applied, pruned to `options`.
    pub selection: BTreeSet<String>,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoursVsAge {
    MissingColumns(Vec<&'static str>),
    Plan(ScatterPlan),
}

pub fn hours_vs_age(table: &Table, selection: &BTreeSet<String>) -> HoursVsAge {
    let (Some(hours), Some(ages)) = (
        table.numeric_column(HOURS_COLUMN),
        table.numeric_column(AGE_COLUMN),
    ) else {
        let missing = [HOURS_COLUMN, AGE_COLUMN]
            .into_iter()
            .filter(|c| !table.has_column(c))
            .collect();
        return HoursVsAge::MissingColumns(missing);
    };

    let major_index = table.column_index(MAJOR_COLUMN);
    let rows: Vec<(f64, f64, Option<&str>)> = hours
        .into_iter()
        .zip(ages)
        .enumerate()
        .filter_map(|(row, pair)| match pair {
            (Some(h), Some(a)) => Some((h, a, major_index.and_then(|i| table.cell(row, i)))),
            _ => None,
        })
        .collect();

    let options: Option<Vec<String>> = major_index.map(|_| {
        rows.iter()
            .filter_map(|(_, _, major)| major.map(|m| m.to_string()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    });

    let selection: BTreeSet<String> = match &options {
        Some(options) => selection
            .iter()
            .filter(|m| options.contains(m))
            .cloned()
            .collect(),
        None => BTreeSet::new(),
    };

    let points = rows
        .into_iter()
        .filter(|(_, _, major)| {
            selection.is_empty() || major.is_some_and(|m| selection.contains(m))
        })
        .map(|(h, a, _)| (h, a))
        .collect();

    HoursVsAge::Plan(ScatterPlan {
        options,
        selection,
        points,
    })
}
