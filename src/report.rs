use std::fmt::Write;

use serde_json::Value;
use tracing::debug;

use crate::charts::{self, AgeHistogram, HoursVsAge};
use crate::config::DataPaths;
use crate::document::{self, DocumentChart, DocumentLoad};
use crate::html::{self, escape, Notice};
use crate::models::{Table, WidgetState, BINS_RANGE};
use crate::store::{self, StoreError, StoreLoad};
use crate::svg;

pub const DIAGNOSTIC_ROWS: usize = 5;

/// Where the page is shown. A snapshot is a standalone file: no widgets, no
/// download link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Live,
    Snapshot,
}

#[derive(Debug)]
pub struct ReportPass {
    pub html: String,
    pub state: WidgetState,
}

/// One full reporting pass: re-read both sources, draw all three charts, and
/// hand back the widget state the next pass should start from.
pub fn render(paths: &DataPaths, state: WidgetState, surface: Surface) -> ReportPass {
    let mut state = state;
    let mut body = String::new();
    let csv_name = paths.csv_name();
    let json_name = paths.json_name();

    let _ = writeln!(body, "<h1>Data Visualizations</h1>");
    let _ = writeln!(
        body,
        "<p>This page displays graphs based on the collected data.</p>"
    );
    if surface == Surface::Snapshot {
        let _ = writeln!(
            body,
            "<p><em>Snapshot generated {}.</em></p>",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    let _ = writeln!(body, "<hr><h2>Load Data</h2>");
    let table = load_table(&mut body, paths, &csv_name);
    let document = load_document(&mut body, paths, &json_name);
    if table.is_some() && surface == Surface::Live {
        let _ = writeln!(
            body,
            r#"<p><a href="/data.csv" download="{0}">Download {0}</a></p>"#,
            escape(&csv_name)
        );
    }

    let _ = writeln!(body, "<hr><h2>Graphs</h2>");
    json_bar_chart(&mut body, document.as_ref(), &json_name);
    age_histogram(&mut body, table.as_ref(), &state, surface);
    if let Some(selection) = hours_vs_age(&mut body, table.as_ref(), &state, surface) {
        state.majors_filter = selection;
    }

    debug!(bins = state.bins, majors = ?state.majors_filter, "reporting pass rendered");
    ReportPass {
        html: html::page("Visualizations", &body),
        state,
    }
}

fn load_table(out: &mut String, paths: &DataPaths, csv_name: &str) -> Option<Table> {
    match store::load(&paths.csv) {
        StoreLoad::Loaded { table, .. } => {
            html::notice(out, Notice::Success, &format!("Loaded {csv_name}"));
            let _ = writeln!(out, "<details><summary>Preview {}</summary>", escape(csv_name));
            html::table(out, &table);
            let _ = writeln!(out, "</details>");
            Some(table)
        }
        StoreLoad::Missing => {
            html::notice(
                out,
                Notice::Info,
                &format!("{csv_name} not found yet. Submit the Survey first."),
            );
            None
        }
        StoreLoad::Empty => {
            unreadable(out, csv_name, &StoreError::NoColumns);
            None
        }
        StoreLoad::Unreadable(err) => {
            unreadable(out, csv_name, &err);
            None
        }
    }
}

fn load_document(out: &mut String, paths: &DataPaths, json_name: &str) -> Option<Value> {
    match document::load(&paths.json) {
        DocumentLoad::Loaded(value) => {
            html::notice(out, Notice::Success, &format!("Loaded {json_name}"));
            let pretty = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            let _ = writeln!(
                out,
                "<details><summary>Preview {}</summary><pre>{}</pre></details>",
                escape(json_name),
                escape(&pretty)
            );
            Some(value)
        }
        DocumentLoad::Missing => {
            html::notice(
                out,
                Notice::Info,
                &format!(
                    "{json_name} not found. Make sure it is in the same folder as the survey data."
                ),
            );
            None
        }
        DocumentLoad::Unreadable(err) => {
            unreadable(out, json_name, &err);
            None
        }
    }
}

fn unreadable(out: &mut String, name: &str, err: &dyn std::error::Error) {
    html::notice(out, Notice::Error, &format!("Couldn't read {name}: {err}"));
}

fn json_bar_chart(out: &mut String, document: Option<&Value>, json_name: &str) {
    let _ = writeln!(out, "<h3>Graph 1: Static JSON Bar Chart</h3>");
    match document::chart_from(document) {
        DocumentChart::Ready { title, bars } => {
            let _ = writeln!(
                out,
                "<p><strong>{}</strong>: bar chart of values per label from <code>{}</code>.</p>",
                escape(&title),
                escape(json_name)
            );
            let bars: Vec<(String, f64)> = bars.into_iter().map(|b| (b.label, b.value)).collect();
            out.push_str(&svg::bar_chart(None, &bars, "value"));
        }
        DocumentChart::MissingKeys => html::notice(
            out,
            Notice::Warning,
            &format!("{json_name} does not have the expected keys ('label', 'value')."),
        ),
        DocumentChart::NonNumericValue { label } => html::notice(
            out,
            Notice::Warning,
            &format!("{json_name} has a non-numeric 'value' for label '{label}'."),
        ),
        DocumentChart::NoDataPoints => html::notice(
            out,
            Notice::Info,
            &format!("No data_points found in {json_name} to plot."),
        ),
        DocumentChart::NotAMapping | DocumentChart::NotLoaded => html::notice(
            out,
            Notice::Info,
            &format!("Load {json_name} to see this graph."),
        ),
    }
}

fn age_histogram(out: &mut String, table: Option<&Table>, state: &WidgetState, surface: Surface) {
    let _ = writeln!(out, "<h3>Graph 2: Dynamic Age Histogram (CSV)</h3>");
    let histogram = charts::age_histogram(table, state.bins);
    if histogram == AgeHistogram::NoColumn {
        html::notice(
            out,
            Notice::Info,
            "Add survey entries with an 'Age' value to see this histogram.",
        );
        return;
    }

    match surface {
        Surface::Live => {
            let _ = writeln!(
                out,
                "<p>Use the slider to adjust histogram bins. The plot updates on apply.</p>"
            );
            let _ = writeln!(
                out,
                r#"<form method="get" action="/visuals"><label>Number of bins <input type="range" name="bins" min="{}" max="{}" value="{}" oninput="this.nextElementSibling.value=this.value"><output>{}</output></label><button type="submit">Apply</button></form>"#,
                BINS_RANGE.0, BINS_RANGE.1, state.bins, state.bins
            );
        }
        Surface::Snapshot => {
            let _ = writeln!(out, "<p>Number of bins: {}</p>", state.bins);
        }
    }

    match histogram {
        AgeHistogram::Ready(bins) => {
            let bars: Vec<(String, f64)> = bins
                .iter()
                .map(|bin| (bin.label(), bin.count as f64))
                .collect();
            out.push_str(&svg::bar_chart(None, &bars, "count"));
        }
        AgeHistogram::NoValues | AgeHistogram::NoColumn => {
            html::notice(out, Notice::Warning, "No Age values found in CSV.")
        }
    }
}

/// Returns the pruned major selection when the filter was evaluated.
fn hours_vs_age(
    out: &mut String,
    table: Option<&Table>,
    state: &WidgetState,
    surface: Surface,
) -> Option<std::collections::BTreeSet<String>> {
    let _ = writeln!(out, "<h3>Graph 3: Dynamic Hours vs Age (CSV, Scatter)</h3>");
    let Some(table) = table else {
        html::notice(
            out,
            Notice::Info,
            "No CSV loaded yet. Submit the survey first.",
        );
        return None;
    };

    let _ = writeln!(
        out,
        "<p><small>Graph 3 diagnostics (first {DIAGNOSTIC_ROWS} rows and columns detected):</small></p>"
    );
    let columns: Vec<String> = table.columns.iter().map(|c| format!("'{c}'")).collect();
    let _ = writeln!(out, "<p>Columns: [{}]</p>", escape(&columns.join(", ")));
    html::table(out, &table.head(DIAGNOSTIC_ROWS));

    let plan = match charts::hours_vs_age(table, &state.majors_filter) {
        HoursVsAge::MissingColumns(missing) => {
            html::notice(
                out,
                Notice::Error,
                &format!(
                    "Missing required columns for this graph: {}. Need columns: 'Hours' and 'Age'. \
                     Go to the Survey page and submit entries so these columns exist.",
                    missing.join(", ")
                ),
            );
            return None;
        }
        HoursVsAge::Plan(plan) => plan,
    };

    if let Some(options) = &plan.options {
        match surface {
            Surface::Live => {
                let _ = writeln!(
                    out,
                    r#"<form method="get" action="/visuals"><input type="hidden" name="filter" value="1"><fieldset><legend>Filter by majors (optional)</legend>"#
                );
                for option in options {
                    let checked = if plan.selection.contains(option) {
                        " checked"
                    } else {
                        ""
                    };
                    let _ = writeln!(
                        out,
                        r#"<label><input type="checkbox" name="major" value="{0}"{checked}> {0}</label>"#,
                        escape(option)
                    );
                }
                let _ = writeln!(out, r#"</fieldset><button type="submit">Apply</button></form>"#);
            }
            Surface::Snapshot => {
                let selected: Vec<&str> = plan.selection.iter().map(String::as_str).collect();
                let shown = if selected.is_empty() {
                    "all".to_string()
                } else {
                    selected.join(", ")
                };
                let _ = writeln!(out, "<p>Majors: {}</p>", escape(&shown));
            }
        }
    }

    if plan.points.is_empty() {
        html::notice(
            out,
            Notice::Warning,
            "No rows to plot. Try adding survey entries or clearing the major filter.",
        );
    } else {
        out.push_str(&svg::scatter_plot(
            "Hours vs Age (Scatter)",
            &plan.points,
            "Hours studied today",
            "Age",
        ));
    }

    Some(plan.selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn paths_with(csv: Option<&str>, json: Option<&str>) -> (tempfile::TempDir, DataPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::in_dir(dir.path());
        if let Some(csv) = csv {
            fs::write(&paths.csv, csv).unwrap();
        }
        if let Some(json) = json {
            fs::write(&paths.json, json).unwrap();
        }
        (dir, paths)
    }

    const ROWS: &str = "Name,Age,Major,Hours\nAvery,20,Biology,2\nJules,22,Other,5\n";

    #[test]
    fn missing_sources_degrade_to_messages() {
        let (_dir, paths) = paths_with(None, None);
        let pass = render(&paths, WidgetState::default(), Surface::Live);
        assert!(pass.html.contains("data.csv not found yet."));
        assert!(pass.html.contains("data.json not found."));
        assert!(pass.html.contains("Load data.json to see this graph."));
        assert!(pass.html.contains("No CSV loaded yet."));
        assert!(!pass.html.contains("<svg"));
    }

    #[test]
    fn corrupt_sources_report_error_text_and_continue() {
        let (_dir, paths) = paths_with(Some("a,b\n1,2,3\n"), Some("{not json"));
        let pass = render(&paths, WidgetState::default(), Surface::Live);
        assert!(pass.html.contains("Couldn&#39;t read data.csv:"));
        assert!(pass.html.contains("Couldn&#39;t read data.json:"));
        assert!(pass.html.contains("Graph 3"));
    }

    #[test]
    fn empty_store_file_is_reported_as_unreadable() {
        let (_dir, paths) = paths_with(Some(""), None);
        let pass = render(&paths, WidgetState::default(), Surface::Live);
        assert!(pass
            .html
            .contains("Couldn&#39;t read data.csv: no columns to parse from file"));
        assert!(pass.html.contains("No CSV loaded yet."));
        assert!(!pass.html.contains(r#"href="/data.csv""#));
    }

    #[test]
    fn short_rows_still_render_charts() {
        let csv = "Name,Age,Major,Hours\nAvery,20,Biology,2\nJules,22\n";
        let (_dir, paths) = paths_with(Some(csv), None);
        let pass = render(&paths, WidgetState::default(), Surface::Live);
        assert!(pass.html.contains("Loaded data.csv"));
        assert_eq!(pass.html.matches("<circle").count(), 1);
    }

    #[test]
    fn json_chart_is_independent_of_the_store() {
        let doc = r#"{"chart_title":"T","data_points":[{"label":"A","value":3},{"label":"B","value":7}]}"#;
        let (_dir, paths) = paths_with(None, Some(doc));
        let pass = render(&paths, WidgetState::default(), Surface::Live);
        assert!(pass.html.contains("<strong>T</strong>"));
        assert_eq!(pass.html.matches("<rect").count(), 2);
    }

    #[test]
    fn histogram_uses_session_bin_count() {
        let (_dir, paths) = paths_with(Some(ROWS), None);
        let pass = render(&paths, WidgetState::default().with_bins(7), Surface::Live);
        assert_eq!(pass.html.matches("<rect").count(), 7);
        assert!(pass.html.contains(r#"name="bins" min="5" max="40" value="7""#));
        assert!(pass.html.contains(r#"href="/data.csv""#));
    }

    #[test]
    fn major_filter_narrows_scatter_and_prunes_state() {
        let (_dir, paths) = paths_with(Some(ROWS), None);
        let state = WidgetState::default().with_majors(["Biology", "Biomedical"]);
        let pass = render(&paths, state, Surface::Live);
        assert_eq!(pass.html.matches("<circle").count(), 1);
        assert!(pass.html.contains(r#"value="Biology" checked"#));
        assert_eq!(
            pass.state.majors_filter.into_iter().collect::<Vec<_>>(),
            vec!["Biology".to_string()]
        );
    }

    #[test]
    fn missing_scatter_columns_are_named() {
        let (_dir, paths) = paths_with(Some("Name,Age\nAvery,20\n"), None);
        let pass = render(&paths, WidgetState::default(), Surface::Live);
        assert!(pass.html.contains("Missing required columns for this graph: Hours."));
        assert!(pass.html.contains("Columns: [&#39;Name&#39;, &#39;Age&#39;]"));
    }

    #[test]
    fn snapshot_omits_widgets() {
        let (_dir, paths) = paths_with(Some(ROWS), None);
        let pass = render(&paths, WidgetState::default(), Surface::Snapshot);
        assert!(!pass.html.contains("<form"));
        assert!(!pass.html.contains("/data.csv"));
        assert!(pass.html.contains("Majors: all"));
        assert_eq!(pass.html.matches("<circle").count(), 2);
    }
}
