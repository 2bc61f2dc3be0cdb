use std::fmt::Write;

use serde::Deserialize;
use tracing::debug;

use crate::config::DataPaths;
use crate::html::{self, escape, Notice};
use crate::models::{Major, Record, AGE_RANGE, DEFAULT_HOURS, HOURS_RANGE};
use crate::store::{self, MergeOutcome, StoreLoad};

pub const PREVIEW_ROWS: usize = 10;

/// Raw form payload. Numbers arrive as text and are parsed leniently.
#[derive(Debug, Clone, Deserialize)]
pub struct SurveyForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub hours: String,
}

impl SurveyForm {
    pub fn into_record(self) -> Result<Record, String> {
        let age = parse_whole(&self.age, "age")?;
        let hours = parse_whole(&self.hours, "hours")?;
        let major: Major = self.major.parse()?;
        Ok(Record::new(self.name, age, major, hours))
    }
}

fn parse_whole(value: &str, field: &str) -> Result<i64, String> {
    let value = value.trim();
    value
        .parse::<i64>()
        .or_else(|_| value.parse::<f64>().map(|v| v.round() as i64))
        .map_err(|_| format!("{field} must be a whole number, got '{value}'"))
}

/// Result of handling one submission, shown above the form.
#[derive(Debug)]
pub enum Submission {
    Saved(MergeOutcome),
    Rejected(String),
    Failed(String),
}

pub fn submit(paths: &DataPaths, form: SurveyForm) -> Submission {
    let record = match form.into_record() {
        Ok(record) => record,
        Err(reason) => return Submission::Rejected(reason),
    };
    match store::append_record(&paths.csv, &record) {
        Ok(outcome) => {
            debug!(kind = ?outcome.kind, rows = outcome.table.len(), "submission merged");
            Submission::Saved(outcome)
        }
        Err(err) => Submission::Failed(format!("{err:#}")),
    }
}

pub fn render(paths: &DataPaths, submission: Option<&Submission>) -> String {
    let csv_name = paths.csv_name();
    let mut body = String::new();
    let _ = writeln!(body, "<h1>Survey Page</h1>");
    let _ = writeln!(
        body,
        "<p>Please fill out the form below to add your data to the dataset.</p>"
    );

    match submission {
        Some(Submission::Saved(outcome)) => {
            html::notice(
                &mut body,
                Notice::Success,
                &format!("Data submitted successfully and saved to {csv_name}!"),
            );
            html::table(&mut body, &outcome.table.tail(PREVIEW_ROWS));
        }
        Some(Submission::Rejected(reason)) => html::notice(&mut body, Notice::Error, reason),
        Some(Submission::Failed(reason)) => html::notice(
            &mut body,
            Notice::Error,
            &format!("Couldn't save to {csv_name}: {reason}"),
        ),
        None => {}
    }

    form(&mut body);

    let _ = writeln!(body, "<hr><h2>Current Data in CSV</h2>");
    match store::load(&paths.csv) {
        StoreLoad::Loaded { table, .. } => html::table(&mut body, &table),
        StoreLoad::Missing | StoreLoad::Empty => html::notice(
            &mut body,
            Notice::Info,
            &format!("No data found yet. Submit a new entry above to create {csv_name}."),
        ),
        StoreLoad::Unreadable(err) => html::notice(
            &mut body,
            Notice::Error,
            &format!("Couldn't read {csv_name}: {err}"),
        ),
    }

    html::page("Survey Page", &body)
}

fn form(out: &mut String) {
    let _ = writeln!(out, r#"<form method="post" action="/survey">"#);
    let _ = writeln!(
        out,
        r#"<label>Enter your name: <input type="text" name="name"></label>"#
    );
    let _ = writeln!(
        out,
        r#"<label>Enter your age: <input type="number" name="age" min="{}" max="{}" step="1" value="{}"></label>"#,
        AGE_RANGE.0, AGE_RANGE.1, AGE_RANGE.0
    );
    let _ = writeln!(out, r#"<label>Select your major: <select name="major">"#);
    for major in Major::ALL {
        let _ = writeln!(
            out,
            r#"<option value="{0}">{0}</option>"#,
            escape(major.as_str())
        );
    }
    let _ = writeln!(out, "</select></label>");
    let _ = writeln!(
        out,
        r#"<label>Hours studied today: <input type="range" name="hours" min="{}" max="{}" step="1" value="{}" oninput="this.nextElementSibling.value=this.value"><output>{}</output></label>"#,
        HOURS_RANGE.0, HOURS_RANGE.1, DEFAULT_HOURS, DEFAULT_HOURS
    );
    let _ = writeln!(out, r#"<button type="submit">Submit</button></form>"#);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, age: &str, major: &str, hours: &str) -> SurveyForm {
        SurveyForm {
            name: name.to_string(),
            age: age.to_string(),
            major: major.to_string(),
            hours: hours.to_string(),
        }
    }

    #[test]
    fn form_parses_and_clamps() {
        let record = form(" Avery ", "130", "Biology", "25").into_record().unwrap();
        assert_eq!(record, Record::new(" Avery ", 120, Major::Biology, 24));
    }

    #[test]
    fn form_rejects_unknown_major_and_bad_numbers() {
        assert!(form("A", "20", "Chemistry", "2").into_record().is_err());
        assert!(form("A", "twenty", "Biology", "2").into_record().is_err());
    }

    #[test]
    fn submission_shows_ack_preview_and_full_dump() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::in_dir(dir.path());
        for i in 0..12 {
            submit(&paths, form(&format!("student{i:02}"), "20", "Other", "3"));
        }
        let submission = submit(&paths, form("last", "21", "Biomedical", "4"));
        let Submission::Saved(outcome) = &submission else {
            panic!("submission should save");
        };
        assert_eq!(outcome.table.len(), 13);

        let page = render(&paths, Some(&submission));
        assert!(page.contains("Data submitted successfully and saved to data.csv!"));
        // Preview covers the last ten rows; the full dump repeats all thirteen.
        assert_eq!(page.matches("student00").count(), 1);
        assert_eq!(page.matches("student05").count(), 2);
        assert_eq!(page.matches(">last<").count(), 2);
    }

    #[test]
    fn empty_store_shows_info() {
        let dir = tempfile::tempdir().unwrap();
        let page = render(&DataPaths::in_dir(dir.path()), None);
        assert!(page.contains("No data found yet."));
        assert!(page.contains(r#"<option value="Computer Science">"#));
    }
}
