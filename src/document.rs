use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_TITLE: &str = "JSON Data";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
pub enum DocumentLoad {
    Missing,
    Unreadable(DocumentError),
    Loaded(Value),
}

pub fn load(path: &Path) -> DocumentLoad {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return DocumentLoad::Missing,
        Err(source) => {
            return DocumentLoad::Unreadable(DocumentError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    match serde_json::from_str(&text) {
        Ok(value) => DocumentLoad::Loaded(value),
        Err(err) => DocumentLoad::Unreadable(err.into()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// Shape of the document as far as the static bar chart is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentChart {
    NotLoaded,
    /// Loaded, but the top level is not an object.
    NotAMapping,
    /// `data_points` absent, not a list, or empty.
    NoDataPoints,
    /// Some entry lacks `label` or `value`.
    MissingKeys,
    /// Some entry has a `value` that is not a number.
    NonNumericValue { label: String },
    Ready { title: String, bars: Vec<Bar> },
}

pub fn chart_from(document: Option<&Value>) -> DocumentChart {
    let Some(document) = document else {
        return DocumentChart::NotLoaded;
    };
    let Some(map) = document.as_object() else {
        return DocumentChart::NotAMapping;
    };
    // An empty object carries nothing to chart, same as no document at all.
    if map.is_empty() {
        return DocumentChart::NotLoaded;
    }

    let title = map
        .get("chart_title")
        .map(|t| match t {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let points = match map.get("data_points").and_then(Value::as_array) {
        Some(points) if !points.is_empty() => points,
        _ => return DocumentChart::NoDataPoints,
    };

    let mut bars = Vec::with_capacity(points.len());
    for point in points {
        let (Some(label), Some(value)) = (point.get("label"), point.get("value")) else {
            return DocumentChart::MissingKeys;
        };
        let label = match label {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let value = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => crate::models::coerce_number(s),
            _ => None,
        };
        let Some(value) = value else {
            return DocumentChart::NonNumericValue { label };
        };
        bars.push(Bar { label, value });
    }

    DocumentChart::Ready { title, bars }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn two_points_become_two_bars() {
        let doc = json!({
            "chart_title": "T",
            "data_points": [{"label": "A", "value": 3}, {"label": "B", "value": 7}]
        });
        assert_eq!(
            chart_from(Some(&doc)),
            DocumentChart::Ready {
                title: "T".to_string(),
                bars: vec![
                    Bar { label: "A".to_string(), value: 3.0 },
                    Bar { label: "B".to_string(), value: 7.0 },
                ],
            }
        );
    }

    #[test]
    fn missing_or_empty_points_are_not_errors() {
        assert_eq!(chart_from(Some(&json!({"chart_title": "T"}))), DocumentChart::NoDataPoints);
        assert_eq!(
            chart_from(Some(&json!({"data_points": []}))),
            DocumentChart::NoDataPoints
        );
    }

    #[test]
    fn entries_without_label_or_value_are_flagged() {
        let doc = json!({"data_points": [{"label": "A", "value": 1}, {"name": "B", "value": 2}]});
        assert_eq!(chart_from(Some(&doc)), DocumentChart::MissingKeys);
    }

    #[test]
    fn title_defaults_when_absent() {
        let doc = json!({"data_points": [{"label": "A", "value": "4.5"}]});
        match chart_from(Some(&doc)) {
            DocumentChart::Ready { title, bars } => {
                assert_eq!(title, DEFAULT_TITLE);
                assert_eq!(bars[0].value, 4.5);
            }
            other => panic!("unexpected chart: {other:?}"),
        }
    }

    #[test]
    fn non_object_documents_are_rejected() {
        assert_eq!(chart_from(Some(&json!([1, 2]))), DocumentChart::NotAMapping);
        assert_eq!(chart_from(None), DocumentChart::NotLoaded);
        assert_eq!(chart_from(Some(&json!({}))), DocumentChart::NotLoaded);
    }

    #[test]
    fn broken_json_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{\"chart_title\": ").unwrap();
        assert!(matches!(load(&path), DocumentLoad::Unreadable(DocumentError::Json(_))));
        assert!(matches!(load(&dir.path().join("nope.json")), DocumentLoad::Missing));
    }
}
