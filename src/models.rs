use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const NAME_COLUMN: &str = "Name";
pub const AGE_COLUMN: &str = "Age";
pub const MAJOR_COLUMN: &str = "Major";
pub const HOURS_COLUMN: &str = "Hours";

/// Column order of a store created by the first submission.
pub const RECORD_COLUMNS: [&str; 4] = [NAME_COLUMN, AGE_COLUMN, MAJOR_COLUMN, HOURS_COLUMN];

pub const AGE_RANGE: (u32, u32) = (0, 120);
pub const HOURS_RANGE: (u32, u32) = (0, 24);
pub const DEFAULT_HOURS: u32 = 2;

pub const BINS_RANGE: (usize, usize) = (5, 40);
pub const DEFAULT_BINS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Major {
    Biomedical,
    ComputerScience,
    Biology,
    Other,
}

impl Major {
    pub const ALL: [Major; 4] = [
        Major::Biomedical,
        Major::ComputerScience,
        Major::Biology,
        Major::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Major::Biomedical => "Biomedical",
            Major::ComputerScience => "Computer Science",
            Major::Biology => "Biology",
            Major::Other => "Other",
        }
    }
}

impl fmt::Display for Major {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Major {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Major::ALL
            .into_iter()
            .find(|major| major.as_str() == value.trim())
            .ok_or_else(|| format!("unknown major '{value}'"))
    }
}

/// One survey submission. Age and hours are clamped on construction the way
/// the form widgets bound them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub age: u32,
    pub major: Major,
    pub hours: u32,
}

impl Record {
    pub fn new(name: impl Into<String>, age: i64, major: Major, hours: i64) -> Self {
        Self {
            name: name.into(),
            age: clamp(age, AGE_RANGE),
            major,
            hours: clamp(hours, HOURS_RANGE),
        }
    }

    /// Cell value for a store column, `None` when the record has no such field.
    pub fn field(&self, column: &str) -> Option<String> {
        match column {
            NAME_COLUMN => Some(self.name.clone()),
            AGE_COLUMN => Some(self.age.to_string()),
            MAJOR_COLUMN => Some(self.major.to_string()),
            HOURS_COLUMN => Some(self.hours.to_string()),
            _ => None,
        }
    }
}

fn clamp(value: i64, (min, max): (u32, u32)) -> u32 {
    value.clamp(i64::from(min), i64::from(max)) as u32
}

/// Loosely typed view of the store: whatever columns the file has, every
/// cell kept as text. An empty cell is a missing value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn from_record(record: &Record) -> Self {
        let columns: Vec<String> = RECORD_COLUMNS.iter().map(|c| c.to_string()).collect();
        let row = columns
            .iter()
            .map(|c| record.field(c).unwrap_or_default())
            .collect();
        Self {
            columns,
            rows: vec![row],
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Numeric coercion of one column; blanks and non-numbers become `None`.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let index = self.column_index(name)?;
        Some(
            (0..self.rows.len())
                .map(|row| self.cell(row, index).and_then(coerce_number))
                .collect(),
        )
    }

    /// Appends a record, widening the column set when the record carries a
    /// field the existing table lacks. Columns the record has no value for
    /// are left blank.
    pub fn append(&mut self, record: &Record) {
        for column in RECORD_COLUMNS {
            if !self.has_column(column) {
                self.columns.push(column.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }
        let row = self
            .columns
            .iter()
            .map(|c| record.field(c).unwrap_or_default())
            .collect();
        self.rows.push(row);
    }

    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn tail(&self, n: usize) -> Table {
        let skip = self.rows.len().saturating_sub(n);
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().skip(skip).cloned().collect(),
        }
    }
}

pub fn coerce_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

/// Per-viewer widget state carried between reporting passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetState {
    pub bins: usize,
    pub majors_filter: BTreeSet<String>,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            majors_filter: BTreeSet::new(),
        }
    }
}

impl WidgetState {
    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins.clamp(BINS_RANGE.0, BINS_RANGE.1);
        self
    }

    pub fn with_majors<I, S>(mut self, majors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.majors_filter = majors
            .into_iter()
            .map(Into::into)
            .filter(|m: &String| !m.trim().is_empty())
            .collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_clamps_to_widget_ranges() {
        let record = Record::new("Avery", 150, Major::Biology, -3);
        assert_eq!(record.age, 120);
        assert_eq!(record.hours, 0);
    }

    #[test]
    fn major_parses_display_names() {
        assert_eq!("Computer Science".parse::<Major>(), Ok(Major::ComputerScience));
        assert!("Chemistry".parse::<Major>().is_err());
    }

    #[test]
    fn append_widens_foreign_column_set() {
        let mut table = Table {
            columns: vec!["Name".to_string(), "Note".to_string()],
            rows: vec![vec!["Jules".to_string(), "legacy".to_string()]],
        };
        table.append(&Record::new("Kiara", 21, Major::Other, 4));

        assert_eq!(table.columns, vec!["Name", "Note", "Age", "Major", "Hours"]);
        assert_eq!(table.rows[0], vec!["Jules", "legacy", "", "", ""]);
        assert_eq!(table.rows[1], vec!["Kiara", "", "21", "Other", "4"]);
    }

    #[test]
    fn numeric_column_coerces_and_marks_missing() {
        let table = Table {
            columns: vec!["Age".to_string()],
            rows: vec![
                vec!["20".to_string()],
                vec!["twenty".to_string()],
                vec![" ".to_string()],
                vec!["21.5".to_string()],
            ],
        };
        assert_eq!(
            table.numeric_column("Age"),
            Some(vec![Some(20.0), None, None, Some(21.5)])
        );
        assert_eq!(table.numeric_column("Hours"), None);
    }

    #[test]
    fn tail_keeps_last_rows_in_order() {
        let mut table = Table::default();
        for i in 0..12 {
            table.append(&Record::new(format!("s{i}"), 20, Major::Biology, 1));
        }
        let tail = table.tail(10);
        assert_eq!(tail.len(), 10);
        assert_eq!(tail.rows[0][0], "s2");
        assert_eq!(tail.rows[9][0], "s11");
    }

    #[test]
    fn widget_state_clamps_bins_and_drops_blank_majors() {
        let state = WidgetState::default()
            .with_bins(100)
            .with_majors(["Biology", " ", "Other"]);
        assert_eq!(state.bins, 40);
        assert_eq!(state.majors_filter.len(), 2);
    }
}
