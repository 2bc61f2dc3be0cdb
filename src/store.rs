use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Record, Table};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Csv(#[from] csv::Error),
    #[error("no columns to parse from file")]
    NoColumns,
    #[error("expected {expected} fields in line {line}, saw {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// What a reader finds at the store path.
#[derive(Debug)]
pub enum StoreLoad {
    Missing,
    Empty,
    Unreadable(StoreError),
    Loaded { table: Table, bytes: Vec<u8> },
}

/// How a submission was merged into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    Appended,
    Created,
    /// Prior content could not be parsed and was dropped.
    Replaced,
}

#[derive(Debug)]
pub struct MergeOutcome {
    pub table: Table,
    pub kind: MergeKind,
}

pub fn load(path: &Path) -> StoreLoad {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return StoreLoad::Missing,
        Err(source) => {
            return StoreLoad::Unreadable(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if bytes.is_empty() {
        return StoreLoad::Empty;
    }

    match parse_table(&bytes) {
        Ok(table) => StoreLoad::Loaded { table, bytes },
        Err(err) => StoreLoad::Unreadable(err),
    }
}

pub fn parse_table(bytes: &[u8]) -> Result<Table, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if columns.iter().all(|c| c.trim().is_empty()) {
        return Err(StoreError::NoColumns);
    }

    // Short rows are padded with missing cells; long rows are malformed.
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.len() > columns.len() {
            return Err(StoreError::TooManyFields {
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                expected: columns.len(),
                found: record.len(),
            });
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(columns.len(), String::new());
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

pub fn to_csv(table: &Table) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| StoreError::Csv(csv::Error::from(err.into_error())))
}

/// Rewrites the whole store. The table goes to a sibling temp file first and
/// is renamed over the store.
pub fn write_table(path: &Path, table: &Table) -> anyhow::Result<()> {
    let bytes = to_csv(table)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes)
        .map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "data.csv".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read-concatenate-rewrite. A store that cannot be parsed is treated as
/// absent, so the new record becomes the entire store.
pub fn append_record(path: &Path, record: &Record) -> anyhow::Result<MergeOutcome> {
    let (table, kind) = match load(path) {
        StoreLoad::Loaded { mut table, .. } => {
            table.append(record);
            (table, MergeKind::Appended)
        }
        StoreLoad::Missing | StoreLoad::Empty => (Table::from_record(record), MergeKind::Created),
        StoreLoad::Unreadable(err) => {
            warn!(path = %path.display(), error = %err, "store unreadable, starting fresh");
            (Table::from_record(record), MergeKind::Replaced)
        }
    };

    write_table(path, &table)?;
    info!(path = %path.display(), rows = table.len(), ?kind, "record saved");

    Ok(MergeOutcome { table, kind })
}
