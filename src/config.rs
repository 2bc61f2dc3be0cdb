use std::path::{Path, PathBuf};

pub const DEFAULT_CSV: &str = "data.csv";
pub const DEFAULT_JSON: &str = "data.json";

/// Locations of the two data sources. Both live in the same data directory
/// unless given as absolute paths.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: &Path, csv: &Path, json: &Path) -> Self {
        Self {
            csv: data_dir.join(csv),
            json: data_dir.join(json),
        }
    }

    pub fn csv_name(&self) -> String {
        file_name(&self.csv)
    }

    pub fn json_name(&self) -> String {
        file_name(&self.json)
    }
}

#[cfg(test)]
impl DataPaths {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir, Path::new(DEFAULT_CSV), Path::new(DEFAULT_JSON))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
