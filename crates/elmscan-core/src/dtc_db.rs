//! DTC description table
//!
//! The scanner only needs `code -> description`; that seam is the
//! [`DtcDescriptions`] trait. [`DtcDatabase`] implements it over plain
//! `code,description` files: a generic table plus optional manufacturer
//! tables that override generic entries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DtcDbError;

/// Description returned for codes missing from every loaded table
pub const UNKNOWN_CODE_DESCRIPTION: &str = "Unknown code - not in database";

/// Name of the generic table inside the data directory
pub const GENERIC_FILE: &str = "dtc_generic.csv";

/// Manufacturer aliases and the table each one selects
const MANUFACTURER_FILES: &[(&str, &str)] = &[
    ("chrysler", "dtc_jeep_dodge_chrysler.csv"),
    ("jeep", "dtc_jeep_dodge_chrysler.csv"),
    ("dodge", "dtc_jeep_dodge_chrysler.csv"),
    ("landrover", "dtc_land_rover.csv"),
    ("land_rover", "dtc_land_rover.csv"),
    ("jaguar", "dtc_land_rover.csv"),
];

/// Code description lookup consumed by the scanner
pub trait DtcDescriptions: Send {
    /// Description for `code`, or [`UNKNOWN_CODE_DESCRIPTION`]
    fn get_description(&self, code: &str) -> String;
}

/// One row of a description table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtcInfo {
    pub code: String,
    pub description: String,
    /// Table the row came from ("generic", "jeep", ...)
    pub source: String,
}

/// Description tables loaded from a data directory
#[derive(Debug, Clone)]
pub struct DtcDatabase {
    data_dir: PathBuf,
    manufacturer: Option<String>,
    codes: HashMap<String, DtcInfo>,
    loaded_files: Vec<String>,
}

impl DtcDatabase {
    /// Load the generic table and the tables for `manufacturer`
    ///
    /// Without a manufacturer every manufacturer table is loaded. A missing
    /// data directory yields an empty database.
    pub fn new(data_dir: impl Into<PathBuf>, manufacturer: Option<&str>) -> Self {
        let mut db = Self {
            data_dir: data_dir.into(),
            manufacturer: manufacturer.map(str::to_string),
            codes: HashMap::new(),
            loaded_files: Vec::new(),
        };
        db.reload();
        db
    }

    /// Database with no tables (every lookup is unknown)
    pub fn empty() -> Self {
        Self {
            data_dir: PathBuf::new(),
            manufacturer: None,
            codes: HashMap::new(),
            loaded_files: Vec::new(),
        }
    }

    fn reload(&mut self) {
        self.codes.clear();
        self.loaded_files.clear();

        if !self.data_dir.is_dir() {
            debug!(dir = %self.data_dir.display(), "DTC data directory not found");
            return;
        }

        let generic = self.data_dir.join(GENERIC_FILE);
        if generic.exists() {
            self.load_logged(&generic, "generic");
        }

        match self.manufacturer.clone() {
            Some(mfr) => {
                let key = normalize_manufacturer(&mfr);
                if let Some(file) = manufacturer_file(&key) {
                    let path = self.data_dir.join(file);
                    if path.exists() {
                        self.load_logged(&path, &key);
                    }
                }
            }
            None => {
                let mut seen: Vec<&str> = Vec::new();
                for (name, file) in MANUFACTURER_FILES {
                    if seen.contains(file) {
                        continue;
                    }
                    let path = self.data_dir.join(file);
                    if path.exists() {
                        self.load_logged(&path, name);
                        seen.push(file);
                    }
                }
            }
        }
    }

    fn load_logged(&mut self, path: &Path, source: &str) {
        if let Err(e) = self.load_file(path, source) {
            warn!("{}", e);
        }
    }

    /// Merge one `code,description` file into the database
    ///
    /// Later rows override earlier ones with the same code. Returns the
    /// number of rows read.
    pub fn load_file(&mut self, path: &Path, source: &str) -> Result<usize, DtcDbError> {
        let content = std::fs::read_to_string(path).map_err(|e| DtcDbError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.loaded_files.push(name);

        let mut rows = 0;
        for line in content.trim_start_matches('\u{feff}').lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields = split_csv_line(line);
            if fields.len() < 2 {
                continue;
            }
            let code = fields[0].trim().to_uppercase();
            if code.is_empty() {
                continue;
            }
            self.codes.insert(
                code.clone(),
                DtcInfo {
                    code,
                    description: fields[1].trim().to_string(),
                    source: source.to_string(),
                },
            );
            rows += 1;
        }

        debug!(file = %path.display(), rows, "Loaded DTC table");
        Ok(rows)
    }

    /// Switch manufacturer and reload every table
    pub fn set_manufacturer(&mut self, manufacturer: Option<&str>) {
        self.manufacturer = manufacturer.map(str::to_string);
        self.reload();
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }

    pub fn lookup(&self, code: &str) -> Option<&DtcInfo> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        self.codes.get(&code.to_uppercase())
    }

    /// Case-insensitive substring search over codes and descriptions
    pub fn search(&self, query: &str) -> Vec<&DtcInfo> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<&DtcInfo> = self
            .codes
            .values()
            .filter(|info| {
                info.code.to_lowercase().contains(&q) || info.description.to_lowercase().contains(&q)
            })
            .collect();
        hits.sort_by(|a, b| a.code.cmp(&b.code));
        hits
    }

    pub fn count(&self) -> usize {
        self.codes.len()
    }

    pub fn loaded_files(&self) -> &[String] {
        &self.loaded_files
    }

    /// Manufacturers whose table exists in the data directory, one name per file
    pub fn available_manufacturers(&self) -> Vec<&'static str> {
        let mut seen: Vec<&str> = Vec::new();
        let mut out = Vec::new();
        for (name, file) in MANUFACTURER_FILES {
            if seen.contains(file) {
                continue;
            }
            if self.data_dir.join(file).exists() {
                out.push(*name);
                seen.push(file);
            }
        }
        out
    }
}

impl DtcDescriptions for DtcDatabase {
    fn get_description(&self, code: &str) -> String {
        self.lookup(code)
            .map(|info| info.description.clone())
            .unwrap_or_else(|| UNKNOWN_CODE_DESCRIPTION.to_string())
    }
}

fn normalize_manufacturer(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

fn manufacturer_file(key: &str) -> Option<&'static str> {
    MANUFACTURER_FILES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, file)| *file)
}

/// Split one CSV line, honouring double quotes and `""` escapes
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
