//! Reference lookup data for contextual validations.
//!
//! The reference data store is loaded once before any validation and is
//! immutable afterwards; every concurrent run shares the same store. Two
//! sets are carried: valid NAICS sector codes and valid census tract
//! GEOIDs, both read from CSV files shaped like the published data
//! (`code,title` and `geoid` header rows respectively).

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use sblar_model::{CodeLookup, Result, ValidationError};

/// Valid NAICS codes mapped to their sector titles.
#[derive(Debug, Clone, Default)]
pub struct NaicsCodes {
    codes: HashMap<String, String>,
}

impl NaicsCodes {
    /// Load from a CSV file with `code` and `title` columns.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = open_reader(path)?;
        let (code_idx, title_idx) = {
            let headers = headers(&mut reader, path)?;
            (
                column_index(&headers, "code", path)?,
                column_index(&headers, "title", path)?,
            )
        };

        let mut codes = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| ValidationError::source_read(display(path), e))?;
            let code = record.get(code_idx).unwrap_or_default().trim();
            let title = record.get(title_idx).unwrap_or_default().trim();
            if !code.is_empty() {
                codes.insert(code.to_string(), title.to_string());
            }
        }
        tracing::debug!(count = codes.len(), path = %path.display(), "loaded NAICS codes");
        Ok(Self { codes })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn title(&self, code: &str) -> Option<&str> {
        self.codes.get(code).map(String::as_str)
    }
}

impl CodeLookup for NaicsCodes {
    fn contains(&self, value: &str) -> bool {
        self.codes.contains_key(value)
    }
}

/// Valid census tract GEOIDs.
#[derive(Debug, Clone, Default)]
pub struct CensusGeoids {
    geoids: HashSet<String>,
}

impl CensusGeoids {
    /// Load from a CSV file with a `geoid` column.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = open_reader(path)?;
        let geoid_idx = {
            let headers = headers(&mut reader, path)?;
            column_index(&headers, "geoid", path)?
        };

        let mut geoids = HashSet::new();
        for record in reader.records() {
            let record = record.map_err(|e| ValidationError::source_read(display(path), e))?;
            let geoid = record.get(geoid_idx).unwrap_or_default().trim();
            if !geoid.is_empty() {
                geoids.insert(geoid.to_string());
            }
        }
        tracing::debug!(count = geoids.len(), path = %path.display(), "loaded census GEOIDs");
        Ok(Self { geoids })
    }

    pub fn len(&self) -> usize {
        self.geoids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geoids.is_empty()
    }
}

impl CodeLookup for CensusGeoids {
    fn contains(&self, value: &str) -> bool {
        self.geoids.contains(value)
    }
}

/// The process-wide reference data bundle.
#[derive(Debug, Clone, Default)]
pub struct RefData {
    pub naics: Arc<NaicsCodes>,
    pub geoids: Arc<CensusGeoids>,
}

impl RefData {
    pub fn load(naics_path: &Path, geoids_path: &Path) -> Result<Self> {
        Ok(Self {
            naics: Arc::new(NaicsCodes::load(naics_path)?),
            geoids: Arc::new(CensusGeoids::load(geoids_path)?),
        })
    }

    /// Empty store. Membership checks fail for every value; useful for
    /// tests and for runs that do not exercise code lookups.
    pub fn empty() -> Self {
        Self::default()
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| ValidationError::source_read(display(path), e))
}

fn headers(reader: &mut csv::Reader<std::fs::File>, path: &Path) -> Result<csv::StringRecord> {
    reader
        .headers()
        .map(Clone::clone)
        .map_err(|e| ValidationError::source_read(display(path), e))
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            ValidationError::source_read(display(path), format!("missing {name} column"))
        })
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write fixture");
        file
    }

    #[test]
    fn loads_naics_codes() {
        let file = write_file("code,title\n111,Crop Production\n112,Animal Production\n");
        let codes = NaicsCodes::load(file.path()).expect("load naics");
        assert_eq!(codes.len(), 2);
        assert!(codes.contains("111"));
        assert!(!codes.contains("999"));
        assert_eq!(codes.title("112"), Some("Animal Production"));
    }

    #[test]
    fn loads_census_geoids() {
        let file = write_file("geoid\n10380000100\n10380000200\n");
        let geoids = CensusGeoids::load(file.path()).expect("load geoids");
        assert_eq!(geoids.len(), 2);
        assert!(geoids.contains("10380000100"));
        assert!(!geoids.contains("99999999999"));
    }

    #[test]
    fn missing_column_is_source_read_error() {
        let file = write_file("not_geoid\n123\n");
        let err = CensusGeoids::load(file.path()).unwrap_err();
        assert!(matches!(err, ValidationError::SourceRead { .. }));
    }

    #[test]
    fn empty_store_rejects_everything() {
        let refdata = RefData::empty();
        assert!(!refdata.naics.contains("111"));
        assert!(!refdata.geoids.contains("10380000100"));
    }
}
