// Pipeline ingestion: reading the four source CSV files into header-keyed raw tables

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::config::InputsConfig;
use crate::domain::EntityKind;
use crate::error::{EtlError, Result};

static HEADER_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalize a header cell so lookups are case- and whitespace-insensitive.
/// `" Provider ID "` and `"provider_id"` both become `provider_id`.
pub fn normalize_header(header: &str) -> String {
    HEADER_WHITESPACE
        .replace_all(header.trim(), "_")
        .to_lowercase()
}

/// One data row of a raw table. Cells are kept exactly as read.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based position among the data rows (header excluded)
    pub row_number: usize,
    columns: HashMap<String, String>,
}

impl RawRow {
    /// Build a row from (header, value) pairs. Headers are normalized on the way in.
    pub fn from_pairs<I, K, V>(row_number: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let columns = pairs
            .into_iter()
            .map(|(k, v)| (normalize_header(k.as_ref()), v.into()))
            .collect();
        Self { row_number, columns }
    }

    /// The cell for `column`, or `None` when the column is missing or the cell is blank.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }
}

/// A header-keyed table read from one CSV file
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| EtlError::Csv {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Self::from_reader(file).map_err(|source| EtlError::Csv {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> std::result::Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();

        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            // Short rows simply lack their trailing columns
            let pairs = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.as_str(), v.to_string()));
            rows.push(RawRow::from_pairs(i + 1, pairs));
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The four raw inputs, one per entity
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub providers: RawTable,
    pub receivers: RawTable,
    pub food_listings: RawTable,
    pub claims: RawTable,
}

impl RawTables {
    pub fn get(&self, kind: EntityKind) -> &RawTable {
        match kind {
            EntityKind::Provider => &self.providers,
            EntityKind::Receiver => &self.receivers,
            EntityKind::FoodListing => &self.food_listings,
            EntityKind::Claim => &self.claims,
        }
    }

    /// Row counts in load order, as reported at the start of a run
    pub fn row_counts(&self) -> Vec<(EntityKind, usize)> {
        EntityKind::LOAD_ORDER
            .iter()
            .map(|kind| (*kind, self.get(*kind).len()))
            .collect()
    }
}

/// Resolve the file for each entity inside `data_dir`
pub fn input_path(inputs: &InputsConfig, kind: EntityKind) -> PathBuf {
    let file = match kind {
        EntityKind::Provider => &inputs.providers,
        EntityKind::Receiver => &inputs.receivers,
        EntityKind::FoodListing => &inputs.food_listings,
        EntityKind::Claim => &inputs.claims,
    };
    inputs.data_dir.join(file)
}

/// Read all four source files. Any unreadable file aborts the run.
#[instrument(skip(inputs), fields(data_dir = %inputs.data_dir.display()))]
pub fn read_inputs(inputs: &InputsConfig) -> Result<RawTables> {
    let read = |kind: EntityKind| -> Result<RawTable> {
        let path = input_path(inputs, kind);
        debug!("Reading {} from {}", kind, path.display());
        let table = RawTable::from_path(&path)?;
        info!(table = %kind, rows = table.len(), columns = table.headers.len(), "Loaded input");
        metrics::counter!("etl_rows_read_total", "table" => kind.table()).increment(table.len() as u64);
        Ok(table)
    };

    Ok(RawTables {
        providers: read(EntityKind::Provider)?,
        receivers: read(EntityKind::Receiver)?,
        food_listings: read(EntityKind::FoodListing)?,
        claims: read(EntityKind::Claim)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_normalization() {
        assert_eq!(normalize_header(" Provider_ID "), "provider_id");
        assert_eq!(normalize_header("Expiry  Date"), "expiry_date");
        assert_eq!(normalize_header("STATUS"), "status");
    }

    #[test]
    fn test_reads_rows_with_messy_headers() {
        let data = " Provider_ID ,NAME, City\n1, Acme ,Springfield\n2,Beta,\n";
        let table = RawTable::from_reader(data.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["provider_id", "name", "city"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].get("name"), Some(" Acme "));
        assert_eq!(table.rows[0].row_number, 1);
        // Blank cells read as absent
        assert_eq!(table.rows[1].get("city"), None);
        assert!(table.rows[1].has_column("city"));
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let data = "Claim_ID,Food_ID,Status\n7,3\n";
        let table = RawTable::from_reader(data.as_bytes()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].get("food_id"), Some("3"));
        assert_eq!(table.rows[0].get("status"), None);
        assert!(!table.rows[0].has_column("status"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = RawTable::from_path(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, EtlError::Csv { .. }));
    }
}
