//! Header-keyed CSV rows and the column-name variants different writers
//! have used for the same field.

use crate::error::Result;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Serial number columns, in lookup order. The first non-empty one wins.
pub const SERIAL_COLUMNS: &[&str] = &["Serial", "SERIAL NO.", "serial", "SERIAL"];
/// External identifier columns, in lookup order. The first present one wins.
pub const ID_COLUMNS: &[&str] = &["PRN", "ID"];
/// First-name columns, in lookup order. The first present one wins.
pub const FIRST_NAME_COLUMNS: &[&str] = &["First Name", "NAME"];

/// One CSV row paired with the file's header names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Pair `row` with `headers`. Short rows leave trailing columns absent,
    /// extra cells without a header are dropped.
    pub fn from_csv(headers: &StringRecord, row: &StringRecord) -> Self {
        Self {
            fields: headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(h, _)| h == column)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `column`, or `""` when the column is absent.
    pub fn field(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// Value of the first candidate column present in the row, even if empty.
    pub fn first_present(&self, candidates: &[&str]) -> Option<&str> {
        candidates.iter().find_map(|c| self.get(c))
    }

    /// Value of the first candidate column holding a non-blank value.
    pub fn first_nonempty(&self, candidates: &[&str]) -> Option<&str> {
        candidates
            .iter()
            .filter_map(|c| self.get(c))
            .find(|v| !v.trim().is_empty())
    }
}

/// Read every data row of `path` keyed by its header. A missing file reads
/// as `None`; rows the CSV parser rejects are logged and skipped.
pub(crate) fn read_records(path: &Path) -> Result<Option<Vec<Record>>> {
    if !path.is_file() {
        return Ok(None);
    }
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        match row {
            Ok(row) => records.push(Record::from_csv(&headers, &row)),
            Err(e) => tracing::warn!(path = %path.display(), line = line + 2, error = %e, "skipping unreadable row"),
        }
    }
    Ok(Some(records))
}

/// Number of CSV rows in `path`, header included. Missing files count as 0.
pub(crate) fn count_rows(path: &Path) -> Result<usize> {
    if !path.is_file() {
        return Ok(0);
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    Ok(reader.records().filter(|r| r.is_ok()).count())
}

/// Append one row, writing `header` first when the file is new or empty.
pub(crate) fn append_row<I, T>(path: &Path, header: &[&str], row: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let fresh = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    if fresh {
        writer.write_record(header)?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}
