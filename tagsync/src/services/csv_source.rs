//! Tabular source loading
//!
//! Reads a CSV file with a header row into memory once; the importer and the
//! reconciliation pass then iterate rows without further I/O.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;
use tagsync_common::{Error, Result};

/// An in-memory tabular source (CSV rows plus their header)
#[derive(Debug, Clone)]
pub struct TabularSource {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl TabularSource {
    /// Load from a CSV file with a header row
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Self::from_csv_reader(file)
    }

    /// Load from any CSV reader with a header row
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = csv_reader
            .headers()
            .map_err(|e| Error::InvalidInput(format!("CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|e| Error::InvalidInput(format!("CSV row: {}", e)))?;
            let mut row: Vec<String> = record.iter().map(String::from).collect();
            // Short rows pad with empty cells so column lookups stay in range
            row.resize(columns.len(), String::new());
            rows.push(row);
        }

        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Raw cell value for a row and column name, if the column exists
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let col = *self.index.get(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// Trimmed, non-empty cell value for a row and column name
    pub fn trimmed_value(&self, row: usize, column: &str) -> Option<&str> {
        let value = self.value(row, column)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Distinct non-empty trimmed values in a column, in sorted order
    pub fn distinct_values(&self, column: &str) -> BTreeSet<String> {
        let mut values = BTreeSet::new();
        if let Some(&col) = self.index.get(column) {
            for row in &self.rows {
                let value = row[col].trim();
                if !value.is_empty() {
                    values.insert(value.to_string());
                }
            }
        }
        values
    }
}
