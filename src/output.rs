//! Result table assembly and CSV output.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::record::ResultRecord;

/// Header of the row-key column.
pub const ID_COLUMN: &str = "vehicleId";

/// Rows keyed by vehicle ID, kept in insertion order.
#[derive(Debug, Default)]
pub struct ResultTable {
    rows: Vec<(String, ResultRecord)>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the row for `vehicle_id`, replacing an earlier row in place.
    pub fn insert(&mut self, vehicle_id: impl Into<String>, record: ResultRecord) {
        let vehicle_id = vehicle_id.into();
        match self.rows.iter_mut().find(|(id, _)| *id == vehicle_id) {
            Some((_, existing)) => *existing = record,
            None => self.rows.push((vehicle_id, record)),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    fn get(&self, vehicle_id: &str) -> Option<&ResultRecord> {
        self.rows
            .iter()
            .find(|(id, _)| id == vehicle_id)
            .map(|(_, record)| record)
    }

    /// Union of every record's columns, in the order they were first seen.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for (_, record) in &self.rows {
            for column in record.columns() {
                if !columns.iter().any(|c| c == column) {
                    columns.push(column.to_string());
                }
            }
        }
        columns
    }

    /// Writes the table to `path` and returns the number of rows.
    ///
    /// The CSV is written next to `path` first and renamed into place, so a
    /// failure never leaves a partial table behind.
    pub fn write_csv(&self, path: &Path) -> Result<usize> {
        let columns = self.columns();
        let tmp = tmp_path(path);
        debug!(path = %path.display(), rows = self.len(), columns = columns.len(), "Writing result table");

        {
            let mut writer = WriterBuilder::new()
                .from_path(&tmp)
                .with_context(|| format!("failed to create {}", tmp.display()))?;

            writer.write_record(std::iter::once(ID_COLUMN).chain(columns.iter().map(String::as_str)))?;

            for (vehicle_id, record) in &self.rows {
                let cells = columns
                    .iter()
                    .map(|column| record.get(column).map(render_cell).unwrap_or_default());
                writer.write_record(std::iter::once(vehicle_id.clone()).chain(cells))?;
            }

            writer.flush()?;
        }

        fs::rename(&tmp, path)
            .with_context(|| format!("failed to move table into place at {}", path.display()))?;
        Ok(self.len())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Renders one cell: null is empty, booleans are `True`/`False`.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Logs a record as JSON at debug level.
pub fn log_record(vehicle_id: &str, record: &ResultRecord) {
    let fields: serde_json::Map<String, Value> = record
        .columns()
        .filter_map(|c| record.get(c).map(|v| (c.to_string(), v.clone())))
        .collect();
    let record = Value::Object(fields);
    debug!(vehicle_id, %record, "Record built");
}
