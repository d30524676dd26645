//! JSONL persistence: one row per line.
//!
//! The portable interchange format for a store's full state. Property
//! registry rows are written first, then object quads, then data quads.
//! Writes are atomic (temp file, fsync, rename).

use crate::error::StoreError;
use crate::quad::{DataQuad, ObjQuad};
use crate::registry::PropertyInfo;
use crate::store::QuadStore;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One persisted line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "row", rename_all = "camelCase")]
pub enum QuadRow {
    Prop(PropertyInfo),
    Obj(ObjQuad),
    Data(DataQuad),
}

/// Read rows from a JSONL reader. Blank lines and `#` comments are skipped.
pub fn read_rows(reader: impl BufRead) -> Result<Vec<QuadRow>, StoreError> {
    let mut rows = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| StoreError::Io(format!("line {}: {e}", line_no + 1)))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let row: QuadRow = serde_json::from_str(trimmed)
            .map_err(|e| StoreError::Parse(line_no + 1, e.to_string()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write rows to a JSONL writer.
pub fn write_rows(writer: &mut impl Write, rows: &[QuadRow]) -> Result<(), StoreError> {
    for row in rows {
        let line = serde_json::to_string(row).map_err(|e| StoreError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| StoreError::Io(e.to_string()))?;
    }
    Ok(())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".tmp-{}", std::process::id()));
    PathBuf::from(name)
}

impl QuadStore {
    /// Collect the store's full state as persistable rows.
    pub fn to_rows(&self) -> Vec<QuadRow> {
        let mut rows: Vec<QuadRow> = self.props().rows().cloned().map(QuadRow::Prop).collect();
        rows.extend(self.obj_rows().iter().cloned().map(QuadRow::Obj));
        rows.extend(self.data_rows().iter().cloned().map(QuadRow::Data));
        rows
    }

    /// Rebuild a store from persisted rows. Counters are recomputed from
    /// the identifiers seen; the result has no pending changes.
    pub fn from_rows(rows: Vec<QuadRow>) -> Result<Self, StoreError> {
        let mut store = QuadStore::new();
        for row in rows {
            match row {
                QuadRow::Prop(info) => store.declare_row(info)?,
                QuadRow::Obj(quad) => store.push_obj_row(quad),
                QuadRow::Data(quad) => store.push_data_row(quad),
            }
        }
        store.recompute_counters();
        Ok(store)
    }

    /// Load a store from a JSONL file.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))?;
        let rows = read_rows(BufReader::new(file))?;
        Self::from_rows(rows)
    }

    /// Persist the store to a JSONL file, atomically.
    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("{}: {e}", parent.display())))?;
        }

        let tmp_path = tmp_write_path(path);
        let write_result = (|| -> Result<(), StoreError> {
            let file = File::create(&tmp_path)
                .map_err(|e| StoreError::Io(format!("{}: {e}", tmp_path.display())))?;
            let mut writer = BufWriter::new(file);
            write_rows(&mut writer, &self.to_rows())?;
            writer
                .flush()
                .map_err(|e| StoreError::Io(format!("{}: {e}", tmp_path.display())))?;
            let file = writer
                .into_inner()
                .map_err(|e| StoreError::Io(format!("{}: {e}", tmp_path.display())))?;
            file.sync_all()
                .map_err(|e| StoreError::Io(format!("{}: {e}", tmp_path.display())))?;
            Ok(())
        })();

        if let Err(error) = write_result {
            let _ = fs::remove_file(&tmp_path);
            return Err(error);
        }

        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(format!(
                "{} -> {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })
    }
}
