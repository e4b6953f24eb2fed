//! Spreadsheet ingestion.
//!
//! Reads the first worksheet of a workbook into a [`RowStore`]. Rows keep their
//! 1-based sheet row number, columns are named by their letters (`a`, `b`,
//! ..., `z`, `aa`), and rows with no non-empty cell are skipped.

use crate::backend::RowStoreBackend;
use crate::error::IngestError;
use crate::row_store::{Row, RowStore};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::NaiveDateTime;
use std::io::{Cursor, Read, Seek};
use std::path::PathBuf;
use tracing::{debug, info};

/// Where a spreadsheet comes from.
#[derive(Debug, Clone)]
pub enum SheetSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl SheetSource {
    /// Parse the sheet. Blocking.
    pub fn read(self) -> Result<RowStore, IngestError> {
        match self {
            SheetSource::Path(path) => {
                debug!("Opening spreadsheet {}", path.display());
                first_sheet(open_workbook_auto(&path)?)
            }
            SheetSource::Bytes(bytes) => {
                debug!("Opening uploaded spreadsheet ({} bytes)", bytes.len());
                first_sheet(open_workbook_auto_from_rs(Cursor::new(bytes))?)
            }
        }
    }
}

/// Reset the backend, parse the sheet and persist the rows.
///
/// Returns the number of rows stored. If parsing fails the backend is left
/// holding an empty store.
pub async fn ingest_into(
    backend: &dyn RowStoreBackend,
    source: SheetSource,
) -> Result<usize, IngestError> {
    backend.reset().await?;

    let store = tokio::task::spawn_blocking(move || source.read())
        .await
        .map_err(|e| IngestError::Task(e.to_string()))??;

    backend.save(&store).await?;
    info!("Ingested {} row(s) from spreadsheet", store.len());
    Ok(store.len())
}

fn first_sheet<RS: Read + Seek>(mut workbook: Sheets<RS>) -> Result<RowStore, IngestError> {
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IngestError::NoWorksheet)??;
    Ok(rows_from_range(&range))
}

/// Convert a worksheet range into rows keyed by absolute sheet position.
pub fn rows_from_range(range: &Range<Data>) -> RowStore {
    let mut store = RowStore::new();
    let Some((first_row, first_col)) = range.start() else {
        return store;
    };

    for (r, cells) in range.rows().enumerate() {
        let mut row = Row::new();
        for (c, cell) in cells.iter().enumerate() {
            if let Some(text) = cell_text(cell) {
                row.insert(&column_letters(first_col + c as u32), text);
            }
        }
        if !row.is_empty() {
            store.insert(first_row + r as u32 + 1, row);
        }
    }
    store
}

/// Spreadsheet-style column name for a zero-based column index, lower-case.
pub fn column_letters(index: u32) -> String {
    let mut n = index as u64 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(b'a' + rem);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Text stored for a cell, or `None` when the cell is empty.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(true) => Some("True".to_string()),
        Data::Bool(false) => Some("False".to_string()),
        Data::DateTime(dt) => Some(
            dt.as_datetime()
                .map(format_datetime)
                .unwrap_or_else(|| dt.as_f64().to_string()),
        ),
        Data::Error(e) => Some(e.to_string()),
        other => Some(other.to_string()).filter(|s| !s.is_empty()),
    }
}

fn format_datetime(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}
