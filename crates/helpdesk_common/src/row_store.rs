//! Row store - spreadsheet rows keyed by their 1-based sheet row number.
//!
//! The persisted form is INI-style text: one `[ordinal]` section per row and
//! one `column = value` line per stored cell. Embedded newlines are written as
//! a newline followed by a tab, so any value survives a round trip unchanged.

use crate::error::StoreFormatError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// One spreadsheet row: lower-case column letters -> cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    cells: BTreeMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from (column, value) pairs. Empty values are dropped.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.insert(column.as_ref(), value);
        }
        row
    }

    /// Store a cell. The column is lower-cased; empty values are not stored.
    /// Returns whether the cell was stored.
    pub fn insert(&mut self, column: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        if value.is_empty() {
            return false;
        }
        self.cells.insert(column.to_ascii_lowercase(), value);
        true
    }

    /// Look up a column, ignoring letter case.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(&column.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Ordered collection of rows keyed by ordinal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowStore {
    rows: BTreeMap<u32, Row>,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, returning the row previously stored under that ordinal.
    pub fn insert(&mut self, ordinal: u32, row: Row) -> Option<Row> {
        self.rows.insert(ordinal, row)
    }

    pub fn get(&self, ordinal: u32) -> Option<&Row> {
        self.rows.get(&ordinal)
    }

    /// Stored ordinals in ascending order.
    pub fn ordinals(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Row)> {
        self.rows.iter().map(|(k, v)| (*k, v))
    }

    /// Serialize to the persisted text form.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (ordinal, row) in &self.rows {
            out.push('[');
            out.push_str(&ordinal.to_string());
            out.push_str("]\n");
            for (column, value) in row.iter() {
                out.push_str(column);
                out.push_str(" = ");
                out.push_str(&value.replace('\n', "\n\t"));
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    /// Parse the persisted text form. Text with no sections is an empty store.
    pub fn decode(text: &str) -> Result<Self, StoreFormatError> {
        let mut store = RowStore::new();
        let mut section = Section::None;
        let mut open_key: Option<String> = None;

        for (idx, line) in text.split('\n').enumerate() {
            let line_no = idx + 1;

            if let Some(rest) = line.strip_prefix('\t') {
                let key = open_key
                    .as_ref()
                    .ok_or_else(|| StoreFormatError::new(line_no, "continuation without a key"))?;
                if let Section::Row(ordinal) = section {
                    if let Some(value) = store
                        .rows
                        .get_mut(&ordinal)
                        .and_then(|row| row.cells.get_mut(key))
                    {
                        value.push('\n');
                        value.push_str(rest);
                    }
                }
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                open_key = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if let Some(name) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                open_key = None;
                section = match parse_ordinal(name.trim()) {
                    Some(ordinal) => {
                        if store.rows.contains_key(&ordinal) {
                            return Err(StoreFormatError::new(
                                line_no,
                                format!("duplicate row {}", ordinal),
                            ));
                        }
                        store.rows.insert(ordinal, Row::new());
                        Section::Row(ordinal)
                    }
                    None => {
                        warn!("Skipping non-numeric row store section [{}]", name);
                        Section::Skipped
                    }
                };
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| StoreFormatError::new(line_no, "expected `column = value`"))?;
            let key = key.trim();
            if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(StoreFormatError::new(
                    line_no,
                    format!("invalid column identifier '{}'", key),
                ));
            }
            let value = value.strip_prefix(' ').unwrap_or(value);

            match section {
                Section::None => {
                    return Err(StoreFormatError::new(line_no, "cell outside of a row section"));
                }
                Section::Skipped => open_key = Some(key.to_ascii_lowercase()),
                Section::Row(ordinal) => {
                    let key = key.to_ascii_lowercase();
                    if let Some(row) = store.rows.get_mut(&ordinal) {
                        row.cells.insert(key.clone(), value.to_string());
                    }
                    open_key = Some(key);
                }
            }
        }

        // Values that came out empty carry no data.
        for row in store.rows.values_mut() {
            row.cells.retain(|_, v| !v.is_empty());
        }
        Ok(store)
    }
}

impl FromIterator<(u32, Row)> for RowStore {
    fn from_iter<I: IntoIterator<Item = (u32, Row)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

enum Section {
    None,
    Skipped,
    Row(u32),
}

fn parse_ordinal(name: &str) -> Option<u32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse::<u32>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RowStore {
        let mut store = RowStore::new();
        store.insert(1, Row::from_pairs([("A", "Nome"), ("B", "Desc")]));
        store.insert(2, Row::from_pairs([("a", "Maria"), ("b", "Furo")]));
        store.insert(4, Row::from_pairs([("a", "Joao"), ("c", "line one\nline two")]));
        store
    }

    #[test]
    fn test_row_keys_are_lowercased() {
        let row = Row::from_pairs([("AB", "x")]);
        assert_eq!(row.get("ab"), Some("x"));
        assert_eq!(row.get("Ab"), Some("x"));
        assert_eq!(row.iter().next(), Some(("ab", "x")));
    }

    #[test]
    fn test_empty_values_not_stored() {
        let mut row = Row::new();
        assert!(!row.insert("a", ""));
        assert!(row.is_empty());
    }

    #[test]
    fn test_encode_layout() {
        let mut store = RowStore::new();
        store.insert(2, Row::from_pairs([("a", "Maria")]));
        assert_eq!(store.encode(), "[2]\na = Maria\n\n");
    }

    #[test]
    fn test_round_trip() {
        let store = sample();
        let decoded = RowStore::decode(&store.encode()).unwrap();
        assert_eq!(decoded, store);
        assert_eq!(decoded.ordinals().collect::<Vec<_>>(), vec![1, 2, 4]);
    }

    #[test]
    fn test_round_trip_preserves_awkward_values() {
        let mut store = RowStore::new();
        store.insert(
            3,
            Row::from_pairs([
                ("a", "  leading spaces"),
                ("b", "trailing  "),
                ("c", "x = y [1]"),
                ("d", "\n\nblank lines\n"),
                ("e", "\ttabbed"),
            ]),
        );
        let decoded = RowStore::decode(&store.encode()).unwrap();
        assert_eq!(decoded, store);
    }

    #[test]
    fn test_decode_empty_text_is_empty_store() {
        assert!(RowStore::decode("").unwrap().is_empty());
        assert!(RowStore::decode("\n\n# nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn test_decode_lowercases_keys() {
        let store = RowStore::decode("[5]\nA = upper\n").unwrap();
        assert_eq!(store.get(5).and_then(|r| r.get("a")), Some("upper"));
    }

    #[test]
    fn test_decode_skips_non_numeric_sections() {
        let store = RowStore::decode("[meta]\nx = 1\n\n[2]\na = v\n").unwrap();
        assert_eq!(store.ordinals().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_decode_rejects_duplicate_rows() {
        let err = RowStore::decode("[2]\na = v\n[2]\na = w\n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_decode_rejects_orphan_cells() {
        let err = RowStore::decode("a = v\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(RowStore::decode("[1]\nno delimiter\n").is_err());
        assert!(RowStore::decode("[1]\na1 = bad key\n").is_err());
    }
}
