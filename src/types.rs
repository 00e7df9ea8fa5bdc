//! Row-level data types shared by the decoders, the bridge and the converters.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// What a low-level cell record carried before it was rendered to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Blank,
    Text,
    Number,
    /// Cached result of a formula (the formula itself is never evaluated).
    FormulaResult,
    /// Error placeholder such as `#DIV/0!`; rendered as an empty string.
    Error,
    /// `TRUE` / `FALSE`.
    Boolean,
}

/// One decoded cell, as emitted by a row decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCellEvent {
    pub sheet_index: usize,
    pub row_index: u32,
    pub column_index: u16,
    pub text: String,
    pub kind: CellKind,
}

/// A completed row: cell texts aligned to their column positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    /// Zero-based worksheet number (chart and macro sheets are not counted).
    pub sheet_index: usize,
    /// Zero-based row number inside the worksheet.
    pub row_index: u32,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(sheet_index: usize, row_index: u32, cells: Vec<String>) -> Self {
        Self {
            sheet_index,
            row_index,
            cells,
        }
    }

    /// Cell text at `column`, or `""` when the row is shorter.
    pub fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Accumulates the cells of the row currently being decoded.
///
/// Owned by exactly one decoder. Gaps between column indices are filled with empty strings so
/// positions stay aligned with headers.
#[derive(Debug, Default)]
pub struct RowBuffer {
    row: Option<(usize, u32)>,
    cells: Vec<String>,
}

impl RowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new row. Any cells still buffered are discarded.
    pub fn begin(&mut self, sheet_index: usize, row_index: u32) {
        self.row = Some((sheet_index, row_index));
        self.cells.clear();
    }

    /// `(sheet, row)` of the open row, if any.
    pub fn current(&self) -> Option<(usize, u32)> {
        self.row
    }

    pub fn is_open(&self) -> bool {
        self.row.is_some()
    }

    /// Place `text` at `column`, padding skipped columns with `""`.
    ///
    /// A repeated column overwrites the earlier value. Returns `false` (and ignores the cell) when
    /// no row is open.
    pub fn push(&mut self, column: u16, text: String) -> bool {
        if self.row.is_none() {
            return false;
        }
        let column = usize::from(column);
        if column < self.cells.len() {
            log::debug!(
                "cell at column {column} arrived after column {}; overwriting",
                self.cells.len() - 1
            );
            self.cells[column] = text;
            return true;
        }
        self.cells.resize(column, String::new());
        self.cells.push(text);
        true
    }

    pub fn push_event(&mut self, event: RawCellEvent) -> bool {
        self.push(event.column_index, event.text)
    }

    /// Close the open row and hand out its cells, leaving the buffer empty.
    pub fn take(&mut self) -> Option<RawRow> {
        let (sheet_index, row_index) = self.row.take()?;
        Some(RawRow::new(
            sheet_index,
            row_index,
            std::mem::take(&mut self.cells),
        ))
    }
}

/// A row keyed by column title, preserving column order.
///
/// Serializes as a JSON-style object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowMap {
    entries: Vec<(String, String)>,
}

impl RowMap {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            entries: Vec::with_capacity(n),
        }
    }

    /// Insert or replace the value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RowMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RowMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = RowMap::default();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
