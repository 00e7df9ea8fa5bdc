//! Column titles: captured from the first row or supplied by the caller.

use std::collections::HashMap;

use crate::types::RawRow;

/// Column titles and their positions. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    titles: Vec<String>,
    index: HashMap<String, usize>,
}

impl HeaderMap {
    /// Build from titles in column order. When a title repeats, the first column keeps it.
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let titles: Vec<String> = titles.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(titles.len());
        for (i, title) in titles.iter().enumerate() {
            if index.contains_key(title) {
                log::warn!("duplicate column title '{title}' at column {i}; keeping the first");
                continue;
            }
            index.insert(title.clone(), i);
        }
        Self { titles, index }
    }

    pub fn get(&self, title: &str) -> Option<usize> {
        self.index.get(title).copied()
    }

    /// All titles in column order, duplicates included.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// `(title, column)` pairs in column order, one per distinct title.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.titles
            .iter()
            .enumerate()
            .filter(|(i, t)| self.index.get(*t) == Some(i))
            .map(|(i, t)| (t.as_str(), i))
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// What [`HeaderManager::intercept`] did with a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDecision {
    /// Ordinary data row.
    Data,
    /// The row became the header map.
    Captured,
    /// First row of a later sheet, dropped because `skip_repeated_headers` is on.
    SkippedRepeat,
}

/// Decides which rows are headers.
///
/// With capture enabled, only the very first row produced, and only if it belongs to the first
/// sheet, becomes the header. Capture takes precedence over explicit names: configuring both
/// keeps capture and discards the names.
#[derive(Debug, Default)]
pub struct HeaderManager {
    capture: bool,
    skip_repeated: bool,
    map: Option<HeaderMap>,
    rows_seen: u64,
    last_sheet: Option<usize>,
}

impl HeaderManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture_first_row(&mut self) {
        if self.map.take().is_some() {
            log::warn!("header capture enabled after explicit headers; explicit headers discarded");
        }
        self.capture = true;
    }

    pub fn set_explicit<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.capture {
            log::warn!("explicit headers ignored: header capture from the first row takes precedence");
            return;
        }
        self.map = Some(HeaderMap::new(names));
    }

    /// Also drop the first row of every sheet after the first.
    pub fn skip_repeated_headers(&mut self, on: bool) {
        self.skip_repeated = on;
    }

    pub fn is_capturing(&self) -> bool {
        self.capture
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.map.as_ref()
    }

    /// Classify the next row produced by the bridge.
    pub fn intercept(&mut self, row: &RawRow) -> HeaderDecision {
        let first_overall = self.rows_seen == 0;
        let first_of_sheet = self.last_sheet != Some(row.sheet_index);
        self.rows_seen += 1;
        self.last_sheet = Some(row.sheet_index);

        if self.capture && first_overall {
            if row.sheet_index == 0 {
                self.map = Some(HeaderMap::new(row.cells.iter().cloned()));
                return HeaderDecision::Captured;
            }
            log::warn!(
                "first row comes from sheet {}; no header captured",
                row.sheet_index
            );
        }
        if self.skip_repeated && first_of_sheet && row.sheet_index > 0 {
            log::debug!("skipping first row of sheet {}", row.sheet_index);
            return HeaderDecision::SkippedRepeat;
        }
        HeaderDecision::Data
    }
}
