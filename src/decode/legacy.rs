//! Row decoder for BIFF8 record streams.
//!
//! [`LegacyRowDecoder`] is fed records in file order and answers each one with a [`Step`]: either
//! a completed row or a request for more input. The driver stops feeding as soon as a row comes
//! back, which is what lets the bridge hand rows out one at a time.

use super::biff::{self, BiffRecord};
use super::formats::{general_number, FormatTable};
use super::sst::parse_sst;
use crate::convert::date::DATE_1904_OFFSET;
use crate::error::DecodeError;
use crate::types::{CellKind, RawCellEvent, RawRow, RowBuffer};

/// Outcome of feeding one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A row was completed by this record.
    Row(RawRow),
    /// Keep feeding.
    NeedMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Globals,
    Sheet(usize),
}

#[derive(Debug)]
enum SharedStrings {
    NotLoaded,
    Collecting(Vec<Vec<u8>>),
    Loaded(Vec<String>),
}

/// Resumable decoder state.
#[derive(Debug)]
pub struct LegacyRowDecoder {
    stage: Stage,
    /// Depth inside chart, macro or other non-worksheet substreams.
    skip_depth: u32,
    seen_globals: bool,
    worksheets: usize,
    strings: SharedStrings,
    formats: FormatTable,
    date_1904: bool,
    /// `(row, column)` of a formula whose string result arrives in the next `STRING` record.
    pending_string: Option<(u32, u16)>,
    buffer: RowBuffer,
}

impl Default for LegacyRowDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyRowDecoder {
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            skip_depth: 0,
            seen_globals: false,
            worksheets: 0,
            strings: SharedStrings::NotLoaded,
            formats: FormatTable::default(),
            date_1904: false,
            pending_string: None,
            buffer: RowBuffer::new(),
        }
    }

    /// Number of worksheets opened so far.
    pub fn worksheets_seen(&self) -> usize {
        self.worksheets
    }

    pub fn is_1904(&self) -> bool {
        self.date_1904
    }

    /// Feed the next record.
    pub fn feed(&mut self, record: &BiffRecord) -> Result<Step, DecodeError> {
        if let SharedStrings::Collecting(fragments) = &mut self.strings {
            if record.id == biff::RECORD_CONTINUE {
                fragments.push(record.data.clone());
                return Ok(Step::NeedMore);
            }
            self.load_shared_strings()?;
        }

        if self.skip_depth > 0 {
            match record.id {
                biff::RECORD_BOF => self.skip_depth += 1,
                biff::RECORD_EOF => self.skip_depth -= 1,
                _ => {}
            }
            return Ok(Step::NeedMore);
        }

        match record.id {
            biff::RECORD_BOF => self.on_bof(record).map(|()| Step::NeedMore),
            id if biff::LEGACY_BOF_IDS.contains(&id) => Err(DecodeError::UnsupportedBiffVersion {
                version: id,
            }),
            biff::RECORD_EOF => Ok(self.on_eof()),
            _ => match self.stage {
                Stage::Globals => self.on_globals_record(record).map(|()| Step::NeedMore),
                Stage::Sheet(sheet) => self.on_sheet_record(sheet, record),
                Stage::Idle => Ok(Step::NeedMore),
            },
        }
    }

    /// Signal end of input. Returns the row still buffered, if any.
    pub fn finish(&mut self) -> Result<Option<RawRow>, DecodeError> {
        if matches!(self.strings, SharedStrings::Collecting(_)) {
            self.load_shared_strings()?;
        }
        self.pending_string = None;
        self.stage = Stage::Idle;
        Ok(self.buffer.take())
    }

    fn load_shared_strings(&mut self) -> Result<(), DecodeError> {
        if let SharedStrings::Collecting(fragments) = &self.strings {
            let strings = parse_sst(fragments)?;
            log::debug!("loaded {} shared strings", strings.len());
            self.strings = SharedStrings::Loaded(strings);
        }
        Ok(())
    }

    fn on_bof(&mut self, record: &BiffRecord) -> Result<(), DecodeError> {
        let version = record.u16_at(0)?;
        let kind = record.u16_at(2)?;

        if !self.seen_globals && self.worksheets == 0 && version != biff::BIFF8_VERSION {
            return Err(DecodeError::UnsupportedBiffVersion { version });
        }

        match (self.stage, kind) {
            (Stage::Idle, biff::BOF_GLOBALS) => {
                self.seen_globals = true;
                self.stage = Stage::Globals;
            }
            (Stage::Idle, biff::BOF_WORKSHEET) => {
                let sheet = self.worksheets;
                self.worksheets += 1;
                self.stage = Stage::Sheet(sheet);
                log::debug!("worksheet {sheet} opened");
            }
            (_, other) => {
                log::debug!("skipping substream of type 0x{other:04X}");
                self.skip_depth = 1;
            }
        }
        Ok(())
    }

    fn on_eof(&mut self) -> Step {
        let stage = std::mem::replace(&mut self.stage, Stage::Idle);
        self.pending_string = None;
        match stage {
            Stage::Sheet(sheet) => {
                log::debug!("worksheet {sheet} closed");
                match self.buffer.take() {
                    Some(row) => Step::Row(row),
                    None => Step::NeedMore,
                }
            }
            Stage::Globals | Stage::Idle => Step::NeedMore,
        }
    }

    fn on_globals_record(&mut self, record: &BiffRecord) -> Result<(), DecodeError> {
        match record.id {
            biff::RECORD_FILEPASS => return Err(DecodeError::Encrypted),
            biff::RECORD_SST => {
                self.strings = SharedStrings::Collecting(vec![record.data.clone()]);
            }
            biff::RECORD_FORMAT => self.formats.add_format(record)?,
            biff::RECORD_XF => self.formats.add_xf(record)?,
            biff::RECORD_DATEMODE => self.date_1904 = record.u16_at(0)? == 1,
            _ => {}
        }
        Ok(())
    }

    fn on_sheet_record(&mut self, sheet: usize, record: &BiffRecord) -> Result<Step, DecodeError> {
        if record.id == biff::RECORD_STRING {
            return Ok(match self.pending_string.take() {
                Some((row, column)) => {
                    let text = record.unicode_string_at(0)?;
                    self.place(RawCellEvent {
                        sheet_index: sheet,
                        row_index: row,
                        column_index: column,
                        text,
                        kind: CellKind::FormulaResult,
                    })
                }
                None => Step::NeedMore,
            });
        }

        let events = self.cell_events(sheet, record)?;
        let mut completed = None;
        for event in events {
            if let Step::Row(row) = self.place(event) {
                completed = Some(row);
            }
        }
        Ok(completed.map_or(Step::NeedMore, Step::Row))
    }

    /// Put a cell into the buffer; a cell on a new row closes the buffered one.
    fn place(&mut self, event: RawCellEvent) -> Step {
        let mut completed = None;
        match self.buffer.current() {
            Some((sheet, row)) if sheet == event.sheet_index && row == event.row_index => {}
            Some(_) => {
                completed = self.buffer.take();
                self.buffer.begin(event.sheet_index, event.row_index);
            }
            None => self.buffer.begin(event.sheet_index, event.row_index),
        }
        self.buffer.push_event(event);
        completed.map_or(Step::NeedMore, Step::Row)
    }

    fn cell_events(&mut self, sheet: usize, record: &BiffRecord) -> Result<Vec<RawCellEvent>, DecodeError> {
        let cell = |row: u16, column: u16, text: String, kind: CellKind| RawCellEvent {
            sheet_index: sheet,
            row_index: u32::from(row),
            column_index: column,
            text,
            kind,
        };

        let events = match record.id {
            biff::RECORD_LABELSST => {
                let index = record.u32_at(6)?;
                let text = self.shared_string(index)?;
                vec![cell(record.u16_at(0)?, record.u16_at(2)?, text, CellKind::Text)]
            }
            biff::RECORD_LABEL | biff::RECORD_RSTRING => {
                let text = record.unicode_string_at(6)?;
                vec![cell(record.u16_at(0)?, record.u16_at(2)?, text, CellKind::Text)]
            }
            biff::RECORD_NUMBER => {
                let text = self.number_text(record.u16_at(4)?, record.f64_at(6)?);
                vec![cell(record.u16_at(0)?, record.u16_at(2)?, text, CellKind::Number)]
            }
            biff::RECORD_RK => {
                let value = biff::rk_to_f64(record.u32_at(6)?);
                let text = self.number_text(record.u16_at(4)?, value);
                vec![cell(record.u16_at(0)?, record.u16_at(2)?, text, CellKind::Number)]
            }
            biff::RECORD_MULRK => {
                let row = record.u16_at(0)?;
                let first = record.u16_at(2)?;
                // [row][first col] then 6-byte (xf, rk) pairs, then the last column.
                let count = record.data.len().saturating_sub(6) / 6;
                let mut out = Vec::with_capacity(count);
                for i in 0..count {
                    let base = 4 + i * 6;
                    let value = biff::rk_to_f64(record.u32_at(base + 2)?);
                    let text = self.number_text(record.u16_at(base)?, value);
                    out.push(cell(row, offset_column(record, first, i)?, text, CellKind::Number));
                }
                out
            }
            biff::RECORD_BLANK => {
                vec![cell(record.u16_at(0)?, record.u16_at(2)?, String::new(), CellKind::Blank)]
            }
            biff::RECORD_MULBLANK => {
                let row = record.u16_at(0)?;
                let first = record.u16_at(2)?;
                let count = record.data.len().saturating_sub(6) / 2;
                (0..count)
                    .map(|i| {
                        let column = offset_column(record, first, i)?;
                        Ok(cell(row, column, String::new(), CellKind::Blank))
                    })
                    .collect::<Result<Vec<_>, DecodeError>>()?
            }
            biff::RECORD_BOOLERR => {
                let value = record.u8_at(6)?;
                let is_error = record.u8_at(7)? != 0;
                let (text, kind) = if is_error {
                    (String::new(), CellKind::Error)
                } else {
                    (bool_text(value != 0), CellKind::Boolean)
                };
                vec![cell(record.u16_at(0)?, record.u16_at(2)?, text, kind)]
            }
            biff::RECORD_FORMULA => {
                let row = record.u16_at(0)?;
                let column = record.u16_at(2)?;
                self.pending_string = None;
                let result = record.bytes(6, 8)?;
                if result[6] == 0xFF && result[7] == 0xFF {
                    let (text, kind) = match result[0] {
                        0 => {
                            // Text arrives in the following STRING record.
                            self.pending_string = Some((u32::from(row), column));
                            (String::new(), CellKind::FormulaResult)
                        }
                        1 => (bool_text(result[2] != 0), CellKind::Boolean),
                        2 => (String::new(), CellKind::Error),
                        _ => (String::new(), CellKind::FormulaResult),
                    };
                    vec![cell(row, column, text, kind)]
                } else {
                    let text = self.number_text(record.u16_at(4)?, record.f64_at(6)?);
                    vec![cell(row, column, text, CellKind::FormulaResult)]
                }
            }
            _ => Vec::new(),
        };

        if !events.is_empty() && record.id != biff::RECORD_FORMULA {
            self.pending_string = None;
        }
        Ok(events)
    }

    fn shared_string(&self, index: u32) -> Result<String, DecodeError> {
        match &self.strings {
            SharedStrings::Loaded(strings) => strings
                .get(index as usize)
                .cloned()
                .ok_or(DecodeError::SharedStringOutOfRange {
                    index,
                    len: strings.len(),
                }),
            SharedStrings::NotLoaded | SharedStrings::Collecting(_) => {
                Err(DecodeError::SharedStringsNotLoaded { index })
            }
        }
    }

    /// Date-formatted numbers are rendered as their serial number in the 1900 date system.
    fn number_text(&self, xf: u16, value: f64) -> String {
        if self.date_1904 && self.formats.is_date_xf(xf) {
            general_number(value + DATE_1904_OFFSET)
        } else {
            general_number(value)
        }
    }
}

/// Column `index` cells to the right of `first` in a MULRK/MULBLANK run.
fn offset_column(record: &BiffRecord, first: u16, index: usize) -> Result<u16, DecodeError> {
    u16::try_from(index)
        .ok()
        .and_then(|i| first.checked_add(i))
        .ok_or_else(|| DecodeError::InvalidRecord {
            record: record.id,
            message: format!("cell {index} of a run starting at column {first} is past the last column"),
        })
}

fn bool_text(value: bool) -> String {
    if value { "TRUE" } else { "FALSE" }.to_string()
}
