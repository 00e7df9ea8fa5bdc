//! Row decoder for the streaming XML cell reader.
//!
//! The XML cell reader already resolves shared strings, so this decoder only tracks row
//! boundaries. It is driven from the background worker in [`crate::bridge::worker`].

use crate::types::{CellKind, RawCellEvent, RawRow, RowBuffer};

#[derive(Debug, Default)]
pub struct XmlRowDecoder {
    sheet_index: usize,
    buffer: RowBuffer,
}

impl XmlRowDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to a new worksheet; rows from the previous one must already be closed.
    pub fn start_sheet(&mut self, sheet_index: usize) {
        self.sheet_index = sheet_index;
    }

    pub fn sheet_index(&self) -> usize {
        self.sheet_index
    }

    pub fn current_row(&self) -> Option<u32> {
        self.buffer.current().map(|(_, row)| row)
    }

    pub fn row_start(&mut self, row_index: u32) {
        self.buffer.begin(self.sheet_index, row_index);
    }

    pub fn cell(&mut self, column_index: u16, text: String, kind: CellKind) {
        let event = RawCellEvent {
            sheet_index: self.sheet_index,
            row_index: self.current_row().unwrap_or_default(),
            column_index,
            text,
            kind,
        };
        if !self.buffer.push_event(event) {
            log::debug!("cell at column {column_index} outside of a row; ignored");
        }
    }

    pub fn row_end(&mut self) -> Option<RawRow> {
        self.buffer.take()
    }
}

#[cfg(feature = "xlsx")]
mod calamine_cells {
    use calamine::{DataRef, ExcelDateTime};

    use super::super::formats::general_number;
    use crate::convert::date::{civil_to_serial, DATE_1904_OFFSET};
    use crate::types::CellKind;

    /// Serial of a date cell in the 1900 system.
    ///
    /// The cell keeps its stored serial and the workbook's epoch; the civil date it resolves to
    /// tells the two systems apart, since they differ by exactly [`DATE_1904_OFFSET`] days.
    fn serial_1900(dt: &ExcelDateTime) -> f64 {
        let stored = dt.as_f64();
        if dt.is_duration() {
            return stored;
        }
        match civil_to_serial(dt.to_ymd_hms_milli()) {
            Some(civil) if (civil - stored).round() == DATE_1904_OFFSET => stored + DATE_1904_OFFSET,
            _ => stored,
        }
    }

    /// Text for one calamine cell value.
    ///
    /// Date-formatted numbers come back as their serial number in the 1900 system, so both
    /// containers render dates identically. Error cells render as empty text.
    pub fn render(value: &DataRef<'_>) -> (String, CellKind) {
        match value {
            DataRef::String(s) => (s.clone(), CellKind::Text),
            DataRef::SharedString(s) => ((*s).to_string(), CellKind::Text),
            DataRef::Int(i) => (i.to_string(), CellKind::Number),
            DataRef::Float(f) => (general_number(*f), CellKind::Number),
            DataRef::Bool(b) => (if *b { "TRUE" } else { "FALSE" }.to_string(), CellKind::Boolean),
            DataRef::DateTime(dt) => (general_number(serial_1900(dt)), CellKind::Number),
            DataRef::DateTimeIso(s) | DataRef::DurationIso(s) => (s.clone(), CellKind::Text),
            DataRef::Error(_) => (String::new(), CellKind::Error),
            DataRef::Empty => (String::new(), CellKind::Blank),
        }
    }
}

#[cfg(feature = "xlsx")]
pub use calamine_cells::render;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_cleared_between_callbacks() {
        let mut d = XmlRowDecoder::new();
        d.start_sheet(2);
        assert_eq!(d.sheet_index(), 2);
        d.row_start(0);
        d.cell(0, "Name".to_string(), CellKind::Text);
        d.cell(2, "Age".to_string(), CellKind::Text);
        let row = d.row_end().unwrap();
        assert_eq!(row.sheet_index, 2);
        assert_eq!(row.cells, vec!["Name", "", "Age"]);

        assert!(d.row_end().is_none());
        d.row_start(1);
        assert_eq!(d.row_end().unwrap().cells, Vec::<String>::new());
    }

    #[test]
    fn cells_outside_a_row_are_dropped() {
        let mut d = XmlRowDecoder::new();
        d.cell(0, "stray".to_string(), CellKind::Text);
        assert!(d.row_end().is_none());
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn renders_calamine_values() {
        use calamine::DataRef;

        assert_eq!(render(&DataRef::Float(30.0)).0, "30");
        assert_eq!(render(&DataRef::Float(2.5)).0, "2.5");
        assert_eq!(render(&DataRef::Bool(true)).0, "TRUE");
        assert_eq!(render(&DataRef::SharedString("x")), ("x".to_string(), CellKind::Text));
        assert_eq!(render(&DataRef::Empty).1, CellKind::Blank);
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn date_serials_render_in_the_1900_system() {
        use calamine::{DataRef, ExcelDateTime, ExcelDateTimeType};

        let date = |value, is_1904| {
            render(&DataRef::DateTime(ExcelDateTime::new(
                value,
                ExcelDateTimeType::DateTime,
                is_1904,
            )))
            .0
        };
        assert_eq!(date(45.0, false), "45");
        assert_eq!(date(60.0, false), "60");
        assert_eq!(date(45292.5, false), "45292.5");
        assert_eq!(date(0.0, true), "1462");
        assert_eq!(date(45292.5, true), "46754.5");

        let duration = ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, true);
        assert_eq!(render(&DataRef::DateTime(duration)).0, "1.5");
    }
}
