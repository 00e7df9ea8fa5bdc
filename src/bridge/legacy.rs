use std::io::{BufReader, Read, Seek};

use cfb::{CompoundFile, Stream};

use super::RowSource;
use crate::decode::{LegacyRowDecoder, RecordReader, Step};
use crate::error::{SheetError, SheetResult};
use crate::types::RawRow;

const WORKBOOK_STREAMS: [&str; 4] = ["/Workbook", "/Book", "Workbook", "Book"];

/// Drives [`LegacyRowDecoder`] over the `Workbook` stream of a compound file, one row per call.
pub struct LegacyBridge<F: Read + Seek> {
    records: Option<RecordReader<BufReader<Stream<F>>>>,
    // Keeps the compound file alive while its stream is being read.
    compound: Option<CompoundFile<F>>,
    decoder: LegacyRowDecoder,
}

impl<F: Read + Seek> LegacyBridge<F> {
    /// Open the compound file and locate its workbook stream.
    pub fn open(inner: F) -> SheetResult<Self> {
        let mut compound = CompoundFile::open(inner)
            .map_err(|e| SheetError::not_supported(format!("not a readable OLE2 compound file: {e}")))?;
        let stream = WORKBOOK_STREAMS
            .iter()
            .find_map(|name| compound.open_stream(name).ok())
            .ok_or_else(|| {
                SheetError::not_supported("compound file has no `Workbook` or `Book` stream")
            })?;
        Ok(Self {
            records: Some(RecordReader::new(BufReader::new(stream))),
            compound: Some(compound),
            decoder: LegacyRowDecoder::new(),
        })
    }

    fn release(&mut self) {
        if let Some(records) = self.records.take() {
            log::debug!("releasing xls stream after {} records", records.records_read());
        }
        self.compound = None;
    }
}

impl<F: Read + Seek> RowSource for LegacyBridge<F> {
    fn pull_one_row(&mut self) -> SheetResult<Option<RawRow>> {
        loop {
            let next = match self.records.as_mut() {
                Some(records) => records.next_record(),
                None => return Ok(None),
            };
            let record = match next {
                Ok(Some(record)) => record,
                Ok(None) => {
                    let last = self.decoder.finish();
                    self.release();
                    return Ok(last?);
                }
                Err(e) => {
                    self.release();
                    return Err(e.into());
                }
            };
            match self.decoder.feed(&record) {
                Ok(Step::Row(row)) => return Ok(Some(row)),
                Ok(Step::NeedMore) => {}
                Err(e) => {
                    self.release();
                    return Err(e.into());
                }
            }
        }
    }

    fn close(&mut self) {
        self.release();
    }
}
