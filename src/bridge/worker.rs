use std::io::{Read, Seek};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use calamine::{Reader, Xlsx, XlsxError};

use super::handoff::{HandoffQueue, ProducerGuard};
use super::RowSource;
use crate::decode::xml::{render, XmlRowDecoder};
use crate::error::{DecodeError, SheetError, SheetResult};
use crate::types::RawRow;

type Slot = Result<RawRow, DecodeError>;

/// Reads an `.xlsx` workbook on a background thread and hands rows over through a bounded queue.
///
/// The worker owns the workbook (and with it the input file or spooled copy). It is joined when
/// the queue runs dry, on [`RowSource::close`], or on drop, so the input is released exactly once.
pub struct XmlBridge {
    queue: Arc<HandoffQueue<Slot>>,
    worker: Option<JoinHandle<()>>,
    done: bool,
}

impl XmlBridge {
    /// Parse the workbook's shared parts on the calling thread, then start streaming its
    /// worksheets in the background.
    pub fn spawn<RS>(input: RS, capacity: usize) -> SheetResult<Self>
    where
        RS: Read + Seek + Send + 'static,
    {
        let workbook: Xlsx<RS> = Xlsx::new(input)
            .map_err(|e| SheetError::not_supported(format!("not a readable xlsx workbook: {e}")))?;
        Self::start(capacity, move |queue| stream_workbook(workbook, queue))
    }

    /// Run `produce` on a worker thread; the queue is closed however it returns.
    fn start<P>(capacity: usize, produce: P) -> SheetResult<Self>
    where
        P: FnOnce(&HandoffQueue<Slot>) + Send + 'static,
    {
        let queue = Arc::new(HandoffQueue::new(capacity.max(1)));
        let producer = Arc::clone(&queue);
        let worker = thread::Builder::new()
            .name("sheet-stream-xlsx".to_string())
            .spawn(move || {
                let _guard = ProducerGuard(&*producer);
                produce(&producer);
            })?;

        Ok(Self {
            queue,
            worker: Some(worker),
            done: false,
        })
    }

    fn join(&mut self) -> Result<(), DecodeError> {
        match self.worker.take() {
            Some(handle) => handle.join().map_err(|_| DecodeError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

impl RowSource for XmlBridge {
    fn pull_one_row(&mut self) -> SheetResult<Option<RawRow>> {
        if self.done {
            return Ok(None);
        }
        match self.queue.pop() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => {
                self.close();
                Err(e.into())
            }
            None => {
                self.done = true;
                self.join()?;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.done = true;
        self.queue.cancel();
        if let Err(e) = self.join() {
            log::warn!("xlsx worker ended abnormally during close: {e}");
        }
    }

    fn backpressure_wait(&self) -> Duration {
        self.queue.total_wait()
    }
}

impl Drop for XmlBridge {
    fn drop(&mut self) {
        self.close();
    }
}

/// Worker body: every worksheet in workbook order, each row pushed as soon as it completes.
fn stream_workbook<RS: Read + Seek>(mut workbook: Xlsx<RS>, queue: &HandoffQueue<Slot>) {
    let mut decoder = XmlRowDecoder::new();
    let mut sheet_index = 0;

    for name in workbook.sheet_names() {
        let mut cells = match workbook.worksheet_cells_reader(&name) {
            Ok(cells) => cells,
            Err(XlsxError::NotAWorksheet(kind)) => {
                log::debug!("skipping '{name}': {kind} is not a worksheet");
                continue;
            }
            Err(e) => {
                let _ = queue.push(Err(e.into()));
                return;
            }
        };
        decoder.start_sheet(sheet_index);
        sheet_index += 1;

        loop {
            let cell = match cells.next_cell() {
                Ok(Some(cell)) => cell,
                Ok(None) => break,
                Err(e) => {
                    let _ = queue.push(Err(e.into()));
                    return;
                }
            };
            let (row, column) = cell.get_position();
            if decoder.current_row() != Some(row) {
                if let Some(done) = decoder.row_end() {
                    if queue.push(Ok(done)).is_err() {
                        return;
                    }
                }
                decoder.row_start(row);
            }
            let (text, kind) = render(cell.get_value());
            decoder.cell(column.min(u32::from(u16::MAX)) as u16, text, kind);
        }

        if let Some(done) = decoder.row_end() {
            if queue.push(Ok(done)).is_err() {
                return;
            }
        }
    }
    log::debug!("xlsx worker finished after {sheet_index} worksheets");
}
