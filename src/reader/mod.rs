//! The pull reader.
//!
//! A [`Reader`] yields one converted row per [`Reader::next_row`] call. Only the row being
//! converted is held in memory on the `.xls` path; the `.xlsx` path adds the bounded handoff
//! queue between the worker and the caller.
//!
//! ```no_run
//! use sheet_stream::Reader;
//! use sheet_stream::RowMap;
//!
//! # fn main() -> Result<(), sheet_stream::SheetError> {
//! let mut reader = Reader::<RowMap>::open("people.xls")?.with_header_from_first_row();
//! while let Some(row) = reader.next_row()? {
//!     println!("{} is {}", row.get("Name").unwrap_or(""), row.get("Age").unwrap_or(""));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Errors come in two kinds (see [`SheetError::is_fatal`]). A `Conversion` error rejects one row
//! and the next call continues with the following row. Any other error ends the reader: the
//! container is released and every later call returns `Ok(None)`.

use std::iter::FusedIterator;
use std::path::Path;
use std::sync::Arc;

use crate::bridge::RowSource;
use crate::convert::{DefaultConverter, Record, RowConverter};
use crate::error::{SheetError, SheetResult};
use crate::format::ContainerFormat;
use crate::header::{HeaderDecision, HeaderManager, HeaderMap};
use crate::observe::{
    severity_for_error, ReaderContext, ReaderEvent, ReaderMetrics, ReaderObserver, ReaderSeverity,
};
use crate::types::RowMap;

mod options;
mod source;

pub use options::ReaderOptions;
pub use source::Source;

/// Lazy, forward-only reader of rows of type `T`.
pub struct Reader<T> {
    rows: Option<Box<dyn RowSource>>,
    format: ContainerFormat,
    headers: HeaderManager,
    converter: Arc<dyn RowConverter<T>>,
    observer: Option<Arc<dyn ReaderObserver>>,
    alert_at_or_above: ReaderSeverity,
    metrics: Arc<ReaderMetrics>,
    context: ReaderContext,
    started: bool,
}

impl<T> Reader<T>
where
    DefaultConverter: RowConverter<T>,
    T: 'static,
{
    /// Open with default options.
    pub fn open(source: impl Into<Source>) -> SheetResult<Self> {
        Self::open_with(source, ReaderOptions::default())
    }

    pub fn open_with(source: impl Into<Source>, options: ReaderOptions) -> SheetResult<Self> {
        let converter: Arc<dyn RowConverter<T>> = Arc::new(options.converter.clone());
        Self::open_with_converter(source, options, converter)
    }
}

impl<T> Reader<T> {
    /// Open with a caller-supplied converter, for row types the default converter does not cover.
    ///
    /// Fails with [`SheetError::FileNotSupported`] when the input is neither an `.xls` nor an
    /// `.xlsx` workbook, and with [`SheetError::Io`] when a path cannot be opened.
    pub fn open_with_converter(
        source: impl Into<Source>,
        options: ReaderOptions,
        converter: Arc<dyn RowConverter<T>>,
    ) -> SheetResult<Self> {
        let source = source.into();
        let mut context = ReaderContext {
            source: source.describe(),
            format: options.format,
        };

        let opened = match source::open_source(source, &options) {
            Ok(opened) => opened,
            Err(e) => {
                if let Some(obs) = options.observer.as_ref() {
                    notify_failure(obs.as_ref(), &context, options.alert_at_or_above, &e);
                }
                return Err(e);
            }
        };
        context.format = Some(opened.format);

        let mut headers = HeaderManager::new();
        headers.skip_repeated_headers(options.skip_repeated_headers);

        let reader = Self {
            rows: Some(opened.rows),
            format: opened.format,
            headers,
            converter,
            observer: options.observer,
            alert_at_or_above: options.alert_at_or_above,
            metrics: Arc::new(ReaderMetrics::new()),
            context,
            started: false,
        };
        reader.emit(ReaderEvent::Opened);
        Ok(reader)
    }

    /// Treat the first row of the first sheet as column titles. Takes precedence over
    /// [`Self::with_explicit_headers`].
    pub fn with_header_from_first_row(mut self) -> Self {
        if self.started {
            log::warn!("with_header_from_first_row ignored: rows have already been read");
        } else {
            self.headers.capture_first_row();
        }
        self
    }

    /// Name columns explicitly; every row, including the first, is data.
    pub fn with_explicit_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.started {
            log::warn!("with_explicit_headers ignored: rows have already been read");
        } else {
            self.headers.set_explicit(names);
        }
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn RowConverter<T>>) -> Self {
        if self.started {
            log::warn!("with_converter ignored: rows have already been read");
        } else {
            self.converter = converter;
        }
        self
    }

    /// The next converted row, or `None` once every worksheet has been read.
    ///
    /// Header rows are consumed here and never returned.
    pub fn next_row(&mut self) -> SheetResult<Option<T>> {
        loop {
            let Some(rows) = self.rows.as_mut() else {
                return Ok(None);
            };
            self.started = true;

            let row = match rows.pull_one_row() {
                Ok(Some(row)) => row,
                Ok(None) => {
                    self.finish();
                    return Ok(None);
                }
                Err(e) => {
                    self.fail(&e);
                    return Err(e);
                }
            };

            match self.headers.intercept(&row) {
                HeaderDecision::Data => {}
                HeaderDecision::Captured => {
                    self.metrics.on_header_row();
                    let columns = self.headers.headers().map_or(0, HeaderMap::len);
                    self.emit(ReaderEvent::HeaderCaptured { columns });
                    continue;
                }
                HeaderDecision::SkippedRepeat => {
                    self.metrics.on_header_row();
                    self.emit(ReaderEvent::RepeatedHeaderSkipped {
                        sheet_index: row.sheet_index,
                    });
                    continue;
                }
            }

            return match self.converter.convert(self.headers.headers(), &row) {
                Ok(value) => {
                    self.metrics.on_row_emitted();
                    Ok(Some(value))
                }
                Err(e) => {
                    self.metrics.on_row_failed();
                    self.emit(ReaderEvent::RowFailed {
                        sheet_index: e.sheet_index,
                        row_index: e.row_index,
                        failures: e.failures.len(),
                    });
                    let err = SheetError::Conversion(e);
                    self.report(&err);
                    Err(err)
                }
            };
        }
    }

    /// Read every remaining row into memory, stopping at the first error.
    ///
    /// This defeats the point of streaming: a large workbook is held in memory in full. Prefer
    /// [`Self::next_row`] or [`Self::rows`] unless the input is known to be small.
    pub fn read_all(&mut self) -> SheetResult<Vec<T>> {
        let mut out = Vec::new();
        while let Some(row) = self.next_row()? {
            out.push(row);
        }
        Ok(out)
    }

    /// Consume the reader as an iterator of rows.
    pub fn rows(self) -> Rows<T> {
        Rows { reader: self }
    }

    /// Column titles in effect, once known.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.headers.headers()
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    pub fn metrics(&self) -> Arc<ReaderMetrics> {
        Arc::clone(&self.metrics)
    }

    /// `true` once the container has been released.
    pub fn is_closed(&self) -> bool {
        self.rows.is_none()
    }

    /// Stop reading and release the container. Later calls to [`Self::next_row`] return `None`.
    pub fn close(&mut self) {
        if let Some(mut rows) = self.rows.take() {
            rows.close();
            log::debug!("reader closed before the end of the workbook");
            self.emit(ReaderEvent::Closed { early: true });
        }
    }

    fn finish(&mut self) {
        let Some(mut rows) = self.rows.take() else {
            return;
        };
        let waited = rows.backpressure_wait();
        rows.close();
        self.metrics.set_backpressure_wait(waited);
        if !waited.is_zero() {
            self.emit(ReaderEvent::Backpressure { waited });
        }
        self.emit(ReaderEvent::Finished {
            metrics: self.metrics.snapshot(),
        });
        self.emit(ReaderEvent::Closed { early: false });
    }

    fn fail(&mut self, error: &SheetError) {
        if let Some(mut rows) = self.rows.take() {
            rows.close();
        }
        self.emit(ReaderEvent::Failed {
            severity: severity_for_error(error),
        });
        self.report(error);
        self.emit(ReaderEvent::Closed { early: false });
    }

    fn emit(&self, event: ReaderEvent) {
        if let Some(obs) = self.observer.as_ref() {
            obs.on_event(&self.context, &event);
        }
    }

    fn report(&self, error: &SheetError) {
        if let Some(obs) = self.observer.as_ref() {
            notify_failure(obs.as_ref(), &self.context, self.alert_at_or_above, error);
        }
    }
}

fn notify_failure(
    obs: &dyn ReaderObserver,
    ctx: &ReaderContext,
    alert_at_or_above: ReaderSeverity,
    error: &SheetError,
) {
    let sev = severity_for_error(error);
    obs.on_failure(ctx, sev, error);
    if sev >= alert_at_or_above {
        obs.on_alert(ctx, sev, error);
    }
}

impl<T> Drop for Reader<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T> IntoIterator for Reader<T> {
    type Item = SheetResult<T>;
    type IntoIter = Rows<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows()
    }
}

/// Iterator over a consumed [`Reader`].
///
/// Conversion errors are yielded as items and iteration continues. Iteration ends after a fatal
/// error or at the end of the workbook.
pub struct Rows<T> {
    reader: Reader<T>,
}

impl<T> Rows<T> {
    pub fn reader(&self) -> &Reader<T> {
        &self.reader
    }
}

impl<T> Iterator for Rows<T> {
    type Item = SheetResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_row().transpose()
    }
}

impl<T> FusedIterator for Rows<T> {}

/// Open a workbook as string maps keyed by column letter, or by title once headers are set.
pub fn open(path: impl AsRef<Path>) -> SheetResult<Reader<RowMap>> {
    Reader::open(path.as_ref())
}

/// Open a workbook whose first row holds the titles of `T`'s fields.
pub fn open_as<T: Record>(path: impl AsRef<Path>) -> SheetResult<Reader<T>> {
    Ok(Reader::open(path.as_ref())?.with_header_from_first_row())
}
