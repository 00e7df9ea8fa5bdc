//! Reader events, observers and live counters.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{DecodeError, SheetError};
use crate::format::ContainerFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReaderSeverity {
    /// Informational event.
    Info,
    /// A row was rejected; the reader continues.
    Warning,
    /// The reader failed and stops producing rows.
    Error,
    /// I/O failure underneath the reader.
    Critical,
}

/// Severity an error is reported with.
pub fn severity_for_error(error: &SheetError) -> ReaderSeverity {
    match error {
        SheetError::Io(_) | SheetError::Decode(DecodeError::Io(_)) => ReaderSeverity::Critical,
        SheetError::FileNotSupported { .. } | SheetError::Decode(_) => ReaderSeverity::Error,
        SheetError::Conversion(_) | SheetError::ColumnOutOfRange { .. } => ReaderSeverity::Warning,
    }
}

/// Which input a reader is working on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderContext {
    /// File path, or a placeholder such as `<stream>` for in-memory input.
    pub source: String,
    /// `None` until the container has been identified.
    pub format: Option<ContainerFormat>,
}

/// Lifecycle events reported to a [`ReaderObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    Opened,
    HeaderCaptured { columns: usize },
    RepeatedHeaderSkipped { sheet_index: usize },
    RowFailed {
        sheet_index: usize,
        row_index: u32,
        failures: usize,
    },
    /// The `.xlsx` worker had to wait for the consumer.
    Backpressure { waited: Duration },
    /// A fatal error ended the reader.
    Failed { severity: ReaderSeverity },
    /// The workbook was read to the end.
    Finished { metrics: ReaderMetricsSnapshot },
    /// The container was released. `early` is `true` when rows were left unread.
    Closed { early: bool },
}

/// Observer interface for reader activity.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait ReaderObserver: Send + Sync {
    fn on_event(&self, _ctx: &ReaderContext, _event: &ReaderEvent) {}

    /// Called for every error surfaced by the reader, including row-scoped ones.
    fn on_failure(&self, _ctx: &ReaderContext, _severity: ReaderSeverity, _error: &SheetError) {}

    /// Called when a failure meets the configured alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &SheetError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Fans callbacks out to several observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ReaderObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn ReaderObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ReaderObserver for CompositeObserver {
    fn on_event(&self, ctx: &ReaderContext, event: &ReaderEvent) {
        for o in &self.observers {
            o.on_event(ctx, event);
        }
    }

    fn on_failure(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &SheetError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &SheetError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs reader events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

fn format_label(ctx: &ReaderContext) -> String {
    ctx.format
        .map(|f| f.to_string())
        .unwrap_or_else(|| "?".to_string())
}

impl ReaderObserver for StdErrObserver {
    fn on_event(&self, ctx: &ReaderContext, event: &ReaderEvent) {
        eprintln!("[sheet][{}] source={} {event:?}", format_label(ctx), ctx.source);
    }

    fn on_failure(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &SheetError) {
        eprintln!(
            "[sheet][{severity:?}] format={} source={} err={error}",
            format_label(ctx),
            ctx.source
        );
    }

    fn on_alert(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &SheetError) {
        eprintln!(
            "[ALERT][sheet][{severity:?}] format={} source={} err={error}",
            format_label(ctx),
            ctx.source
        );
    }
}

/// Appends reader events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Writes are best-effort; failures to open or write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ReaderObserver for FileObserver {
    fn on_event(&self, ctx: &ReaderContext, event: &ReaderEvent) {
        self.append_line(&format!(
            "{} event format={} source={} {event:?}",
            unix_ts(),
            format_label(ctx),
            ctx.source
        ));
    }

    fn on_failure(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &SheetError) {
        self.append_line(&format!(
            "{} fail severity={severity:?} format={} source={} err={error}",
            unix_ts(),
            format_label(ctx),
            ctx.source
        ));
    }

    fn on_alert(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &SheetError) {
        self.append_line(&format!(
            "{} ALERT severity={severity:?} format={} source={} err={error}",
            unix_ts(),
            format_label(ctx),
            ctx.source
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Real-time counters for one reader. Snapshot them at any time.
#[derive(Debug, Default)]
pub struct ReaderMetrics {
    rows_emitted: AtomicU64,
    rows_failed: AtomicU64,
    header_rows: AtomicU64,
    backpressure_wait_ns: AtomicU64,
}

impl ReaderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_row_emitted(&self) {
        let _ = self.rows_emitted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_row_failed(&self) {
        let _ = self.rows_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_header_row(&self) {
        let _ = self.header_rows.fetch_add(1, Ordering::SeqCst);
    }

    pub fn set_backpressure_wait(&self, d: Duration) {
        let ns = d.as_nanos().min(u64::MAX as u128) as u64;
        self.backpressure_wait_ns.store(ns, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ReaderMetricsSnapshot {
        ReaderMetricsSnapshot {
            rows_emitted: self.rows_emitted.load(Ordering::SeqCst),
            rows_failed: self.rows_failed.load(Ordering::SeqCst),
            header_rows: self.header_rows.load(Ordering::SeqCst),
            backpressure_wait: Duration::from_nanos(self.backpressure_wait_ns.load(Ordering::SeqCst)),
        }
    }
}

/// Immutable snapshot of [`ReaderMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReaderMetricsSnapshot {
    pub rows_emitted: u64,
    pub rows_failed: u64,
    /// Rows consumed as headers (captured or skipped repeats).
    pub header_rows: u64,
    pub backpressure_wait: Duration,
}

impl fmt::Display for ReaderMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows_emitted={}, rows_failed={}, header_rows={}, backpressure_wait={:?}",
            self.rows_emitted, self.rows_failed, self.header_rows, self.backpressure_wait
        )
    }
}
