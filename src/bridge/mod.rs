//! Push-to-pull bridges.
//!
//! Both decoders are push-driven. A [`RowSource`] turns one of them into a pull interface that
//! hands out exactly one row per call:
//!
//! - [`LegacyBridge`] (`.xls`) runs the BIFF decoder on the caller's thread and stops feeding it
//!   as soon as a row completes; the next call resumes the same record stream.
//! - [`XmlBridge`] (`.xlsx`) runs the XML decoder on a background thread that hands rows over
//!   through a bounded [`handoff::HandoffQueue`].

use std::time::Duration;

use crate::error::SheetResult;
use crate::types::RawRow;

pub mod handoff;
#[cfg(feature = "xls")]
pub mod legacy;
#[cfg(feature = "xlsx")]
pub mod worker;

#[cfg(feature = "xls")]
pub use legacy::LegacyBridge;
#[cfg(feature = "xlsx")]
pub use worker::XmlBridge;

/// Default number of rows buffered between the `.xlsx` worker and the consumer.
pub const DEFAULT_HANDOFF_CAPACITY: usize = 10;

/// A pull-based source of raw rows.
pub trait RowSource {
    /// The next row, or `None` once the workbook is exhausted.
    ///
    /// Exhaustion releases the underlying container. After `None` or a fatal error every further
    /// call returns `Ok(None)`.
    fn pull_one_row(&mut self) -> SheetResult<Option<RawRow>>;

    /// Stop early and release the container. Calling it more than once is a no-op.
    fn close(&mut self);

    /// Time the producer spent blocked on a full handoff queue.
    fn backpressure_wait(&self) -> Duration {
        Duration::ZERO
    }
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn pull_one_row(&mut self) -> SheetResult<Option<RawRow>> {
        (**self).pull_one_row()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn backpressure_wait(&self) -> Duration {
        (**self).backpressure_wait()
    }
}
