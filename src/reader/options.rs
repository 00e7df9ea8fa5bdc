use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::bridge::DEFAULT_HANDOFF_CAPACITY;
use crate::convert::DefaultConverter;
use crate::format::ContainerFormat;
use crate::observe::{ReaderObserver, ReaderSeverity};

/// Options controlling how a workbook is opened and read.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ReaderOptions {
    /// If `None`, the container is detected from its leading bytes.
    pub format: Option<ContainerFormat>,
    /// Rows buffered between the `.xlsx` worker and the consumer. Clamped to at least 1.
    pub handoff_capacity: usize,
    /// Directory for the temporary copy of a [`super::Source::Reader`]. `None` uses the system
    /// temp directory.
    pub spool_dir: Option<PathBuf>,
    /// Drop the first row of every sheet after the first.
    pub skip_repeated_headers: bool,
    /// Optional observer for events, failures and alerts.
    pub observer: Option<Arc<dyn ReaderObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: ReaderSeverity,
    /// Converter used by readers of [`crate::RowMap`] or a [`crate::Record`]. Readers opened
    /// with the same converter share its schema cache.
    pub converter: DefaultConverter,
}

impl fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("format", &self.format)
            .field("handoff_capacity", &self.handoff_capacity)
            .field("spool_dir", &self.spool_dir)
            .field("skip_repeated_headers", &self.skip_repeated_headers)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            format: None,
            handoff_capacity: DEFAULT_HANDOFF_CAPACITY,
            spool_dir: None,
            skip_repeated_headers: false,
            observer: None,
            alert_at_or_above: ReaderSeverity::Critical,
            converter: DefaultConverter::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::StdErrObserver;

    #[test]
    fn defaults() {
        let o = ReaderOptions::default();
        assert_eq!(o.handoff_capacity, 10);
        assert!(!o.skip_repeated_headers);
        assert_eq!(o.alert_at_or_above, ReaderSeverity::Critical);
    }

    #[test]
    fn debug_hides_the_observer() {
        let o = ReaderOptions {
            observer: Some(Arc::new(StdErrObserver)),
            ..Default::default()
        };
        let text = format!("{o:?}");
        assert!(text.contains("observer_set: true"));
        assert!(text.contains("handoff_capacity: 10"));
    }
}
