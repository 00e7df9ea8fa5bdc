use std::fmt;

use thiserror::Error;

/// Convenience result type for reader operations.
pub type SheetResult<T> = Result<T, SheetError>;

/// Error type returned by the reader and its helpers.
///
/// `FileNotSupported` and `Decode` are fatal: once a reader reports one of them it yields no
/// further rows. `Conversion` is row-scoped and the reader can be polled again.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The input is not a workbook container this crate can read.
    #[error("file not supported: {message}")]
    FileNotSupported { message: String },

    /// The container was recognised but its contents are malformed.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// One or more fields of a row could not be coerced to their declared types.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A column index without a letter name (see [`crate::column::MAX_COLUMNS`]).
    #[error("column index {index} is out of range (max {max})")]
    ColumnOutOfRange { index: usize, max: usize },
}

impl SheetError {
    pub(crate) fn not_supported(message: impl Into<String>) -> Self {
        Self::FileNotSupported {
            message: message.into(),
        }
    }

    /// `true` for errors after which the reader produces no more rows.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Conversion(_) | Self::ColumnOutOfRange { .. })
    }
}

/// Malformed low-level content found while decoding a workbook.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("io error while decoding: {0}")]
    Io(#[from] std::io::Error),

    /// A cell referenced the shared-string table before the table was read.
    #[error("shared string {index} referenced before the shared-string table was loaded")]
    SharedStringsNotLoaded { index: u32 },

    #[error("shared string index {index} out of range (table has {len} entries)")]
    SharedStringOutOfRange { index: u32, len: usize },

    /// A record payload is shorter than its fields require.
    #[error("record 0x{record:04X} truncated: needed {needed} bytes, found {available}")]
    Truncated {
        record: u16,
        needed: usize,
        available: usize,
    },

    /// A record's fields are present but describe an impossible cell.
    #[error("record 0x{record:04X} is invalid: {message}")]
    InvalidRecord { record: u16, message: String },

    #[error("unsupported BIFF version 0x{version:04X} (only BIFF8 is supported)")]
    UnsupportedBiffVersion { version: u16 },

    #[error("workbook is password protected")]
    Encrypted,

    #[error("invalid string data: {message}")]
    InvalidString { message: String },

    #[cfg(feature = "xlsx")]
    #[error("xlsx error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    /// The background worker decoding an `.xlsx` workbook panicked.
    #[error("background decoder panicked")]
    WorkerPanicked,
}

/// A single field that failed to coerce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    /// Record field name.
    pub field: String,
    /// Column title the field was bound to.
    pub column: String,
    /// Raw cell text.
    pub raw: String,
    pub message: String,
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}' (column '{}'): {} (raw='{}')",
            self.field, self.column, self.message, self.raw
        )
    }
}

/// A row that could not be converted into the target record type.
///
/// Every failing field of the row is listed; the row itself is not returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to convert sheet {sheet_index} row {row_index}: {}", join_failures(.failures))]
pub struct ConversionError {
    pub sheet_index: usize,
    pub row_index: u32,
    pub failures: Vec<FieldFailure>,
}

fn join_failures(failures: &[FieldFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
