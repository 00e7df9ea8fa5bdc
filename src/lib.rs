//! `sheet-stream` reads `.xls` (BIFF8) and `.xlsx` workbooks lazily, one row at a time.
//!
//! Rows come out of every worksheet in workbook order, either as [`RowMap`]s (column title →
//! cell text) or as any type implementing [`Record`]. Memory stays flat regardless of workbook
//! size: the legacy decoder is suspended as soon as a row completes, and the `.xlsx` decoder runs
//! on a worker thread that blocks once a small handoff queue is full.
//!
//! ## Quick example
//!
//! ```no_run
//! use sheet_stream::convert::{FieldSpec, Record, SchemaBuilder};
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! impl Record for Person {
//!     fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
//!         schema
//!             .field(FieldSpec::named("name").title("Name"), |p: &mut Person, v: String| p.name = v)
//!             .field(FieldSpec::named("age").title("Age"), |p: &mut Person, v: i32| p.age = v)
//!     }
//! }
//!
//! # fn main() -> Result<(), sheet_stream::SheetError> {
//! for person in sheet_stream::open_as::<Person>("people.xlsx")? {
//!     match person {
//!         Ok(p) => println!("{p:?}"),
//!         // Row-scoped: iteration continues with the next row.
//!         Err(e) => eprintln!("skipped: {e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Cell text
//!
//! Every cell is first rendered to text: strings as-is, numbers in general notation (`30`, not
//! `30.0`), dates as their serial number, booleans as `TRUE`/`FALSE`, error cells as `""`. Gaps
//! inside a row are padded with `""`; trailing empty cells are not materialised. Conversion to
//! typed fields happens afterwards (see [`convert::FromCell`]).
//!
//! ## Cargo features
//!
//! - `xls` (default): legacy workbooks, via `cfb`.
//! - `xlsx` (default): Office Open XML workbooks, via `calamine`.

pub mod bridge;
pub mod column;
pub mod convert;
pub mod decode;
pub mod error;
pub mod format;
pub mod header;
pub mod observe;
pub mod reader;
pub mod types;

pub use column::{column_index, column_letter, MAX_COLUMNS};
pub use convert::{DefaultConverter, FieldSpec, FromCell, Record, RowConverter, SchemaBuilder};
pub use error::{ConversionError, DecodeError, FieldFailure, SheetError, SheetResult};
pub use format::ContainerFormat;
pub use header::HeaderMap;
pub use observe::{ReaderEvent, ReaderMetricsSnapshot, ReaderObserver, ReaderSeverity};
pub use reader::{open, open_as, Reader, ReaderOptions, Rows, Source};
pub use types::{RawRow, RowMap};
