//! Push-style row decoders for both workbook containers.
//!
//! - [`legacy`]: BIFF8 records (`.xls`), fed one record at a time.
//! - [`xml`]: cell callbacks from the streaming XML reader (`.xlsx`).
//!
//! Neither decoder owns its input; the bridge in [`crate::bridge`] drives them.

pub mod biff;
pub mod formats;
pub mod legacy;
pub mod sst;
pub mod xml;

pub use biff::{BiffRecord, RecordReader};
pub use legacy::{LegacyRowDecoder, Step};
pub use xml::XmlRowDecoder;
