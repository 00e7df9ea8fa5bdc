//! Container detection from leading bytes.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{SheetError, SheetResult};

/// OLE2 compound file signature (legacy `.xls`).
pub const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
/// Local file header signature of a zip archive (`.xlsx`).
pub const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// Workbook container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// Legacy binary workbook: BIFF8 records inside an OLE2 compound file.
    Xls,
    /// Office Open XML workbook: zip archive of XML parts.
    Xlsx,
}

impl ContainerFormat {
    /// Identify the container from the first bytes of a file.
    pub fn sniff(prefix: &[u8]) -> Option<Self> {
        if prefix.starts_with(&OLE_MAGIC) {
            Some(Self::Xls)
        } else if prefix.starts_with(&ZIP_MAGIC) {
            Some(Self::Xlsx)
        } else {
            None
        }
    }

    /// Sniff a seekable input and rewind it to the start.
    pub fn detect<R: Read + Seek>(input: &mut R) -> SheetResult<Self> {
        let mut prefix = [0u8; 8];
        let mut filled = 0;
        while filled < prefix.len() {
            match input.read(&mut prefix[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        input.seek(SeekFrom::Start(0))?;

        Self::sniff(&prefix[..filled]).ok_or_else(|| {
            if filled == 0 {
                SheetError::not_supported("input is empty")
            } else {
                SheetError::not_supported(format!(
                    "unrecognised leading bytes {:02X?}; expected an xls or xlsx workbook",
                    &prefix[..filled]
                ))
            }
        })
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
        })
    }
}
