//! BIFF8 record framing and field readers.
//!
//! A BIFF stream is a flat sequence of `[id: u16][len: u16][payload: len bytes]` records. The
//! reader here only frames records; interpreting them is the job of
//! [`super::legacy::LegacyRowDecoder`].

use std::io::{self, Read};

use crate::error::DecodeError;

pub const RECORD_FORMULA: u16 = 0x0006;
pub const RECORD_EOF: u16 = 0x000A;
pub const RECORD_DATEMODE: u16 = 0x0022;
pub const RECORD_FILEPASS: u16 = 0x002F;
pub const RECORD_CONTINUE: u16 = 0x003C;
pub const RECORD_MULRK: u16 = 0x00BD;
pub const RECORD_MULBLANK: u16 = 0x00BE;
pub const RECORD_RSTRING: u16 = 0x00D6;
pub const RECORD_XF: u16 = 0x00E0;
pub const RECORD_SST: u16 = 0x00FC;
pub const RECORD_LABELSST: u16 = 0x00FD;
pub const RECORD_BLANK: u16 = 0x0201;
pub const RECORD_NUMBER: u16 = 0x0203;
pub const RECORD_LABEL: u16 = 0x0204;
pub const RECORD_BOOLERR: u16 = 0x0205;
pub const RECORD_STRING: u16 = 0x0207;
pub const RECORD_RK: u16 = 0x027E;
pub const RECORD_FORMAT: u16 = 0x041E;
pub const RECORD_BOF: u16 = 0x0809;
/// BOF ids used by BIFF2, BIFF3 and BIFF4.
pub const LEGACY_BOF_IDS: [u16; 3] = [0x0009, 0x0209, 0x0409];

pub const BIFF8_VERSION: u16 = 0x0600;

// BOF substream types.
pub const BOF_GLOBALS: u16 = 0x0005;
pub const BOF_WORKSHEET: u16 = 0x0010;

// XLUnicodeString option flags.
pub(crate) const STR_HIGH_BYTE: u8 = 0x01;
pub(crate) const STR_EXT: u8 = 0x04;
pub(crate) const STR_RICH: u8 = 0x08;

/// One physical record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiffRecord {
    pub id: u16,
    pub data: Vec<u8>,
}

impl BiffRecord {
    pub fn new(id: u16, data: Vec<u8>) -> Self {
        Self { id, data }
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8, DecodeError> {
        self.bytes(offset, 1).map(|b| b[0])
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16, DecodeError> {
        self.bytes(offset, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32, DecodeError> {
        self.bytes(offset, 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn f64_at(&self, offset: usize) -> Result<f64, DecodeError> {
        let b = self.bytes(offset, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(f64::from_le_bytes(raw))
    }

    pub fn bytes(&self, offset: usize, len: usize) -> Result<&[u8], DecodeError> {
        self.data
            .get(offset..offset + len)
            .ok_or(DecodeError::Truncated {
                record: self.id,
                needed: offset + len,
                available: self.data.len(),
            })
    }

    /// BIFF8 `XLUnicodeString` with a 16-bit character count starting at `offset`.
    pub fn unicode_string_at(&self, offset: usize) -> Result<String, DecodeError> {
        let cch = usize::from(self.u16_at(offset)?);
        let flags = self.u8_at(offset + 2)?;
        let mut pos = offset + 3;
        if flags & STR_RICH != 0 {
            pos += 2;
        }
        if flags & STR_EXT != 0 {
            pos += 4;
        }
        let wide = flags & STR_HIGH_BYTE != 0;
        let bytes = self.bytes(pos, if wide { cch * 2 } else { cch })?;
        Ok(decode_chars(bytes, wide))
    }
}

/// Decode BIFF8 character data: UTF-16LE when `wide`, otherwise one Latin-1 byte per char.
pub(crate) fn decode_chars(bytes: &[u8], wide: bool) -> String {
    if wide {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().copied().map(char::from).collect()
    }
}

/// Decode an `RK` packed number.
pub fn rk_to_f64(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        f64::from((rk as i32) >> 2)
    } else {
        f64::from_bits(u64::from(rk & 0xFFFF_FFFC) << 32)
    };
    if rk & 0x01 != 0 { value / 100.0 } else { value }
}

/// Pulls records one at a time from a byte stream.
pub struct RecordReader<R> {
    inner: R,
    records_read: u64,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            records_read: 0,
        }
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Next record, or `None` at a clean end of stream.
    ///
    /// Trailing zero padding shorter than a record header is treated as end of stream.
    pub fn next_record(&mut self) -> Result<Option<BiffRecord>, DecodeError> {
        let mut header = [0u8; 4];
        let filled = read_up_to(&mut self.inner, &mut header)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < header.len() {
            if header[..filled].iter().all(|b| *b == 0) {
                return Ok(None);
            }
            return Err(DecodeError::Truncated {
                record: 0,
                needed: header.len(),
                available: filled,
            });
        }

        let id = u16::from_le_bytes([header[0], header[1]]);
        let len = usize::from(u16::from_le_bytes([header[2], header[3]]));
        let mut data = vec![0u8; len];
        let got = read_up_to(&mut self.inner, &mut data)?;
        if got < len {
            return Err(DecodeError::Truncated {
                record: id,
                needed: len,
                available: got,
            });
        }
        self.records_read += 1;
        Ok(Some(BiffRecord { id, data }))
    }
}

fn read_up_to<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Byte builders shared by the decoder tests.

    pub fn record(id: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    pub fn compressed_string(s: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(s.len() as u16).to_le_bytes());
        out.push(0);
        out.extend_from_slice(s.as_bytes());
        out
    }

    pub fn cell_header(row: u16, col: u16, xf: u16) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&row.to_le_bytes());
        out.extend_from_slice(&col.to_le_bytes());
        out.extend_from_slice(&xf.to_le_bytes());
        out
    }
}
