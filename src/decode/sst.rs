//! Shared String Table (`SST`) parsing.
//!
//! The SST payload usually exceeds the 8224-byte record limit and continues in `CONTINUE`
//! records. When a string's character data crosses a fragment boundary, the continued fragment
//! begins with a one-byte option flag that may switch between compressed and UTF-16 storage.

use super::biff::{decode_chars, RECORD_SST, STR_EXT, STR_HIGH_BYTE, STR_RICH};
use crate::error::DecodeError;

/// Parse an SST record given its physical fragments (the SST payload followed by each
/// `CONTINUE` payload).
pub fn parse_sst(fragments: &[Vec<u8>]) -> Result<Vec<String>, DecodeError> {
    let mut cursor = FragmentCursor::new(fragments);
    let _total = cursor.read_u32()?;
    let unique = cursor.read_u32()? as usize;

    let mut strings = Vec::with_capacity(unique.min(64 * 1024));
    for _ in 0..unique {
        strings.push(cursor.read_rich_string()?);
    }
    Ok(strings)
}

struct FragmentCursor<'a> {
    fragments: &'a [Vec<u8>],
    index: usize,
    offset: usize,
    consumed: usize,
}

impl<'a> FragmentCursor<'a> {
    fn new(fragments: &'a [Vec<u8>]) -> Self {
        Self {
            fragments,
            index: 0,
            offset: 0,
            consumed: 0,
        }
    }

    fn truncated(&self, needed: usize) -> DecodeError {
        DecodeError::Truncated {
            record: RECORD_SST,
            needed: self.consumed + needed,
            available: self.fragments.iter().map(Vec::len).sum(),
        }
    }

    fn remaining_in_fragment(&self) -> usize {
        self.fragments
            .get(self.index)
            .map(|f| f.len() - self.offset)
            .unwrap_or(0)
    }

    fn next_fragment(&mut self, needed: usize) -> Result<(), DecodeError> {
        if self.index + 1 >= self.fragments.len() {
            return Err(self.truncated(needed));
        }
        self.index += 1;
        self.offset = 0;
        Ok(())
    }

    /// Plain bytes; fragment boundaries are crossed without a flag byte.
    fn take(&mut self, mut n: usize) -> Result<Vec<u8>, DecodeError> {
        let mut out = Vec::with_capacity(n);
        while n > 0 {
            if self.remaining_in_fragment() == 0 {
                self.next_fragment(n)?;
                continue;
            }
            let step = n.min(self.remaining_in_fragment());
            let frag = &self.fragments[self.index];
            out.extend_from_slice(&frag[self.offset..self.offset + step]);
            self.offset += step;
            self.consumed += step;
            n -= step;
        }
        Ok(out)
    }

    fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.take(n).map(drop)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// `XLUnicodeRichExtendedString`: header, character data, then formatting runs and the
    /// extended block, which are skipped.
    fn read_rich_string(&mut self) -> Result<String, DecodeError> {
        let cch = usize::from(self.read_u16()?);
        let flags = self.read_u8()?;
        let runs = if flags & STR_RICH != 0 {
            usize::from(self.read_u16()?)
        } else {
            0
        };
        let ext = if flags & STR_EXT != 0 {
            self.read_u32()? as usize
        } else {
            0
        };

        let mut wide = flags & STR_HIGH_BYTE != 0;
        let mut text = String::with_capacity(cch);
        let mut left = cch;
        while left > 0 {
            if self.remaining_in_fragment() == 0 {
                self.next_fragment(left)?;
                wide = self.read_u8()? & STR_HIGH_BYTE != 0;
                continue;
            }
            let width = if wide { 2 } else { 1 };
            let chars = (self.remaining_in_fragment() / width).min(left);
            if chars == 0 {
                return Err(DecodeError::InvalidString {
                    message: "shared string split in the middle of a character".to_string(),
                });
            }
            let bytes = self.take(chars * width)?;
            text.push_str(&decode_chars(&bytes, wide));
            left -= chars;
        }

        self.skip(runs * 4)?;
        self.skip(ext)?;
        Ok(text)
    }
}
