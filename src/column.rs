//! Spreadsheet-style column names (`A`, `B`, ..., `Z`, `AA`, `AB`, ...).

use crate::error::{SheetError, SheetResult};

/// Number of named columns: `A..=Z` followed by two-letter names up to `YZ`.
pub const MAX_COLUMNS: usize = 26 * 26;

/// Letters for a zero-based column index.
///
/// ```
/// use sheet_stream::column::column_letter;
///
/// assert_eq!(column_letter(0).unwrap(), "A");
/// assert_eq!(column_letter(25).unwrap(), "Z");
/// assert_eq!(column_letter(26).unwrap(), "AA");
/// assert!(column_letter(676).is_err());
/// ```
pub fn column_letter(index: usize) -> SheetResult<String> {
    if index >= MAX_COLUMNS {
        return Err(SheetError::ColumnOutOfRange {
            index,
            max: MAX_COLUMNS - 1,
        });
    }
    let letter = |n: usize| char::from(b'A' + n as u8);
    if index < 26 {
        return Ok(letter(index).to_string());
    }
    let rest = index - 26;
    Ok([letter(rest / 26), letter(rest % 26)].iter().collect())
}

/// Inverse of [`column_letter`]; case-insensitive. `None` for anything outside the named range.
pub fn column_index(letters: &str) -> Option<usize> {
    let bytes = letters.as_bytes();
    let digit = |b: u8| b.is_ascii_alphabetic().then(|| usize::from(b.to_ascii_uppercase() - b'A'));
    match bytes {
        [a] => digit(*a),
        [a, b] => {
            let index = 26 + digit(*a)? * 26 + digit(*b)?;
            (index < MAX_COLUMNS).then_some(index)
        }
        _ => None,
    }
}
