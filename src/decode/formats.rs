//! Number-format bookkeeping used to tell dates from plain numbers.

use std::collections::HashMap;

use super::biff::BiffRecord;
use crate::error::DecodeError;

/// XF index → number format id, plus the workbook's custom format strings.
#[derive(Debug, Default)]
pub struct FormatTable {
    xf_formats: Vec<u16>,
    custom: HashMap<u16, String>,
}

impl FormatTable {
    /// `FORMAT` record: `[ifmt: u16][XLUnicodeString]`.
    pub fn add_format(&mut self, record: &BiffRecord) -> Result<(), DecodeError> {
        let id = record.u16_at(0)?;
        let code = record.unicode_string_at(2)?;
        self.custom.insert(id, code);
        Ok(())
    }

    /// `XF` record: the format id sits at offset 2. XF records are numbered by arrival order.
    pub fn add_xf(&mut self, record: &BiffRecord) -> Result<(), DecodeError> {
        self.xf_formats.push(record.u16_at(2)?);
        Ok(())
    }

    pub fn format_id(&self, xf: u16) -> Option<u16> {
        self.xf_formats.get(usize::from(xf)).copied()
    }

    pub fn is_date_xf(&self, xf: u16) -> bool {
        let Some(id) = self.format_id(xf) else {
            return false;
        };
        match self.custom.get(&id) {
            Some(code) => is_date_format_code(code),
            None => is_builtin_date_format(id),
        }
    }
}

/// Built-in format ids that display dates or times (including the locale-specific ranges).
pub fn is_builtin_date_format(id: u16) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// `true` when a format code renders its value as a date, time or elapsed duration.
///
/// Quoted literals, escaped characters, padding/fill directives and bracketed sections (colours,
/// conditions, locales) are ignored; elapsed-time brackets such as `[h]` still count.
pub fn is_date_format_code(code: &str) -> bool {
    // Only the first section decides how positive numbers display.
    let section = first_section(code);
    let mut chars = section.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let mut inner = String::new();
                for b in chars.by_ref() {
                    if b == ']' {
                        break;
                    }
                    inner.push(b.to_ascii_lowercase());
                }
                if !inner.is_empty() && inner.chars().all(|c| matches!(c, 'h' | 'm' | 's')) {
                    return true;
                }
            }
            _ => {
                if matches!(c.to_ascii_lowercase(), 'y' | 'm' | 'd' | 'h' | 's') {
                    return !is_general(section);
                }
            }
        }
    }
    false
}

fn first_section(code: &str) -> &str {
    let mut quoted = false;
    for (i, c) in code.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ';' if !quoted => return &code[..i],
            _ => {}
        }
    }
    code
}

fn is_general(code: &str) -> bool {
    code.trim().eq_ignore_ascii_case("general")
}

/// Render a number the way a "General" cell displays it: integral values without a fractional
/// part, everything else with the shortest round-tripping representation.
pub fn general_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids() {
        assert!(is_builtin_date_format(14));
        assert!(is_builtin_date_format(22));
        assert!(is_builtin_date_format(46));
        assert!(!is_builtin_date_format(0));
        assert!(!is_builtin_date_format(2));
        assert!(!is_builtin_date_format(49));
    }

    #[test]
    fn custom_codes() {
        assert!(is_date_format_code("yyyy-mm-dd"));
        assert!(is_date_format_code("dd/mm/yyyy hh:mm"));
        assert!(is_date_format_code("[h]:mm:ss"));
        assert!(is_date_format_code("[$-409]mmm d, yyyy"));
        assert!(!is_date_format_code("0.00"));
        assert!(!is_date_format_code("#,##0 \"days\""));
        assert!(!is_date_format_code("[Red]0.00"));
        assert!(!is_date_format_code("General"));
        assert!(!is_date_format_code("0.00\\s"));
        assert!(!is_date_format_code("0;\"yes\""));
    }

    #[test]
    fn general_rendering() {
        assert_eq!(general_number(30.0), "30");
        assert_eq!(general_number(-2.0), "-2");
        assert_eq!(general_number(98.5), "98.5");
        assert_eq!(general_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(general_number(45292.5), "45292.5");
    }

    #[test]
    fn xf_lookup_prefers_custom_codes() {
        let mut table = FormatTable::default();
        let xf = |ifmt: u16| {
            let mut data = vec![0, 0];
            data.extend(ifmt.to_le_bytes());
            BiffRecord::new(super::super::biff::RECORD_XF, data)
        };
        table.add_xf(&xf(0)).unwrap();
        table.add_xf(&xf(14)).unwrap();
        table.add_xf(&xf(164)).unwrap();

        let mut fmt = 164u16.to_le_bytes().to_vec();
        fmt.extend(5u16.to_le_bytes());
        fmt.push(0);
        fmt.extend(b"0.000");
        table
            .add_format(&BiffRecord::new(super::super::biff::RECORD_FORMAT, fmt))
            .unwrap();

        assert!(!table.is_date_xf(0));
        assert!(table.is_date_xf(1));
        assert!(!table.is_date_xf(2));
        assert!(!table.is_date_xf(99));
    }
}
