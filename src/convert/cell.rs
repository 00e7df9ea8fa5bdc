//! Coercion of a single cell's text into a Rust value.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::date::{looks_like_serial, serial_to_datetime, DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT};

/// A type that can be read from cell text.
///
/// `Ok(None)` means "leave the field at its default". Empty cells behave as follows:
///
/// - `String`: the empty string is assigned.
/// - `i8` / `u8`: error. Single-byte integers have no sensible "missing" value in a file that was
///   written by hand, so an empty cell is reported instead of silently becoming `0`.
/// - every other numeric type, `bool`, `Decimal` and the chrono types: left at the default.
/// - `Option<V>`: set to `None`.
///
/// `format` is the field's declared pattern, used by the date and time types.
pub trait FromCell: Sized {
    fn from_cell(text: &str, format: Option<&str>) -> Result<Option<Self>, String>;
}

impl FromCell for String {
    fn from_cell(text: &str, _format: Option<&str>) -> Result<Option<Self>, String> {
        Ok(Some(text.to_string()))
    }
}

impl<V: FromCell> FromCell for Option<V> {
    fn from_cell(text: &str, format: Option<&str>) -> Result<Option<Self>, String> {
        if text.trim().is_empty() {
            return Ok(Some(None));
        }
        V::from_cell(text, format).map(Some)
    }
}

/// Exact decimal parse; accepts plain and scientific notation.
pub fn parse_decimal(text: &str) -> Result<Decimal, String> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| format!("'{text}' is not a number: {e}"))
}

impl FromCell for Decimal {
    fn from_cell(text: &str, _format: Option<&str>) -> Result<Option<Self>, String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        parse_decimal(trimmed).map(Some)
    }
}

macro_rules! integer_from_cell {
    ($($ty:ty => $to:ident, $empty_fails:expr;)*) => {$(
        impl FromCell for $ty {
            fn from_cell(text: &str, _format: Option<&str>) -> Result<Option<Self>, String> {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return if $empty_fails {
                        Err(format!("empty cell cannot be read as {}", stringify!($ty)))
                    } else {
                        Ok(None)
                    };
                }
                let value = parse_decimal(trimmed)?;
                if !value.fract().is_zero() {
                    return Err(format!("'{trimmed}' is not a whole number"));
                }
                value
                    .$to()
                    .map(Some)
                    .ok_or_else(|| format!("'{trimmed}' is out of range for {}", stringify!($ty)))
            }
        }
    )*};
}

integer_from_cell! {
    i8 => to_i8, true;
    u8 => to_u8, true;
    i16 => to_i16, false;
    u16 => to_u16, false;
    i32 => to_i32, false;
    u32 => to_u32, false;
    i64 => to_i64, false;
    u64 => to_u64, false;
    i128 => to_i128, false;
    u128 => to_u128, false;
    isize => to_isize, false;
    usize => to_usize, false;
}

macro_rules! float_from_cell {
    ($($ty:ty => $to:ident;)*) => {$(
        impl FromCell for $ty {
            fn from_cell(text: &str, _format: Option<&str>) -> Result<Option<Self>, String> {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                match parse_decimal(trimmed) {
                    Ok(value) => value
                        .$to()
                        .map(Some)
                        .ok_or_else(|| format!("'{trimmed}' is out of range for {}", stringify!($ty))),
                    // Magnitudes beyond the decimal range.
                    Err(message) => trimmed.parse::<$ty>().map(Some).map_err(|_| message),
                }
            }
        }
    )*};
}

float_from_cell! {
    f32 => to_f32;
    f64 => to_f64;
}

impl FromCell for bool {
    fn from_cell(text: &str, _format: Option<&str>) -> Result<Option<Self>, String> {
        match text.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "true" | "t" | "1" | "yes" | "y" => Ok(Some(true)),
            "false" | "f" | "0" | "no" | "n" => Ok(Some(false)),
            _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
        }
    }
}

fn serial(text: &str) -> Result<Option<NaiveDateTime>, String> {
    if !looks_like_serial(text) {
        return Ok(None);
    }
    let value: f64 = text
        .parse()
        .map_err(|e| format!("'{text}' is not a serial date: {e}"))?;
    serial_to_datetime(value)
        .map(Some)
        .ok_or_else(|| format!("serial date {text} is out of range"))
}

impl FromCell for NaiveDateTime {
    fn from_cell(text: &str, format: Option<&str>) -> Result<Option<Self>, String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if let Some(dt) = serial(trimmed)? {
            return Ok(Some(dt));
        }
        let pattern = format.unwrap_or(DEFAULT_DATETIME_FORMAT);
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Ok(Some(dt));
        }
        // Date-only patterns do not parse as a NaiveDateTime.
        NaiveDate::parse_from_str(trimmed, pattern)
            .or_else(|_| NaiveDate::parse_from_str(trimmed, DEFAULT_DATE_FORMAT))
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Some)
            .ok_or_else(|| format!("'{trimmed}' does not match date format '{pattern}'"))
    }
}

impl FromCell for NaiveDate {
    fn from_cell(text: &str, format: Option<&str>) -> Result<Option<Self>, String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if let Some(dt) = serial(trimmed)? {
            return Ok(Some(dt.date()));
        }
        let pattern = format.unwrap_or(DEFAULT_DATE_FORMAT);
        NaiveDate::parse_from_str(trimmed, pattern)
            .or_else(|_| NaiveDateTime::parse_from_str(trimmed, DEFAULT_DATETIME_FORMAT).map(|dt| dt.date()))
            .map(Some)
            .map_err(|e| format!("'{trimmed}' does not match date format '{pattern}': {e}"))
    }
}

impl FromCell for NaiveTime {
    fn from_cell(text: &str, format: Option<&str>) -> Result<Option<Self>, String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if let Some(dt) = serial(trimmed)? {
            return Ok(Some(dt.time()));
        }
        let pattern = format.unwrap_or("%H:%M:%S");
        NaiveTime::parse_from_str(trimmed, pattern)
            .map(Some)
            .map_err(|e| format!("'{trimmed}' does not match time format '{pattern}': {e}"))
    }
}
