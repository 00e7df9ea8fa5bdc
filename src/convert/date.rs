//! Spreadsheet serial dates.
//!
//! A serial is a day count where the integer part is the date and the fraction the time of day.
//! The 1900 system counts 1900-02-29 as a real day, so serials up to 60 are one day off from a
//! plain count starting at 1899-12-30. Both 60 and 61 map to 1900-03-01 here.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// Fallback pattern for date-time fields without a declared format.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Fallback pattern for date-only values.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Days between the 1900 and 1904 date systems.
pub const DATE_1904_OFFSET: f64 = 1462.0;

const MS_PER_DAY: f64 = 86_400_000.0;
/// First serial counted from the 1899-12-30 epoch.
const LEAP_BUG_SERIAL: i64 = 61;

fn epoch(serial_day: i64) -> Option<NaiveDateTime> {
    let base = if serial_day < LEAP_BUG_SERIAL {
        NaiveDate::from_ymd_opt(1899, 12, 31)
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)
    };
    base?.and_hms_opt(0, 0, 0)
}

/// Convert a serial number to a date-time, rounding the time of day to the millisecond.
///
/// `None` for negative, non-finite or out-of-range serials.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let whole = serial.floor();
    let days = whole as i64;
    let millis = ((serial - whole) * MS_PER_DAY).round() as i64;
    epoch(days)?
        .checked_add_signed(TimeDelta::try_days(days)?)?
        .checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

/// Inverse of [`serial_to_datetime`] for dates on or after 1900-01-01.
pub fn datetime_to_serial(value: NaiveDateTime) -> Option<f64> {
    let day_start = value.date().and_hms_opt(0, 0, 0)?;
    let march_first = NaiveDate::from_ymd_opt(1900, 3, 1)?.and_hms_opt(0, 0, 0)?;
    let base = if day_start < march_first { epoch(0)? } else { epoch(LEAP_BUG_SERIAL)? };
    let days = (day_start - base).num_days();
    if days < 0 {
        return None;
    }
    let millis = (value - day_start).num_milliseconds();
    Some(days as f64 + millis as f64 / MS_PER_DAY)
}

/// Serial in the 1900 system for a civil date-time given as
/// `(year, month, day, hour, minute, second, millisecond)`.
///
/// 1900-02-29, the day that only exists in the 1900 system, maps to serial 60.
pub fn civil_to_serial(parts: (u16, u8, u8, u8, u8, u8, u16)) -> Option<f64> {
    let (year, month, day, hour, minute, second, milli) = parts;
    let time = NaiveTime::from_hms_milli_opt(
        u32::from(hour),
        u32::from(minute),
        u32::from(second),
        u32::from(milli),
    )?;
    if (year, month, day) == (1900, 2, 29) {
        let since_midnight = time - NaiveTime::MIN;
        return Some(60.0 + since_midnight.num_milliseconds() as f64 / MS_PER_DAY);
    }
    let date = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))?;
    datetime_to_serial(date.and_time(time))
}

/// `true` when `text` is a bare serial number: digits with at most one decimal point.
pub fn looks_like_serial(text: &str) -> bool {
    let mut digits = 0usize;
    let mut dots = 0usize;
    for b in text.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}
