//! Fixed-offset field readers and the instrument's static tables

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};

/// Current-range code to scale multiplier
///
/// The instrument stores current, capacity and energy as integers whose unit
/// depends on the gain range active when the sample was taken. The table has
/// no formula behind it; unknown ranges are a hard error.
pub fn current_multiplier(range: i32) -> Result<f64> {
    let multiplier = match range {
        -300000 | -200000 | -100000 | -60000 | -50000 | -30000 | -20000 | -12000 | -10000
        | -6000 | -5000 | -3000 | -2000 | -1000 => 1e-2,
        -500 | -100 => 1e-3,
        -50 | -25 => 1e-4,
        -1 => 1e-5,
        0 => 0.0,
        10 => 1e-3,
        100 | 112 | 200 => 1e-2,
        1000 | 6000 | 10000 | 12000 | 50000 | 60000 | 100000 => 1e-1,
        other => return Err(Error::unknown_current_range(other)),
    };
    Ok(multiplier)
}

/// Every range code the table knows, in table order
pub const KNOWN_RANGES: [i32; 31] = [
    -300000, -200000, -100000, -60000, -50000, -30000, -20000, -12000, -10000, -6000, -5000,
    -3000, -2000, -1000, -500, -100, -50, -25, -1, 0, 10, 100, 112, 200, 1000, 6000, 10000,
    12000, 50000, 60000, 100000,
];

#[inline]
fn field<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

// Callers slice records to their full layout length before reading, so the
// offsets below are always in bounds.

pub fn read_u8(bytes: &[u8], at: usize) -> u8 {
    bytes[at]
}

pub fn read_i8(bytes: &[u8], at: usize) -> i8 {
    i8::from_le_bytes(field(bytes, at))
}

pub fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes(field(bytes, at))
}

pub fn read_i16(bytes: &[u8], at: usize) -> i16 {
    i16::from_le_bytes(field(bytes, at))
}

pub fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(field(bytes, at))
}

pub fn read_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_le_bytes(field(bytes, at))
}

pub fn read_u64(bytes: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(field(bytes, at))
}

pub fn read_i64(bytes: &[u8], at: usize) -> i64 {
    i64::from_le_bytes(field(bytes, at))
}

pub fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes(field(bytes, at))
}

/// Packed `<HBBBBB` year/month/day/hour/minute/second
///
/// `offset` is the record's absolute position, used only for error context.
pub fn read_packed_datetime(bytes: &[u8], at: usize, offset: usize) -> Result<NaiveDateTime> {
    let year = read_u16(bytes, at);
    let [month, day, hour, minute, second] = field::<5>(bytes, at + 2);

    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
        .and_then(|date| {
            date.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second))
        })
        .ok_or_else(|| {
            Error::record_decode(
                offset,
                format!(
                    "impossible date {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                ),
            )
        })
}

/// First position of `needle` in `haystack` at or after `from`
pub fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}
