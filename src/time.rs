//! Absolute timestamp reconstruction.
//!
//! Usagestats artifacts are named after the start of the interval they cover, in milliseconds
//! since the Unix epoch. Times inside the artifact come in two flavours:
//! - a non-negative value is an offset in milliseconds from that start time.
//! - a negative value is already an absolute epoch-millisecond time, stored negated.
use crate::err::{Result, UsageStatsError};

use jiff::Timestamp;
use log::warn;

/// Parses an artifact file name into its epoch-millisecond base time.
///
/// Only plain decimal digits are accepted (no sign, no whitespace, no extension).
pub fn base_epoch_from_file_name(file_name: &str) -> Result<i64> {
    let malformed = || UsageStatsError::MalformedFileName {
        file_name: file_name.to_owned(),
    };

    if file_name.is_empty() || !file_name.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    file_name.parse::<i64>().map_err(|_| malformed())
}

/// Turns a raw "last active" style field into an absolute epoch-millisecond value.
///
/// Returns `None` when the field is absent, or when the result cannot be represented
/// (`i64::MIN` has no absolute value, and `base + raw` may overflow).
pub fn reconstruct(raw: Option<i64>, base_epoch_ms: i64) -> Option<i64> {
    let raw = raw?;

    let absolute = if raw < 0 {
        raw.checked_abs()
    } else {
        base_epoch_ms.checked_add(raw)
    };

    if absolute.is_none() {
        warn!("time value {raw} (base {base_epoch_ms}) is out of range, dropping it");
    }

    absolute
}

/// Renders an epoch-millisecond value as an RFC 3339 UTC timestamp.
pub fn format_epoch_ms(epoch_ms: i64) -> Option<String> {
    Timestamp::from_millisecond(epoch_ms)
        .ok()
        .map(|ts| ts.to_string())
}
