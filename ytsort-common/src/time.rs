//! Timestamp and duration utilities
//!
//! Remote records carry RFC 3339 publication timestamps (`2024-03-01T12:00:00Z`)
//! and ISO 8601 durations (`PT1H2M3S`, `P1DT4M`).

use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an RFC 3339 timestamp into UTC
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("Invalid timestamp '{}': {}", value, e)))
}

/// Parse an ISO 8601 duration into whole seconds
///
/// Supports the day and time designators the remote API emits
/// (`P[nD][T[nH][nM][nS]]`). Week, month and year designators are rejected.
pub fn parse_iso8601_duration(value: &str) -> Result<u64> {
    let invalid = || Error::InvalidInput(format!("Invalid ISO 8601 duration: '{}'", value));

    let body = value.strip_prefix('P').ok_or_else(invalid)?;
    if body.is_empty() {
        return Err(invalid());
    }

    let mut seconds = 0u64;
    let mut digits = String::new();
    let mut in_time = false;
    let mut components = 0;

    for ch in body.chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            'T' if !in_time && digits.is_empty() => in_time = true,
            'D' | 'H' | 'M' | 'S' => {
                let n: u64 = digits.parse().map_err(|_| invalid())?;
                digits.clear();
                let unit = match (ch, in_time) {
                    ('D', false) => 24 * 60 * 60,
                    ('H', true) => 60 * 60,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return Err(invalid()),
                };
                seconds += n * unit;
                components += 1;
            }
            _ => return Err(invalid()),
        }
    }

    if !digits.is_empty() || components == 0 {
        return Err(invalid());
    }

    Ok(seconds)
}
