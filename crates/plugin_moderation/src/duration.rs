//! Duration strings as typed in commands (`30m`, `1d12h`, `perm`) and
//! human-readable rendering of durations and timestamps.

use chrono::{DateTime, Utc};
use std::time::Duration;

const SECOND: u64 = 1;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = 365 * DAY;

/// Longest timed punishment; anything longer should be `perm`.
pub const MAX_DURATION_SECS: u64 = 100 * YEAR;

/// Units longest-first; `mo` must be tried before `m`.
const UNITS: [(&str, u64); 7] = [
    ("y", YEAR),
    ("mo", MONTH),
    ("w", WEEK),
    ("d", DAY),
    ("h", HOUR),
    ("m", MINUTE),
    ("s", SECOND),
];

/// Parses `<n><unit>` segments. Returns `Ok(None)` for `perm`/`permanent`.
pub fn parse_duration(input: &str) -> Result<Option<Duration>, String> {
    let input = input.trim().to_ascii_lowercase();
    if input == "perm" || input == "permanent" {
        return Ok(None);
    }
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total: u64 = 0;
    let mut rest = input.as_str();
    while !rest.is_empty() {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return Err(format!("expected a number at '{rest}'"));
        }
        let amount: u64 = rest[..digits]
            .parse()
            .map_err(|_| format!("number too large in '{input}'"))?;
        rest = &rest[digits..];

        let Some((unit, seconds)) = UNITS.iter().find(|(unit, _)| rest.starts_with(unit)) else {
            return Err(format!("unknown unit in '{input}' (use s, m, h, d, w, mo, y)"));
        };
        rest = &rest[unit.len()..];

        total = amount
            .checked_mul(*seconds)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| format!("duration '{input}' is too long"))?;
    }

    if total == 0 {
        return Err("duration must be longer than zero".to_string());
    }
    if total > MAX_DURATION_SECS {
        return Err(format!("duration '{input}' is longer than 100y, use 'perm'"));
    }
    Ok(Some(Duration::from_secs(total)))
}

/// Renders milliseconds as `1d 12h 5m`. Seconds are shown only below an hour.
pub fn format_duration_ms(ms: i64) -> String {
    let mut remaining = (ms.max(0) as u64).div_ceil(1000);
    if remaining == 0 {
        return "0s".to_string();
    }
    let show_seconds = remaining < HOUR;

    let mut parts = Vec::new();
    for (unit, seconds) in UNITS {
        if unit == "s" && !show_seconds {
            break;
        }
        let amount = remaining / seconds;
        if amount > 0 {
            parts.push(format!("{amount}{unit}"));
            remaining %= seconds;
        }
    }
    parts.join(" ")
}

pub fn format_duration(duration: Duration) -> String {
    format_duration_ms(duration.as_millis() as i64)
}

/// Renders a Unix millisecond timestamp as `2024-05-01 18:30 UTC`.
pub fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|time| time.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_and_combined_units() {
        assert_eq!(parse_duration("30s").unwrap(), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("2mo").unwrap(), Some(Duration::from_secs(60 * DAY)));
        assert_eq!(parse_duration("5m").unwrap(), Some(Duration::from_secs(300)));
        assert_eq!(
            parse_duration("1d12h").unwrap(),
            Some(Duration::from_secs(DAY + 12 * HOUR))
        );
        assert_eq!(parse_duration("1Y").unwrap(), Some(Duration::from_secs(YEAR)));
    }

    #[test]
    fn test_parse_permanent() {
        assert_eq!(parse_duration("perm").unwrap(), None);
        assert_eq!(parse_duration("Permanent").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "10", "h", "1x", "0s", "1d-2h", "99999999999999999999y"] {
            assert!(parse_duration(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_parse_caps_length() {
        assert_eq!(parse_duration("100y").unwrap(), Some(Duration::from_secs(MAX_DURATION_SECS)));
        assert!(parse_duration("100y1s").is_err());
        assert!(parse_duration("999999999y").unwrap_err().contains("perm"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_ms(0), "0s");
        assert_eq!(format_duration_ms(45_000), "45s");
        assert_eq!(format_duration_ms(90_000), "1m 30s");
        assert_eq!(format_duration_ms(((DAY + 12 * HOUR) * 1000) as i64), "1d 12h");
        assert_eq!(format_duration_ms((HOUR * 1000 + 500) as i64), "1h");
        assert_eq!(format_duration(Duration::from_secs(8 * DAY)), "1w 1d");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00 UTC");
    }
}
