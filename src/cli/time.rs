//! Window bound parsing for `--from` / `--to`.
//!
//! Accepts `now`, RFC 3339 (`2026-10-19T12:00:00Z`), Unix seconds
//! (`1792411200`) and offsets relative to now (`-1h`, `-30m`, `-2d`, `-90s`).

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Failed to parse time '{input}': expected now, RFC 3339, Unix seconds or a relative offset like -1h")]
pub struct TimeParseError {
    pub input: String,
}

pub fn parse_time(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, TimeParseError> {
    let input = input.trim();

    if input == "now" {
        return Ok(now);
    }

    if let Some(ts) = try_parse_relative(input, now) {
        return Ok(ts);
    }

    if let Ok(secs) = input.parse::<i64>()
        && let Some(ts) = DateTime::from_timestamp(secs, 0)
    {
        return Ok(ts);
    }

    DateTime::parse_from_rfc3339(input)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| TimeParseError {
            input: input.to_string(),
        })
}

fn try_parse_relative(input: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let rest = input.strip_prefix('-')?;
    let unit = rest.chars().last()?;
    let amount: i64 = rest.get(..rest.len() - unit.len_utf8())?.parse().ok()?;
    let offset = match unit {
        's' => Duration::try_seconds(amount)?,
        'm' => Duration::try_minutes(amount)?,
        'h' => Duration::try_hours(amount)?,
        'd' => Duration::try_days(amount)?,
        _ => return None,
    };
    now.checked_sub_signed(offset)
}
