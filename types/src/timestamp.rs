//! Producer-reported timestamps.
//!
//! Producers stamp each message with a naive wall-clock time
//! (`YYYY-MM-DDTHH:MM:SS[.ffffff]`) and no offset. The consumer interprets it
//! in its own local timezone, so both sides must share a zone for skew to
//! mean anything.

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone};
use thiserror::Error;

/// `strftime` layout for reported times. `%.f` makes the fraction optional.
pub const REPORTED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampParseError {
    #[error("reported time {value:?} does not match YYYY-MM-DDTHH:MM:SS[.ffffff]: {source}")]
    Format {
        value: String,
        source: chrono::ParseError,
    },
    #[error("reported time {value:?} does not exist in the local timezone")]
    Nonexistent { value: String },
}

/// Parse a reported time in the local timezone.
///
/// Ambiguous wall-clock times (DST fall-back) resolve to the earlier instant.
/// Times inside a DST gap have no local instant and are rejected.
pub fn parse_reported_time(value: &str) -> Result<DateTime<Local>, TimestampParseError> {
    resolve(&Local, value)
}

fn resolve<Tz: TimeZone>(zone: &Tz, value: &str) -> Result<DateTime<Tz>, TimestampParseError> {
    let naive = NaiveDateTime::parse_from_str(value, REPORTED_TIME_FORMAT).map_err(|source| {
        TimestampParseError::Format {
            value: value.to_string(),
            source,
        }
    })?;

    zone.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| TimestampParseError::Nonexistent {
            value: value.to_string(),
        })
}

/// RFC 3339 rendering used for the observed time in anomaly records.
#[must_use]
pub fn format_observed(observed: &DateTime<Local>) -> String {
    observed.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
