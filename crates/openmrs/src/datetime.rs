//! Date/time formats of the OpenMRS REST API.
//!
//! OpenMRS does not accept fractional seconds on input, but returns values such as
//! `2018-03-01T00:00:00.000+0000`.

use crate::{OpenMrsError, OpenMrsResult};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format a date/time for the OpenMRS REST API (second precision, no offset).
pub fn format_date_time(date_time: &NaiveDateTime) -> String {
    date_time.format(OUTPUT_FORMAT).to_string()
}

/// Current UTC date/time, formatted for the OpenMRS REST API.
pub fn format_now() -> String {
    format_date_time(&Utc::now().naive_utc())
}

/// Parse a date/time returned by OpenMRS, with or without fractional seconds.
pub fn parse_date_time(value: &str) -> OpenMrsResult<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .map_err(|_| OpenMrsError::InvalidDateTime(value.to_string()))
}

/// Drop the time part of a date/time returned by OpenMRS (`YYYY-MM-DD`).
pub fn keep_only_date(value: &str) -> OpenMrsResult<String> {
    Ok(parse_date_time(value)?.format("%Y-%m-%d").to_string())
}
