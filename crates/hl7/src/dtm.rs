//! Conversions for the HL7 `DTM` (date/time) data type.

use crate::{Hl7Error, Hl7Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};

pub fn format_date_time(date_time: &NaiveDateTime) -> String {
    date_time.format("%Y%m%d%H%M%S").to_string()
}

/// Current UTC date/time as a `DTM` value.
pub fn format_now() -> String {
    format_date_time(&Utc::now().naive_utc())
}

/// Parse a `DTM` value with day, minute or second precision (8, 12 or 14 digits).
pub fn parse_date_time(value: &str) -> Hl7Result<NaiveDateTime> {
    let invalid = || Hl7Error::InvalidDateTime(value.to_string());
    match value.len() {
        8 => NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(invalid),
        12 => NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M").map_err(|_| invalid()),
        14 => NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M%S").map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_precisions() {
        let day = parse_date_time("19651112").expect("day");
        assert_eq!(format_date_time(&day), "19651112000000");

        let minute = parse_date_time("201803011100").expect("minute");
        assert_eq!(format_date_time(&minute), "20180301110000");

        let second = parse_date_time("20180301110005").expect("second");
        assert_eq!(format_date_time(&second), "20180301110005");
    }

    #[test]
    fn rejects_other_lengths() {
        for value in ["", "2018", "2018030111", "20180301110000.0012"] {
            assert!(
                matches!(parse_date_time(value), Err(Hl7Error::InvalidDateTime(_))),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_invalid_calendar_dates() {
        assert!(parse_date_time("20181332").is_err());
    }

    #[test]
    fn now_has_second_precision() {
        assert_eq!(format_now().len(), 14);
    }
}
