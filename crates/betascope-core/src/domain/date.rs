use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// Parses `YYYY-MM-DD` or a full RFC3339 timestamp into a UTC calendar date.
pub fn parse_iso_date(input: &str) -> Result<Date, ValidationError> {
    let trimmed = input.trim();
    let invalid = || ValidationError::InvalidDate {
        value: input.to_owned(),
    };

    if let Ok(date) = Date::parse(trimmed, format_description!("[year]-[month]-[day]")) {
        return Ok(date);
    }

    OffsetDateTime::parse(trimmed, &Rfc3339)
        .map(|ts| ts.to_offset(UtcOffset::UTC).date())
        .map_err(|_| invalid())
}

/// UTC calendar date of a unix timestamp in seconds.
pub fn date_from_unix(seconds: i64) -> Option<Date> {
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()
        .map(|ts| ts.date())
}

/// Unix seconds at UTC midnight of `date`.
pub fn unix_midnight(date: Date) -> i64 {
    date.midnight().assume_utc().unix_timestamp()
}
