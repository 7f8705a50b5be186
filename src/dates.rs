//! Date validation and the date conversions used by the callback codec and
//! the flight client.

use chrono::{Datelike, Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::TravelError;

/// ISO calendar date format accepted at every dialogue gate
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Days added to the departure date when no return date is supplied
pub const DEFAULT_TRIP_LENGTH_DAYS: i64 = 7;

lazy_static! {
    // chrono alone accepts "2025-1-5" and signed years, so pin the field widths first
    static ref ISO_DATE_SHAPE: Regex =
        Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("ISO date pattern should be valid");
    static ref SHORT_DATE_SHAPE: Regex =
        Regex::new(r"^[0-9]{6}$").expect("Short date pattern should be valid");
}

/// Parse a strict `YYYY-MM-DD` date, rejecting other widths and impossible days
pub fn parse_iso_date(text: &str) -> Result<NaiveDate, TravelError> {
    if !ISO_DATE_SHAPE.is_match(text) {
        return Err(TravelError::InvalidDate(format!("expected YYYY-MM-DD, got {text:?}")));
    }
    NaiveDate::parse_from_str(text, ISO_DATE_FORMAT)
        .map_err(|e| TravelError::InvalidDate(format!("{text:?}: {e}")))
}

/// Whether `text` is a well-formed calendar date
pub fn is_valid_date(text: &str) -> bool {
    parse_iso_date(text).is_ok()
}

/// Departure plus the default trip length
pub fn default_return_date(depart: NaiveDate) -> NaiveDate {
    depart + Duration::days(DEFAULT_TRIP_LENGTH_DAYS)
}

/// Years the six digit form can carry without losing the century
pub const SHORT_DATE_YEARS: std::ops::RangeInclusive<i32> = 2000..=2099;

/// `2025-06-01` -> `010625`; years outside [`SHORT_DATE_YEARS`] are refused
pub fn to_ddmmyy(date: NaiveDate) -> Result<String, TravelError> {
    if !SHORT_DATE_YEARS.contains(&date.year()) {
        return Err(TravelError::InvalidDate(format!(
            "{date} is outside the DDMMYY range {}..={}",
            SHORT_DATE_YEARS.start(),
            SHORT_DATE_YEARS.end()
        )));
    }
    Ok(date.format("%d%m%y").to_string())
}

/// `010625` -> `2025-06-01`.
///
/// The century is always taken to be 20xx; dates from 2100 onward cannot be
/// represented in the six digit form.
pub fn from_ddmmyy(short: &str) -> Result<NaiveDate, TravelError> {
    if !SHORT_DATE_SHAPE.is_match(short) {
        return Err(TravelError::InvalidDate(format!("expected DDMMYY, got {short:?}")));
    }
    let iso = format!("20{}-{}-{}", &short[4..6], &short[2..4], &short[0..2]);
    parse_iso_date(&iso)
}
