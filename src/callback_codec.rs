//! # Callback Codec
//!
//! Packs the context needed to re-sort a flight search into Telegram's
//! callback data, which is capped at 64 bytes.
//!
//! ## Wire format (schema `fs1`)
//!
//! ```text
//! fs1|asc|MOW|LED|010625|080625
//! fs1|desc|MOW|IST|150725|OW
//! ```
//!
//! Fields in order: tag, sort direction, origin code, destination code,
//! departure date as `DDMMYY`, return date as `DDMMYY` or `OW` for one-way.
//! Codes are at most three characters and dates exactly six, so a token is
//! bounded by construction; the length check in [`encode`] only reports
//! inputs that break that assumption.
//!
//! If the layout ever changes, bump [`TOKEN_TAG`] so stale buttons still in
//! chat history are rejected instead of misread.

use chrono::NaiveDate;

use crate::dates::{from_ddmmyy, parse_iso_date, to_ddmmyy};
use crate::errors::TravelError;
use crate::iata::{resolve, reverse_resolve};

/// Routing tag and schema version, always the first field
pub const TOKEN_TAG: &str = "fs1";
/// Field separator
pub const DELIMITER: char = '|';
/// Return-date placeholder for one-way searches
pub const ONE_WAY: &str = "OW";
/// Telegram's limit on `callback_data`
pub const MAX_CALLBACK_BYTES: usize = 64;

const FIELD_TAG: usize = 0;
const FIELD_SORT: usize = 1;
const FIELD_ORIGIN: usize = 2;
const FIELD_DESTINATION: usize = 3;
const FIELD_DEPART: usize = 4;
const FIELD_RETURN: usize = 5;
/// Number of fields in a token
pub const FIELD_COUNT: usize = 6;

/// Price sort direction carried by a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_wire(self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }

    fn from_wire(field: &str) -> Option<Self> {
        match field {
            "asc" => Some(SortOrder::Ascending),
            "desc" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// Everything recovered from an inbound token
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCallback {
    pub sort: SortOrder,
    pub origin_code: String,
    pub destination_code: String,
    /// Human-readable label; lossy, never use as identity
    pub origin_label: String,
    /// Human-readable label; lossy, never use as identity
    pub destination_label: String,
    pub depart_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

/// Whether inbound callback data belongs to this codec
pub fn is_flight_token(data: &str) -> bool {
    data.split(DELIMITER).next() == Some(TOKEN_TAG)
}

fn checked_code(city: &str) -> Result<String, TravelError> {
    let code = resolve(city);
    if code.is_empty() || code.contains(DELIMITER) {
        return Err(TravelError::MalformedToken(format!(
            "city {city:?} does not yield a usable code"
        )));
    }
    Ok(code)
}

/// Build a token for a search. Dates are ISO `YYYY-MM-DD`.
pub fn encode(
    sort: SortOrder,
    origin_city: &str,
    destination_city: &str,
    depart_date: &str,
    return_date: Option<&str>,
) -> Result<String, TravelError> {
    let origin = checked_code(origin_city)?;
    let destination = checked_code(destination_city)?;
    let depart = to_ddmmyy(parse_iso_date(depart_date)?)?;
    let ret = match return_date {
        Some(date) => to_ddmmyy(parse_iso_date(date)?)?,
        None => ONE_WAY.to_string(),
    };

    let mut fields = [""; FIELD_COUNT];
    fields[FIELD_TAG] = TOKEN_TAG;
    fields[FIELD_SORT] = sort.as_wire();
    fields[FIELD_ORIGIN] = origin.as_str();
    fields[FIELD_DESTINATION] = destination.as_str();
    fields[FIELD_DEPART] = depart.as_str();
    fields[FIELD_RETURN] = ret.as_str();
    let separator = DELIMITER.to_string();
    let token = fields.join(separator.as_str());

    if token.len() > MAX_CALLBACK_BYTES {
        return Err(TravelError::MalformedToken(format!(
            "encoded token is {} bytes, limit is {MAX_CALLBACK_BYTES}",
            token.len()
        )));
    }
    Ok(token)
}

/// Parse a token produced by [`encode`]
pub fn decode(token: &str) -> Result<DecodedCallback, TravelError> {
    let fields: Vec<&str> = token.split(DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(TravelError::MalformedToken(format!(
            "expected {FIELD_COUNT} fields, got {}",
            fields.len()
        )));
    }
    if fields[FIELD_TAG] != TOKEN_TAG {
        return Err(TravelError::MalformedToken(format!(
            "unknown tag {:?}",
            fields[FIELD_TAG]
        )));
    }

    let sort = SortOrder::from_wire(fields[FIELD_SORT]).ok_or_else(|| {
        TravelError::MalformedToken(format!("unknown sort {:?}", fields[FIELD_SORT]))
    })?;

    let origin_code = fields[FIELD_ORIGIN].to_string();
    let destination_code = fields[FIELD_DESTINATION].to_string();
    if origin_code.is_empty() || destination_code.is_empty() {
        return Err(TravelError::MalformedToken("empty airport code".to_string()));
    }

    let depart_date = from_ddmmyy(fields[FIELD_DEPART])
        .map_err(|e| TravelError::MalformedToken(e.to_string()))?;
    let return_date = match fields[FIELD_RETURN] {
        ONE_WAY => None,
        short => Some(from_ddmmyy(short).map_err(|e| TravelError::MalformedToken(e.to_string()))?),
    };

    Ok(DecodedCallback {
        sort,
        origin_label: reverse_resolve(&origin_code),
        destination_label: reverse_resolve(&destination_code),
        origin_code,
        destination_code,
        depart_date,
        return_date,
    })
}
