//! # Flight Price Client
//!
//! Looks up round-trip prices for a pair of cities and turns the upstream
//! payload into [`FlightOffer`]s.
//!
//! ## Flow
//!
//! 1. Validate the departure date, default the return date to one week later
//! 2. Resolve both cities to IATA codes
//! 3. Ask the [`PriceSource`] for the raw payload (price ascending, capped page)
//! 4. Store the payload, then extract the offers that carry a purchase link
//! 5. On timeout, re-extract from the most recently stored payload instead
//!
//! Nothing here returns an error to the dialogue layer: every failure is
//! logged and degrades to an empty list.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::callback_codec::SortOrder;
use crate::dates::{default_return_date, parse_iso_date, ISO_DATE_FORMAT};
use crate::db::ResponseStore;
use crate::errors::TravelError;
use crate::iata::resolve;

/// Base for the relative purchase paths returned by the API
pub const PURCHASE_BASE_URL: &str = "https://www.aviasales.ru";

/// Airline shown when the API omits one
pub const UNKNOWN_AIRLINE: &str = "Unknown";

/// Parameters sent to the price API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub origin_code: String,
    pub destination_code: String,
    pub depart_date: NaiveDate,
    pub return_date: NaiveDate,
}

impl PriceQuery {
    pub fn depart_iso(&self) -> String {
        self.depart_date.format(ISO_DATE_FORMAT).to_string()
    }

    pub fn return_iso(&self) -> String {
        self.return_date.format(ISO_DATE_FORMAT).to_string()
    }
}

/// One bookable round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub price: f64,
    pub airline: String,
    pub departure_at: String,
    pub return_at: Option<String>,
    pub transfers: u32,
    /// Relative purchase path, always starting with `/`
    pub link: String,
}

impl FlightOffer {
    pub fn purchase_url(&self) -> String {
        format!("{PURCHASE_BASE_URL}{}", self.link)
    }
}

/// Upstream that returns the raw price payload for a query
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(&self, query: &PriceQuery) -> Result<String, TravelError>;
}

#[derive(Debug, Deserialize)]
struct PricesEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<PriceItem>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceItem {
    price: Option<f64>,
    airline: Option<String>,
    departure_at: Option<String>,
    return_at: Option<String>,
    transfers: Option<u32>,
    link: Option<String>,
}

impl PriceItem {
    fn into_offer(self) -> Option<FlightOffer> {
        let link = self.link.filter(|link| link.starts_with('/') && link.len() > 1)?;
        let price = self.price.filter(|price| price.is_finite() && *price >= 0.0)?;
        Some(FlightOffer {
            price,
            airline: self
                .airline
                .filter(|airline| !airline.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_AIRLINE.to_string()),
            departure_at: self.departure_at.unwrap_or_default(),
            return_at: self.return_at.filter(|at| !at.is_empty()),
            transfers: self.transfers.unwrap_or(0),
            link,
        })
    }
}

/// Extract offers from a raw payload, keeping upstream order and dropping
/// items without a usable purchase path or price
pub fn extract_offers(raw: &str) -> Result<Vec<FlightOffer>, TravelError> {
    let envelope: PricesEnvelope = serde_json::from_str(raw)?;
    if !envelope.success {
        return Err(TravelError::UpstreamError(
            envelope
                .error
                .unwrap_or_else(|| "price API reported failure".to_string()),
        ));
    }
    let total = envelope.data.len();
    let offers: Vec<FlightOffer> = envelope
        .data
        .into_iter()
        .filter_map(PriceItem::into_offer)
        .collect();
    if offers.len() < total {
        debug!(dropped = total - offers.len(), kept = offers.len(), "Dropped offers without purchase link");
    }
    Ok(offers)
}

/// Sort by price in the given direction; equal prices keep their input order
pub fn sort_offers(offers: &[FlightOffer], order: SortOrder) -> Vec<FlightOffer> {
    let mut sorted = offers.to_vec();
    let by_price = |a: &FlightOffer, b: &FlightOffer| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal);
    match order {
        SortOrder::Ascending => sorted.sort_by(by_price),
        SortOrder::Descending => sorted.sort_by(|a, b| by_price(b, a)),
    }
    sorted
}

/// Build the effective query: validated dates, default return date, IATA codes
pub fn build_query(
    origin: &str,
    destination: &str,
    depart_date: &str,
    return_date: Option<&str>,
) -> Result<PriceQuery, TravelError> {
    let depart = parse_iso_date(depart_date)?;
    let ret = match return_date {
        Some(date) => parse_iso_date(date)?,
        None => default_return_date(depart),
    };
    Ok(PriceQuery {
        origin_code: resolve(origin),
        destination_code: resolve(destination),
        depart_date: depart,
        return_date: ret,
    })
}

/// Where a set of offers came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOrigin {
    Live,
    /// The last stored payload, possibly for a different query
    CachedFallback,
    Unavailable,
}

/// Offers plus their provenance
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub offers: Vec<FlightOffer>,
    pub origin: OfferOrigin,
}

impl SearchOutcome {
    fn unavailable() -> Self {
        Self {
            offers: Vec::new(),
            origin: OfferOrigin::Unavailable,
        }
    }
}

/// Flight price client
#[derive(Clone)]
pub struct FlightPriceClient {
    source: Arc<dyn PriceSource>,
    store: ResponseStore,
}

impl FlightPriceClient {
    pub fn new(source: Arc<dyn PriceSource>, store: ResponseStore) -> Self {
        Self { source, store }
    }

    /// Offers for a search, in upstream (price ascending) order
    pub async fn search(
        &self,
        origin: &str,
        destination: &str,
        depart_date: &str,
        return_date: Option<&str>,
    ) -> Vec<FlightOffer> {
        self.search_with_origin(origin, destination, depart_date, return_date)
            .await
            .offers
    }

    /// Same as [`search`](Self::search) but reports whether the cache fallback was used
    pub async fn search_with_origin(
        &self,
        origin: &str,
        destination: &str,
        depart_date: &str,
        return_date: Option<&str>,
    ) -> SearchOutcome {
        let query = match build_query(origin, destination, depart_date, return_date) {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "Rejected flight search");
                return SearchOutcome::unavailable();
            }
        };

        info!(
            origin = %query.origin_code,
            destination = %query.destination_code,
            depart = %query.depart_date,
            ret = %query.return_date,
            "Searching flight prices"
        );

        match self.source.fetch_prices(&query).await {
            Ok(raw) => self.handle_live_payload(&query, &raw).await,
            Err(e) if e.is_timeout() => {
                warn!(error = %e, "Flight price lookup timed out, using last stored response");
                self.fallback_to_latest().await
            }
            Err(e) => {
                error!(error = %e, "Flight price lookup failed");
                SearchOutcome::unavailable()
            }
        }
    }

    /// Search again and order by price in the requested direction
    pub async fn resort(
        &self,
        origin: &str,
        destination: &str,
        depart_date: &str,
        return_date: Option<&str>,
        order: SortOrder,
    ) -> Vec<FlightOffer> {
        let offers = self.search(origin, destination, depart_date, return_date).await;
        sort_offers(&offers, order)
    }

    async fn handle_live_payload(&self, query: &PriceQuery, raw: &str) -> SearchOutcome {
        let offers = match extract_offers(raw) {
            Ok(offers) => offers,
            Err(e) => {
                error!(error = %e, "Could not read flight price payload");
                return SearchOutcome::unavailable();
            }
        };

        let return_iso = query.return_iso();
        if let Err(e) = self
            .store
            .put(
                &query.origin_code,
                &query.destination_code,
                &query.depart_iso(),
                Some(return_iso.as_str()),
                raw,
            )
            .await
        {
            error!(error = %e, "Failed to store flight price payload");
        }

        info!(offers = offers.len(), "Flight price lookup completed");
        SearchOutcome {
            offers,
            origin: OfferOrigin::Live,
        }
    }

    async fn fallback_to_latest(&self) -> SearchOutcome {
        let cached = match self.store.get_latest().await {
            Ok(Some(cached)) => cached,
            Ok(None) => {
                info!("No stored flight price payload to fall back to");
                return SearchOutcome::unavailable();
            }
            Err(e) => {
                error!(error = %e, "Failed to read stored flight price payload");
                return SearchOutcome::unavailable();
            }
        };

        match extract_offers(&cached.response_json) {
            Ok(offers) => {
                info!(
                    offers = offers.len(),
                    cached_origin = %cached.origin,
                    cached_destination = %cached.destination,
                    "Serving offers from stored payload"
                );
                SearchOutcome {
                    offers,
                    origin: OfferOrigin::CachedFallback,
                }
            }
            Err(e) => {
                error!(error = %e, "Stored flight price payload is unreadable");
                SearchOutcome::unavailable()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(price: f64, link: &str) -> FlightOffer {
        FlightOffer {
            price,
            airline: "SU".to_string(),
            departure_at: "2025-06-01T10:00:00+03:00".to_string(),
            return_at: Some("2025-06-08T18:00:00+03:00".to_string()),
            transfers: 0,
            link: link.to_string(),
        }
    }

    #[test]
    fn test_extract_offers_filters_missing_links() {
        let raw = r#"{
            "success": true,
            "data": [
                {"price": 5000, "airline": "SU", "departure_at": "2025-06-01T10:00:00+03:00",
                 "return_at": "2025-06-08T18:00:00+03:00", "transfers": 1, "link": "/search/MOW0106LED08061"},
                {"price": 4000, "airline": "S7", "departure_at": "2025-06-01T12:00:00+03:00"},
                {"price": 4500, "link": ""},
                {"price": 6000, "link": "/search/x"}
            ]
        }"#;
        let offers = extract_offers(raw).unwrap();
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].price, 5000.0);
        assert_eq!(offers[0].transfers, 1);
        assert_eq!(offers[0].purchase_url(), "https://www.aviasales.ru/search/MOW0106LED08061");
        assert_eq!(offers[1].airline, UNKNOWN_AIRLINE);
        assert_eq!(offers[1].return_at, None);
    }

    #[test]
    fn test_extract_offers_unsuccessful_envelope() {
        let raw = r#"{"success": false, "data": [], "error": "Unauthorized"}"#;
        assert_eq!(
            extract_offers(raw),
            Err(TravelError::UpstreamError("Unauthorized".to_string()))
        );
        assert!(extract_offers("<html>").is_err());
    }

    #[test]
    fn test_sort_offers_both_directions() {
        let offers = vec![offer(500.0, "/a"), offer(100.0, "/b"), offer(300.0, "/c")];

        let desc: Vec<f64> = sort_offers(&offers, SortOrder::Descending).iter().map(|o| o.price).collect();
        assert_eq!(desc, vec![500.0, 300.0, 100.0]);

        let asc: Vec<f64> = sort_offers(&offers, SortOrder::Ascending).iter().map(|o| o.price).collect();
        assert_eq!(asc, vec![100.0, 300.0, 500.0]);
    }

    #[test]
    fn test_sort_offers_is_stable() {
        let offers = vec![offer(200.0, "/first"), offer(100.0, "/x"), offer(200.0, "/second")];

        let asc = sort_offers(&offers, SortOrder::Ascending);
        assert_eq!(asc[1].link, "/first");
        assert_eq!(asc[2].link, "/second");

        let desc = sort_offers(&offers, SortOrder::Descending);
        assert_eq!(desc[0].link, "/first");
        assert_eq!(desc[1].link, "/second");
    }

    #[test]
    fn test_build_query_defaults_return_date() {
        let query = build_query("Москва", "Сочи", "2025-06-01", None).unwrap();
        assert_eq!(query.origin_code, "MOW");
        assert_eq!(query.destination_code, "AER");
        assert_eq!(query.return_iso(), "2025-06-08");
    }

    #[test]
    fn test_build_query_rejects_bad_dates() {
        assert!(matches!(
            build_query("MOW", "LED", "2025-13-01", None),
            Err(TravelError::InvalidDate(_))
        ));
        assert!(matches!(
            build_query("MOW", "LED", "2025-06-01", Some("next week")),
            Err(TravelError::InvalidDate(_))
        ));
    }
}
