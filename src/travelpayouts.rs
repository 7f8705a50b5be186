//! Travelpayouts (Aviasales) price API source.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;

use crate::config::{AppConfig, RetryConfig};
use crate::errors::TravelError;
use crate::flight_client::{PriceQuery, PriceSource};
use crate::http::send_with_retry;

pub const PRICES_FOR_DATES_URL: &str = "https://api.travelpayouts.com/aviasales/v3/prices_for_dates";

/// HTTP price source backed by `prices_for_dates`
#[derive(Debug, Clone)]
pub struct TravelpayoutsSource {
    http: Client,
    token: String,
    currency: String,
    limit: u32,
    retry: RetryConfig,
}

impl TravelpayoutsSource {
    pub fn new(token: &str, currency: &str, limit: u32, timeout: Duration, retry: RetryConfig) -> Result<Self, TravelError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TravelError::from)?;
        Ok(Self {
            http,
            token: token.to_string(),
            currency: currency.to_string(),
            limit,
            retry,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, TravelError> {
        Self::new(
            &config.travel_token,
            &config.currency,
            config.result_limit,
            config.http_timeout,
            config.retry.clone(),
        )
    }

    /// Query parameters for a search; always round-trip, cheapest first
    pub fn query_params(&self, query: &PriceQuery) -> Vec<(&'static str, String)> {
        vec![
            ("origin", query.origin_code.clone()),
            ("destination", query.destination_code.clone()),
            ("departure_at", query.depart_iso()),
            ("return_at", query.return_iso()),
            ("one_way", "false".to_string()),
            ("currency", self.currency.clone()),
            ("limit", self.limit.to_string()),
            ("page", "1".to_string()),
            ("sorting", "price".to_string()),
            ("token", self.token.clone()),
        ]
    }

    fn request(&self, query: &PriceQuery) -> RequestBuilder {
        self.http.get(PRICES_FOR_DATES_URL).query(&self.query_params(query))
    }
}

#[async_trait]
impl PriceSource for TravelpayoutsSource {
    async fn fetch_prices(&self, query: &PriceQuery) -> Result<String, TravelError> {
        let response = send_with_retry(
            || self.request(query),
            &self.retry,
            "travelpayouts",
        )
        .await?;
        let body = response.text().await?;
        debug!(bytes = body.len(), "Received flight price payload");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight_client::build_query;

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> &'a str {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    }

    #[test]
    fn test_query_params_are_round_trip_and_capped() {
        let source = TravelpayoutsSource::new("secret", "rub", 10, Duration::from_secs(10), RetryConfig::default())
            .unwrap();
        let query = build_query("Москва", "Стамбул", "2025-06-01", None).unwrap();
        let params = source.query_params(&query);

        let get = |key: &str| param(&params, key).to_string();
        assert_eq!(get("origin"), "MOW");
        assert_eq!(get("destination"), "IST");
        assert_eq!(get("departure_at"), "2025-06-01");
        assert_eq!(get("return_at"), "2025-06-08");
        assert_eq!(get("one_way"), "false");
        assert_eq!(get("limit"), "10");
        assert_eq!(get("sorting"), "price");
        assert_eq!(get("token"), "secret");
    }

    #[test]
    fn test_request_targets_prices_for_dates() {
        let source = TravelpayoutsSource::new("secret", "rub", 10, Duration::from_secs(10), RetryConfig::default())
            .unwrap();
        let query = build_query("Москва", "Сочи", "2025-06-01", Some("2025-06-08")).unwrap();
        let request = source.request(&query).build().unwrap();

        let url = request.url();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            format!("{}://{}{}", url.scheme(), url.host_str().unwrap(), url.path()),
            PRICES_FOR_DATES_URL
        );
        let query_string = url.query().unwrap();
        assert!(query_string.contains("origin=MOW"));
        assert!(query_string.contains("destination=AER"));
        assert!(query_string.contains("return_at=2025-06-08"));
    }
}
