//! # Flight Price Client Tests
//!
//! Drives [`FlightPriceClient`] against a scripted price source and an
//! in-memory SQLite store: live results, the timeout fallback and the
//! failure paths that degrade to an empty list.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use skyfare::callback_codec::SortOrder;
use skyfare::db::{connect, init_database_schema, ResponseStore};
use skyfare::errors::TravelError;
use skyfare::flight_client::{FlightPriceClient, OfferOrigin, PriceQuery, PriceSource};

const PAYLOAD: &str = r#"{
    "success": true,
    "data": [
        {"price": 5200, "airline": "SU", "departure_at": "2025-06-01T08:00:00+03:00",
         "return_at": "2025-06-08T20:00:00+03:00", "transfers": 0, "link": "/search/MOW0106LED08061?t=a"},
        {"price": 3100, "airline": "S7", "departure_at": "2025-06-01T11:00:00+03:00",
         "return_at": "2025-06-08T21:00:00+03:00", "transfers": 1, "link": "/search/MOW0106LED08061?t=b"},
        {"price": 4000, "airline": "U6", "departure_at": "2025-06-01T15:00:00+03:00"},
        {"price": 4700, "airline": "DP", "departure_at": "2025-06-01T19:00:00+03:00",
         "return_at": "2025-06-08T07:00:00+03:00", "transfers": 2, "link": "/search/MOW0106LED08061?t=c"}
    ]
}"#;

/// Price source that replays scripted answers and records every query
#[derive(Default)]
struct ScriptedSource {
    answers: Mutex<VecDeque<Result<String, TravelError>>>,
    queries: Mutex<Vec<PriceQuery>>,
}

impl ScriptedSource {
    fn with_answers(answers: Vec<Result<String, TravelError>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn queries(&self) -> Vec<PriceQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch_prices(&self, query: &PriceQuery) -> Result<String, TravelError> {
        self.queries.lock().unwrap().push(query.clone());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TravelError::UpstreamError("no scripted answer".to_string())))
    }
}

async fn setup(answers: Vec<Result<String, TravelError>>) -> Result<(FlightPriceClient, Arc<ScriptedSource>, ResponseStore)> {
    let pool = connect("sqlite::memory:", 1).await?;
    init_database_schema(&pool).await?;
    let store = ResponseStore::new(pool);
    let source = ScriptedSource::with_answers(answers);
    let client = FlightPriceClient::new(source.clone(), store.clone());
    Ok((client, source, store))
}

fn timeout() -> TravelError {
    TravelError::UpstreamTimeout("operation timed out".to_string())
}

#[tokio::test]
async fn test_live_search_defaults_return_date_and_resolves_codes() -> Result<()> {
    let (client, source, _store) = setup(vec![Ok(PAYLOAD.to_string())]).await?;

    let outcome = client
        .search_with_origin("Москва", "Санкт-Петербург", "2025-06-01", None)
        .await;

    let queries = source.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].origin_code, "MOW");
    assert_eq!(queries[0].destination_code, "LED");
    assert_eq!(queries[0].depart_iso(), "2025-06-01");
    assert_eq!(queries[0].return_iso(), "2025-06-08");

    assert_eq!(outcome.origin, OfferOrigin::Live);
    let prices: Vec<f64> = outcome.offers.iter().map(|o| o.price).collect();
    // upstream order is kept, the offer without a link is dropped
    assert_eq!(prices, vec![5200.0, 3100.0, 4700.0]);
    Ok(())
}

#[tokio::test]
async fn test_live_search_stores_raw_payload() -> Result<()> {
    let (client, _source, store) = setup(vec![Ok(PAYLOAD.to_string())]).await?;

    client.search("MOW", "LED", "2025-06-01", Some("2025-06-10")).await;

    let latest = store.get_latest().await?.expect("payload should be stored");
    assert_eq!(latest.origin, "MOW");
    assert_eq!(latest.destination, "LED");
    assert_eq!(latest.depart_date, "2025-06-01");
    assert_eq!(latest.return_date.as_deref(), Some("2025-06-10"));
    assert_eq!(latest.response_json, PAYLOAD);
    Ok(())
}

#[tokio::test]
async fn test_timeout_falls_back_to_latest_stored_payload() -> Result<()> {
    let (client, _source, store) = setup(vec![Err(timeout())]).await?;
    store
        .put("AER", "KZN", "2025-07-01", Some("2025-07-08"), PAYLOAD)
        .await?;

    let outcome = client
        .search_with_origin("MOW", "LED", "2025-06-01", None)
        .await;

    assert_eq!(outcome.origin, OfferOrigin::CachedFallback);
    assert_eq!(outcome.offers.len(), 3);
    assert_eq!(outcome.offers[0].airline, "SU");
    Ok(())
}

#[tokio::test]
async fn test_timeout_without_stored_payload_is_empty() -> Result<()> {
    let (client, _source, _store) = setup(vec![Err(timeout())]).await?;

    let outcome = client
        .search_with_origin("MOW", "LED", "2025-06-01", None)
        .await;

    assert_eq!(outcome.origin, OfferOrigin::Unavailable);
    assert!(outcome.offers.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_non_timeout_failure_does_not_use_fallback() -> Result<()> {
    let (client, _source, store) = setup(vec![Err(TravelError::UpstreamError("HTTP 500".to_string()))]).await?;
    store
        .put("MOW", "LED", "2025-06-01", Some("2025-06-08"), PAYLOAD)
        .await?;

    let offers = client.search("MOW", "LED", "2025-06-01", None).await;
    assert!(offers.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_invalid_date_never_reaches_the_source() -> Result<()> {
    let (client, source, _store) = setup(vec![Ok(PAYLOAD.to_string())]).await?;

    assert!(client.search("MOW", "LED", "2025-02-30", None).await.is_empty());
    assert!(client.search("MOW", "LED", "2025-06-01", Some("soon")).await.is_empty());
    assert!(source.queries().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_empty_and_not_stored() -> Result<()> {
    let failure = r#"{"success": false, "data": [], "error": "Unauthorized"}"#;
    let (client, _source, store) = setup(vec![Ok(failure.to_string())]).await?;

    assert!(client.search("MOW", "LED", "2025-06-01", None).await.is_empty());
    assert!(store.get_latest().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_resort_orders_by_requested_direction() -> Result<()> {
    let (client, _source, _store) = setup(vec![Ok(PAYLOAD.to_string()), Ok(PAYLOAD.to_string())]).await?;

    let descending = client
        .resort("MOW", "LED", "2025-06-01", None, SortOrder::Descending)
        .await;
    let prices: Vec<f64> = descending.iter().map(|o| o.price).collect();
    assert_eq!(prices, vec![5200.0, 4700.0, 3100.0]);

    let ascending = client
        .resort("MOW", "LED", "2025-06-01", None, SortOrder::Ascending)
        .await;
    let prices: Vec<f64> = ascending.iter().map(|o| o.price).collect();
    assert_eq!(prices, vec![3100.0, 4700.0, 5200.0]);
    Ok(())
}
