//! # Weather Module
//!
//! Current conditions for a city via OpenWeatherMap: a geocoding call turns
//! the name into coordinates, then a second call fetches the weather there.
//! Each call is bounded by the client timeout.
//!
//! Successful reports are kept in a [`TtlCache`] owned by the client, with a
//! fixed capacity and time-to-live, so repeated lookups for popular cities do
//! not hit the API and memory stays bounded.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::config::{AppConfig, RetryConfig, WeatherCacheConfig};
use crate::errors::TravelError;
use crate::http::send_with_retry;

pub const GEOCODE_URL: &str = "https://api.openweathermap.org/geo/1.0/direct";
pub const CURRENT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Outcome of a weather lookup
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherReport {
    Current { temperature_c: f64, description: String },
    /// Geocoding found no such city
    NotFound,
    /// Upstream timed out or answered with an error status
    Unavailable,
    /// Upstream answered but the payload could not be read
    Error,
}

impl WeatherReport {
    pub fn is_current(&self) -> bool {
        matches!(self, WeatherReport::Current { .. })
    }

    /// `🌡 12.3°C, Ясно` for current conditions; `None` for sentinels
    pub fn summary(&self) -> Option<String> {
        match self {
            WeatherReport::Current { temperature_c, description } => {
                Some(format!("🌡 {temperature_c:.1}°C, {description}"))
            }
            _ => None,
        }
    }
}

/// Fixed-capacity map whose entries expire after a time-to-live
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, (Instant, V)>>,
    capacity: usize,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((inserted, value)) if inserted.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert, first purging expired entries and then evicting the oldest if full
    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let ttl = self.ttl;
            entries.retain(|_, (inserted, _)| inserted.elapsed() < ttl);
            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, (inserted, _))| *inserted)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(key, (Instant::now(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
struct GeoPlace {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: CurrentMain,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct CurrentMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

/// First coordinates in a geocoding payload; `Ok(None)` when the list is empty
pub fn parse_geocode(raw: &str) -> Result<Option<(f64, f64)>, TravelError> {
    let places: Vec<GeoPlace> = serde_json::from_str(raw)?;
    Ok(places.first().map(|place| (place.lat, place.lon)))
}

/// Current conditions from a weather payload
pub fn parse_current_weather(raw: &str) -> Result<WeatherReport, TravelError> {
    let current: CurrentWeather = serde_json::from_str(raw)?;
    let description = current
        .weather
        .first()
        .map(|condition| capitalize(&condition.description))
        .unwrap_or_default();
    Ok(WeatherReport::Current {
        temperature_c: current.main.temp,
        description,
    })
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Weather lookup client; create once and share
#[derive(Debug)]
pub struct WeatherClient {
    http: Client,
    api_key: String,
    retry: RetryConfig,
    cache: TtlCache<String, WeatherReport>,
}

impl WeatherClient {
    pub fn new(
        api_key: &str,
        timeout: Duration,
        retry: RetryConfig,
        cache: &WeatherCacheConfig,
    ) -> Result<Self, TravelError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            retry,
            cache: TtlCache::new(cache.capacity, cache.ttl),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, TravelError> {
        Self::new(&config.weather_key, config.http_timeout, config.retry.clone(), &config.weather_cache)
    }

    fn cache_key(city: &str) -> String {
        city.trim().to_lowercase()
    }

    /// Current weather for a city; failures come back as sentinel variants
    pub async fn current(&self, city: &str) -> WeatherReport {
        let key = Self::cache_key(city);
        if let Some(report) = self.cache.get(&key) {
            debug!(city = %key, "Weather cache hit");
            return report;
        }

        let report = match self.lookup(city).await {
            Ok(report) => report,
            Err(e) => {
                warn!(city, error = %e, "Weather lookup unavailable");
                WeatherReport::Unavailable
            }
        };

        if report.is_current() {
            self.cache.insert(key, report.clone());
        }
        report
    }

    async fn lookup(&self, city: &str) -> Result<WeatherReport, TravelError> {
        let geo = send_with_retry(
            || {
                self.http.get(GEOCODE_URL).query(&[
                    ("q", city),
                    ("appid", self.api_key.as_str()),
                    ("limit", "1"),
                ])
            },
            &self.retry,
            "openweathermap-geo",
        )
        .await?;
        let geo_body = geo.text().await?;
        let (lat, lon) = match parse_geocode(&geo_body) {
            Ok(Some(coords)) => coords,
            Ok(None) => return Ok(WeatherReport::NotFound),
            Err(e) => {
                error!(city, error = %e, "Unreadable geocoding payload");
                return Ok(WeatherReport::Error);
            }
        };

        let lat = lat.to_string();
        let lon = lon.to_string();
        let weather = send_with_retry(
            || {
                self.http.get(CURRENT_WEATHER_URL).query(&[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("appid", self.api_key.as_str()),
                    ("units", "metric"),
                    ("lang", "ru"),
                ])
            },
            &self.retry,
            "openweathermap-current",
        )
        .await?;
        let body = weather.text().await?;
        Ok(parse_current_weather(&body).unwrap_or_else(|e| {
            error!(city, error = %e, "Unreadable weather payload");
            WeatherReport::Error
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geocode() {
        let raw = r#"[{"name":"Moscow","lat":55.75,"lon":37.61,"country":"RU"}]"#;
        assert_eq!(parse_geocode(raw).unwrap(), Some((55.75, 37.61)));
        assert_eq!(parse_geocode("[]").unwrap(), None);
        assert!(parse_geocode("{}").is_err());
    }

    #[test]
    fn test_parse_current_weather() {
        let raw = r#"{"main":{"temp":12.34,"humidity":40},"weather":[{"description":"пасмурно"}]}"#;
        let report = parse_current_weather(raw).unwrap();
        assert_eq!(
            report,
            WeatherReport::Current {
                temperature_c: 12.34,
                description: "Пасмурно".to_string()
            }
        );
        assert_eq!(report.summary().unwrap(), "🌡 12.3°C, Пасмурно");
        assert!(WeatherReport::NotFound.summary().is_none());
    }

    #[test]
    fn test_cache_expires_entries() {
        let cache = TtlCache::new(4, Duration::from_millis(0));
        cache.insert("moscow".to_string(), 1);
        assert_eq!(cache.get(&"moscow".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_evicts_oldest_when_full() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b".to_string(), 2);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("c".to_string(), 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.get(&"b".to_string()), Some(2));
        assert_eq!(cache.get(&"c".to_string()), Some(3));
    }

    #[test]
    fn test_cache_overwrite_does_not_evict() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        cache.insert("a".to_string(), 10);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(10));
        assert_eq!(cache.get(&"b".to_string()), Some(2));
    }
}
