//! # Travel Error Types Module
//!
//! This module defines the error taxonomy shared by the flight search core,
//! the weather lookup and the persistence layer. Every variant is recoverable:
//! callers degrade to an empty result, a sentinel or a re-prompt instead of
//! letting the error escape to the dispatcher.

/// Custom error types for flight search and its collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum TravelError {
    /// Malformed date string at a validation gate
    InvalidDate(String),
    /// Callback token failed to parse
    MalformedToken(String),
    /// External call exceeded its time bound
    UpstreamTimeout(String),
    /// Non-timeout transport failure, non-2xx status or unreadable body
    UpstreamError(String),
    /// Store read or write failure
    PersistenceError(String),
}

impl TravelError {
    /// Whether this error is a timeout, which unlocks the cached-response fallback
    pub fn is_timeout(&self) -> bool {
        matches!(self, TravelError::UpstreamTimeout(_))
    }
}

impl std::fmt::Display for TravelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TravelError::InvalidDate(msg) => write!(f, "Invalid date: {msg}"),
            TravelError::MalformedToken(msg) => write!(f, "Malformed callback token: {msg}"),
            TravelError::UpstreamTimeout(msg) => write!(f, "Upstream timeout: {msg}"),
            TravelError::UpstreamError(msg) => write!(f, "Upstream error: {msg}"),
            TravelError::PersistenceError(msg) => write!(f, "Persistence error: {msg}"),
        }
    }
}

impl std::error::Error for TravelError {}

impl From<sqlx::Error> for TravelError {
    fn from(err: sqlx::Error) -> Self {
        TravelError::PersistenceError(err.to_string())
    }
}

impl From<reqwest::Error> for TravelError {
    fn from(err: reqwest::Error) -> Self {
        // request URLs carry API tokens as query parameters
        let err = err.without_url();
        if err.is_timeout() {
            TravelError::UpstreamTimeout(err.to_string())
        } else {
            TravelError::UpstreamError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TravelError {
    fn from(err: serde_json::Error) -> Self {
        TravelError::UpstreamError(format!("unreadable payload: {err}"))
    }
}
