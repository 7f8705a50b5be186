//! # Skyfare Telegram Bot
//!
//! A Telegram bot that finds cheap round-trip flights through the
//! Travelpayouts price API, reports current weather from OpenWeatherMap and
//! keeps a per-user search history in SQLite.
//!
//! Sort buttons on search results carry their whole query in a compact
//! callback token (see [`callback_codec`]), so re-sorting needs no
//! server-side session.

pub mod bot;
pub mod callback_codec;
pub mod config;
pub mod dates;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod flight_client;
pub mod http;
pub mod iata;
pub mod localization;
pub mod travelpayouts;
pub mod weather;
