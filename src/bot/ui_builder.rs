//! UI Builder module for creating keyboards and formatting messages

use chrono::{DateTime, Utc};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use teloxide::utils::html;

use crate::callback_codec::SortOrder;
use crate::db::SearchHistoryEntry;
use crate::dialogue::{Prompt, Rejection};
use crate::flight_client::FlightOffer;
use crate::localization::{t_args_lang, t_lang};
use crate::weather::WeatherReport;

/// Callback data of the "yes, clear history" button
pub const CONFIRM_CLEAR: &str = "confirm_clear";
/// Callback data of the "keep history" button
pub const CANCEL_CLEAR: &str = "cancel_clear";

/// How many offers a result message shows
pub const TOP_OFFERS: usize = 3;

/// Persistent reply keyboard with the four menu entries
pub fn main_menu_keyboard(language_code: Option<&str>) -> KeyboardMarkup {
    let label = |key: &str| KeyboardButton::new(t_lang(key, language_code));
    KeyboardMarkup::new(vec![
        vec![label("menu-search"), label("menu-weather")],
        vec![label("menu-history"), label("menu-clear")],
    ])
    .resize_keyboard()
}

/// Inline keyboard with the two sort buttons
pub fn sort_keyboard(ascending_token: String, descending_token: String, language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(t_lang("sort-cheaper", language_code), ascending_token),
        InlineKeyboardButton::callback(t_lang("sort-pricier", language_code), descending_token),
    ]])
}

/// Yes/no keyboard shown before clearing history
pub fn clear_confirm_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(t_lang("clear-yes", language_code), CONFIRM_CLEAR),
        InlineKeyboardButton::callback(t_lang("clear-no", language_code), CANCEL_CLEAR),
    ]])
}

/// Question for a dialogue step
pub fn prompt_text(prompt: Prompt, language_code: Option<&str>) -> String {
    let key = match prompt {
        Prompt::Origin => "ask-origin",
        Prompt::Destination => "ask-destination",
        Prompt::DepartDate => "ask-depart-date",
        Prompt::ReturnDate => "ask-return-date",
        Prompt::WeatherCity => "weather-ask",
    };
    t_lang(key, language_code)
}

/// Explanation for a refused input
pub fn rejection_text(reason: &Rejection, language_code: Option<&str>) -> String {
    match reason {
        Rejection::EmptyCity => t_lang("empty-city", language_code),
        Rejection::InvalidDate => t_lang("invalid-date", language_code),
        Rejection::ReturnBeforeDepart { depart_date } => {
            t_args_lang("return-before-depart", &[("depart", depart_date)], language_code)
        }
        Rejection::InvalidWeatherCity => t_lang("weather-invalid-city", language_code),
    }
}

/// Second message after a refusal; city rejections already ask again
pub fn reprompt_follow_up(prompt: Prompt, language_code: Option<&str>) -> Option<String> {
    match prompt {
        Prompt::DepartDate => Some(t_lang("repeat-depart-date", language_code)),
        Prompt::ReturnDate => Some(t_lang("repeat-return-date", language_code)),
        Prompt::Origin | Prompt::Destination | Prompt::WeatherCity => None,
    }
}

fn date_part(timestamp: &str) -> &str {
    timestamp.get(..10).unwrap_or(timestamp)
}

/// Price with a currency sign, without fractional noise
pub fn format_price(price: f64, currency: &str) -> String {
    let sign = match currency.to_lowercase().as_str() {
        "rub" => "₽".to_string(),
        "usd" => "$".to_string(),
        "eur" => "€".to_string(),
        other => other.to_uppercase(),
    };
    if price.fract() == 0.0 {
        format!("{price:.0} {sign}")
    } else {
        format!("{price:.2} {sign}")
    }
}

/// One offer as an HTML message; `heading` and `route` must already be escaped
pub fn format_offer(
    position: usize,
    offer: &FlightOffer,
    heading: &str,
    route: &str,
    currency: &str,
    language_code: Option<&str>,
) -> String {
    let return_date = offer.return_at.as_deref().map(date_part).unwrap_or("—");
    format!(
        "{position}. ✈️ <b>{heading}</b>\n   🛫 {route}\n   📅 {}: {}\n   📅 {}: {}\n   💸 <b>{}</b>\n   🛩 {}: {} · {}: {}\n   🔗 <a href='{}'>{}</a>",
        t_lang("offer-depart", language_code),
        html::escape(date_part(&offer.departure_at)),
        t_lang("offer-return", language_code),
        html::escape(return_date),
        format_price(offer.price, currency),
        t_lang("offer-airline", language_code),
        html::escape(&offer.airline),
        t_lang("offer-transfers", language_code),
        offer.transfers,
        html::escape(&offer.purchase_url()),
        t_lang("offer-buy", language_code),
    )
}

/// Heading for offers in a given order; `None` is the initial search
pub fn offers_heading(order: Option<SortOrder>, language_code: Option<&str>) -> String {
    match order {
        None => t_lang("offer-roundtrip", language_code),
        Some(SortOrder::Ascending) => t_lang("offer-sorted-cheaper", language_code),
        Some(SortOrder::Descending) => t_lang("offer-sorted-pricier", language_code),
    }
}

/// Up to [`TOP_OFFERS`] offer messages
pub fn format_top_offers(
    offers: &[FlightOffer],
    order: Option<SortOrder>,
    origin: &str,
    destination: &str,
    currency: &str,
    language_code: Option<&str>,
) -> Vec<String> {
    let heading = html::escape(&offers_heading(order, language_code));
    let route = html::escape(&format!("{origin} → {destination}"));
    offers
        .iter()
        .take(TOP_OFFERS)
        .enumerate()
        .map(|(i, offer)| format_offer(i + 1, offer, &heading, &route, currency, language_code))
        .collect()
}

/// Full weather answer for the weather menu
pub fn weather_report_text(city: &str, report: &WeatherReport, language_code: Option<&str>) -> String {
    match report {
        WeatherReport::Current { .. } => {
            let summary = report.summary().unwrap_or_default();
            t_args_lang("weather-result", &[("city", city), ("summary", &summary)], language_code)
        }
        WeatherReport::NotFound => t_args_lang("weather-not-found", &[("city", city)], language_code),
        WeatherReport::Unavailable => t_args_lang("weather-unavailable", &[("city", city)], language_code),
        WeatherReport::Error => t_args_lang("weather-error", &[("city", city)], language_code),
    }
}

/// Short weather line shown next to search results
pub fn weather_line(key: &str, city: &str, report: &WeatherReport, language_code: Option<&str>) -> String {
    let summary = report
        .summary()
        .unwrap_or_else(|| t_lang("weather-short-unavailable", language_code));
    t_args_lang(key, &[("city", city), ("summary", &summary)], language_code)
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%d.%m %H:%M").to_string()
}

/// Recent searches, newest first
pub fn format_history(entries: &[SearchHistoryEntry], language_code: Option<&str>) -> String {
    if entries.is_empty() {
        return t_lang("history-empty", language_code);
    }

    let mut result = format!("{}\n\n", t_lang("history-title", language_code));
    for entry in entries {
        result.push_str(&format!(
            "🛫 {} → {}\n📅 {}\n⏰ {}\n\n",
            entry.departure,
            entry.destination,
            entry.date_range,
            format_timestamp(&entry.timestamp)
        ));
    }
    result.trim_end().to_string()
}
