//! Dialogue Manager module for carrying out dialogue transitions

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{LinkPreviewOptions, ParseMode};
use tracing::{error, info, warn};

use crate::callback_codec::{encode, SortOrder};
use crate::db::add_search;
use crate::dialogue::{FlightDialogue, SearchQuery, StepOutcome, Transition};
use crate::flight_client::OfferOrigin;
use crate::localization::{t_args_lang, t_lang};

use super::ui_builder::{
    format_top_offers, prompt_text, rejection_text, reprompt_follow_up, sort_keyboard, weather_line,
    weather_report_text,
};
use super::AppServices;

fn no_link_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Store the next state, then do what the outcome asks for
pub async fn apply_transition(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlightDialogue,
    services: &Arc<AppServices>,
    transition: Transition,
    language_code: Option<&str>,
) -> Result<()> {
    dialogue.update(transition.next).await?;

    match transition.outcome {
        StepOutcome::Ask(prompt) => {
            bot.send_message(chat_id, prompt_text(prompt, language_code)).await?;
        }
        StepOutcome::Reprompt { prompt, reason } => {
            info!(user_id = %chat_id, ?prompt, ?reason, "Input rejected, asking again");
            bot.send_message(chat_id, rejection_text(&reason, language_code)).await?;
            if let Some(follow_up) = reprompt_follow_up(prompt, language_code) {
                bot.send_message(chat_id, follow_up).await?;
            }
        }
        StepOutcome::Search(query) => {
            run_search(bot, chat_id, services, &query, language_code).await?;
        }
        StepOutcome::Weather(city) => {
            run_weather(bot, chat_id, services, &city, language_code).await?;
        }
        StepOutcome::Ignored => {
            bot.send_message(chat_id, t_lang("help", language_code)).await?;
        }
    }

    Ok(())
}

/// Run a completed search and render its results
pub async fn run_search(
    bot: &Bot,
    chat_id: ChatId,
    services: &Arc<AppServices>,
    query: &SearchQuery,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(chat_id, t_lang("searching", language_code)).await?;

    let outcome = services
        .flights
        .search_with_origin(
            &query.origin,
            &query.destination,
            &query.depart_date,
            query.return_date.as_deref(),
        )
        .await;

    if outcome.offers.is_empty() {
        info!(user_id = %chat_id, "Search finished without offers");
        bot.send_message(chat_id, t_lang("no-offers", language_code)).await?;
        return Ok(());
    }

    if outcome.origin == OfferOrigin::CachedFallback {
        bot.send_message(chat_id, t_lang("cached-offers", language_code)).await?;
    }

    // History failures are logged, the offers are still shown
    if let Err(e) = add_search(
        &services.pool,
        chat_id.0,
        &query.origin,
        &query.destination,
        &query.depart_date,
        query.return_date.as_deref(),
    )
    .await
    {
        error!(user_id = %chat_id, error = %e, "Failed to record search history");
    }

    let origin_weather = services.weather.current(&query.origin).await;
    let destination_weather = services.weather.current(&query.destination).await;
    bot.send_message(
        chat_id,
        weather_line("weather-at-origin", &query.origin, &origin_weather, language_code),
    )
    .await?;
    bot.send_message(
        chat_id,
        weather_line("weather-at-destination", &query.destination, &destination_weather, language_code),
    )
    .await?;

    send_offers(
        bot,
        chat_id,
        format_top_offers(
            &outcome.offers,
            None,
            &query.origin,
            &query.destination,
            &services.currency,
            language_code,
        ),
    )
    .await?;

    let tokens = encode(
        SortOrder::Ascending,
        &query.origin,
        &query.destination,
        &query.depart_date,
        query.return_date.as_deref(),
    )
    .and_then(|ascending| {
        encode(
            SortOrder::Descending,
            &query.origin,
            &query.destination,
            &query.depart_date,
            query.return_date.as_deref(),
        )
        .map(|descending| (ascending, descending))
    });

    match tokens {
        Ok((ascending, descending)) => {
            bot.send_message(chat_id, t_lang("sort-prompt", language_code))
                .reply_markup(sort_keyboard(ascending, descending, language_code))
                .await?;
        }
        Err(e) => {
            warn!(user_id = %chat_id, error = %e, "Could not build sort buttons");
        }
    }

    Ok(())
}

/// Look up and render the weather for one city
pub async fn run_weather(
    bot: &Bot,
    chat_id: ChatId,
    services: &Arc<AppServices>,
    city: &str,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(
        chat_id,
        t_args_lang("weather-looking", &[("city", city)], language_code),
    )
    .await?;

    let report = services.weather.current(city).await;
    info!(user_id = %chat_id, city, found = report.is_current(), "Weather lookup finished");
    bot.send_message(chat_id, weather_report_text(city, &report, language_code))
        .await?;
    Ok(())
}

/// Send rendered offers as HTML without link previews
pub async fn send_offers(bot: &Bot, chat_id: ChatId, texts: Vec<String>) -> Result<()> {
    for text in texts {
        bot.send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_link_preview())
            .await?;
    }
    Ok(())
}
