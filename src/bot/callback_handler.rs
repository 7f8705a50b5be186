//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, MessageId};
use tracing::{debug, error, info, warn};

use crate::callback_codec::{decode, is_flight_token, DecodedCallback};
use crate::dates::ISO_DATE_FORMAT;
use crate::db::clear_history;
use crate::localization::{t_args_lang, t_lang};

use super::dialogue_manager::send_offers;
use super::ui_builder::{format_top_offers, CANCEL_CLEAR, CONFIRM_CLEAR};
use super::AppServices;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(bot: Bot, q: CallbackQuery, services: Arc<AppServices>) -> Result<()> {
    debug!(user_id = %q.from.id, "Received callback query from user");

    let language_code = q.from.language_code.as_deref();
    let data = q.data.as_deref().unwrap_or("");

    let work = async {
        let Some(msg) = &q.message else {
            return Ok::<(), anyhow::Error>(());
        };
        let chat_id = msg.chat().id;
        let message_id = msg.id();

        if is_flight_token(data) {
            handle_sort(&bot, chat_id, message_id, &services, data, language_code).await?;
        } else if data == CONFIRM_CLEAR {
            let text = match clear_history(&services.pool, chat_id.0).await {
                Ok(count) => t_args_lang("cleared", &[("count", &count.to_string())], language_code),
                Err(e) => {
                    error!(user_id = %chat_id, error = %e, "Failed to clear search history");
                    t_lang("storage-error", language_code)
                }
            };
            edit_or_log(&bot, chat_id, message_id, text).await;
        } else if data == CANCEL_CLEAR {
            edit_or_log(&bot, chat_id, message_id, t_lang("clear-cancelled", language_code)).await;
        } else {
            warn!(user_id = %chat_id, data, "Unknown callback data");
        }
        Ok(())
    };

    // Answer the callback query to remove the loading state
    let answer = async {
        bot.answer_callback_query(q.id.clone()).await?;
        Ok::<(), anyhow::Error>(())
    };

    answer_after(q.from.id, work, answer).await
}

/// Await `work` and log its failure, then await `answer` regardless
async fn answer_after<W, A>(user_id: impl Display, work: W, answer: A) -> Result<()>
where
    W: Future<Output = Result<()>>,
    A: Future<Output = Result<()>>,
{
    if let Err(e) = work.await {
        error!(user_id = %user_id, error = %e, "Failed to handle callback query");
    }
    answer.await
}

async fn edit_or_log(bot: &Bot, chat_id: ChatId, message_id: MessageId, text: String) {
    if let Err(e) = bot.edit_message_text(chat_id, message_id, text).await {
        error!(user_id = %chat_id, error = %e, "Failed to edit message");
    }
}

/// Re-run the search carried by a sort token and render it in the token's order
async fn handle_sort(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    services: &Arc<AppServices>,
    data: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let decoded = match decode(data) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(user_id = %chat_id, error = %e, "Rejected sort token");
            bot.send_message(chat_id, t_lang("callback-failed", language_code))
                .await?;
            return Ok(());
        }
    };

    info!(
        user_id = %chat_id,
        origin = %decoded.origin_code,
        destination = %decoded.destination_code,
        sort = decoded.sort.as_wire(),
        "Re-sorting offers"
    );
    edit_or_log(bot, chat_id, message_id, t_lang("resorting", language_code)).await;

    let (depart, ret) = iso_dates(&decoded);
    let offers = services
        .flights
        .resort(
            &decoded.origin_code,
            &decoded.destination_code,
            &depart,
            ret.as_deref(),
            decoded.sort,
        )
        .await;

    if offers.is_empty() {
        bot.send_message(chat_id, t_lang("no-data", language_code)).await?;
        return Ok(());
    }

    let texts = format_top_offers(
        &offers,
        Some(decoded.sort),
        &decoded.origin_label,
        &decoded.destination_label,
        &services.currency,
        language_code,
    );
    send_offers(bot, chat_id, texts).await
}

fn iso_dates(decoded: &DecodedCallback) -> (String, Option<String>) {
    (
        decoded.depart_date.format(ISO_DATE_FORMAT).to_string(),
        decoded
            .return_date
            .map(|date| date.format(ISO_DATE_FORMAT).to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback_codec::{encode, SortOrder};
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_iso_dates_from_token() {
        let token = encode(SortOrder::Ascending, "MOW", "LED", "2025-06-01", Some("2025-06-08")).unwrap();
        let decoded = decode(&token).unwrap();
        assert_eq!(
            iso_dates(&decoded),
            ("2025-06-01".to_string(), Some("2025-06-08".to_string()))
        );

        let token = encode(SortOrder::Ascending, "MOW", "LED", "2025-06-01", None).unwrap();
        let decoded = decode(&token).unwrap();
        assert_eq!(iso_dates(&decoded), ("2025-06-01".to_string(), None));
    }

    #[tokio::test]
    async fn test_callback_is_answered_when_sort_fails() {
        let answered = AtomicBool::new(false);
        let result = answer_after(
            42,
            async { Err::<(), _>(anyhow!("Telegram rejected the offers message")) },
            async {
                answered.store(true, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(result.is_ok());
        assert!(answered.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_answer_failure_is_reported() {
        let result = answer_after(42, async { Ok(()) }, async {
            Err::<(), _>(anyhow!("query is too old"))
        })
        .await;

        assert!(result.is_err());
    }
}
