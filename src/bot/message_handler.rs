//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error, info};

use crate::db::{get_history, DEFAULT_HISTORY_LIMIT};
use crate::dialogue::{advance, begin_search, begin_weather, FlightDialogue, FlightDialogueState};
use crate::localization::{is_label, t_lang};

use super::dialogue_manager::apply_transition;
use super::ui_builder::{clear_confirm_keyboard, format_history, main_menu_keyboard};
use super::AppServices;

/// What a message asks for before the dialogue gets to see it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Start,
    Help,
    Search,
    Weather,
    History,
    ClearHistory,
}

/// Commands and menu buttons; `None` means the text belongs to the dialogue
pub fn menu_action(text: &str) -> Option<MenuAction> {
    let text = text.trim();
    let command = text.split_whitespace().next().unwrap_or("");
    // `/start@BotName` in groups
    let command = command.split('@').next().unwrap_or("");
    match command {
        "/start" => return Some(MenuAction::Start),
        "/help" => return Some(MenuAction::Help),
        _ => {}
    }

    if is_label("menu-search", text) {
        Some(MenuAction::Search)
    } else if is_label("menu-weather", text) {
        Some(MenuAction::Weather)
    } else if is_label("menu-history", text) {
        Some(MenuAction::History)
    } else if is_label("menu-clear", text) {
        Some(MenuAction::ClearHistory)
    } else {
        None
    }
}

/// Entry point for every message update
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    dialogue: FlightDialogue,
    services: Arc<AppServices>,
) -> Result<()> {
    let chat_id = msg.chat.id;
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.as_ref())
        .map(|s| s.as_str());

    let Some(text) = msg.text() else {
        debug!(user_id = %chat_id, "Ignoring non-text message");
        bot.send_message(chat_id, t_lang("help", language_code)).await?;
        return Ok(());
    };

    match menu_action(text) {
        Some(action) => {
            info!(user_id = %chat_id, ?action, "Menu action");
            handle_menu_action(&bot, chat_id, &dialogue, &services, action, language_code).await
        }
        None => {
            let state = dialogue.get().await?.unwrap_or_default();
            debug!(user_id = %chat_id, dialogue_state = ?state, "Advancing dialogue");
            let transition = advance(state, text);
            apply_transition(&bot, chat_id, &dialogue, &services, transition, language_code).await
        }
    }
}

async fn handle_menu_action(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlightDialogue,
    services: &Arc<AppServices>,
    action: MenuAction,
    language_code: Option<&str>,
) -> Result<()> {
    match action {
        MenuAction::Start => {
            dialogue.update(FlightDialogueState::Idle).await?;
            bot.send_message(chat_id, t_lang("welcome", language_code))
                .reply_markup(main_menu_keyboard(language_code))
                .await?;
        }
        MenuAction::Help => {
            bot.send_message(chat_id, t_lang("help", language_code))
                .reply_markup(main_menu_keyboard(language_code))
                .await?;
        }
        MenuAction::Search => {
            apply_transition(bot, chat_id, dialogue, services, begin_search(), language_code).await?;
        }
        MenuAction::Weather => {
            apply_transition(bot, chat_id, dialogue, services, begin_weather(), language_code).await?;
        }
        MenuAction::History => {
            dialogue.update(FlightDialogueState::Idle).await?;
            match get_history(&services.pool, chat_id.0, DEFAULT_HISTORY_LIMIT).await {
                Ok(entries) => {
                    bot.send_message(chat_id, format_history(&entries, language_code))
                        .await?;
                }
                Err(e) => {
                    error!(user_id = %chat_id, error = %e, "Failed to load search history");
                    bot.send_message(chat_id, t_lang("storage-error", language_code))
                        .await?;
                }
            }
        }
        MenuAction::ClearHistory => {
            dialogue.update(FlightDialogueState::Idle).await?;
            bot.send_message(chat_id, t_lang("clear-confirm", language_code))
                .reply_markup(clear_confirm_keyboard(language_code))
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_are_recognized() {
        assert_eq!(menu_action("/start"), Some(MenuAction::Start));
        assert_eq!(menu_action("/start@skyfare_bot"), Some(MenuAction::Start));
        assert_eq!(menu_action("/help"), Some(MenuAction::Help));
    }

    #[test]
    fn test_menu_labels_in_both_languages() {
        assert_eq!(menu_action(&t_lang("menu-search", Some("ru"))), Some(MenuAction::Search));
        assert_eq!(menu_action(&t_lang("menu-weather", Some("en"))), Some(MenuAction::Weather));
        assert_eq!(menu_action(&t_lang("menu-history", Some("ru"))), Some(MenuAction::History));
        assert_eq!(menu_action(&t_lang("menu-clear", Some("en"))), Some(MenuAction::ClearHistory));
    }

    #[test]
    fn test_dialogue_answers_are_not_menu_actions() {
        assert_eq!(menu_action("Москва"), None);
        assert_eq!(menu_action("2025-06-01"), None);
        assert_eq!(menu_action("/unknown"), None);
    }
}
