//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Handles commands, menu buttons and dialogue answers
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `ui_builder`: Creates keyboards and formats messages
//! - `dialogue_manager`: Carries out dialogue transitions (prompts, searches, weather)

pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

use sqlx::SqlitePool;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

use crate::dialogue::FlightDialogueState;
use crate::flight_client::FlightPriceClient;
use crate::weather::WeatherClient;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

/// Long-lived collaborators shared by every handler
pub struct AppServices {
    pub pool: SqlitePool,
    pub flights: FlightPriceClient,
    pub weather: WeatherClient,
    /// Currency the price source was asked for, used when rendering prices
    pub currency: String,
}

/// Dispatcher tree: messages go through the dialogue, callbacks straight to their handler
pub fn build_handler() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<FlightDialogueState>, FlightDialogueState>()
                .endpoint(message_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
}
