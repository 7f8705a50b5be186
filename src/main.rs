use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use skyfare::bot::{build_handler, AppServices};
use skyfare::config::AppConfig;
use skyfare::db::{self, ResponseStore};
use skyfare::dialogue::FlightDialogueState;
use skyfare::flight_client::FlightPriceClient;
use skyfare::localization::init_localization;
use skyfare::travelpayouts::TravelpayoutsSource;
use skyfare::weather::WeatherClient;

const MAX_DB_CONNECTIONS: u32 = 5;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();

    info!("Starting Skyfare Telegram Bot");

    init_localization()?;

    let config = AppConfig::from_env()?;

    info!(database_url = %config.database_url, "Initializing database");

    let pool = db::connect(&config.database_url, MAX_DB_CONNECTIONS).await?;
    db::init_database_schema(&pool).await?;

    let source = TravelpayoutsSource::from_config(&config).context("Failed to build flight price source")?;
    let flights = FlightPriceClient::new(Arc::new(source), ResponseStore::new(pool.clone()));
    let weather = WeatherClient::from_config(&config).context("Failed to build weather client")?;

    let services = Arc::new(AppServices {
        pool,
        flights,
        weather,
        currency: config.currency.clone(),
    });

    let bot = Bot::new(config.bot_token.clone());

    info!("Bot initialized, starting dispatcher");

    Dispatcher::builder(bot, build_handler())
        .dependencies(dptree::deps![InMemStorage::<FlightDialogueState>::new(), services])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
