mod bot;
mod config;

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::prelude::*;

use bot::cooldown::CooldownTracker;
use bot::registry::DestinationRegistry;
use bot::schedule::ScheduleStore;
use bot::{BotState, Command, announcer, commands};
use config::Config;

#[tokio::main]
async fn main() {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "jadwalbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {config_path}: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("jadwalbot.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting jadwalbot...");
    info!("Loaded config from {config_path}");
    info!("Owner IDs: {:?}", config.owner_ids);
    info!(
        "Timezone: {}, command cooldown: {}m, announcements every {}h",
        config.timezone, config.command_cooldown_minutes, config.announce_interval_hours
    );

    let db_path = config.data_dir.join("jadwal.db");
    let schedules = match ScheduleStore::open(&db_path) {
        Ok(store) => store,
        Err(e) => {
            panic!("Failed to open schedule database: {}", e);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    let state = Arc::new(BotState {
        config,
        schedules,
        cooldowns: CooldownTracker::new(),
        destination: DestinationRegistry::new(),
    });

    announcer::spawn(bot.clone(), state.clone());

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(commands::handle_command),
        )
        .branch(Update::filter_message().endpoint(commands::ignore_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
