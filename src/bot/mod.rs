//! Bot module - schedule storage, rate limiting, broadcasts, announcements.

pub mod announcer;
pub mod broadcast;
pub mod cleanup;
pub mod commands;
pub mod cooldown;
pub mod registry;
pub mod retry;
pub mod schedule;


pub use commands::Command;

use crate::config::Config;
use cooldown::CooldownTracker;
use registry::DestinationRegistry;
use schedule::ScheduleStore;

/// Everything the handlers share, passed around behind one `Arc`.
pub struct BotState {
    pub config: Config,
    pub schedules: ScheduleStore,
    pub cooldowns: CooldownTracker,
    pub destination: DestinationRegistry,
}

#[cfg(test)]
pub fn test_state() -> BotState {
    use std::path::PathBuf;
    use teloxide::types::UserId;

    BotState {
        config: Config {
            owner_ids: vec![UserId(1)],
            telegram_bot_token: "123:abc".to_string(),
            data_dir: PathBuf::from("."),
            timezone: chrono_tz::Asia::Jakarta,
            command_cooldown_minutes: 50,
            announce_interval_hours: 6,
        },
        schedules: ScheduleStore::in_memory(),
        cooldowns: CooldownTracker::default(),
        destination: DestinationRegistry::new(),
    }
}
