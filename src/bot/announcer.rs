//! Recurring schedule announcements to the registered group.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::bot::BotState;
use crate::bot::broadcast::{self, BroadcastMessage};
use crate::bot::retry::with_retry;
use crate::bot::schedule;

const SEND_ATTEMPTS: u32 = 3;
const SEND_RETRY_DELAY: Duration = Duration::from_secs(5);

/// What a single announcement pass did, mostly for tests and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    NoDestination,
    PrivateDestination,
    NothingToday,
    StoreFailed,
    Sent,
    GaveUp,
}

/// Start the announcement loop. The first pass runs immediately, then
/// the timer fires at a fixed rate. Passes never overlap; a pass still
/// retrying when the next tick is due delays that tick.
pub fn spawn(bot: Bot, state: Arc<BotState>) {
    let period = Duration::from_secs(state.config.announce_interval_hours * 3600);
    tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            announce_tick(&bot, &state, Utc::now()).await;
        }
    });
}

pub async fn announce_tick(bot: &Bot, state: &BotState, now: DateTime<Utc>) -> TickOutcome {
    let Some(destination) = state.destination.get() else {
        debug!("No announcement group registered yet; skipping tick");
        return TickOutcome::NoDestination;
    };

    // Positive chat ids are users; announcements only go to groups.
    if destination.0 > 0 {
        info!("Registered destination {} is a private chat; skipping announcement", destination.0);
        return TickOutcome::PrivateDestination;
    }

    let day = schedule::today_name(now, state.config.timezone);
    let entries = match state.schedules.get(day) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to load schedule for {}: {}", day, e);
            return TickOutcome::StoreFailed;
        }
    };

    if entries.is_empty() {
        info!("No schedule stored for {}; nothing to announce", day);
        return TickOutcome::NothingToday;
    }

    let announcement = BroadcastMessage {
        body: schedule::format_schedule_message(&entries),
        buttons: Vec::new(),
        media: None,
    };
    let result = with_retry(SEND_ATTEMPTS, SEND_RETRY_DELAY, || {
        let bot = bot.clone();
        let announcement = announcement.clone();
        async move { broadcast::dispatch(&bot, destination, &announcement).await }
    })
    .await;

    match result {
        Ok(_) => {
            info!("Announced {} schedule to chat {}", day, destination.0);
            TickOutcome::Sent
        }
        Err(e) => {
            error!("Giving up announcing {} schedule: {}", day, e);
            TickOutcome::GaveUp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::test_state;

    fn noon() -> DateTime<Utc> {
        "2025-06-02T05:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn test_tick_without_destination_sends_nothing() {
        let state = test_state();
        let bot = Bot::new("123:abc");
        assert_eq!(announce_tick(&bot, &state, noon()).await, TickOutcome::NoDestination);
    }

    #[tokio::test]
    async fn test_tick_refuses_private_destination() {
        let state = test_state();
        state.destination.set(ChatId(12345));
        let bot = Bot::new("123:abc");
        assert_eq!(announce_tick(&bot, &state, noon()).await, TickOutcome::PrivateDestination);
    }

    #[tokio::test]
    async fn test_tick_with_empty_schedule_is_quiet() {
        let state = test_state();
        state.destination.set(ChatId(-1001234567890));
        let bot = Bot::new("123:abc");
        assert_eq!(announce_tick(&bot, &state, noon()).await, TickOutcome::NothingToday);
    }
}
