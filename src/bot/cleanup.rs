//! Delayed removal of command chatter to keep the group tidy.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::MessageId;
use teloxide::{ApiError, RequestError};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::bot::retry::with_retry;

/// How long a handled command stays visible before removal.
pub const COMMAND_DELETE_DELAY: Duration = Duration::from_secs(1);
/// Registration confirmations linger a little longer.
pub const CONFIRMATION_DELETE_DELAY: Duration = Duration::from_secs(5);
/// Rules replies stay up long enough to be read.
pub const RULES_REPLY_DELETE_DELAY: Duration = Duration::from_secs(5 * 60);

const DELETE_ATTEMPTS: u32 = 3;
const DELETE_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Someone else removed it first. Not a failure.
    AlreadyGone,
}

/// Delete one message, treating "already deleted" as success so the
/// retry wrapper never spins on it.
pub async fn delete_message(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
) -> Result<DeleteOutcome, RequestError> {
    match bot.delete_message(chat_id, message_id).await {
        Ok(_) => Ok(DeleteOutcome::Deleted),
        Err(RequestError::Api(ApiError::MessageToDeleteNotFound)) => {
            debug!("Message {} in chat {} was already gone", message_id.0, chat_id.0);
            Ok(DeleteOutcome::AlreadyGone)
        }
        Err(e) => Err(e),
    }
}

pub async fn delete_with_retry(bot: &Bot, chat_id: ChatId, message_id: MessageId) {
    let result = with_retry(DELETE_ATTEMPTS, DELETE_RETRY_DELAY, || {
        let bot = bot.clone();
        async move { delete_message(&bot, chat_id, message_id).await }
    })
    .await;

    if let Err(e) = result {
        warn!("Giving up on deleting message {} in chat {}: {}", message_id.0, chat_id.0, e);
    }
}

/// Remove a message after a delay without blocking the handler.
pub fn schedule_delete(bot: Bot, chat_id: ChatId, message_id: MessageId, delay: Duration) {
    tokio::spawn(async move {
        sleep(delay).await;
        delete_with_retry(&bot, chat_id, message_id).await;
    });
}
