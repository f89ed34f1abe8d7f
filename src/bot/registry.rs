//! Single-slot registry for the broadcast destination chat.

use std::sync::Mutex;
use teloxide::types::ChatId;

/// Holds the chat the bot broadcasts to.
///
/// Armed by `/setgroup` (or `/start` in a group); read by the broadcast
/// command and the announcement loop. Last write wins, and the slot is
/// never cleared while the process runs. Not persisted: a restart leaves
/// the bot idle until it is re-armed in the target group.
pub struct DestinationRegistry {
    destination: Mutex<Option<ChatId>>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self { destination: Mutex::new(None) }
    }

    pub fn set(&self, chat_id: ChatId) {
        *self.destination.lock().unwrap() = Some(chat_id);
    }

    pub fn get(&self) -> Option<ChatId> {
        *self.destination.lock().unwrap()
    }
}

impl Default for DestinationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
