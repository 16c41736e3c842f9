//! Change Detector: finds newly arrived messages by diffing consecutive
//! conversation snapshots.
//!
//! Rules, in order:
//! 1. An empty previous or current snapshot is a baseline: nothing fires.
//! 2. Conversations are joined across snapshots by `id`; list order only
//!    decides which trigger wins.
//! 3. The first conversation (in current order) with a previous match, a
//!    strictly higher unread count and a populated `last_message` fires.
//!    Later increases in the same pass are dropped.
//! 4. The current snapshot always becomes the new baseline.
//!
//! A count increase without a message payload never fires; the payload may
//! lag the count during optimistic updates.

use std::collections::HashMap;

use skillforge_protocol::Conversation;

use crate::notification::NotificationMessage;

/// Compares two snapshots and returns the message to surface, if any.
pub fn detect_new_message(
    previous: &[Conversation],
    current: &[Conversation],
) -> Option<NotificationMessage> {
    if previous.is_empty() || current.is_empty() {
        return None;
    }

    let mut previous_by_id: HashMap<&str, &Conversation> = HashMap::with_capacity(previous.len());
    for conversation in previous {
        previous_by_id
            .entry(conversation.id.as_str())
            .or_insert(conversation);
    }

    current.iter().find_map(|conversation| {
        let matched = previous_by_id.get(conversation.id.as_str())?;
        if conversation.unread_count <= matched.unread_count {
            return None;
        }
        let last_message = conversation.last_message.as_ref()?;
        Some(NotificationMessage::from_conversation(conversation, last_message))
    })
}

/// Holds the committed baseline between detection passes.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    previous: Vec<Conversation>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one detection pass and commits `current` as the new baseline.
    pub fn observe(&mut self, current: &[Conversation]) -> Option<NotificationMessage> {
        let detected = detect_new_message(&self.previous, current);
        self.previous = current.to_vec();
        detected
    }

    pub fn baseline(&self) -> &[Conversation] {
        &self.previous
    }

    /// Forgets the baseline so the next snapshot is treated as a first observation.
    pub fn reset(&mut self) {
        self.previous.clear();
    }
}
