//! Notification Presenter: a single-slot transient alert.
//!
//! The slot holds at most one message. Activating while open replaces the
//! content in place; nothing is queued. Closing keeps the last message so a
//! closing animation never renders empty content.
//!
//! ```text
//!            activate/replace            dismiss | click | expire
//!   Closed ─────────────────────► Open ─────────────────────────► Closed
//!                                  │ ▲                           (message kept)
//!                                  └─┘ activate/replace (content swapped)
//! ```

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use skillforge_protocol::{Conversation, LastMessage, UserRef, MEDIA_FALLBACK_LABEL};
use tracing::debug;

use crate::routes::messages_route;

/// A newly detected message, enriched with its sender and conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub sender: UserRef,
    pub conversation_id: String,
}

impl NotificationMessage {
    pub fn from_conversation(conversation: &Conversation, last_message: &LastMessage) -> Self {
        Self {
            content: last_message.text().map(str::to_string),
            media_url: last_message.media_url.clone(),
            sent_at: last_message.created_at,
            sender: conversation.user.clone(),
            conversation_id: conversation.id.clone(),
        }
    }

    pub fn display_content(&self) -> &str {
        self.content
            .as_deref()
            .filter(|content| !content.trim().is_empty())
            .unwrap_or(MEDIA_FALLBACK_LABEL)
    }

    /// Deep link into the conversation, when the id is known.
    pub fn link(&self) -> Option<String> {
        let id = self.conversation_id.trim();
        (!id.is_empty()).then(|| messages_route(id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationState {
    pub open: bool,
    pub message: Option<NotificationMessage>,
}

/// What a shell needs to draw the alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationView {
    pub open: bool,
    pub title: String,
    pub body: String,
    pub avatar_url: Option<String>,
    pub avatar_initial: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug)]
pub struct NotificationSlot {
    state: NotificationState,
    auto_hide: Duration,
    expires_at: Option<Instant>,
}

impl NotificationSlot {
    pub fn new(auto_hide: Duration) -> Self {
        Self {
            state: NotificationState::default(),
            auto_hide,
            expires_at: None,
        }
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.open
    }

    /// Opens the slot with `message`, restarting the auto-hide timer.
    pub fn activate(&mut self, message: NotificationMessage, now: Instant) {
        if let Some(displaced) = self.replace(message, now) {
            debug!(
                conversation_id = %displaced.conversation_id,
                "Open notification replaced"
            );
        }
    }

    /// Puts `message` in the slot and returns the message it displaced from an
    /// open slot. A closed slot displaces nothing.
    pub fn replace(&mut self, message: NotificationMessage, now: Instant) -> Option<NotificationMessage> {
        let was_open = self.state.open;
        let previous = self.state.message.replace(message);
        self.state.open = true;
        self.expires_at = Some(now + self.auto_hide);
        if was_open {
            previous
        } else {
            None
        }
    }

    /// Closes the slot. Returns false if it was already closed.
    pub fn dismiss(&mut self) -> bool {
        self.expires_at = None;
        if !self.state.open {
            return false;
        }
        self.state.open = false;
        true
    }

    /// Closes an open slot and returns where to navigate. Clicking a closed
    /// slot does nothing.
    pub fn click(&mut self) -> Option<String> {
        if !self.state.open {
            return None;
        }
        let target = self.state.message.as_ref().and_then(NotificationMessage::link);
        self.dismiss();
        target
    }

    /// Auto-dismisses when the display duration has elapsed.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) if self.state.open && now >= deadline => self.dismiss(),
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        if self.state.open {
            self.expires_at
        } else {
            None
        }
    }

    pub fn view(&self) -> Option<NotificationView> {
        let message = self.state.message.as_ref()?;
        Some(NotificationView {
            open: self.state.open,
            title: message.sender.username.clone(),
            body: message.display_content().to_string(),
            avatar_url: message.sender.avatar.clone(),
            avatar_initial: message.sender.initial(),
            link: message.link(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::user;

    const AUTO_HIDE: Duration = Duration::from_millis(6000);

    fn message(conversation_id: &str, content: Option<&str>) -> NotificationMessage {
        NotificationMessage {
            content: content.map(str::to_string),
            media_url: None,
            sent_at: None,
            sender: user("u2", "mira"),
            conversation_id: conversation_id.to_string(),
        }
    }

    #[test]
    fn activate_opens_slot() {
        let mut slot = NotificationSlot::new(AUTO_HIDE);
        slot.activate(message("c1", Some("hi")), Instant::now());

        assert!(slot.is_open());
        assert_eq!(slot.view().unwrap().body, "hi");
    }

    #[test]
    fn dismiss_keeps_message_and_is_idempotent() {
        let mut slot = NotificationSlot::new(AUTO_HIDE);
        slot.activate(message("c1", Some("hi")), Instant::now());

        assert!(slot.dismiss());
        assert!(!slot.state().open);
        assert!(!slot.dismiss());
        assert!(!slot.state().open);
        assert_eq!(slot.state().message.as_ref().unwrap().conversation_id, "c1");
    }

    #[test]
    fn replace_swaps_content_without_stacking() {
        let now = Instant::now();
        let mut slot = NotificationSlot::new(AUTO_HIDE);
        slot.activate(message("c1", Some("first")), now);

        let displaced = slot.replace(message("c2", Some("second")), now);

        assert_eq!(displaced.unwrap().conversation_id, "c1");
        assert!(slot.is_open());
        assert_eq!(slot.state().message.as_ref().unwrap().conversation_id, "c2");
    }

    #[test]
    fn replace_on_closed_slot_displaces_nothing() {
        let now = Instant::now();
        let mut slot = NotificationSlot::new(AUTO_HIDE);
        slot.activate(message("c1", Some("first")), now);
        slot.dismiss();

        assert!(slot.replace(message("c2", None), now).is_none());
    }

    #[test]
    fn click_navigates_to_conversation_and_closes() {
        let mut slot = NotificationSlot::new(AUTO_HIDE);
        slot.activate(message("c42", Some("hi")), Instant::now());

        assert_eq!(slot.click().as_deref(), Some("/messages/c42"));
        assert!(!slot.is_open());
        assert_eq!(slot.click(), None);
    }

    #[test]
    fn click_without_conversation_id_only_closes() {
        let mut slot = NotificationSlot::new(AUTO_HIDE);
        slot.activate(message("", Some("hi")), Instant::now());

        assert_eq!(slot.click(), None);
        assert!(!slot.is_open());
    }

    #[test]
    fn auto_dismiss_after_duration() {
        let start = Instant::now();
        let mut slot = NotificationSlot::new(AUTO_HIDE);
        slot.activate(message("c1", Some("hi")), start);

        assert_eq!(slot.deadline(), Some(start + AUTO_HIDE));
        assert!(!slot.expire(start + Duration::from_millis(5999)));
        assert!(slot.expire(start + AUTO_HIDE));
        assert!(!slot.expire(start + AUTO_HIDE * 2));
        assert_eq!(slot.deadline(), None);
    }

    #[test]
    fn replacing_restarts_auto_hide_timer() {
        let start = Instant::now();
        let mut slot = NotificationSlot::new(AUTO_HIDE);
        slot.activate(message("c1", Some("hi")), start);
        slot.activate(message("c2", Some("again")), start + Duration::from_secs(5));

        assert!(!slot.expire(start + Duration::from_secs(7)));
        assert!(slot.expire(start + Duration::from_secs(11)));
    }

    #[test]
    fn view_uses_media_fallback_and_initial() {
        let mut slot = NotificationSlot::new(AUTO_HIDE);
        slot.activate(message("c1", None), Instant::now());

        let view = slot.view().unwrap();
        assert_eq!(view.title, "mira");
        assert_eq!(view.body, MEDIA_FALLBACK_LABEL);
        assert_eq!(view.avatar_initial.as_deref(), Some("M"));
        assert_eq!(view.link.as_deref(), Some("/messages/c1"));
    }
}
