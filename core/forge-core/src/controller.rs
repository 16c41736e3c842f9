//! Session controller: the single writer for all client-side state.
//!
//! Inputs are method calls carrying an explicit `now`; outputs are [`Effect`]s
//! the driver must perform (service calls, navigations). The controller never
//! blocks and never spawns, so every ordering is reproducible in tests.
//!
//! ```text
//! start ──► RestoreSession ──► session_restored ──► RefreshConversations
//!                                                       │
//!            tick (interval) ──► RefreshConversations ◄─┘
//!                                       │
//!                       conversations_refreshed ──► notification opened
//! ```
//!
//! When the auth phase changes while a guarded route is showing, a
//! `Navigate` to the current location is emitted so the guard re-runs.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use skillforge_protocol::{Conversation, UserRef};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::conversations::{CommitOutcome, ConversationStore, RefreshTicket};
use crate::detector::ChangeDetector;
use crate::error::{Result, ServiceError};
use crate::gate::show_floating_chat;
use crate::guard::{self, GuardOutcome};
use crate::kv::KeyValueSlot;
use crate::notification::{NotificationMessage, NotificationSlot, NotificationView};
use crate::route_memory::RouteMemory;
use crate::routes::{normalize_path, RouteAccess, RouteTable, View};
use crate::scheduler::{PollScheduler, PollTransition};
use crate::session::{AuthPhase, RestoreStep, RestoreTicket, Session, SessionStore};

/// Guard redirects are followed at most this many times per navigation.
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Validate the stored token with the identity service.
    RestoreSession { ticket: RestoreTicket },
    /// Fetch the conversation list; report back with the same ticket.
    RefreshConversations { ticket: RefreshTicket, token: String },
    /// Run `navigate` for this path.
    Navigate { path: String },
}

/// Result of one navigation, after following guard redirects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub requested: String,
    /// Where the user ended up.
    pub path: String,
    pub view: Option<View>,
    pub outcome: GuardOutcome,
    pub redirects: Vec<String>,
    /// Whether Route Memory stored `path`.
    pub recorded: bool,
}

/// Point-in-time summary for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientStatus {
    pub phase: AuthPhase,
    pub user: Option<UserRef>,
    pub location: Option<String>,
    pub polling: bool,
    pub conversations: usize,
    pub unread_total: u64,
    pub notification: Option<NotificationView>,
    pub show_floating_chat: bool,
    pub last_route: Option<String>,
}

pub struct SessionController {
    config: ClientConfig,
    session: SessionStore,
    conversations: ConversationStore,
    detector: ChangeDetector,
    notification: NotificationSlot,
    scheduler: PollScheduler,
    route_memory: RouteMemory,
    routes: RouteTable,
    location: Option<String>,
    shut_down: bool,
}

impl SessionController {
    pub fn new(config: ClientConfig, kv: Arc<dyn KeyValueSlot>) -> Self {
        Self {
            session: SessionStore::new(Arc::clone(&kv)),
            conversations: ConversationStore::new(),
            detector: ChangeDetector::new(),
            notification: NotificationSlot::new(config.notification_auto_hide()),
            scheduler: PollScheduler::new(config.poll_interval()),
            route_memory: RouteMemory::new(kv),
            routes: RouteTable::default(),
            location: None,
            shut_down: false,
            config,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        self.session.session()
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.conversations.conversations()
    }

    pub fn notification(&self) -> &NotificationSlot {
        &self.notification
    }

    pub fn route_memory(&self) -> &RouteMemory {
        &self.route_memory
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn show_floating_chat(&self) -> bool {
        show_floating_chat(
            self.session.is_authenticated(),
            self.location.as_deref().unwrap_or_default(),
        )
    }

    pub fn status(&self) -> ClientStatus {
        let session = self.session.session();
        ClientStatus {
            phase: session.phase(),
            user: session.user.clone(),
            location: self.location.clone(),
            polling: self.scheduler.is_active(),
            conversations: self.conversations.conversations().len(),
            unread_total: self.conversations.unread_total(),
            notification: self.notification.view().filter(|view| view.open),
            show_floating_chat: self.show_floating_chat(),
            last_route: self.route_memory.get(),
        }
    }

    /// Earliest instant at which `tick` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scheduler.next_deadline(), self.notification.deadline()) {
            (Some(poll), Some(hide)) => Some(poll.min(hide)),
            (poll, hide) => poll.or(hide),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Attempts to restore the session from the stored token.
    pub fn start(&mut self, now: Instant) -> Vec<Effect> {
        if self.shut_down {
            return Vec::new();
        }
        let step = self.session.begin_restore();
        self.apply_restore_step(step, now)
    }

    pub fn session_restored(
        &mut self,
        ticket: &RestoreTicket,
        result: std::result::Result<UserRef, ServiceError>,
        now: Instant,
    ) -> Vec<Effect> {
        if self.shut_down {
            debug!("Ignoring session restore after shutdown");
            return Vec::new();
        }
        if !self.session.finish_restore(ticket, result) {
            return Vec::new();
        }
        self.after_session_change(now)
    }

    /// Stores an externally issued token and validates it. Polling state from
    /// any previous identity is dropped first.
    pub fn sign_in(&mut self, token: &str, now: Instant) -> Result<Vec<Effect>> {
        if self.shut_down {
            return Ok(Vec::new());
        }
        self.reset_polling();
        let step = self.session.sign_in(token)?;
        Ok(self.apply_restore_step(step, now))
    }

    pub fn logout(&mut self, now: Instant) -> Vec<Effect> {
        self.session.logout();
        self.reset_polling();
        if self.shut_down {
            return Vec::new();
        }
        self.after_session_change(now)
    }

    /// Tears everything down. In-flight responses are ignored afterwards.
    /// Returns false when already shut down.
    pub fn shutdown(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        self.shut_down = true;
        self.reset_polling();
        info!("Session controller shut down");
        true
    }

    fn apply_restore_step(&mut self, step: RestoreStep, now: Instant) -> Vec<Effect> {
        match step {
            RestoreStep::Validate(ticket) => vec![Effect::RestoreSession { ticket }],
            RestoreStep::Resolved => self.after_session_change(now),
            RestoreStep::Pending => Vec::new(),
        }
    }

    fn after_session_change(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        match self.scheduler.sync(self.session.is_authenticated(), now) {
            PollTransition::Activated => effects.extend(self.refresh_effect()),
            PollTransition::Deactivated => self.reset_polling(),
            PollTransition::Unchanged => {}
        }

        if let Some(location) = self.location.clone() {
            let guarded = self
                .routes
                .resolve(&location)
                .is_some_and(|matched| matched.access != RouteAccess::Public);
            if guarded {
                effects.push(Effect::Navigate { path: location });
            }
        }
        effects
    }

    fn reset_polling(&mut self) {
        self.scheduler.cancel();
        self.conversations.reset();
        self.detector.reset();
        self.notification.dismiss();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Polling
    // ─────────────────────────────────────────────────────────────────────────

    /// Advances timers: auto-hides an expired notification and issues a
    /// refresh when the poll interval has elapsed.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        if self.shut_down {
            return Vec::new();
        }
        if self.notification.expire(now) {
            debug!("Notification auto-dismissed");
        }
        if self.scheduler.poll_due(now) {
            return self.refresh_effect().into_iter().collect();
        }
        Vec::new()
    }

    fn refresh_effect(&mut self) -> Option<Effect> {
        let Some(token) = self.session.token() else {
            warn!("Polling active without a stored token; skipping refresh");
            return None;
        };
        let ticket = self.conversations.begin_refresh();
        debug!(seq = ticket.seq(), "Conversation refresh issued");
        Some(Effect::RefreshConversations { ticket, token })
    }

    /// Applies a refresh result. Returns the message surfaced, if any.
    pub fn conversations_refreshed(
        &mut self,
        ticket: RefreshTicket,
        result: std::result::Result<Vec<Conversation>, ServiceError>,
        now: Instant,
    ) -> Option<NotificationMessage> {
        if self.shut_down || !self.scheduler.is_active() {
            debug!(seq = ticket.seq(), "Ignoring refresh result while not polling");
            return None;
        }

        let conversations = match result {
            Ok(conversations) => conversations,
            Err(err) => {
                warn!(
                    error = %err,
                    kind = err.kind(),
                    seq = ticket.seq(),
                    "Conversation refresh failed; keeping previous snapshot"
                );
                return None;
            }
        };

        if self.conversations.commit(ticket, conversations) == CommitOutcome::Stale {
            return None;
        }

        let detected = self.detector.observe(self.conversations.conversations())?;
        info!(
            conversation_id = %detected.conversation_id,
            sender = %detected.sender.username,
            "New message detected"
        );
        self.notification.activate(detected.clone(), now);
        Some(detected)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notification
    // ─────────────────────────────────────────────────────────────────────────

    /// Closes the open notification and returns the deep link to follow.
    pub fn click_notification(&mut self) -> Option<Effect> {
        self.notification
            .click()
            .map(|path| Effect::Navigate { path })
    }

    pub fn dismiss_notification(&mut self) -> bool {
        self.notification.dismiss()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────

    /// Moves to `path`, following guard redirects. Rendered locations are
    /// written to Route Memory.
    pub fn navigate(&mut self, path: &str) -> Navigation {
        let requested = normalize_path(path);
        let phase = self.session.session().phase();
        let mut current = requested.clone();
        let mut redirects = Vec::new();

        loop {
            let matched = self.routes.resolve(&current);
            let outcome = match &matched {
                Some(matched) => guard::evaluate(
                    matched.access,
                    phase,
                    &self.route_memory,
                    &self.config.default_landing_route,
                ),
                None => GuardOutcome::Render,
            };

            match outcome {
                GuardOutcome::Redirect(target) if redirects.len() < MAX_REDIRECTS => {
                    let target = normalize_path(&target);
                    debug!(from = %current, to = %target, "Guard redirect");
                    redirects.push(target.clone());
                    current = target;
                }
                outcome => {
                    if let GuardOutcome::Redirect(target) = &outcome {
                        warn!(path = %current, target = %target, "Too many redirects; stopping");
                    }
                    let recorded = outcome == GuardOutcome::Render
                        && self.route_memory.record_navigation(&current);
                    self.location = Some(current.clone());
                    return Navigation {
                        requested,
                        path: current,
                        view: matched.map(|matched| matched.view),
                        outcome,
                        redirects,
                        recorded,
                    };
                }
            }
        }
    }
}
