//! Thread-backed driver for [`SessionController`].
//!
//! One loop thread owns the controller. Everything that touches state arrives
//! as a [`RuntimeEvent`] on a single channel, so there is exactly one writer.
//! Service calls run on short-lived worker threads that post their results
//! back as events; the controller's tickets decide whether a late result
//! still applies.
//!
//! The loop sleeps with `recv_timeout` until the controller's next deadline
//! (poll interval or notification auto-hide), then ticks.
//!
//! Subscribers receive [`ClientUpdate`]s on a second channel. Updates are
//! derived by comparing observable state before and after each step, so a
//! subscriber sees each transition once.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use serde::Serialize;
use skillforge_protocol::{Conversation, UserRef};
use tracing::{debug, info, warn};

use crate::controller::{ClientStatus, Effect, Navigation, SessionController};
use crate::conversations::RefreshTicket;
use crate::error::ServiceError;
use crate::notification::NotificationView;
use crate::services::{ConversationService, IdentityService};
use crate::session::{RestoreTicket, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCommand {
    Open(String),
    ClickNotification,
    DismissNotification,
    SignIn(String),
    Logout,
    Status,
}

#[derive(Debug)]
pub enum RuntimeEvent {
    Command(RuntimeCommand),
    SessionRestored {
        ticket: RestoreTicket,
        result: Result<UserRef, ServiceError>,
    },
    ConversationsFetched {
        ticket: RefreshTicket,
        result: Result<Vec<Conversation>, ServiceError>,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientUpdate {
    Session(Session),
    NotificationOpened(NotificationView),
    NotificationClosed,
    Navigated(Navigation),
    Status(ClientStatus),
    CommandFailed(String),
    Stopped,
}

/// Remote collaborators used by worker threads.
#[derive(Clone)]
pub struct Services {
    pub identity: Arc<dyn IdentityService>,
    pub conversations: Arc<dyn ConversationService>,
}

/// Owner-side handle. Dropping it stops the loop.
pub struct RuntimeHandle {
    events: Sender<RuntimeEvent>,
    thread: Option<JoinHandle<SessionController>>,
}

impl RuntimeHandle {
    /// Queues a command. Returns false when the loop has already stopped.
    pub fn send(&self, command: RuntimeCommand) -> bool {
        self.events.send(RuntimeEvent::Command(command)).is_ok()
    }

    pub fn shutdown(&self) {
        let _ = self.events.send(RuntimeEvent::Shutdown);
    }

    /// A sender other threads can use to issue commands.
    pub fn commander(&self) -> RuntimeCommander {
        RuntimeCommander {
            events: self.events.clone(),
        }
    }

    /// Waits for the loop to exit and returns the controller for inspection.
    pub fn join(mut self) -> Option<SessionController> {
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(controller) => Some(controller),
            Err(_) => {
                warn!("Runtime loop panicked");
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct RuntimeCommander {
    events: Sender<RuntimeEvent>,
}

impl RuntimeCommander {
    pub fn send(&self, command: RuntimeCommand) -> bool {
        self.events.send(RuntimeEvent::Command(command)).is_ok()
    }

    pub fn shutdown(&self) {
        let _ = self.events.send(RuntimeEvent::Shutdown);
    }
}

impl Drop for RuntimeHandle {
    fn drop(&mut self) {
        let _ = self.events.send(RuntimeEvent::Shutdown);
    }
}

/// Starts the loop thread. The controller restores the session immediately.
pub fn spawn(
    controller: SessionController,
    services: Services,
) -> std::io::Result<(RuntimeHandle, Receiver<ClientUpdate>)> {
    let (events_tx, events_rx) = mpsc::channel();
    let (updates_tx, updates_rx) = mpsc::channel();

    let loop_events = events_tx.clone();
    let thread = thread::Builder::new()
        .name("skillforge-runtime".to_string())
        .spawn(move || {
            let runtime = Runtime {
                controller,
                services,
                events: loop_events,
                updates: updates_tx,
                observed: Observed::default(),
            };
            runtime.run(events_rx)
        })?;

    Ok((
        RuntimeHandle {
            events: events_tx,
            thread: Some(thread),
        },
        updates_rx,
    ))
}

#[derive(Default)]
struct Observed {
    session: Option<Session>,
    notification: Option<NotificationView>,
}

struct Runtime {
    controller: SessionController,
    services: Services,
    events: Sender<RuntimeEvent>,
    updates: Sender<ClientUpdate>,
    observed: Observed,
}

impl Runtime {
    fn run(mut self, events: Receiver<RuntimeEvent>) -> SessionController {
        info!("Runtime started");
        let effects = self.controller.start(Instant::now());
        self.perform(effects);
        self.publish_changes();

        loop {
            let received = match self.controller.next_deadline() {
                Some(deadline) => {
                    events.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => events.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(RuntimeEvent::Shutdown) => break,
                Ok(event) => self.handle(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let effects = self.controller.tick(Instant::now());
            self.perform(effects);
            self.publish_changes();
        }

        self.controller.shutdown();
        self.publish_changes();
        self.publish(ClientUpdate::Stopped);
        info!("Runtime stopped");
        self.controller
    }

    fn handle(&mut self, event: RuntimeEvent) {
        let now = Instant::now();
        match event {
            RuntimeEvent::Command(command) => self.handle_command(command, now),
            RuntimeEvent::SessionRestored { ticket, result } => {
                let effects = self.controller.session_restored(&ticket, result, now);
                self.perform(effects);
            }
            RuntimeEvent::ConversationsFetched { ticket, result } => {
                self.controller.conversations_refreshed(ticket, result, now);
            }
            RuntimeEvent::Shutdown => {}
        }
    }

    fn handle_command(&mut self, command: RuntimeCommand, now: Instant) {
        debug!(?command, "Runtime command");
        match command {
            RuntimeCommand::Open(path) => self.navigate(&path),
            RuntimeCommand::ClickNotification => {
                if let Some(effect) = self.controller.click_notification() {
                    self.perform(vec![effect]);
                }
            }
            RuntimeCommand::DismissNotification => {
                self.controller.dismiss_notification();
            }
            RuntimeCommand::SignIn(token) => match self.controller.sign_in(&token, now) {
                Ok(effects) => self.perform(effects),
                Err(err) => {
                    warn!(error = %err, "Sign-in failed");
                    self.publish(ClientUpdate::CommandFailed(err.to_string()));
                }
            },
            RuntimeCommand::Logout => {
                let effects = self.controller.logout(now);
                self.perform(effects);
            }
            RuntimeCommand::Status => {
                let status = self.controller.status();
                self.publish(ClientUpdate::Status(status));
            }
        }
    }

    fn navigate(&mut self, path: &str) {
        let navigation = self.controller.navigate(path);
        self.publish(ClientUpdate::Navigated(navigation));
    }

    fn perform(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            if self.controller.is_shut_down() {
                debug!("Dropping effect after shutdown");
                return;
            }
            match effect {
                Effect::Navigate { path } => self.navigate(&path),
                Effect::RestoreSession { ticket } => self.spawn_restore(ticket),
                Effect::RefreshConversations { ticket, token } => self.spawn_refresh(ticket, token),
            }
        }
    }

    fn spawn_restore(&self, ticket: RestoreTicket) {
        let identity = Arc::clone(&self.services.identity);
        let events = self.events.clone();
        let spawned = thread::Builder::new()
            .name("skillforge-restore".to_string())
            .spawn({
                let ticket = ticket.clone();
                move || {
                    let result = identity.restore(ticket.token());
                    let _ = events.send(RuntimeEvent::SessionRestored { ticket, result });
                }
            });
        if let Err(err) = spawned {
            warn!(error = %err, "Failed to spawn session restore worker");
            let _ = self.events.send(RuntimeEvent::SessionRestored {
                ticket,
                result: Err(ServiceError::Transport(err.to_string())),
            });
        }
    }

    fn spawn_refresh(&self, ticket: RefreshTicket, token: String) {
        let conversations = Arc::clone(&self.services.conversations);
        let events = self.events.clone();
        let spawned = thread::Builder::new()
            .name("skillforge-refresh".to_string())
            .spawn(move || {
                let result = conversations.list(&token);
                let _ = events.send(RuntimeEvent::ConversationsFetched { ticket, result });
            });
        if let Err(err) = spawned {
            warn!(error = %err, seq = ticket.seq(), "Failed to spawn conversation refresh worker");
        }
    }

    fn publish(&self, update: ClientUpdate) {
        if self.updates.send(update).is_err() {
            debug!("No update subscriber");
        }
    }

    fn publish_changes(&mut self) {
        let session = self.controller.session().clone();
        if self.observed.session.as_ref() != Some(&session) {
            self.observed.session = Some(session.clone());
            self.publish(ClientUpdate::Session(session));
        }

        let notification = self
            .controller
            .notification()
            .view()
            .filter(|view| view.open);
        if self.observed.notification != notification {
            match &notification {
                Some(view) => self.publish(ClientUpdate::NotificationOpened(view.clone())),
                None => self.publish(ClientUpdate::NotificationClosed),
            }
            self.observed.notification = notification;
        }
    }
}
