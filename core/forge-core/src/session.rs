//! Session Store: authentication status, loading flag and user identity.
//!
//! ## Lifecycle
//!
//! ```text
//! new()            loading=true, unauthenticated
//!   │ begin_restore()
//!   ├── no token ──────────────────────────► loading=false, anonymous
//!   └── token ──► Validate(ticket) ... finish_restore(ticket, result)
//!                    ├── Ok(user) ───────► loading=false, authenticated
//!                    ├── Unauthorized ───► loading=false, anonymous, token removed
//!                    └── other failure ──► loading=false, anonymous, token kept
//! ```
//!
//! The store is the only writer of [`Session`]. Each load attempt mutates the
//! session exactly once, when it resolves. Calling `begin_restore` while an
//! attempt is in flight is a no-op, so callers may trigger it opportunistically.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use skillforge_protocol::UserRef;
use tracing::{debug, info, warn};

use crate::error::{Result, ServiceError};
use crate::kv::{KeyValueSlot, TOKEN_KEY};
use crate::services::IdentityService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub is_authenticated: bool,
    pub loading: bool,
    pub user: Option<UserRef>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Session {
    /// State at process start: restore not yet attempted.
    pub fn initial() -> Self {
        Self {
            is_authenticated: false,
            loading: true,
            user: None,
            resolved_at: None,
        }
    }

    fn anonymous() -> Self {
        Self {
            is_authenticated: false,
            loading: false,
            user: None,
            resolved_at: Some(Utc::now()),
        }
    }

    fn authenticated(user: UserRef) -> Self {
        Self {
            is_authenticated: true,
            loading: false,
            user: Some(user),
            resolved_at: Some(Utc::now()),
        }
    }

    pub fn phase(&self) -> AuthPhase {
        if self.loading {
            AuthPhase::Loading
        } else if self.is_authenticated {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Anonymous
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::initial()
    }
}

/// The three authentication states every consumer must distinguish.
/// `Loading` is never treated as `Anonymous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthPhase {
    Loading,
    Authenticated,
    Anonymous,
}

/// Identifies one load attempt; results for superseded attempts are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreTicket {
    generation: u64,
    token: String,
}

impl RestoreTicket {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreStep {
    /// A token exists; validate it with the identity service.
    Validate(RestoreTicket),
    /// No token; the session resolved to anonymous synchronously.
    Resolved,
    /// An attempt is already in flight.
    Pending,
}

pub struct SessionStore {
    session: Session,
    kv: Arc<dyn KeyValueSlot>,
    generation: u64,
    pending: bool,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueSlot>) -> Self {
        Self {
            session: Session::initial(),
            kv,
            generation: 0,
            pending: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated
    }

    /// The stored credential, if any (empty strings count as absent).
    pub fn token(&self) -> Option<String> {
        self.kv
            .get(TOKEN_KEY)
            .filter(|token| !token.trim().is_empty())
    }

    /// Starts a load attempt.
    pub fn begin_restore(&mut self) -> RestoreStep {
        if self.pending {
            debug!(generation = self.generation, "Session restore already pending");
            return RestoreStep::Pending;
        }

        match self.token() {
            Some(token) => {
                self.generation += 1;
                self.pending = true;
                debug!(generation = self.generation, "Session restore started");
                RestoreStep::Validate(RestoreTicket {
                    generation: self.generation,
                    token,
                })
            }
            None => {
                self.session = Session::anonymous();
                debug!("No stored token, session resolved anonymous");
                RestoreStep::Resolved
            }
        }
    }

    /// Resolves a load attempt. Returns false when the ticket was superseded.
    pub fn finish_restore(
        &mut self,
        ticket: &RestoreTicket,
        result: std::result::Result<UserRef, ServiceError>,
    ) -> bool {
        if ticket.generation != self.generation || !self.pending {
            debug!(
                generation = ticket.generation,
                current = self.generation,
                "Ignoring superseded session restore"
            );
            return false;
        }
        self.pending = false;

        match result {
            Ok(user) => {
                info!(user_id = %user.id, username = %user.username, "Session restored");
                self.session = Session::authenticated(user);
            }
            Err(err) if err.is_unauthorized() => {
                info!(error = %err, "Stored token rejected, clearing it");
                if let Err(remove_err) = self.kv.remove(TOKEN_KEY) {
                    warn!(error = %remove_err, "Failed to clear rejected token");
                }
                self.session = Session::anonymous();
            }
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "Session restore failed");
                self.session = Session::anonymous();
            }
        }
        true
    }

    /// Runs a complete load attempt on the calling thread: `begin_restore`,
    /// the identity call and `finish_restore` in one step.
    ///
    /// Synchronous convenience for callers that own a bare store. The
    /// controller splits the same two steps around an effect so the identity
    /// call can run off its thread.
    pub fn load_user(&mut self, identity: &dyn IdentityService) -> &Session {
        if let RestoreStep::Validate(ticket) = self.begin_restore() {
            let result = identity.restore(ticket.token());
            self.finish_restore(&ticket, result);
        }
        &self.session
    }

    /// Stores a freshly issued token and starts validating it. Any attempt in
    /// flight is superseded.
    pub fn sign_in(&mut self, token: &str) -> Result<RestoreStep> {
        self.kv.set(TOKEN_KEY, token.trim())?;
        self.generation += 1;
        self.pending = false;
        Ok(self.begin_restore())
    }

    /// Clears the token and resolves the session to anonymous.
    pub fn logout(&mut self) {
        if let Err(err) = self.kv.remove(TOKEN_KEY) {
            warn!(error = %err, "Failed to remove token on logout");
        }
        self.generation += 1;
        self.pending = false;
        self.session = Session::anonymous();
        info!("Logged out");
    }
}
