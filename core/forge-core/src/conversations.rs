//! Conversation Store: the latest committed conversation snapshot.
//!
//! Each refresh is issued a [`RefreshTicket`] carrying a monotonically
//! increasing sequence number. Refreshes are fire-and-forget and may complete
//! out of order; a response is committed only if its sequence is newer than the
//! last committed one, so a slow old poll can never overwrite a newer snapshot.
//! Snapshots replace the previous list wholesale.

use skillforge_protocol::Conversation;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket {
    seq: u64,
}

impl RefreshTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// A newer response was already committed, or the ticket predates a reset.
    Stale,
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    next_seq: u64,
    committed_seq: Option<u64>,
    /// Tickets below this were issued before the last reset.
    floor: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn unread_total(&self) -> u64 {
        self.conversations
            .iter()
            .map(|c| u64::from(c.unread_count))
            .sum()
    }

    pub fn committed_seq(&self) -> Option<u64> {
        self.committed_seq
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        let ticket = RefreshTicket { seq: self.next_seq };
        self.next_seq += 1;
        ticket
    }

    pub fn commit(&mut self, ticket: RefreshTicket, conversations: Vec<Conversation>) -> CommitOutcome {
        let stale = ticket.seq < self.floor
            || self
                .committed_seq
                .is_some_and(|committed| ticket.seq <= committed);
        if stale {
            debug!(
                seq = ticket.seq,
                committed = ?self.committed_seq,
                floor = self.floor,
                "Discarding stale conversation refresh"
            );
            return CommitOutcome::Stale;
        }

        self.committed_seq = Some(ticket.seq);
        self.conversations = conversations;
        CommitOutcome::Committed
    }

    /// Drops the snapshot and invalidates every ticket issued so far.
    pub fn reset(&mut self) {
        self.conversations.clear();
        self.committed_seq = None;
        self.floor = self.next_seq;
    }
}
