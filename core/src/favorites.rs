//! Favorites state machine.
//!
//! Pure bookkeeping for the favorites cache: which events are favorited,
//! which toggles are in flight, and how server snapshots merge with local
//! optimism. No I/O happens here; the client crate's `FavoritesCache` runs
//! the network calls and feeds their outcome back.
//!
//! # Per-event state machine
//!
//! ```text
//! Idle(favorited) --toggle--> Pending(intended) --ack--> Idle(intended)
//!                             Pending(intended) --error--> Idle(previous)
//!                             Pending --toggle--> Pending   (coalesced)
//! ```
//!
//! # Merging a full load
//!
//! A logical clock advances on every local transition. A load remembers the
//! clock value at which it was issued; when its response arrives, ids that
//! are pending, or that were resolved locally after the load was issued,
//! keep their local value. Everything else takes the server's value.

use crate::types::EventId;
use std::collections::{HashMap, HashSet};

/// Intended membership of an in-flight toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Membership {
    /// The event is being added to favorites
    Added,
    /// The event is being removed from favorites
    Removed,
}

impl Membership {
    /// Membership for a boolean "is favorite"
    #[must_use]
    pub const fn from_favorited(favorited: bool) -> Self {
        if favorited { Self::Added } else { Self::Removed }
    }

    /// Returns `true` for [`Membership::Added`]
    #[must_use]
    pub const fn is_added(self) -> bool {
        matches!(self, Self::Added)
    }
}

/// Identifier of one toggle attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttemptId(u64);

/// An optimistic mutation awaiting server acknowledgment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingToggle {
    /// Event being toggled
    pub event_id: EventId,
    /// Membership applied optimistically
    pub intended: Membership,
    /// Membership before the toggle, restored on failure
    pub previous: bool,
    /// Attempt this record belongs to
    pub attempt_id: AttemptId,
}

/// Result of asking to toggle an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToggleStart {
    /// A toggle for this event is already in flight; nothing was changed.
    Coalesced {
        /// Membership the in-flight toggle is heading to
        intended: bool,
    },
    /// Optimistic value applied; the caller must issue the request and
    /// report back with [`FavoritesState::finish_toggle`].
    Started(PendingToggle),
}

/// How the server answered a toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleResolution {
    /// The server accepted the change
    Acknowledged,
    /// The request failed; roll back
    Failed,
}

/// Handle for a full refresh, taken before the request is issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    issued_at: u64,
}

/// Whether a load response was merged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Merged into the set
    Applied,
    /// Dropped: the session changed, or a newer load was already applied
    Discarded,
}

/// Favorites of the current session plus in-flight bookkeeping.
#[derive(Debug, Default)]
pub struct FavoritesState {
    members: HashSet<EventId>,
    pending: HashMap<EventId, PendingToggle>,
    /// Server values seen by a load while the id was pending.
    observed: HashMap<EventId, bool>,
    /// Logical time at which an id was last resolved locally.
    resolved_at: HashMap<EventId, u64>,
    clock: u64,
    next_attempt: u64,
    generation: u64,
    last_load: Option<u64>,
}

impl FavoritesState {
    /// Create an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `event_id` is currently shown as favorite.
    #[must_use]
    pub fn is_favorite(&self, event_id: EventId) -> bool {
        self.members.contains(&event_id)
    }

    /// Returns `true` if a toggle for `event_id` is in flight.
    #[must_use]
    pub fn is_pending(&self, event_id: EventId) -> bool {
        self.pending.contains_key(&event_id)
    }

    /// Intended membership of the in-flight toggle for `event_id`, if any.
    #[must_use]
    pub fn pending_intent(&self, event_id: EventId) -> Option<bool> {
        self.pending
            .get(&event_id)
            .map(|toggle| toggle.intended.is_added())
    }

    /// Number of toggles in flight
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Favorited ids in ascending order
    #[must_use]
    pub fn members(&self) -> Vec<EventId> {
        let mut ids: Vec<EventId> = self.members.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of favorited ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if nothing is favorited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Session scope counter; bumped by [`FavoritesState::clear`].
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Begin a toggle for `event_id`.
    ///
    /// If one is already pending, nothing changes and the pending intent is
    /// returned. Otherwise the negated membership is applied immediately and
    /// a [`PendingToggle`] recorded.
    pub fn begin_toggle(&mut self, event_id: EventId) -> ToggleStart {
        if let Some(existing) = self.pending.get(&event_id) {
            return ToggleStart::Coalesced {
                intended: existing.intended.is_added(),
            };
        }

        let previous = self.members.contains(&event_id);
        let intended = Membership::from_favorited(!previous);
        self.set_member(event_id, !previous);
        self.clock += 1;
        self.next_attempt += 1;

        let toggle = PendingToggle {
            event_id,
            intended,
            previous,
            attempt_id: AttemptId(self.next_attempt),
        };
        self.pending.insert(event_id, toggle.clone());
        self.observed.remove(&event_id);

        tracing::debug!(event_id = %event_id, ?intended, "favorite toggle pending");
        ToggleStart::Started(toggle)
    }

    /// Settle a toggle started by [`FavoritesState::begin_toggle`].
    ///
    /// On acknowledgment the optimistic value stays. On failure the prior
    /// value is restored, unless a load observed the server's value while
    /// the toggle was pending, in which case that value is used.
    ///
    /// Returns the final membership, or `None` if the attempt is no longer
    /// tracked (the session was cleared while it was in flight).
    pub fn finish_toggle(
        &mut self,
        toggle: &PendingToggle,
        resolution: ToggleResolution,
    ) -> Option<bool> {
        match self.pending.get(&toggle.event_id) {
            Some(current) if current.attempt_id == toggle.attempt_id => {}
            _ => return None,
        }
        self.pending.remove(&toggle.event_id);
        let observed = self.observed.remove(&toggle.event_id);

        let value = match resolution {
            ToggleResolution::Acknowledged => toggle.intended.is_added(),
            ToggleResolution::Failed => observed.unwrap_or(toggle.previous),
        };
        self.set_member(toggle.event_id, value);
        self.clock += 1;
        self.resolved_at.insert(toggle.event_id, self.clock);

        tracing::debug!(
            event_id = %toggle.event_id,
            ?resolution,
            favorited = value,
            "favorite toggle settled"
        );
        Some(value)
    }

    /// Take a ticket before issuing a full refresh.
    #[must_use]
    pub const fn begin_load(&self) -> LoadTicket {
        LoadTicket {
            generation: self.generation,
            issued_at: self.clock,
        }
    }

    /// Merge a full server snapshot, replacing the set wholesale except for
    /// ids that local activity makes authoritative.
    pub fn apply_load(
        &mut self,
        ticket: LoadTicket,
        server_ids: impl IntoIterator<Item = EventId>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation {
            return LoadOutcome::Discarded;
        }
        if self.last_load.is_some_and(|last| ticket.issued_at < last) {
            return LoadOutcome::Discarded;
        }

        let server: HashSet<EventId> = server_ids.into_iter().collect();

        for event_id in self.pending.keys() {
            self.observed.insert(*event_id, server.contains(event_id));
        }

        let protected: HashSet<EventId> = self
            .pending
            .keys()
            .copied()
            .chain(
                self.resolved_at
                    .iter()
                    .filter(|(_, at)| **at > ticket.issued_at)
                    .map(|(id, _)| *id),
            )
            .collect();

        let mut next: HashSet<EventId> = server
            .into_iter()
            .filter(|id| !protected.contains(id))
            .collect();
        next.extend(self.members.iter().filter(|id| protected.contains(id)).copied());
        self.members = next;

        self.resolved_at.retain(|_, at| *at > ticket.issued_at);
        self.last_load = Some(ticket.issued_at);

        tracing::debug!(
            favorites = self.members.len(),
            protected = protected.len(),
            "favorites snapshot merged"
        );
        LoadOutcome::Applied
    }

    /// Drop everything and start a new session scope.
    ///
    /// In-flight toggles and loads from the previous scope are ignored when
    /// they complete.
    pub fn clear(&mut self) {
        self.members.clear();
        self.pending.clear();
        self.observed.clear();
        self.resolved_at.clear();
        self.last_load = None;
        self.generation += 1;
    }

    fn set_member(&mut self, event_id: EventId, favorited: bool) {
        if favorited {
            self.members.insert(event_id);
        } else {
            self.members.remove(&event_id);
        }
    }
}
