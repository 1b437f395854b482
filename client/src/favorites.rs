//! Favorites cache.
//!
//! Imperative shell around [`FavoritesState`]: it issues the backend calls,
//! feeds their outcome back into the state machine, and clears itself
//! whenever the session changes hands.
//!
//! The state lives behind one `std::sync::Mutex` that is never held across
//! an `.await`. Toggle requests run on a spawned task, so a caller that
//! stops waiting (a screen that unmounts) cannot leave an event stuck in
//! the pending state.

use crate::api::BackendApi;
use crate::session::Subscription;
use crate::transport::HttpTransport;
use boxoffice_core::error::{AuthError, NetworkError, Result, SyncError};
use boxoffice_core::favorites::{
    FavoritesState, LoadOutcome, Membership, PendingToggle, ToggleResolution, ToggleStart,
};
use boxoffice_core::types::{Event, EventId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// An event joined with the current user's favorite flag.
#[derive(Clone, Debug, PartialEq)]
pub struct EventCard {
    /// Event snapshot
    pub event: Event,
    /// Whether the event is in the favorites set right now
    pub is_favorite: bool,
}

/// Per-session favorites set with optimistic toggles.
///
/// Cheap to clone; clones share the same set.
pub struct FavoritesCache<T> {
    api: BackendApi<T>,
    state: Arc<Mutex<FavoritesState>>,
    subscription: Arc<Subscription>,
}

impl<T> Clone for FavoritesCache<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            state: Arc::clone(&self.state),
            subscription: Arc::clone(&self.subscription),
        }
    }
}

impl<T> std::fmt::Debug for FavoritesCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesCache")
            .field("state", &*lock(&self.state))
            .finish_non_exhaustive()
    }
}

impl<T: HttpTransport> FavoritesCache<T> {
    /// Create an empty cache bound to the API's session.
    ///
    /// The set is cleared every time a session is established or invalidated.
    #[must_use]
    pub fn new(api: BackendApi<T>) -> Self {
        let state = Arc::new(Mutex::new(FavoritesState::new()));
        let weak = Arc::downgrade(&state);
        let subscription = api.session().subscribe(move |event| {
            if let Some(state) = weak.upgrade() {
                lock(&state).clear();
                debug!(?event, "favorites cleared for session change");
            }
        });

        Self {
            api,
            state,
            subscription: Arc::new(subscription),
        }
    }

    /// Replace the set with the server's list.
    ///
    /// Events with a toggle in flight, or settled after this load started,
    /// keep their local value. A load overtaken by a newer one, or by a
    /// session change, is dropped. Returns the set after the merge.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` when signed out (no request is
    /// made) or on 401, and `NetworkError` when the transport fails.
    pub async fn load(&self) -> Result<Vec<EventId>> {
        let ticket = lock(&self.state).begin_load();
        let ids = self.api.favorite_ids().await?;

        let mut state = lock(&self.state);
        let outcome = state.apply_load(ticket, ids);
        let label = match outcome {
            LoadOutcome::Applied => "applied",
            LoadOutcome::Discarded => {
                debug!("stale favorites load discarded");
                "discarded"
            }
        };
        metrics::counter!("boxoffice.favorites.loads", "outcome" => label).increment(1);
        Ok(state.members())
    }

    /// Flip the favorite flag of `event_id`.
    ///
    /// The new value shows immediately. If a toggle for the same event is
    /// already in flight, its intended value is returned and no request is
    /// made. On failure the previous value is restored.
    ///
    /// Returns the settled value.
    ///
    /// # Errors
    ///
    /// - `AuthError::Unauthorized` when signed out (nothing changes, no
    ///   request is made) or on 401
    /// - `NetworkError` or `SyncError::Rejected` when the request fails
    pub async fn toggle(&self, event_id: EventId) -> Result<bool> {
        if !self.api.session().is_authenticated() {
            return Err(AuthError::Unauthorized.into());
        }

        let toggle = match lock(&self.state).begin_toggle(event_id) {
            ToggleStart::Coalesced { intended } => {
                debug!(%event_id, intended, "favorite toggle coalesced");
                record_toggle("coalesced");
                return Ok(intended);
            }
            ToggleStart::Started(toggle) => toggle,
        };

        let api = self.api.clone();
        let state = Arc::clone(&self.state);
        let request = toggle.clone();
        let task = tokio::spawn(async move {
            let result = match request.intended {
                Membership::Added => api.add_favorite(request.event_id).await,
                Membership::Removed => api.remove_favorite(request.event_id).await,
            };
            settle(&state, &request, result)
        });

        match task.await {
            Ok(result) => result,
            Err(error) => {
                let error = SyncError::Network(NetworkError::Transport(error.to_string()));
                settle(&self.state, &toggle, Err(error))
            }
        }
    }

    /// Returns `true` if `event_id` is shown as favorite.
    #[must_use]
    pub fn is_favorite(&self, event_id: EventId) -> bool {
        lock(&self.state).is_favorite(event_id)
    }

    /// Returns `true` if a toggle for `event_id` is in flight.
    #[must_use]
    pub fn is_pending(&self, event_id: EventId) -> bool {
        lock(&self.state).is_pending(event_id)
    }

    /// Favorited ids in ascending order
    #[must_use]
    pub fn snapshot(&self) -> Vec<EventId> {
        lock(&self.state).members()
    }

    /// Join `events` with the current favorites set.
    #[must_use]
    pub fn annotate(&self, events: &[Event]) -> Vec<EventCard> {
        let state = lock(&self.state);
        events
            .iter()
            .map(|event| EventCard {
                is_favorite: state.is_favorite(event.id),
                event: event.clone(),
            })
            .collect()
    }

    /// API the cache talks through
    #[must_use]
    pub const fn api(&self) -> &BackendApi<T> {
        &self.api
    }
}

fn settle(state: &Mutex<FavoritesState>, toggle: &PendingToggle, result: Result<()>) -> Result<bool> {
    let intended = toggle.intended.is_added();
    match result {
        Ok(()) => {
            let value = lock(state).finish_toggle(toggle, ToggleResolution::Acknowledged);
            record_toggle("acknowledged");
            Ok(value.unwrap_or(intended))
        }
        Err(error) => {
            let restored = lock(state).finish_toggle(toggle, ToggleResolution::Failed);
            warn!(event_id = %toggle.event_id, %error, ?restored, "favorite toggle rolled back");
            record_toggle("rolled_back");
            Err(error)
        }
    }
}

fn record_toggle(outcome: &'static str) {
    metrics::counter!("boxoffice.favorites.toggles", "outcome" => outcome).increment(1);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
