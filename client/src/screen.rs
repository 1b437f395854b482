//! Screen controllers.
//!
//! A [`ScreenController`] is what a mounted screen holds while it is on
//! display. It builds the screen's feed from the backend and the favorites
//! cache, and sends the user to login when the session goes away, at most
//! once per invalidation. Dropping the controller unmounts the screen; work
//! already in flight is left to finish.

use crate::favorites::{EventCard, FavoritesCache};
use crate::session::{SessionEvent, Subscription};
use crate::transport::HttpTransport;
use boxoffice_core::catalog::{self, LAST_TICKETS_THRESHOLD};
use boxoffice_core::environment::Clock;
use boxoffice_core::error::Result;
use boxoffice_core::types::{Category, CategoryId, Event, EventId};
use boxoffice_core::validation::CartQuantity;
use boxoffice_core::SyncError;
use futures::future::{try_join, try_join_all};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Number of popular events shown on the home screen.
pub const POPULAR_LIMIT: usize = 9;

/// Category highlighted on the home screen.
pub const CULTURAL_CATEGORY: &str = "cultura";

/// Routing hook supplied by the UI layer.
pub trait Navigator: Send + Sync + 'static {
    /// Replace the current screen with the login screen.
    fn redirect_to_login(&self);
}

/// Home screen content
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HomeFeed {
    /// Most popular events matching the search query
    pub popular: Vec<EventCard>,
    /// Events in the cultural category
    pub cultural: Vec<EventCard>,
    /// Events close to selling out
    pub last_tickets: Vec<EventCard>,
    /// Events that have not happened yet, soonest first
    pub upcoming: Vec<EventCard>,
}

/// Categories screen content
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoriesFeed {
    /// Every category, for the selector
    pub categories: Vec<Category>,
    /// Events in any selected category (all events if none is selected)
    pub events: Vec<EventCard>,
}

struct RedirectGuard {
    screen: String,
    armed: AtomicBool,
    navigator: Arc<dyn Navigator>,
}

impl RedirectGuard {
    fn fire(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            info!(screen = %self.screen, "redirecting to login");
            self.navigator.redirect_to_login();
        }
    }

    fn rearm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

/// Per-screen consumer of the sync layer.
pub struct ScreenController<T> {
    cache: FavoritesCache<T>,
    clock: Arc<dyn Clock>,
    guard: Arc<RedirectGuard>,
    _subscription: Subscription,
}

impl<T> std::fmt::Debug for ScreenController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenController")
            .field("screen", &self.guard.screen)
            .field("armed", &self.guard.armed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T: HttpTransport> ScreenController<T> {
    /// Mount screen `name`, subscribing to session changes.
    #[must_use]
    pub fn mount(
        name: impl Into<String>,
        cache: FavoritesCache<T>,
        clock: Arc<dyn Clock>,
        navigator: impl Navigator,
    ) -> Self {
        let guard = Arc::new(RedirectGuard {
            screen: name.into(),
            armed: AtomicBool::new(true),
            navigator: Arc::new(navigator),
        });

        let listener = Arc::clone(&guard);
        let subscription = cache.api().session().subscribe(move |event| match event {
            SessionEvent::Invalidated { .. } => listener.fire(),
            SessionEvent::Established => listener.rearm(),
        });

        debug!(screen = %guard.screen, "screen mounted");
        Self {
            cache,
            clock,
            guard,
            _subscription: subscription,
        }
    }

    /// Screen name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.guard.screen
    }

    /// Favorites cache shared with the other screens
    #[must_use]
    pub const fn favorites(&self) -> &FavoritesCache<T> {
        &self.cache
    }

    /// Route an error from any call made on behalf of this screen.
    ///
    /// `Unauthorized` sends the user to login, unless this screen already
    /// redirected for the current invalidation.
    pub fn report(&self, error: &SyncError) {
        if error.is_unauthorized() {
            self.guard.fire();
        } else {
            debug!(screen = %self.guard.screen, %error, "request failed");
        }
    }

    /// Home screen: popular events matching `query`, cultural events, last
    /// tickets and upcoming events.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the two catalog requests.
    pub async fn home(&self, query: &str) -> Result<HomeFeed> {
        let api = self.cache.api();
        let (popular, by_date) = self
            .observe(try_join(api.events_by_popularity(), api.events_by_date()).await)?;
        self.sync_favorites().await;

        let mut matching = catalog::search(&popular, query);
        matching.truncate(POPULAR_LIMIT);
        let upcoming = catalog::sort_by_date(&catalog::filter_upcoming(&by_date, self.clock.now()));

        Ok(HomeFeed {
            popular: self.cache.annotate(&matching),
            cultural: self
                .cache
                .annotate(&catalog::filter_by_category_name(&popular, CULTURAL_CATEGORY)),
            last_tickets: self
                .cache
                .annotate(&catalog::last_tickets(&popular, LAST_TICKETS_THRESHOLD)),
            upcoming: self.cache.annotate(&upcoming),
        })
    }

    /// Coming-soon screen: events strictly after the clock's current time.
    ///
    /// # Errors
    ///
    /// Returns the catalog request's failure.
    pub async fn coming_soon(&self) -> Result<Vec<EventCard>> {
        let events = self.observe(self.cache.api().events_by_date().await)?;
        self.sync_favorites().await;
        Ok(self
            .cache
            .annotate(&catalog::filter_upcoming(&events, self.clock.now())))
    }

    /// Categories screen: events in any of `selected`.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the two catalog requests.
    pub async fn categories(&self, selected: &[CategoryId]) -> Result<CategoriesFeed> {
        let api = self.cache.api();
        let (categories, events) =
            self.observe(try_join(api.categories(), api.events_by_date()).await)?;
        self.sync_favorites().await;

        Ok(CategoriesFeed {
            categories,
            events: self
                .cache
                .annotate(&catalog::filter_by_categories(&events, selected)),
        })
    }

    /// Favorites screen: details of every favorite event.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when signed out, or the first failed request.
    pub async fn favorites_feed(&self) -> Result<Vec<Event>> {
        let ids = self.observe(self.cache.load().await)?;
        let api = self.cache.api();
        self.observe(try_join_all(ids.into_iter().map(|id| api.event(id))).await)
    }

    /// Flip the favorite flag of `event_id` from this screen.
    ///
    /// # Errors
    ///
    /// See [`FavoritesCache::toggle`].
    pub async fn toggle_favorite(&self, event_id: EventId) -> Result<bool> {
        self.observe(self.cache.toggle(event_id).await)
    }

    /// Event details screen: put `quantity` tickets in the cart.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when signed out, or the request's failure.
    pub async fn add_to_cart(&self, event_id: EventId, quantity: CartQuantity) -> Result<()> {
        self.observe(self.cache.api().add_to_cart(event_id, quantity).await)
    }

    async fn sync_favorites(&self) {
        if !self.cache.api().session().is_authenticated() {
            return;
        }
        if let Err(error) = self.cache.load().await {
            warn!(screen = %self.guard.screen, %error, "favorites refresh failed");
            self.report(&error);
        }
    }

    fn observe<R>(&self, result: Result<R>) -> Result<R> {
        if let Err(error) = &result {
            self.report(error);
        }
        result
    }
}

impl<T> Drop for ScreenController<T> {
    fn drop(&mut self) {
        debug!(screen = %self.guard.screen, "screen unmounted");
    }
}
