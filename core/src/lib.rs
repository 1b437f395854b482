//! # Boxoffice Core
//!
//! Domain types and pure logic for the Boxoffice ticketing client.
//!
//! This crate holds everything that can be reasoned about without I/O:
//!
//! - **Types**: events, categories, sessions and profiles as the backend sends them
//! - **Errors**: the taxonomy every public boundary of the sync layer returns
//! - **Catalog**: stateless views over a fetched event list
//! - **Favorites**: the per-event toggle state machine behind the favorites cache
//! - **Validation**: form input checks that never reach the network
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell: the `favorites` module decides, the
//!   client crate performs the I/O and feeds results back
//! - Dependency Injection via Environment (`Clock`)
//! - No hidden reliance on session or cache state in the catalog views
//!
//! ## Example
//!
//! ```
//! use boxoffice_core::catalog;
//! use boxoffice_core::types::Event;
//!
//! let events: Vec<Event> = Vec::new();
//! assert!(catalog::search(&events, "madrid").is_empty());
//! ```

pub mod catalog;
pub mod error;
pub mod favorites;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{AuthError, NetworkError, Result, SyncError, ValidationError};
pub use favorites::{FavoritesState, Membership, PendingToggle, ToggleStart};
pub use types::{AuthToken, Category, CategoryId, Event, EventId, Profile, Session};

/// Environment module - Dependency injection traits
///
/// External dependencies that screens and views need are abstracted behind
/// traits so tests can substitute deterministic implementations.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use boxoffice_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
