//! # Boxoffice Testing
//!
//! Testing utilities and helpers for the Boxoffice client.
//!
//! This crate provides:
//! - Deterministic implementations of Environment traits
//! - Event fixtures with a fluent builder
//! - Property-based testing strategies for catalog types
//! - Tracing setup for test output
//!
//! ## Example
//!
//! ```
//! use boxoffice_testing::{EventFixture, test_clock};
//! use boxoffice_core::{catalog, environment::Clock};
//! use chrono::Duration;
//!
//! let clock = test_clock();
//! let events = vec![
//!     EventFixture::new(1).at(clock.now() + Duration::days(1)).build(),
//!     EventFixture::new(2).at(clock.now()).build(),
//! ];
//! assert_eq!(catalog::filter_upcoming(&events, clock.now()).len(), 1);
//! ```

use boxoffice_core::environment::Clock;
use chrono::{DateTime, Utc};

pub mod fixtures;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use boxoffice_testing::mocks::FixedClock;
    /// use boxoffice_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }
}

/// Property-based testing strategies using proptest.
pub mod properties {
    use crate::fixtures::EventFixture;
    use boxoffice_core::types::{CategoryId, Event};
    use chrono::{DateTime, Duration, Utc};
    use proptest::prelude::*;

    /// Words used for titles and locations, mixed-case on purpose.
    const WORDS: [&str; 8] = [
        "Madrid", "sevilla", "Rock", "jazz", "OPERA", "Centro", "Gala", "teatro",
    ];

    /// A category id from a small pool so filters actually hit.
    pub fn arb_category_id() -> impl Strategy<Value = CategoryId> {
        (1_i64..6).prop_map(CategoryId::new)
    }

    /// A single event within a week of `origin`.
    pub fn arb_event(origin: DateTime<Utc>) -> impl Strategy<Value = Event> {
        (
            1_i64..10_000,
            prop::sample::select(WORDS.to_vec()),
            prop::sample::select(WORDS.to_vec()),
            -7 * 24_i64..7 * 24,
            0_u32..500,
            prop::collection::vec(arb_category_id(), 0..3),
        )
            .prop_map(move |(id, title, location, hours, available, categories)| {
                categories
                    .into_iter()
                    .fold(EventFixture::new(id), |fixture, category| {
                        fixture.category(category.get(), &format!("cat-{category}"))
                    })
                    .titled(title)
                    .located(location)
                    .at(origin + Duration::hours(hours))
                    .available(available)
                    .build()
            })
    }

    /// A list of events around `origin`.
    pub fn arb_events(origin: DateTime<Utc>) -> impl Strategy<Value = Vec<Event>> {
        prop::collection::vec(arb_event(origin), 0..20)
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxoffice=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use fixtures::EventFixture;
pub use mocks::{FixedClock, test_clock};
