//! Event fixtures
//!
//! Fluent builder for catalog events so tests only spell out the fields
//! they care about.

use boxoffice_core::environment::Clock;
use boxoffice_core::types::{Category, CategoryId, Event, EventId};
use chrono::{DateTime, Utc};

/// Builder for [`Event`] test values.
///
/// # Example
///
/// ```
/// use boxoffice_testing::EventFixture;
///
/// let event = EventFixture::new(42)
///     .titled("Rock Fest")
///     .located("Madrid Centro")
///     .category(1, "Música")
///     .build();
/// assert_eq!(event.categories.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct EventFixture {
    event: Event,
}

impl EventFixture {
    /// Start from a plain event dated 2025-01-01 00:00 UTC
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            event: Event {
                id: EventId::new(id),
                title: format!("Event {id}"),
                description: String::new(),
                date: crate::test_clock().now(),
                location: String::new(),
                image_ref: format!("event-{id}.png"),
                available_tickets: 250,
                sold_tickets: 0,
                price: 20.0,
                organizer_username: None,
                event_url: None,
                categories: Vec::new(),
            },
        }
    }

    /// Set the title
    #[must_use]
    pub fn titled(mut self, title: &str) -> Self {
        title.clone_into(&mut self.event.title);
        self
    }

    /// Set the location
    #[must_use]
    pub fn located(mut self, location: &str) -> Self {
        location.clone_into(&mut self.event.location);
        self
    }

    /// Set the date
    #[must_use]
    pub const fn at(mut self, date: DateTime<Utc>) -> Self {
        self.event.date = date;
        self
    }

    /// Set available tickets
    #[must_use]
    pub const fn available(mut self, tickets: u32) -> Self {
        self.event.available_tickets = tickets;
        self
    }

    /// Set the price
    #[must_use]
    pub const fn priced(mut self, price: f64) -> Self {
        self.event.price = price;
        self
    }

    /// Add a category
    #[must_use]
    pub fn category(mut self, id: i64, name: &str) -> Self {
        self.event.categories.push(Category {
            id: CategoryId::new(id),
            name: name.to_string(),
        });
        self
    }

    /// Finish the event
    #[must_use]
    pub fn build(self) -> Event {
        self.event
    }
}
