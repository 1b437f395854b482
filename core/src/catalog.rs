//! Derived views over a fetched event list.
//!
//! Every function here is a pure transform: same input, same output, no
//! access to the session or the favorites cache. Screens compose them on
//! top of whatever list they fetched.

use crate::types::{CategoryId, Event};
use chrono::{DateTime, Utc};

/// Availability below which an event shows up under "last tickets".
pub const LAST_TICKETS_THRESHOLD: u32 = 100;

/// Keep events belonging to any of `category_ids`.
///
/// An empty selection means "no filter" and returns the input unchanged.
#[must_use]
pub fn filter_by_categories(events: &[Event], category_ids: &[CategoryId]) -> Vec<Event> {
    if category_ids.is_empty() {
        return events.to_vec();
    }
    events
        .iter()
        .filter(|event| {
            event
                .categories
                .iter()
                .any(|category| category_ids.contains(&category.id))
        })
        .cloned()
        .collect()
}

/// Keep events strictly after `now`.
///
/// An event starting exactly at `now` is excluded.
#[must_use]
pub fn filter_upcoming(events: &[Event], now: DateTime<Utc>) -> Vec<Event> {
    events.iter().filter(|event| event.date > now).cloned().collect()
}

/// Case-insensitive substring match against title or location.
///
/// An empty query returns the input unchanged.
#[must_use]
pub fn search(events: &[Event], query: &str) -> Vec<Event> {
    if query.is_empty() {
        return events.to_vec();
    }
    let needle = query.to_lowercase();
    events
        .iter()
        .filter(|event| {
            event.title.to_lowercase().contains(&needle)
                || event.location.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Keep events with a category named `name`, ignoring case.
#[must_use]
pub fn filter_by_category_name(events: &[Event], name: &str) -> Vec<Event> {
    let name = name.to_lowercase();
    events
        .iter()
        .filter(|event| {
            event
                .categories
                .iter()
                .any(|category| category.name.to_lowercase() == name)
        })
        .cloned()
        .collect()
}

/// Keep events with fewer than `threshold` tickets left.
#[must_use]
pub fn last_tickets(events: &[Event], threshold: u32) -> Vec<Event> {
    events
        .iter()
        .filter(|event| event.available_tickets < threshold)
        .cloned()
        .collect()
}

/// Events ordered by date, earliest first. Ties keep their input order.
#[must_use]
pub fn sort_by_date(events: &[Event]) -> Vec<Event> {
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|event| event.date);
    sorted
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::types::{Category, EventId};
    use chrono::TimeZone;

    fn event(id: i64, title: &str, location: &str, categories: &[(i64, &str)]) -> Event {
        Event {
            id: EventId::new(id),
            title: title.to_string(),
            description: String::new(),
            date: Utc.with_ymd_and_hms(2025, 1, 1, 20, 0, 0).unwrap(),
            location: location.to_string(),
            image_ref: String::new(),
            available_tickets: 500,
            sold_tickets: 0,
            price: 10.0,
            organizer_username: None,
            event_url: None,
            categories: categories
                .iter()
                .map(|(id, name)| Category {
                    id: CategoryId::new(*id),
                    name: (*name).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_search_matches_location_case_insensitively() {
        let events = vec![
            event(1, "Rock Fest", "madrid centro", &[]),
            event(2, "Opera Gala", "Sevilla", &[]),
        ];

        let found = search(&events, "MADRID");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, EventId::new(1));

        assert_eq!(search(&events, "gala")[0].id, EventId::new(2));
        assert_eq!(search(&events, ""), events);
    }

    #[test]
    fn test_filter_by_categories_matches_any() {
        let events = vec![
            event(1, "A", "", &[(1, "Cultura")]),
            event(2, "B", "", &[(2, "Deporte"), (3, "Música")]),
            event(3, "C", "", &[]),
        ];

        let ids: Vec<_> = filter_by_categories(&events, &[CategoryId::new(3), CategoryId::new(1)])
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![EventId::new(1), EventId::new(2)]);
        assert_eq!(filter_by_categories(&events, &[]), events);
    }

    #[test]
    fn test_filter_upcoming_excludes_now() {
        let mut past = event(1, "Past", "", &[]);
        past.date = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let at_now = event(2, "Now", "", &[]);
        let mut future = event(3, "Future", "", &[]);
        future.date = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();

        let now = at_now.date;
        let upcoming = filter_upcoming(&[past, at_now, future], now);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, EventId::new(3));
    }

    #[test]
    fn test_home_sections() {
        let mut scarce = event(1, "Scarce", "", &[(1, "CULTURA")]);
        scarce.available_tickets = 99;
        let plenty = event(2, "Plenty", "", &[(2, "Deporte")]);
        let events = vec![scarce, plenty];

        assert_eq!(filter_by_category_name(&events, "cultura")[0].id, EventId::new(1));
        let scarce_ids: Vec<_> = last_tickets(&events, LAST_TICKETS_THRESHOLD)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(scarce_ids, vec![EventId::new(1)]);
    }

    #[test]
    fn test_sort_by_date() {
        let mut late = event(1, "Late", "", &[]);
        late.date = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let early = event(2, "Early", "", &[]);

        let sorted = sort_by_date(&[late, early]);
        assert_eq!(sorted[0].id, EventId::new(2));
    }
}
