//! Property tests for the catalog views.
//!
//! The views are pure, so their algebraic laws can be checked over
//! arbitrary event lists.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use boxoffice_core::catalog::{filter_by_categories, filter_upcoming, search};
use boxoffice_core::environment::Clock;
use boxoffice_testing::properties::{arb_category_id, arb_events};
use boxoffice_testing::{EventFixture, test_clock};
use proptest::prelude::*;

proptest! {
    #[test]
    fn empty_category_selection_is_identity(events in arb_events(test_clock().now())) {
        prop_assert_eq!(filter_by_categories(&events, &[]), events);
    }

    #[test]
    fn category_filter_is_idempotent(
        events in arb_events(test_clock().now()),
        ids in prop::collection::vec(arb_category_id(), 0..4),
    ) {
        let once = filter_by_categories(&events, &ids);
        let twice = filter_by_categories(&once, &ids);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn category_filter_keeps_only_selected(
        events in arb_events(test_clock().now()),
        ids in prop::collection::vec(arb_category_id(), 1..4),
    ) {
        for event in filter_by_categories(&events, &ids) {
            prop_assert!(event.categories.iter().any(|c| ids.contains(&c.id)));
        }
    }

    #[test]
    fn upcoming_is_strictly_after_now(events in arb_events(test_clock().now())) {
        let now = test_clock().now();
        let upcoming = filter_upcoming(&events, now);
        prop_assert!(upcoming.iter().all(|e| e.date > now));
        prop_assert_eq!(
            upcoming.len(),
            events.iter().filter(|e| e.date > now).count()
        );
    }

    #[test]
    fn search_ignores_case(events in arb_events(test_clock().now()), query in "[a-zA-Z]{0,6}") {
        prop_assert_eq!(search(&events, &query.to_uppercase()), search(&events, &query.to_lowercase()));
    }

    #[test]
    fn search_is_a_subsequence(events in arb_events(test_clock().now()), query in "[a-z]{1,4}") {
        let found = search(&events, &query);
        let mut remaining = events.iter();
        for event in &found {
            prop_assert!(remaining.any(|candidate| candidate == event));
        }
    }
}

#[test]
fn search_scenarios() {
    let events = vec![
        EventFixture::new(1).titled("Flamenco").located("madrid centro").build(),
        EventFixture::new(2).titled("Madrid Jazz").located("Toledo").build(),
        EventFixture::new(3).titled("Opera").located("Sevilla").build(),
    ];

    assert_eq!(search(&events, ""), events);

    let ids: Vec<i64> = search(&events, "MADRID").iter().map(|e| e.id.get()).collect();
    assert_eq!(ids, vec![1, 2]);
}
