//! Metric descriptions.
//!
//! The sync layer records through the `metrics` facade only. Installing an
//! exporter (Prometheus or otherwise) is up to the application; until one is
//! installed every recording is a no-op.
//!
//! | Metric | Kind | Labels |
//! |---|---|---|
//! | `boxoffice.http.requests` | counter | `outcome` |
//! | `boxoffice.http.request_duration_seconds` | histogram | |
//! | `boxoffice.session.invalidated` | counter | `reason` |
//! | `boxoffice.favorites.toggles` | counter | `outcome` |
//! | `boxoffice.favorites.loads` | counter | `outcome` |

use metrics::{describe_counter, describe_histogram};

/// Register descriptions for every metric the sync layer records.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    // HTTP
    describe_counter!(
        "boxoffice.http.requests",
        "Backend requests by outcome (success, rejected, unauthorized, network_error)"
    );
    describe_histogram!(
        "boxoffice.http.request_duration_seconds",
        "Time from sending a request to receiving its response"
    );

    // Session
    describe_counter!(
        "boxoffice.session.invalidated",
        "Sessions destroyed, by reason (signed_out, account_deleted, expired)"
    );

    // Favorites
    describe_counter!(
        "boxoffice.favorites.toggles",
        "Favorite toggles by outcome (acknowledged, rolled_back, coalesced)"
    );
    describe_counter!(
        "boxoffice.favorites.loads",
        "Favorites list loads by outcome (applied, discarded)"
    );
}
