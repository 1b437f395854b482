//! Mock navigator for testing.

use crate::screen::Navigator;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Navigator that counts login redirects.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    redirects: Arc<AtomicUsize>,
}

impl RecordingNavigator {
    /// Create a navigator with no recorded redirects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of redirects to login so far
    #[must_use]
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}
