//! Mock implementations for testing.
//!
//! In-memory storage, a scripted HTTP transport and a navigator that counts
//! redirects. Enabled by the `test-utils` feature.

pub mod navigator;
pub mod storage;
pub mod transport;

pub use navigator::RecordingNavigator;
pub use storage::MemoryStore;
pub use transport::{Gate, MockTransport, Reply};
