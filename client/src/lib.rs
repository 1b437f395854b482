//! # Boxoffice Client
//!
//! Authenticated-resource synchronization for the Boxoffice ticketing app:
//! the process-wide session, authorized requests to the backend, and the
//! per-user favorites cache that every screen renders from.
//!
//! ## Features
//!
//! - **One session**: [`SessionStore`] owns the bearer token; nothing else caches it
//! - **Uniform 401 handling**: any rejected token clears the session exactly once
//! - **Optimistic favorites**: toggles show immediately and roll back on failure
//! - **Testable**: the transport, storage and navigator are traits with mocks
//!   behind the `test-utils` feature
//!
//! ## Architecture
//!
//! ```text
//! ScreenController → FavoritesCache → BackendApi → AuthorizedFetch → HttpTransport
//!        ↑                  ↑                            │
//!        └──── SessionEvent ┴──────── SessionStore ←─────┘ (401 → expire)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use boxoffice_client::{
//!     AuthorizedFetch, BackendApi, ClientConfig, FavoritesCache, ReqwestTransport, SessionStore,
//! };
//! use boxoffice_core::EventId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let transport = ReqwestTransport::new(&config)?;
//! let session = SessionStore::from_config(&config);
//! let fetch = AuthorizedFetch::new(transport, session, config);
//! let favorites = FavoritesCache::new(BackendApi::new(fetch));
//!
//! favorites.load().await?;
//! let now_favorite = favorites.toggle(EventId::new(42)).await?;
//! # let _ = now_favorite;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod api;
pub mod config;
pub mod favorites;
pub mod fetch;
pub mod metrics;
pub mod screen;
pub mod session;
pub mod storage;
pub mod transport;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use api::BackendApi;
pub use config::{ClientConfig, ConfigError};
pub use favorites::{EventCard, FavoritesCache};
pub use fetch::{AuthorizedFetch, CredentialsMode, RequestOptions, Response};
pub use screen::{CategoriesFeed, HomeFeed, Navigator, ScreenController};
pub use session::{InvalidationReason, SessionEvent, SessionStore, Subscription};
pub use storage::{FileStore, KeyValueStore, StorageError};
pub use transport::{
    FormPart, HttpRequest, HttpResponse, HttpTransport, MultipartForm, RequestBody, ReqwestTransport,
};
