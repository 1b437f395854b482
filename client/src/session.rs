//! Process-wide session store.
//!
//! Holds the one [`Session`] of the process, persists it to a
//! [`KeyValueStore`] and tells subscribers when it is established or
//! invalidated.
//!
//! # Guarantees
//!
//! - No operation blocks: persistence writes are queued to a background
//!   writer and applied in order. Failures are logged, never returned.
//! - Changes are persisted and announced in the order they were made, so the
//!   stored session and the last event a subscriber saw always agree with
//!   [`SessionStore::get`].
//! - Invalidation is guarded: however many callers clear concurrently, only
//!   the one that finds a live session clears it, so subscribers hear about
//!   it exactly once.
//! - A 401 for an old token cannot destroy a newer session ([`SessionStore::expire`]).

use crate::config::ClientConfig;
use crate::storage::{FileStore, KeyValueStore};
use boxoffice_core::types::{AuthToken, Session};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "token";
/// Storage key for the username
pub const USERNAME_KEY: &str = "username";
/// Storage key for the role
pub const ROLE_KEY: &str = "role";

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvalidationReason {
    /// The user logged out
    SignedOut,
    /// The account was deleted
    AccountDeleted,
    /// The backend answered 401
    Expired,
}

impl InvalidationReason {
    /// Stable label for logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignedOut => "signed_out",
            Self::AccountDeleted => "account_deleted",
            Self::Expired => "expired",
        }
    }
}

/// Notification delivered to subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was set (login or replacement).
    Established,
    /// The session was destroyed.
    Invalidated {
        /// Why it ended
        reason: InvalidationReason,
    },
}

type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

enum PersistCommand {
    Save(Session),
    Erase,
    Flush(oneshot::Sender<()>),
}

enum Persistence {
    Disabled,
    Queued(mpsc::UnboundedSender<PersistCommand>),
    Inline(Arc<dyn KeyValueStore>),
}

/// Events waiting for delivery, and whether some thread is delivering them.
#[derive(Default)]
struct Outbox {
    queue: VecDeque<SessionEvent>,
    draining: bool,
}

struct Inner {
    session: Mutex<Session>,
    outbox: Mutex<Outbox>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
    persistence: Persistence,
}

/// Handle to the process-wide session.
///
/// Cheap to clone; all clones share the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*lock(&self.inner.session))
            .field("listeners", &lock(&self.inner.listeners).len())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Store without persistence.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_persistence(Session::default(), Persistence::Disabled)
    }

    /// Empty store that persists to `storage`.
    ///
    /// Inside a Tokio runtime writes go through a background writer task;
    /// outside one they are applied inline.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_persistence(Session::default(), start_persistence(storage))
    }

    /// Store rehydrated from `storage` at process start.
    ///
    /// A read failure is logged and leaves the store signed out.
    #[must_use]
    pub fn rehydrate(storage: Arc<dyn KeyValueStore>) -> Self {
        let session = match read_session(storage.as_ref()) {
            Ok(session) => session,
            Err(error) => {
                warn!(%error, "could not read persisted session, starting signed out");
                Session::default()
            }
        };
        info!(
            authenticated = session.is_authenticated(),
            username = ?session.username,
            "session rehydrated"
        );
        Self::with_persistence(session, start_persistence(storage))
    }

    /// Store for `config`: rehydrated from [`ClientConfig::session_file`]
    /// when one is set, in memory otherwise.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        match &config.session_file {
            Some(path) => {
                debug!(path = %path.display(), "using file-backed session");
                Self::rehydrate(Arc::new(FileStore::new(path)))
            }
            None => Self::in_memory(),
        }
    }

    fn with_persistence(session: Session, persistence: Persistence) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                outbox: Mutex::new(Outbox::default()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                persistence,
            }),
        }
    }

    /// Current session snapshot.
    #[must_use]
    pub fn get(&self) -> Session {
        lock(&self.inner.session).clone()
    }

    /// Current bearer token, if signed in.
    #[must_use]
    pub fn token(&self) -> Option<AuthToken> {
        lock(&self.inner.session).token.clone()
    }

    /// Returns `true` if a token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        lock(&self.inner.session).is_authenticated()
    }

    /// Replace the session and notify [`SessionEvent::Established`].
    ///
    /// Setting an empty session is the same as [`SessionStore::clear`].
    pub fn set(&self, session: Session) {
        if session.is_empty() {
            self.clear();
            return;
        }
        info!(username = ?session.username, role = ?session.role, "session established");
        let deliver = {
            let mut current = lock(&self.inner.session);
            *current = session.clone();
            self.persist(PersistCommand::Save(session));
            self.enqueue(SessionEvent::Established)
        };
        if deliver {
            self.drain();
        }
    }

    /// Sign out locally.
    ///
    /// Idempotent; returns `true` only for the call that actually cleared.
    pub fn clear(&self) -> bool {
        self.clear_with(InvalidationReason::SignedOut)
    }

    /// Destroy the session for `reason`.
    ///
    /// Returns `true` only for the call that actually cleared; subscribers
    /// are notified once, by that call.
    pub fn clear_with(&self, reason: InvalidationReason) -> bool {
        self.invalidate(reason, |_| true)
    }

    /// Destroy the session because `token` was rejected, unless the session
    /// has already moved on to a different token.
    pub fn expire(&self, token: &AuthToken) -> bool {
        self.invalidate(InvalidationReason::Expired, |current| {
            current.token.as_ref() == Some(token)
        })
    }

    fn invalidate(&self, reason: InvalidationReason, applies: impl FnOnce(&Session) -> bool) -> bool {
        let deliver = {
            let mut current = lock(&self.inner.session);
            if current.is_empty() {
                debug!(reason = reason.as_str(), "session already cleared");
                return false;
            }
            if !applies(&current) {
                debug!(reason = reason.as_str(), "rejection was for a superseded token");
                return false;
            }
            *current = Session::default();
            self.persist(PersistCommand::Erase);
            self.enqueue(SessionEvent::Invalidated { reason })
        };

        info!(reason = reason.as_str(), "session invalidated");
        metrics::counter!("boxoffice.session.invalidated", "reason" => reason.as_str()).increment(1);
        if deliver {
            self.drain();
        }
        true
    }

    /// Register a listener for session events.
    ///
    /// Listeners run after the store's lock is released, one event at a
    /// time and in the order the changes were made. Usually that is on the
    /// thread that changed the session; if another thread is already
    /// delivering events, it delivers this one too. Dropping the returned
    /// [`Subscription`] unregisters the listener.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of registered listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    /// Wait until every queued persistence write has been applied.
    pub async fn flush(&self) {
        if let Persistence::Queued(sender) = &self.inner.persistence {
            let (done, finished) = oneshot::channel();
            if sender.send(PersistCommand::Flush(done)).is_ok() {
                let _ = finished.await;
            }
        }
    }

    /// Queue `event` behind earlier changes. Called with the session lock
    /// held; returns `true` if the caller must drain the queue.
    fn enqueue(&self, event: SessionEvent) -> bool {
        let mut outbox = lock(&self.inner.outbox);
        outbox.queue.push_back(event);
        !std::mem::replace(&mut outbox.draining, true)
    }

    fn drain(&self) {
        let _reset = DrainReset(&self.inner.outbox);
        loop {
            let event = {
                let mut outbox = lock(&self.inner.outbox);
                match outbox.queue.pop_front() {
                    Some(event) => event,
                    None => {
                        outbox.draining = false;
                        return;
                    }
                }
            };
            self.notify(&event);
        }
    }

    fn notify(&self, event: &SessionEvent) {
        let listeners: Vec<Listener> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    fn persist(&self, command: PersistCommand) {
        match &self.inner.persistence {
            Persistence::Disabled => {}
            Persistence::Queued(sender) => {
                if sender.send(command).is_err() {
                    warn!("session writer has stopped, change not persisted");
                }
            }
            Persistence::Inline(storage) => apply(storage.as_ref(), command),
        }
    }
}

/// Releases the delivery role if a listener panics mid-drain.
struct DrainReset<'a>(&'a Mutex<Outbox>);

impl Drop for DrainReset<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            lock(self.0).draining = false;
        }
    }
}

/// Registration returned by [`SessionStore::subscribe`].
///
/// The listener stays registered until this value is dropped.
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    store: Weak<Inner>,
    id: u64,
}

impl Subscription {
    /// Unregister the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            lock(&inner.listeners).retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn start_persistence(storage: Arc<dyn KeyValueStore>) -> Persistence {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let (sender, receiver) = mpsc::unbounded_channel();
            handle.spawn(run_writer(storage, receiver));
            Persistence::Queued(sender)
        }
        Err(_) => Persistence::Inline(storage),
    }
}

async fn run_writer(storage: Arc<dyn KeyValueStore>, mut commands: mpsc::UnboundedReceiver<PersistCommand>) {
    while let Some(command) = commands.recv().await {
        if let PersistCommand::Flush(done) = command {
            let _ = done.send(());
            continue;
        }
        let storage = Arc::clone(&storage);
        if let Err(error) = tokio::task::spawn_blocking(move || apply(storage.as_ref(), command)).await {
            warn!(%error, "session persistence task failed");
        }
    }
}

fn apply(storage: &dyn KeyValueStore, command: PersistCommand) {
    let fields = match &command {
        PersistCommand::Save(session) => [
            (TOKEN_KEY, session.token.as_ref().map(AuthToken::as_str)),
            (USERNAME_KEY, session.username.as_deref()),
            (ROLE_KEY, session.role.as_deref()),
        ],
        PersistCommand::Erase => [(TOKEN_KEY, None), (USERNAME_KEY, None), (ROLE_KEY, None)],
        PersistCommand::Flush(_) => return,
    };
    for (key, value) in fields {
        let result = match value {
            Some(value) => storage.set(key, value),
            None => storage.remove(key),
        };
        if let Err(error) = result {
            warn!(key, %error, "failed to persist session field");
        }
    }
}

fn read_session(storage: &dyn KeyValueStore) -> Result<Session, crate::storage::StorageError> {
    Ok(Session {
        token: storage.get(TOKEN_KEY)?.map(AuthToken::new),
        username: storage.get(USERNAME_KEY)?,
        role: storage.get(ROLE_KEY)?,
    })
}
