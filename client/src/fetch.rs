//! Authorized fetch.
//!
//! Every backend call goes through [`AuthorizedFetch::request`]. It attaches
//! the bearer token, turns a 401 into a guarded session expiry plus
//! [`AuthError::Unauthorized`], and keeps transport failures separate as
//! [`NetworkError`](boxoffice_core::NetworkError). Every outcome is a value.

use crate::config::ClientConfig;
use crate::session::SessionStore;
use crate::transport::{HttpRequest, HttpTransport, Method, MultipartForm, RequestBody};
use boxoffice_core::error::{AuthError, Result, SyncError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Whether to send the session's token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CredentialsMode {
    /// Attach the bearer token when one exists
    #[default]
    Include,
    /// Never attach it (login)
    Omit,
}

/// Per-request options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOptions {
    method: Method,
    body: Option<RequestBody>,
    credentials: CredentialsMode,
}

impl RequestOptions {
    /// `GET` with credentials
    #[must_use]
    pub const fn get() -> Self {
        Self::with_method(Method::GET)
    }

    /// `POST` with credentials
    #[must_use]
    pub const fn post() -> Self {
        Self::with_method(Method::POST)
    }

    /// `DELETE` with credentials
    #[must_use]
    pub const fn delete() -> Self {
        Self::with_method(Method::DELETE)
    }

    const fn with_method(method: Method) -> Self {
        Self {
            method,
            body: None,
            credentials: CredentialsMode::Include,
        }
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Serialization` if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body).map_err(|e| SyncError::Serialization(e.to_string()))?;
        self.body = Some(RequestBody::Json(bytes));
        Ok(self)
    }

    /// Attach a `multipart/form-data` body.
    #[must_use]
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }

    /// Do not send the session token.
    #[must_use]
    pub fn without_credentials(mut self) -> Self {
        self.credentials = CredentialsMode::Omit;
        self
    }

    /// HTTP method
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }
}

/// Response of a request that did not hit a 401 or a transport failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Body bytes
    pub body: Vec<u8>,
    /// `false` if the request went out without a token
    pub authenticated: bool,
}

impl Response {
    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body as lossy UTF-8
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Decode` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| SyncError::Decode(e.to_string()))
    }

    /// Map non-2xx statuses to `SyncError::Rejected`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Rejected` carrying the status and body text.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SyncError::Rejected {
                status: self.status,
                message: self.text(),
            })
        }
    }
}

/// Wraps a transport with the session's bearer token and uniform 401 handling.
pub struct AuthorizedFetch<T> {
    transport: Arc<T>,
    session: SessionStore,
    config: Arc<ClientConfig>,
}

impl<T> Clone for AuthorizedFetch<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            session: self.session.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T> std::fmt::Debug for AuthorizedFetch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedFetch")
            .field("base_url", &self.config.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<T: HttpTransport> AuthorizedFetch<T> {
    /// Create a fetcher over `transport`.
    #[must_use]
    pub fn new(transport: T, session: SessionStore, config: ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            session,
            config: Arc::new(config),
        }
    }

    /// The session this fetcher authorizes with
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Client configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue a request to `path` (relative to the configured base URL).
    ///
    /// Requests go out even without a session; [`Response::authenticated`]
    /// tells callers whether a token was attached.
    ///
    /// # Errors
    ///
    /// - `AuthError::Unauthorized` on HTTP 401, after expiring the session
    ///   for the token that was sent
    /// - `NetworkError` when the transport fails
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let token = match options.credentials {
            CredentialsMode::Include => self.session.token(),
            CredentialsMode::Omit => None,
        };

        let mut request = HttpRequest::new(options.method, self.config.endpoint(path));
        if let Some(token) = &token {
            request
                .headers
                .push(("Authorization".to_string(), token.bearer()));
        }
        if let Some(RequestBody::Json(_)) = &options.body {
            request
                .headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
        }
        request.body = options.body;
        let method = request.method.clone();

        let started = Instant::now();
        let sent = self.transport.send(request).await;
        metrics::histogram!("boxoffice.http.request_duration_seconds").record(started.elapsed().as_secs_f64());

        let response = match sent {
            Ok(response) => response,
            Err(error) => {
                warn!(%method, path, %error, "request failed in transport");
                record("network_error");
                return Err(SyncError::Network(error));
            }
        };

        debug!(%method, path, status = response.status, authenticated = token.is_some(), "request completed");

        if response.status == 401 {
            record("unauthorized");
            if let Some(token) = &token {
                self.session.expire(token);
            }
            return Err(AuthError::Unauthorized.into());
        }

        record(if (200..300).contains(&response.status) { "success" } else { "rejected" });
        Ok(Response {
            status: response.status,
            body: response.body,
            authenticated: token.is_some(),
        })
    }
}

fn record(outcome: &'static str) {
    metrics::counter!("boxoffice.http.requests", "outcome" => outcome).increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::mocks::{MockTransport, Reply};
    use crate::session::{InvalidationReason, SessionEvent};
    use boxoffice_core::error::NetworkError;
    use boxoffice_core::types::{AuthToken, Session};
    use std::sync::Mutex;

    fn fetcher() -> (AuthorizedFetch<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let fetch = AuthorizedFetch::new(transport.clone(), SessionStore::in_memory(), ClientConfig::default());
        (fetch, transport)
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let (fetch, transport) = fetcher();
        fetch.session().set(Session::authenticated(AuthToken::new("t1"), "ana", None));
        transport.respond(Method::GET, "/api/auth/profile/me", Reply::status(200));

        let response = fetch.request("/api/auth/profile/me", RequestOptions::get()).await.unwrap();

        assert!(response.authenticated);
        assert_eq!(transport.requests()[0].header("Authorization"), Some("Bearer t1"));
    }

    #[tokio::test]
    async fn test_unauthenticated_request_still_sent() {
        let (fetch, transport) = fetcher();
        transport.respond(Method::GET, "/api/categories", Reply::json(&[] as &[u8]));

        let response = fetch.request("/api/categories", RequestOptions::get()).await.unwrap();

        assert!(!response.authenticated);
        assert_eq!(transport.requests()[0].header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_401_expires_session() {
        let (fetch, transport) = fetcher();
        fetch.session().set(Session::authenticated(AuthToken::new("t1"), "ana", None));
        let reasons = std::sync::Arc::new(Mutex::new(Vec::new()));
        let seen = std::sync::Arc::clone(&reasons);
        let _subscription = fetch.session().subscribe(move |event| {
            if let SessionEvent::Invalidated { reason } = event {
                seen.lock().unwrap().push(*reason);
            }
        });
        transport.respond(Method::GET, "/api/events/favorites/list", Reply::status(401));

        let error = fetch
            .request("/api/events/favorites/list", RequestOptions::get())
            .await
            .unwrap_err();

        assert_eq!(error, SyncError::Auth(AuthError::Unauthorized));
        assert!(!fetch.session().is_authenticated());
        assert_eq!(*reasons.lock().unwrap(), vec![InvalidationReason::Expired]);
    }

    #[tokio::test]
    async fn test_network_failure_keeps_session() {
        let (fetch, transport) = fetcher();
        fetch.session().set(Session::authenticated(AuthToken::new("t1"), "ana", None));
        transport.respond(Method::GET, "/api/categories", Reply::Network(NetworkError::Timeout));

        let error = fetch.request("/api/categories", RequestOptions::get()).await.unwrap_err();

        assert_eq!(error, SyncError::Network(NetworkError::Timeout));
        assert!(fetch.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_omitted_credentials_do_not_expire_session() {
        let (fetch, transport) = fetcher();
        fetch.session().set(Session::authenticated(AuthToken::new("t1"), "ana", None));
        transport.respond(Method::POST, "/api/auth/login", Reply::status(401));

        let options = RequestOptions::post().without_credentials();
        assert!(fetch.request("/api/auth/login", options).await.is_err());
        assert!(fetch.session().is_authenticated());
    }

    #[test]
    fn test_error_for_status() {
        let response = Response {
            status: 404,
            body: b"missing".to_vec(),
            authenticated: false,
        };
        assert_eq!(
            response.error_for_status().unwrap_err(),
            SyncError::Rejected {
                status: 404,
                message: "missing".to_string()
            }
        );
    }
}
