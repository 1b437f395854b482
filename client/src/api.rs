//! Typed backend API.
//!
//! One method per backend endpoint, all going through [`AuthorizedFetch`].
//! Endpoints that need a signed-in user check for a token first and answer
//! [`AuthError::Unauthorized`] without touching the network when there is none.

use crate::fetch::{AuthorizedFetch, RequestOptions, Response};
use crate::session::{InvalidationReason, SessionStore};
use crate::transport::{HttpTransport, MultipartForm};
use boxoffice_core::error::{AuthError, Result, SyncError};
use boxoffice_core::types::{AuthToken, Category, Event, EventId, Profile, Session};
use boxoffice_core::validation::{CartQuantity, Credentials, EventDraft, PasswordChange};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const DEFAULT_LOGIN_FAILURE: &str = "Invalid username or password";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LoginReply {
    Token {
        token: String,
        #[serde(default)]
        role: Option<String>,
    },
    Message {
        message: String,
    },
}

#[derive(Serialize)]
struct PasswordUpdate<'a> {
    password: &'a str,
}

/// Typed client for the ticketing backend.
pub struct BackendApi<T> {
    fetch: AuthorizedFetch<T>,
}

impl<T> Clone for BackendApi<T> {
    fn clone(&self) -> Self {
        Self {
            fetch: self.fetch.clone(),
        }
    }
}

impl<T> std::fmt::Debug for BackendApi<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendApi").field("fetch", &self.fetch).finish()
    }
}

impl<T: HttpTransport> BackendApi<T> {
    /// Create an API over `fetch`
    #[must_use]
    pub const fn new(fetch: AuthorizedFetch<T>) -> Self {
        Self { fetch }
    }

    /// Underlying fetcher
    #[must_use]
    pub const fn fetch(&self) -> &AuthorizedFetch<T> {
        &self.fetch
    }

    /// Session this API authorizes with
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        self.fetch.session()
    }

    /// All categories (`GET /api/categories`).
    ///
    /// # Errors
    ///
    /// Returns `SyncError` on transport failure, a non-2xx status or an
    /// unparseable body.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.get_json("/api/categories").await
    }

    /// Events ordered by date (`GET /api/events/filter/bydate`).
    ///
    /// # Errors
    ///
    /// See [`BackendApi::categories`].
    pub async fn events_by_date(&self) -> Result<Vec<Event>> {
        self.get_json("/api/events/filter/bydate").await
    }

    /// Events ordered by popularity (`GET /api/events/filter/bypopular`).
    ///
    /// # Errors
    ///
    /// See [`BackendApi::categories`].
    pub async fn events_by_popularity(&self) -> Result<Vec<Event>> {
        self.get_json("/api/events/filter/bypopular").await
    }

    /// One event (`GET /api/events/{id}`).
    ///
    /// # Errors
    ///
    /// See [`BackendApi::categories`].
    pub async fn event(&self, id: EventId) -> Result<Event> {
        self.get_json(&format!("/api/events/{id}")).await
    }

    /// Favorite event ids of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` without I/O when signed out, plus
    /// the errors of [`BackendApi::categories`].
    pub async fn favorite_ids(&self) -> Result<Vec<EventId>> {
        self.require_session()?;
        self.get_json("/api/events/favorites/list").await
    }

    /// Add `id` to favorites.
    ///
    /// # Errors
    ///
    /// See [`BackendApi::favorite_ids`].
    pub async fn add_favorite(&self, id: EventId) -> Result<()> {
        self.post_empty(&format!("/api/events/favorites/add/{id}")).await
    }

    /// Remove `id` from favorites.
    ///
    /// # Errors
    ///
    /// See [`BackendApi::favorite_ids`].
    pub async fn remove_favorite(&self, id: EventId) -> Result<()> {
        self.post_empty(&format!("/api/events/favorites/remove/{id}")).await
    }

    /// Put `quantity` tickets for `id` in the cart.
    ///
    /// # Errors
    ///
    /// See [`BackendApi::favorite_ids`].
    pub async fn add_to_cart(&self, id: EventId, quantity: CartQuantity) -> Result<()> {
        self.post_empty(&format!("/api/events/cart/add/{id}/{}", quantity.get()))
            .await
    }

    /// Publish a new event as the signed-in user
    /// (`POST /api/events/create`, `multipart/form-data`).
    ///
    /// Returns the backend's confirmation text.
    ///
    /// # Errors
    ///
    /// See [`BackendApi::favorite_ids`]. A refusal carries the backend's
    /// text in `SyncError::Rejected`.
    pub async fn create_event(&self, draft: &EventDraft) -> Result<String> {
        self.require_session()?;
        let mut form = draft
            .form_fields()
            .into_iter()
            .fold(MultipartForm::new(), |form, (name, value)| form.text(name, value));
        if let Some(image) = draft.image() {
            form = form.file("image", image.file_name(), image.mime(), image.bytes().to_vec());
        }

        let response = self
            .fetch
            .request("/api/events/create", RequestOptions::post().multipart(form))
            .await?
            .error_for_status()?;
        info!(title = draft.title(), "event created");
        Ok(response.text())
    }

    /// Log in and establish the session.
    ///
    /// The request is sent without the current token, so a failed login
    /// leaves an existing session untouched.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` when the backend refuses the
    /// credentials, or the transport and decode errors of any request.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let options = RequestOptions::post()
            .json(&LoginRequest {
                username: credentials.username(),
                password: credentials.password(),
            })?
            .without_credentials();

        let response = match self.fetch.request("/api/auth/login", options).await {
            Ok(response) => response,
            Err(SyncError::Auth(AuthError::Unauthorized)) => {
                return Err(invalid_credentials(DEFAULT_LOGIN_FAILURE));
            }
            Err(error) => return Err(error),
        };

        match response.json::<LoginReply>() {
            Ok(LoginReply::Token { token, role }) if response.is_success() => {
                let session = Session::authenticated(AuthToken::new(token), credentials.username(), role);
                self.session().set(session.clone());
                Ok(session)
            }
            Ok(LoginReply::Message { message }) => {
                warn!(username = credentials.username(), "login refused");
                Err(invalid_credentials(&message))
            }
            _ if (400..500).contains(&response.status) => Err(invalid_credentials(DEFAULT_LOGIN_FAILURE)),
            Ok(LoginReply::Token { .. }) => Err(rejected(&response)),
            Err(error) => Err(if response.is_success() { error } else { rejected(&response) }),
        }
    }

    /// Profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// See [`BackendApi::favorite_ids`].
    pub async fn profile(&self) -> Result<Profile> {
        self.require_session()?;
        self.get_json("/api/auth/profile/me").await
    }

    /// Change the password to the validated new one.
    ///
    /// # Errors
    ///
    /// See [`BackendApi::favorite_ids`].
    pub async fn update_password(&self, change: &PasswordChange) -> Result<()> {
        self.require_session()?;
        let options = RequestOptions::post().json(&PasswordUpdate {
            password: change.new_password(),
        })?;
        self.fetch
            .request("/api/auth/update-password", options)
            .await?
            .error_for_status()?;
        info!("password updated");
        Ok(())
    }

    /// Delete the account and end the session.
    ///
    /// # Errors
    ///
    /// See [`BackendApi::favorite_ids`]. The session is kept when the
    /// backend refuses.
    pub async fn delete_account(&self) -> Result<()> {
        self.require_session()?;
        self.fetch
            .request("/api/auth/selfdelete", RequestOptions::delete())
            .await?
            .error_for_status()?;
        self.session().clear_with(InvalidationReason::AccountDeleted);
        Ok(())
    }

    /// End the session locally.
    ///
    /// Returns `true` if a session was cleared.
    pub fn logout(&self) -> bool {
        self.session().clear_with(InvalidationReason::SignedOut)
    }

    /// Absolute URL of an event image
    #[must_use]
    pub fn image_url(&self, image_ref: &str) -> String {
        self.fetch.config().image_url(image_ref)
    }

    fn require_session(&self) -> Result<()> {
        if self.session().is_authenticated() {
            Ok(())
        } else {
            Err(AuthError::Unauthorized.into())
        }
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.fetch
            .request(path, RequestOptions::get())
            .await?
            .error_for_status()?
            .json()
    }

    async fn post_empty(&self, path: &str) -> Result<()> {
        self.require_session()?;
        self.fetch
            .request(path, RequestOptions::post())
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn invalid_credentials(message: &str) -> SyncError {
    AuthError::InvalidCredentials {
        message: message.to_string(),
    }
    .into()
}

fn rejected(response: &Response) -> SyncError {
    SyncError::Rejected {
        status: response.status,
        message: response.text(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::mocks::{MockTransport, Reply};
    use crate::transport::{FormPart, Method, RequestBody};
    use boxoffice_core::types::CategoryId;
    use boxoffice_core::validation::EventImage;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn draft() -> EventDraft {
        let date = Utc.with_ymd_and_hms(2025, 6, 1, 21, 30, 0).single();
        EventDraft::new("Concierto", date, "100", "25.5")
            .unwrap()
            .with_description("Jazz en directo")
            .with_location("Madrid Centro")
            .with_categories([CategoryId::new(1), CategoryId::new(4)])
    }

    fn api() -> (BackendApi<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let fetch = AuthorizedFetch::new(transport.clone(), SessionStore::in_memory(), ClientConfig::default());
        (BackendApi::new(fetch), transport)
    }

    fn credentials() -> Credentials {
        Credentials::new("ana", "secret1").unwrap()
    }

    #[tokio::test]
    async fn test_login_establishes_session() {
        let (api, transport) = api();
        transport.respond(
            Method::POST,
            "/api/auth/login",
            Reply::json(&json!({"token": "t1", "role": "USER"})),
        );

        let session = api.login(&credentials()).await.unwrap();

        assert_eq!(session.username.as_deref(), Some("ana"));
        assert_eq!(api.session().token(), Some(AuthToken::new("t1")));
        let request = &transport.requests()[0];
        assert_eq!(request.header("authorization"), None);
        let body: serde_json::Value = serde_json::from_slice(request.body.as_ref().and_then(RequestBody::as_json).unwrap()).unwrap();
        assert_eq!(body, json!({"username": "ana", "password": "secret1"}));
    }

    #[tokio::test]
    async fn test_failed_login_keeps_existing_session() {
        let (api, transport) = api();
        api.session()
            .set(Session::authenticated(AuthToken::new("old"), "ana", None));
        transport.respond(
            Method::POST,
            "/api/auth/login",
            Reply::json(&json!({"message": "Credenciales incorrectas"})),
        );

        let error = api.login(&credentials()).await.unwrap_err();

        assert_eq!(
            error,
            SyncError::Auth(AuthError::InvalidCredentials {
                message: "Credenciales incorrectas".to_string()
            })
        );
        assert_eq!(api.session().token(), Some(AuthToken::new("old")));
    }

    #[tokio::test]
    async fn test_login_401_is_invalid_credentials() {
        let (api, transport) = api();
        transport.respond(Method::POST, "/api/auth/login", Reply::status(401));

        let error = api.login(&credentials()).await.unwrap_err();
        assert!(matches!(error, SyncError::Auth(AuthError::InvalidCredentials { .. })));
    }

    #[tokio::test]
    async fn test_signed_out_endpoints_skip_network() {
        let (api, transport) = api();

        assert!(api.favorite_ids().await.unwrap_err().is_unauthorized());
        assert!(api.add_to_cart(EventId::new(1), CartQuantity::new(2).unwrap()).await.unwrap_err().is_unauthorized());
        assert!(api.profile().await.unwrap_err().is_unauthorized());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_status_maps_to_rejected() {
        let (api, transport) = api();
        transport.respond(Method::GET, "/api/categories", Reply::text(503, "maintenance"));

        assert_eq!(
            api.categories().await.unwrap_err(),
            SyncError::Rejected {
                status: 503,
                message: "maintenance".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let (api, transport) = api();
        transport.respond(Method::GET, "/api/categories", Reply::text(200, "<html>oops</html>"));

        let error = api.categories().await.unwrap_err();

        assert!(matches!(error, SyncError::Decode(_)));
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn test_update_password_sends_new_password_only() {
        let (api, transport) = api();
        api.session().set(Session::authenticated(AuthToken::new("t1"), "ana", None));
        transport.respond(Method::POST, "/api/auth/update-password", Reply::status(200));

        let change = PasswordChange::new("secret1", "secret22", "secret22").unwrap();
        api.update_password(&change).await.unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.header("authorization"), Some("Bearer t1"));
        let body: serde_json::Value = serde_json::from_slice(request.body.as_ref().and_then(RequestBody::as_json).unwrap()).unwrap();
        assert_eq!(body, json!({"password": "secret22"}));
    }

    #[tokio::test]
    async fn test_delete_account_clears_session() {
        let (api, transport) = api();
        api.session().set(Session::authenticated(AuthToken::new("t1"), "ana", None));
        transport.respond(Method::DELETE, "/api/auth/selfdelete", Reply::status(204));

        api.delete_account().await.unwrap();
        assert!(!api.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_add_to_cart_path() {
        let (api, transport) = api();
        api.session().set(Session::authenticated(AuthToken::new("t1"), "ana", None));
        transport.respond(Method::POST, "/api/events/cart/add/12/3", Reply::status(200));

        api.add_to_cart(EventId::new(12), CartQuantity::new(3).unwrap()).await.unwrap();
        assert_eq!(transport.count(&Method::POST, "/api/events/cart/add/12/3"), 1);
    }

    #[tokio::test]
    async fn test_create_event_sends_authorized_multipart_form() {
        // Arrange
        let (api, transport) = api();
        api.session().set(Session::authenticated(AuthToken::new("t1"), "ana", None));
        transport.respond(Method::POST, "/api/events/create", Reply::text(200, "Evento creado"));
        let draft = draft().with_image(EventImage::new("file:///picked/poster.png", vec![7; 16]));

        // Act
        let message = api.create_event(&draft).await.unwrap();

        // Assert
        assert_eq!(message, "Evento creado");
        let request = &transport.requests()[0];
        assert_eq!(request.header("authorization"), Some("Bearer t1"));
        assert_eq!(request.header("content-type"), None);
        let form = request.body.as_ref().and_then(RequestBody::as_multipart).unwrap();
        assert_eq!(form.texts("title"), vec!["Concierto"]);
        assert_eq!(form.texts("date"), vec!["2025-06-01T21:30:00.000Z"]);
        assert_eq!(form.texts("localizacion"), vec!["Madrid Centro"]);
        assert_eq!(form.texts("categories"), vec!["1", "4"]);
        assert!(form.parts().iter().any(|part| matches!(
            part,
            FormPart::File { name, file_name, mime, .. }
                if name == "image" && file_name == "poster.png" && mime == "image/png"
        )));
    }

    #[tokio::test]
    async fn test_create_event_requires_session() {
        let (api, transport) = api();

        let error = api.create_event(&draft()).await.unwrap_err();

        assert!(error.is_unauthorized());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_event_refusal_carries_backend_text() {
        let (api, transport) = api();
        api.session().set(Session::authenticated(AuthToken::new("t1"), "ana", None));
        transport.respond(Method::POST, "/api/events/create", Reply::text(413, "Imagen demasiado grande"));

        let error = api.create_event(&draft()).await.unwrap_err();

        assert_eq!(
            error,
            SyncError::Rejected {
                status: 413,
                message: "Imagen demasiado grande".to_string()
            }
        );
        assert!(api.session().is_authenticated());
    }
}
