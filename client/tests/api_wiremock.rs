//! Backend API tests over real HTTP.
//!
//! Runs `ReqwestTransport` against a local `wiremock` server to check the
//! wire contract: paths, bearer headers, JSON bodies, backend field names and
//! the classification of transport failures.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use boxoffice_client::{
    AuthorizedFetch, BackendApi, ClientConfig, FavoritesCache, ReqwestTransport, SessionStore,
};
use boxoffice_core::types::{AuthToken, CategoryId, Session};
use boxoffice_core::validation::{Credentials, EventDraft, EventImage};
use chrono::{TimeZone, Utc};
use boxoffice_core::{AuthError, EventId, NetworkError, SyncError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer, config: ClientConfig) -> BackendApi<ReqwestTransport> {
    let config = ClientConfig {
        base_url: server.uri(),
        ..config
    };
    let transport = ReqwestTransport::new(&config).expect("transport");
    BackendApi::new(AuthorizedFetch::new(transport, SessionStore::in_memory(), config))
}

fn signed_in(api: &BackendApi<ReqwestTransport>) {
    api.session()
        .set(Session::authenticated(AuthToken::new("t1"), "ana", Some("USER".to_string())));
}

#[tokio::test]
async fn test_events_decode_backend_fields() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events/filter/bydate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 3,
            "title": "Concierto",
            "description": "Jazz en directo",
            "date": "2025-06-01T21:30:00",
            "localizacion": "Madrid Centro",
            "imageUrl": "poster.jpg",
            "availableTickets": 40,
            "soldTickets": 160,
            "price": 25.5,
            "categories": [{"id": 1, "name": "Cultura"}]
        }])))
        .mount(&server)
        .await;
    let api = api_for(&server, ClientConfig::default());

    // Act
    let events = api.events_by_date().await.expect("events");

    // Assert
    let event = &events[0];
    assert_eq!(event.id, EventId::new(3));
    assert_eq!(event.location, "Madrid Centro");
    assert_eq!(event.available_tickets, 40);
    assert_eq!(event.categories[0].name, "Cultura");
    assert_eq!(
        api.image_url(&event.image_ref),
        format!("{}/uploaded-images/poster.jpg", server.uri())
    );
}

#[tokio::test]
async fn test_favorites_load_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events/favorites/list"))
        .and(header("Authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([4, "8"])))
        .expect(1)
        .mount(&server)
        .await;
    let api = api_for(&server, ClientConfig::default());
    signed_in(&api);
    let cache = FavoritesCache::new(api);

    let ids = cache.load().await.expect("load");

    assert_eq!(ids, vec![EventId::new(4), EventId::new(8)]);
}

#[tokio::test]
async fn test_toggle_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/events/favorites/add/12"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/events/favorites/remove/12"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let api = api_for(&server, ClientConfig::default());
    signed_in(&api);
    let cache = FavoritesCache::new(api);

    assert!(cache.toggle(EventId::new(12)).await.unwrap());
    assert!(!cache.toggle(EventId::new(12)).await.unwrap());
    assert!(!cache.is_favorite(EventId::new(12)));
}

#[tokio::test]
async fn test_401_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/profile/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let api = api_for(&server, ClientConfig::default());
    signed_in(&api);

    let error = api.profile().await.unwrap_err();

    assert_eq!(error, SyncError::Auth(AuthError::Unauthorized));
    assert!(!api.session().is_authenticated());
}

#[tokio::test]
async fn test_login_posts_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"username": "ana", "password": "secret1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t9", "role": "ADMIN"})))
        .mount(&server)
        .await;
    let api = api_for(&server, ClientConfig::default());

    let credentials = Credentials::new(" ana ", "secret1").unwrap();
    let session = api.login(&credentials).await.expect("login");

    assert_eq!(session.token, Some(AuthToken::new("t9")));
    assert_eq!(session.role.as_deref(), Some("ADMIN"));
    assert_eq!(api.session().get(), session);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    let api = api_for(
        &server,
        ClientConfig::default().with_request_timeout(Duration::from_millis(100)),
    );

    let error = api.categories().await.unwrap_err();

    assert_eq!(error, SyncError::Network(NetworkError::Timeout));
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let config = ClientConfig::new("http://127.0.0.1:9").unwrap();
    let transport = ReqwestTransport::new(&config).unwrap();
    let api = BackendApi::new(AuthorizedFetch::new(transport, SessionStore::in_memory(), config));
    signed_in(&api);

    let error = api.favorite_ids().await.unwrap_err();

    assert!(matches!(error, SyncError::Network(_)));
    assert!(error.is_retryable());
    assert!(api.session().is_authenticated());
}

#[tokio::test]
async fn test_create_event_uploads_multipart_form() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/events/create"))
        .and(header("Authorization", "Bearer t1"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"title\""))
        .and(body_string_contains("Concierto"))
        .and(body_string_contains("2025-06-01T21:30:00.000Z"))
        .and(body_string_contains("filename=\"poster.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_string("Evento creado"))
        .expect(1)
        .mount(&server)
        .await;
    let api = api_for(&server, ClientConfig::default());
    signed_in(&api);
    let draft = EventDraft::new("Concierto", Utc.with_ymd_and_hms(2025, 6, 1, 21, 30, 0).single(), "100", "25")
        .expect("valid draft")
        .with_categories([CategoryId::new(2)])
        .with_image(EventImage::new("file:///picked/poster.png", b"png-bytes".to_vec()));

    // Act
    let message = api.create_event(&draft).await.expect("create");

    // Assert
    assert_eq!(message, "Evento creado");
}

#[tokio::test]
async fn test_create_event_401_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/events/create"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let api = api_for(&server, ClientConfig::default());
    signed_in(&api);
    let draft = EventDraft::new("Concierto", Utc.with_ymd_and_hms(2025, 6, 1, 21, 30, 0).single(), "100", "25")
        .expect("valid draft");

    let error = api.create_event(&draft).await.unwrap_err();

    assert_eq!(error, SyncError::Auth(AuthError::Unauthorized));
    assert!(!api.session().is_authenticated());
}
