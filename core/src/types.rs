//! Domain types for the Boxoffice client.
//!
//! Events, categories and profiles mirror the backend's JSON. Field names
//! on the wire follow the backend (`localizacion`, `imageUrl`, camelCase);
//! the Rust side uses descriptive names.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
///
/// The backend sends numeric ids, but some endpoints serialize them as
/// strings; both forms deserialize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Create an `EventId` from its numeric value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the numeric value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for EventId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(id) => Ok(Self(id)),
            RawId::Text(text) => text
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("invalid event id: {text:?}"))),
        }
    }
}

/// Unique identifier for a category
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(i64);

impl CategoryId {
    /// Create a `CategoryId` from its numeric value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the numeric value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Event category
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category id
    pub id: CategoryId,
    /// Display name
    pub name: String,
}

/// Immutable snapshot of an event as fetched from the catalog.
///
/// Favorite status is deliberately absent: it is joined in at render time
/// from the favorites cache so overlapping lists can never disagree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event id
    pub id: EventId,
    /// Title
    pub title: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// When the event takes place
    #[serde(deserialize_with = "wire_date::deserialize")]
    pub date: DateTime<Utc>,
    /// Venue or address
    #[serde(rename = "localizacion", default)]
    pub location: String,
    /// Uploaded image file name, resolved against `{base}/uploaded-images/`
    #[serde(rename = "imageUrl", default)]
    pub image_ref: String,
    /// Tickets still on sale
    #[serde(default)]
    pub available_tickets: u32,
    /// Tickets already sold
    #[serde(default)]
    pub sold_tickets: u32,
    /// Unit price
    #[serde(default)]
    pub price: f64,
    /// Username of the organizer
    #[serde(default)]
    pub organizer_username: Option<String>,
    /// External event page
    #[serde(default)]
    pub event_url: Option<String>,
    /// Categories the event belongs to
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// Parses event dates as the backend emits them.
///
/// Accepts RFC 3339 as well as zone-less ISO timestamps, which are taken as UTC.
pub mod wire_date {
    use super::{DateTime, Deserialize, Deserializer, NaiveDateTime, Utc};

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

    /// Parse a backend timestamp.
    #[must_use]
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
            return Some(date.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }

    /// Serde adapter for [`parse`].
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string is not a recognised timestamp.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid event date: {raw:?}")))
    }
}

// ============================================================================
// Session & Profile
// ============================================================================

/// Bearer token issued by the backend at login.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Authenticated user context.
///
/// All fields absent means "signed out".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token
    pub token: Option<AuthToken>,
    /// Username typed at login
    pub username: Option<String>,
    /// Role returned by the backend
    pub role: Option<String>,
}

impl Session {
    /// Session established by a successful login
    #[must_use]
    pub fn authenticated(token: AuthToken, username: impl Into<String>, role: Option<String>) -> Self {
        Self {
            token: Some(token),
            username: Some(username.into()),
            role,
        }
    }

    /// Returns `true` if a token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.token.is_none() && self.username.is_none() && self.role.is_none()
    }
}

/// Profile of the signed-in user (`GET /api/auth/profile/me`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Username
    pub username: String,
    /// Role
    #[serde(default)]
    pub role: Option<String>,
    /// Email
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn test_event_from_backend_json() {
        let json = r#"{
            "id": 7,
            "title": "Jazz Night",
            "description": "Live jazz",
            "date": "2025-06-01T21:00:00",
            "soldTickets": 10,
            "availableTickets": 90,
            "imageUrl": "jazz.png",
            "localizacion": "Madrid Centro",
            "price": 25.5,
            "organizerUsername": "ana",
            "eventUrl": "https://example.com/jazz",
            "categories": [{"id": 3, "name": "Cultura"}]
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.id, EventId::new(7));
        assert_eq!(event.location, "Madrid Centro");
        assert_eq!(event.image_ref, "jazz.png");
        assert_eq!(event.available_tickets, 90);
        assert_eq!(event.categories[0].id, CategoryId::new(3));
        assert_eq!(event.date.to_rfc3339(), "2025-06-01T21:00:00+00:00");
    }

    #[test]
    fn test_event_id_accepts_strings() {
        let ids: Vec<EventId> = serde_json::from_str(r#"[1, "2", " 3 "]"#).unwrap();
        assert_eq!(ids, vec![EventId::new(1), EventId::new(2), EventId::new(3)]);
        assert!(serde_json::from_str::<EventId>(r#""abc""#).is_err());
    }

    #[test]
    fn test_wire_date_accepts_offsets() {
        let date = wire_date::parse("2025-06-01T21:00:00+02:00").unwrap();
        assert_eq!(date.to_rfc3339(), "2025-06-01T19:00:00+00:00");
        assert!(wire_date::parse("next friday").is_none());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let session = Session::authenticated(AuthToken::new("secret"), "ana", None);
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret"));
        assert_eq!(session.token.unwrap().bearer(), "Bearer secret");
    }

    #[test]
    fn test_empty_session() {
        assert!(Session::default().is_empty());
        assert!(!Session::default().is_authenticated());
    }
}
