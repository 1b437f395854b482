//! Form input validation.
//!
//! Requests that carry user input are built only from these validated
//! values, so malformed input is rejected locally and never costs a round
//! trip.

use crate::error::ValidationError;
use crate::types::CategoryId;
use chrono::{DateTime, SecondsFormat, Utc};

/// Minimum length for a new password.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Login form input.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Validate login input.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` if either field is blank.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, ValidationError> {
        let username = username.into().trim().to_string();
        let password = password.into();
        if username.is_empty() {
            return Err(ValidationError::MissingField { field: "username" });
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField { field: "password" });
        }
        Ok(Self { username, password })
    }

    /// Username, trimmed
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password as typed
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Change-password form input.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordChange {
    new_password: String,
}

impl PasswordChange {
    /// Validate the change-password form.
    ///
    /// # Errors
    ///
    /// - `MissingField` if any of the three fields is empty
    /// - `PasswordMismatch` if the confirmation differs
    /// - `PasswordTooShort` if the new password is under [`MIN_PASSWORD_LENGTH`] characters
    pub fn new(current: &str, new_password: &str, confirmation: &str) -> Result<Self, ValidationError> {
        for (field, value) in [
            ("current_password", current),
            ("new_password", new_password),
            ("confirm_password", confirmation),
        ] {
            if value.is_empty() {
                return Err(ValidationError::MissingField { field });
            }
        }
        if new_password != confirmation {
            return Err(ValidationError::PasswordMismatch);
        }
        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            });
        }
        Ok(Self {
            new_password: new_password.to_string(),
        })
    }

    /// The validated new password
    #[must_use]
    pub fn new_password(&self) -> &str {
        &self.new_password
    }
}

impl std::fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordChange(***)")
    }
}

/// Number of tickets to add to the cart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CartQuantity(u32);

impl CartQuantity {
    /// Validate a quantity.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidQuantity` for zero.
    pub const fn new(quantity: u32) -> Result<Self, ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::InvalidQuantity { quantity });
        }
        Ok(Self(quantity))
    }

    /// The quantity
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Image attached to a new event.
#[derive(Clone, PartialEq, Eq)]
pub struct EventImage {
    file_name: String,
    bytes: Vec<u8>,
}

impl EventImage {
    /// Image picked from `source` (a path or URI); the file name is its last
    /// segment, `photo.jpg` when there is none.
    #[must_use]
    pub fn new(source: &str, bytes: Vec<u8>) -> Self {
        let file_name = match source.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "photo.jpg".to_string(),
        };
        Self { file_name, bytes }
    }

    /// File name sent with the upload
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `image/<extension>`, or `image` when the name has no extension.
    #[must_use]
    pub fn mime(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                format!("image/{ext}")
            }
            _ => "image".to_string(),
        }
    }

    /// Raw image bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for EventImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventImage")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Create-event form input.
///
/// Title, date, ticket count and price are required; everything else is
/// optional and defaults to empty.
#[derive(Clone, Debug, PartialEq)]
pub struct EventDraft {
    title: String,
    date: DateTime<Utc>,
    available_tickets: u32,
    price: f64,
    description: String,
    location: String,
    event_url: String,
    categories: Vec<CategoryId>,
    image: Option<EventImage>,
}

impl EventDraft {
    /// Validate the required fields of the create-event form.
    ///
    /// Ticket count and price are taken as typed.
    ///
    /// # Errors
    ///
    /// - `MissingField` if the title, date, ticket count or price is empty
    /// - `InvalidNumber` if the ticket count or price is not a non-negative number
    pub fn new(
        title: &str,
        date: Option<DateTime<Utc>>,
        available_tickets: &str,
        price: &str,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField { field: "title" });
        }
        let date = date.ok_or(ValidationError::MissingField { field: "date" })?;
        let available_tickets = required("available_tickets", available_tickets)?
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidNumber {
                field: "available_tickets",
            })?;
        let price = required("price", price)?
            .parse::<f64>()
            .ok()
            .filter(|price| price.is_finite() && *price >= 0.0)
            .ok_or(ValidationError::InvalidNumber { field: "price" })?;

        Ok(Self {
            title: title.to_string(),
            date,
            available_tickets,
            price,
            description: String::new(),
            location: String::new(),
            event_url: String::new(),
            categories: Vec::new(),
            image: None,
        })
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the venue.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set the external event page.
    #[must_use]
    pub fn with_event_url(mut self, event_url: impl Into<String>) -> Self {
        self.event_url = event_url.into();
        self
    }

    /// Set the categories, in selection order.
    #[must_use]
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = CategoryId>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    /// Attach an image.
    #[must_use]
    pub fn with_image(mut self, image: EventImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Title, trimmed
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Attached image, if any
    #[must_use]
    pub const fn image(&self) -> Option<&EventImage> {
        self.image.as_ref()
    }

    /// Text fields in the order the backend's form expects them.
    ///
    /// `categories` repeats once per selected category.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("title", self.title.clone()),
            ("description", self.description.clone()),
            ("date", self.date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("available_tickets", self.available_tickets.to_string()),
            ("price", self.price.to_string()),
            ("localizacion", self.location.clone()),
            ("event_url", self.event_url.clone()),
        ];
        fields.extend(self.categories.iter().map(|id| ("categories", id.to_string())));
        fields
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::MissingField { field })
    } else {
        Ok(value)
    }
}
