//! HTTP transport.
//!
//! The sync layer talks to the network only through [`HttpTransport`], so
//! tests can substitute a scripted transport and the production build uses
//! [`ReqwestTransport`]. Timeouts are the transport's job and surface as
//! [`NetworkError::Timeout`].

use crate::config::ClientConfig;
use boxoffice_core::error::NetworkError;
use std::future::Future;

pub use reqwest::Method;

/// One field of a `multipart/form-data` body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormPart {
    /// Plain text field
    Text {
        /// Field name
        name: String,
        /// Field value
        value: String,
    },
    /// File upload
    File {
        /// Field name
        name: String,
        /// File name sent to the server
        file_name: String,
        /// MIME type
        mime: String,
        /// File contents
        bytes: Vec<u8>,
    },
}

/// Ordered `multipart/form-data` fields. Names may repeat.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    /// Empty form
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        });
        self
    }

    /// Fields in insertion order
    #[must_use]
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Every text value sent under `name`, in order.
    #[must_use]
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                FormPart::Text { name: key, value } if key == name => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    fn size(&self) -> usize {
        self.parts
            .iter()
            .map(|part| match part {
                FormPart::Text { value, .. } => value.len(),
                FormPart::File { bytes, .. } => bytes.len(),
            })
            .sum()
    }

    fn into_reqwest(self) -> Result<reqwest::multipart::Form, NetworkError> {
        let mut form = reqwest::multipart::Form::new();
        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let file = reqwest::multipart::Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(&mime)
                        .map_err(|e| NetworkError::Transport(e.to_string()))?;
                    form.part(name, file)
                }
            };
        }
        Ok(form)
    }
}

/// Request payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
    /// Serialized JSON
    Json(Vec<u8>),
    /// `multipart/form-data`; the transport picks the boundary
    Multipart(MultipartForm),
}

impl RequestBody {
    /// JSON bytes, if this is a JSON body
    #[must_use]
    pub fn as_json(&self) -> Option<&[u8]> {
        match self {
            Self::Json(bytes) => Some(bytes),
            Self::Multipart(_) => None,
        }
    }

    /// Form, if this is a multipart body
    #[must_use]
    pub const fn as_multipart(&self) -> Option<&MultipartForm> {
        match self {
            Self::Multipart(form) => Some(form),
            Self::Json(_) => None,
        }
    }

    fn size(&self) -> usize {
        match self {
            Self::Json(bytes) => bytes.len(),
            Self::Multipart(form) => form.size(),
        }
    }
}

/// Outbound request, fully resolved (absolute URL, final headers).
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Header name/value pairs
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    /// Request without headers or body
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// First value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Path component of the URL (`/api/categories`).
    #[must_use]
    pub fn path(&self) -> String {
        reqwest::Url::parse(&self.url)
            .map_or_else(|_| self.url.clone(), |url| url.path().to_string())
    }
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(key, value)| {
                if key.eq_ignore_ascii_case("authorization") {
                    (key.as_str(), "***")
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body_len", &self.body.as_ref().map(RequestBody::size))
            .finish()
    }
}

/// Raw response: status and body bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

/// Sends requests over the network.
///
/// # Implementation Notes
///
/// - Must classify failures as [`NetworkError`]; never map a status code to an error
/// - Must enforce its own timeouts
pub trait HttpTransport: Send + Sync + 'static {
    /// Send `request` and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` on timeout, connection failure or an
    /// interrupted body.
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, NetworkError>> + Send;
}

/// Production transport backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the timeouts from `config`.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::Transport` if the HTTP client cannot be
    /// initialised (e.g. TLS backend failure).
    pub fn new(config: &ClientConfig) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, NetworkError>> + Send {
        let client = self.client.clone();

        async move {
            let mut builder = client.request(request.method, &request.url);
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            match request.body {
                Some(RequestBody::Json(bytes)) => builder = builder.body(bytes),
                Some(RequestBody::Multipart(form)) => builder = builder.multipart(form.into_reqwest()?),
                None => {}
            }

            let response = builder.send().await.map_err(classify)?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(classify)?;

            Ok(HttpResponse {
                status,
                body: body.to_vec(),
            })
        }
    }
}

fn classify(error: reqwest::Error) -> NetworkError {
    if error.is_timeout() {
        NetworkError::Timeout
    } else if error.is_connect() {
        NetworkError::Connect(error.to_string())
    } else {
        NetworkError::Transport(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_strips_host() {
        let request = HttpRequest::new(Method::GET, "http://localhost:8080/api/events/favorites/list");
        assert_eq!(request.path(), "/api/events/favorites/list");
    }

    #[test]
    fn test_debug_redacts_authorization() {
        let mut request = HttpRequest::new(Method::GET, "http://localhost/api");
        request.headers.push(("Authorization".to_string(), "Bearer secret".to_string()));

        assert_eq!(request.header("authorization"), Some("Bearer secret"));
        assert!(!format!("{request:?}").contains("secret"));
    }

    #[test]
    fn test_multipart_form_keeps_repeated_fields_in_order() {
        let form = MultipartForm::new()
            .text("title", "Concierto")
            .text("categories", "1")
            .file("image", "poster.png", "image/png", vec![0; 4])
            .text("categories", "4");

        assert_eq!(form.texts("categories"), vec!["1", "4"]);
        assert_eq!(form.parts().len(), 4);
        assert_eq!(RequestBody::Multipart(form.clone()).size(), "Concierto".len() + 1 + 4 + 1);
        assert!(form.into_reqwest().is_ok());
    }

    #[test]
    fn test_bad_mime_is_a_transport_error() {
        let form = MultipartForm::new().file("image", "x", "not a mime", Vec::new());
        assert!(matches!(form.into_reqwest(), Err(NetworkError::Transport(_))));
    }
}
