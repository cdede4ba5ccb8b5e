//! Error types for the dochub client.
//!
//! Accessors never swallow failures: transport results are converted into
//! [`DochubError`] once and then propagate unchanged to whoever presents them
//! (see [`crate::error_info`]).

use serde_json::Value;

/// Errors from decoding a HAL envelope.
#[derive(Debug, thiserror::Error)]
pub enum HalError {
    /// The raw value did not have the expected JSON type.
    #[error("expected {expected} for {context}, found {found}")]
    Shape {
        /// Which part of the envelope was being decoded.
        context: &'static str,
        /// The JSON type that was expected.
        expected: &'static str,
        /// The JSON type that was actually present.
        found: &'static str,
    },

    /// A record inside the envelope could not be deserialized.
    #[error("failed to decode {context}: {source}")]
    Json {
        /// Which part of the envelope was being decoded.
        context: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl HalError {
    pub(crate) fn shape(context: &'static str, expected: &'static str, found: &Value) -> Self {
        Self::Shape {
            context,
            expected,
            found: json_type_name(found),
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }
}

/// All errors that can occur when talking to the dochub service.
#[derive(Debug, thiserror::Error)]
pub enum DochubError {
    /// Missing or invalid client configuration.
    #[error("dochub config error: {0}")]
    Config(String),

    /// The request was sent but no response arrived.
    #[error("{method} {url} failed without a response: {source}")]
    Network {
        /// HTTP method, uppercase.
        method: String,
        /// Full request URL.
        url: String,
        /// Transport error from the HTTP client.
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{method} {url} returned HTTP {status}")]
    Http {
        /// HTTP method, uppercase.
        method: String,
        /// Full request URL.
        url: String,
        /// Numeric status code.
        status: u16,
        /// Raw response body, possibly empty.
        body: String,
    },

    /// The service answered, but its body broke off while being read.
    #[error("{method} {url} returned HTTP {status} but the body could not be read: {source}")]
    Body {
        /// HTTP method, uppercase.
        method: String,
        /// Full request URL.
        url: String,
        /// Numeric status code.
        status: u16,
        /// Transport error from the HTTP client.
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match the expected envelope.
    #[error("dochub decode error: {0}")]
    Decode(#[from] HalError),

    /// The access token could not be decoded into a principal.
    #[error("invalid access token: {0}")]
    Token(String),
}

impl DochubError {
    /// HTTP status code, if the service responded at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Body { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the service answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
