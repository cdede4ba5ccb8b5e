//! Turns failures into something presentable: a title, a sentence for the
//! user, diagnostic properties and whether retrying can help.

use std::error::Error as _;
use std::fmt::Write as _;

use serde_json::Value;

use crate::error::DochubError;

const NETWORK_MESSAGE: &str =
    "The server could not be reach due to an network error. Please try again.";

/// What kind of failure happened, independent of where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorShape {
    /// Part of the application itself could not be loaded.
    AssetLoad,
    /// The request was sent but no response arrived.
    NoResponse {
        /// Request method.
        method: String,
        /// Request URL.
        url: String,
    },
    /// The service answered with an error status.
    Response {
        /// Request method.
        method: String,
        /// Request URL.
        url: String,
        /// Numeric status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// Anything else.
    Other {
        /// Error message, if the error carried one.
        message: Option<String>,
        /// Further detail, such as the cause chain.
        detail: Option<String>,
    },
}

/// What the user can do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Repeating the failed operation may succeed.
    Retry,
    /// Only starting over from the home view makes sense.
    Reload,
}

/// A classified error, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Short headline.
    pub title: String,
    /// One sentence for the user.
    pub message: String,
    /// Diagnostic key/value pairs. Empty values are kept here and skipped by
    /// [`ErrorInfo::details`].
    pub properties: Vec<(&'static str, String)>,
    /// Suggested way out.
    pub recovery: Recovery,
}

impl ErrorInfo {
    /// Whether the only way out is to reload.
    pub fn needs_reload(&self) -> bool {
        self.recovery == Recovery::Reload
    }

    /// Non-empty properties as `key: value` lines, or `None` if there are none.
    pub fn details(&self) -> Option<String> {
        let mut out = String::new();
        for (key, value) in self.properties.iter().filter(|(_, v)| !v.is_empty()) {
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = write!(out, "{key}: {value}");
        }
        (!out.is_empty()).then_some(out)
    }
}

/// Classify `shape`.
pub fn inspect_error(shape: &ErrorShape) -> ErrorInfo {
    match shape {
        ErrorShape::AssetLoad => ErrorInfo {
            title: "Network error".to_owned(),
            message: NETWORK_MESSAGE.to_owned(),
            properties: Vec::new(),
            recovery: Recovery::Reload,
        },
        ErrorShape::NoResponse { method, url } => ErrorInfo {
            title: "Network error".to_owned(),
            message: NETWORK_MESSAGE.to_owned(),
            properties: request_properties(method, url),
            recovery: Recovery::Retry,
        },
        ErrorShape::Response {
            method,
            url,
            status,
            body,
        } => {
            let mut properties = request_properties(method, url);
            properties.push(("responseStatus", status.to_string()));
            properties.push(("responseBody", stringify_body(body)));
            let (title, message, recovery) = match status {
                401 => (
                    "Unauthorized".to_owned(),
                    "You tried to access a resource without being authenticated. Please log in first."
                        .to_owned(),
                    Recovery::Reload,
                ),
                403 => (
                    "Forbidden".to_owned(),
                    "You tried to access a resource that you have no access to.".to_owned(),
                    Recovery::Reload,
                ),
                404 => (
                    "Not found".to_owned(),
                    "You tried to access a resource that does not exist.".to_owned(),
                    Recovery::Reload,
                ),
                502..=504 => (
                    "Service unavailable".to_owned(),
                    "The service is currently unavailable. Please try again later.".to_owned(),
                    Recovery::Retry,
                ),
                other => (
                    "Request error".to_owned(),
                    format!("A request failed with HTTP code {other}."),
                    Recovery::Reload,
                ),
            };
            ErrorInfo {
                title,
                message,
                properties,
                recovery,
            }
        }
        ErrorShape::Other { message, detail } => ErrorInfo {
            title: message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Unknown error".to_owned()),
            message: "An error has occured.".to_owned(),
            properties: vec![("stack", detail.clone().unwrap_or_default())],
            recovery: Recovery::Reload,
        },
    }
}

/// Classify a client error.
pub fn inspect_dochub_error(err: &DochubError) -> ErrorInfo {
    inspect_error(&err.shape())
}

impl DochubError {
    /// The shape of this error for classification.
    pub fn shape(&self) -> ErrorShape {
        match self {
            Self::Network { method, url, .. } => ErrorShape::NoResponse {
                method: method.clone(),
                url: url.clone(),
            },
            Self::Http {
                method,
                url,
                status,
                body,
            } => ErrorShape::Response {
                method: method.clone(),
                url: url.clone(),
                status: *status,
                body: body.clone(),
            },
            Self::Config(_) | Self::Body { .. } | Self::Decode(_) | Self::Token(_) => {
                ErrorShape::Other {
                    message: Some(self.to_string()),
                    detail: cause_chain(self),
                }
            }
        }
    }
}

fn request_properties(method: &str, url: &str) -> Vec<(&'static str, String)> {
    vec![
        ("requestMethod", method.to_uppercase()),
        ("requestUrl", url.to_owned()),
    ]
}

/// JSON bodies are pretty-printed, anything else is shown as sent.
fn stringify_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_owned())
        }
        _ => body.to_owned(),
    }
}

fn cause_chain(err: &DochubError) -> Option<String> {
    let mut lines = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::HalError;

    fn response(status: u16, body: &str) -> ErrorShape {
        ErrorShape::Response {
            method: "get".to_owned(),
            url: "/api/documents/42".to_owned(),
            status,
            body: body.to_owned(),
        }
    }

    #[test]
    fn not_found_needs_reload() {
        let info = inspect_error(&response(404, ""));
        assert_eq!(info.title, "Not found");
        assert_eq!(
            info.message,
            "You tried to access a resource that does not exist."
        );
        assert!(info.needs_reload());
        assert!(info.properties.contains(&("responseStatus", "404".to_owned())));
        assert!(info.properties.contains(&("requestMethod", "GET".to_owned())));
    }

    #[test]
    fn gateway_errors_are_retryable() {
        for status in [502, 503, 504] {
            let info = inspect_error(&response(status, ""));
            assert_eq!(info.title, "Service unavailable");
            assert_eq!(info.recovery, Recovery::Retry);
        }
    }

    #[test]
    fn auth_errors() {
        let info = inspect_error(&response(401, ""));
        assert_eq!(info.title, "Unauthorized");
        assert!(info.needs_reload());

        let info = inspect_error(&response(403, ""));
        assert_eq!(info.title, "Forbidden");
        assert!(info.needs_reload());
    }

    #[test]
    fn other_status_is_a_request_error() {
        let info = inspect_error(&response(500, "boom"));
        assert_eq!(info.title, "Request error");
        assert_eq!(info.message, "A request failed with HTTP code 500.");
        assert!(info.needs_reload());
        assert!(info.properties.contains(&("responseBody", "boom".to_owned())));
    }

    #[test]
    fn no_response_is_a_retryable_network_error() {
        let info = inspect_error(&ErrorShape::NoResponse {
            method: "post".to_owned(),
            url: "http://localhost:8080/api/documents".to_owned(),
        });
        assert_eq!(info.title, "Network error");
        assert_eq!(info.recovery, Recovery::Retry);
        assert_eq!(
            info.details().unwrap(),
            "requestMethod: POST\nrequestUrl: http://localhost:8080/api/documents"
        );
    }

    #[test]
    fn asset_load_failure_needs_reload() {
        let info = inspect_error(&ErrorShape::AssetLoad);
        assert_eq!(info.title, "Network error");
        assert!(info.needs_reload());
        assert!(info.details().is_none());
    }

    #[test]
    fn json_bodies_are_pretty_printed() {
        let info = inspect_error(&response(400, r#"{"error":"bad"}"#));
        let body = &info
            .properties
            .iter()
            .find(|(k, _)| *k == "responseBody")
            .unwrap()
            .1;
        assert_eq!(body, "{\n  \"error\": \"bad\"\n}");
    }

    #[test]
    fn details_skip_empty_values() {
        let info = inspect_error(&response(404, ""));
        let details = info.details().unwrap();
        assert!(details.contains("responseStatus: 404"));
        assert!(!details.contains("responseBody"));
    }

    #[test]
    fn unknown_errors_use_their_message() {
        let info = inspect_error(&ErrorShape::Other {
            message: Some("disk full".to_owned()),
            detail: None,
        });
        assert_eq!(info.title, "disk full");
        assert_eq!(info.message, "An error has occured.");
        assert!(info.needs_reload());

        let info = inspect_error(&ErrorShape::Other {
            message: None,
            detail: None,
        });
        assert_eq!(info.title, "Unknown error");
    }

    #[test]
    fn client_errors_map_to_shapes() {
        let err = DochubError::Http {
            method: "GET".to_owned(),
            url: "http://x/api/documents/1".to_owned(),
            status: 404,
            body: String::new(),
        };
        assert_eq!(inspect_dochub_error(&err).title, "Not found");

        let source = serde_json::from_str::<Value>("{").unwrap_err();
        let err = DochubError::Decode(HalError::json("response body", source));
        let info = inspect_dochub_error(&err);
        assert!(info.title.starts_with("dochub decode error"));
        assert!(info.details().unwrap().starts_with("stack: caused by:"));
    }
}
