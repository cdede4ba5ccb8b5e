use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::table::Row;

/// Access level granted to an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Full access, including account administration.
    Admin,
    /// Read and write documents.
    Write,
    /// Read-only access.
    Read,
}

impl Scope {
    /// Every scope, most privileged first.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Write, Self::Read];

    /// Scopes preselected for a new key.
    pub const DEFAULT: [Self; 1] = [Self::Read];

    /// Wire name of the scope.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Write => "write",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known scope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scope \"{0}\" (expected admin, write or read)")]
pub struct ScopeParseError(pub String);

impl FromStr for Scope {
    type Err = ScopeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ScopeParseError(s.to_owned()))
    }
}

/// An API key as returned by list operations.
///
/// Carries no secret: the service only reveals it once, in the response to
/// the create call, which decodes into [`CreatedApiKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    /// API key ID.
    pub id: String,
    /// Owner's user ID.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Granted scopes. `None` means the key inherits the owner's permissions.
    #[serde(default)]
    pub scopes: Option<Vec<Scope>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last time the key authenticated a request, if ever.
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Scopes joined for display, e.g. `"write, read"`.
    pub fn scopes_label(&self) -> String {
        self.scopes
            .as_deref()
            .unwrap_or_default()
            .iter()
            .copied()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Row for ApiKey {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A freshly created API key together with its one-time secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedApiKey {
    /// The key's regular fields.
    #[serde(flatten)]
    pub api_key: ApiKey,
    /// The secret. Shown exactly once and never retrievable again.
    pub secret: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scope_parses_case_insensitively() {
        assert_eq!("WRITE".parse::<Scope>().unwrap(), Scope::Write);
        assert!("owner".parse::<Scope>().is_err());
    }

    #[test]
    fn scopes_label_joins_in_order() {
        let mut key: ApiKey = serde_json::from_value(json!({
            "id": "k1",
            "userId": "u1",
            "name": "ci",
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(key.scopes_label(), "");
        key.scopes = Some(vec![Scope::Write, Scope::Read]);
        assert_eq!(key.scopes_label(), "write, read");
    }

    #[test]
    fn listed_key_has_no_secret() {
        let key: ApiKey = serde_json::from_value(json!({
            "id": "k1",
            "userId": "u1",
            "name": "ci",
            "secret": "leaked?",
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(key.last_used_at, None);
        assert_eq!(key.scopes, None);
        let back = serde_json::to_value(&key).unwrap();
        assert!(back.get("secret").is_none());
    }

    #[test]
    fn created_key_carries_secret() {
        let created: CreatedApiKey = serde_json::from_value(json!({
            "id": "k1",
            "userId": "u1",
            "name": "ci",
            "secret": "s3cr3t",
            "scopes": ["write", "read"],
            "createdAt": "2024-01-01T00:00:00Z",
            "lastUsedAt": null
        }))
        .unwrap();
        assert_eq!(created.secret, "s3cr3t");
        assert_eq!(created.api_key.scopes_label(), "write, read");
    }
}
