use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::DochubError;

/// The authenticated user, as described by the access token's claims.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawPrincipal")]
pub struct Principal {
    /// User ID (`sub` claim).
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Granted claims.
    pub claims: Vec<String>,
}

#[derive(Deserialize)]
struct RawPrincipal {
    sub: String,
    username: String,
    #[serde(default)]
    claims: String,
}

impl From<RawPrincipal> for Principal {
    fn from(raw: RawPrincipal) -> Self {
        Self {
            user_id: raw.sub,
            username: raw.username,
            claims: raw
                .claims
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

impl Principal {
    /// Decode the principal from the payload of a JWT access token.
    ///
    /// The signature is not verified; the service does that on every request.
    ///
    /// # Errors
    ///
    /// Returns `DochubError::Token` if the token is not a JWT or its payload
    /// lacks the expected claims.
    pub fn from_access_token(token: &str) -> Result<Self, DochubError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| DochubError::Token("not a JWT".to_owned()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| DochubError::Token(format!("payload is not base64url: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| DochubError::Token(format!("unexpected claims: {e}")))
    }

    /// Whether the principal holds `claim`.
    pub fn has_claim(&self, claim: &str) -> bool {
        self.claims.iter().any(|c| c == claim)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn claims_are_split_on_commas() {
        let p: Principal = serde_json::from_value(json!({
            "sub": "u1",
            "username": "alice",
            "claims": "user,admin"
        }))
        .unwrap();
        assert_eq!(p.user_id, "u1");
        assert_eq!(p.claims, vec!["user", "admin"]);
        assert!(p.has_claim("admin"));
    }

    #[test]
    fn empty_claims_yield_no_entries() {
        let p: Principal =
            serde_json::from_value(json!({ "sub": "u1", "username": "alice", "claims": "" }))
                .unwrap();
        assert!(p.claims.is_empty());
    }

    #[test]
    fn decodes_jwt_payload() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"u7","username":"bob","claims":"user"}"#);
        let token = format!("eyJhbGciOiJIUzI1NiJ9.{payload}.signature");
        let p = Principal::from_access_token(&token).unwrap();
        assert_eq!(p.username, "bob");
    }

    #[test]
    fn rejects_opaque_tokens() {
        let err = Principal::from_access_token("opaque-token").unwrap_err();
        assert!(matches!(err, DochubError::Token(_)));
    }
}
