/// JWT claim sets
///
/// Access and refresh tokens carry different claims and are signed with
/// different secrets. Both use the registered `sub`, `iat`, `exp` and `iss`
/// claims (RFC 7519).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::revocation::TokenVersion;
use crate::auth::TokenError;

/// Claims for short-lived access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
}

/// Claims for long-lived refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: String,
    /// The user's revocation counter when this token was minted
    pub token_version: TokenVersion,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn new(
        user_id: Uuid,
        username: String,
        issued_at: DateTime<Utc>,
        ttl: Duration,
        issuer: String,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            username,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            iss: issuer,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        parse_subject(&self.sub)
    }
}

impl RefreshClaims {
    pub fn new(
        user_id: Uuid,
        token_version: TokenVersion,
        issued_at: DateTime<Utc>,
        ttl: Duration,
        issuer: String,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            token_version,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            iss: issuer,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        parse_subject(&self.sub)
    }
}

fn parse_subject(sub: &str) -> Result<Uuid, TokenError> {
    Uuid::parse_str(sub).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_claims_creation() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let claims = AccessClaims::new(
            user_id,
            "bob".to_string(),
            now,
            Duration::minutes(15),
            "test".to_string(),
        );

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.username, "bob");
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_refresh_claims_carry_version() {
        let user_id = Uuid::new_v4();
        let claims = RefreshClaims::new(
            user_id,
            TokenVersion::new(3),
            Utc::now(),
            Duration::days(7),
            "test".to_string(),
        );

        assert_eq!(claims.token_version, TokenVersion::new(3));
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_invalid_subject() {
        let mut claims = AccessClaims::new(
            Uuid::new_v4(),
            "bob".to_string(),
            Utc::now(),
            Duration::minutes(15),
            "test".to_string(),
        );
        claims.sub = "invalid-uuid".to_string();

        assert_eq!(claims.user_id(), Err(TokenError::Malformed));
    }
}
