/// Request authentication
///
/// Turns the bearer value of a request into a `Caller`. A missing credential
/// is anonymous; a present but bad one is an error, never anonymous.

use uuid::Uuid;

use crate::auth::jwt::{fingerprint, TokenService};
use crate::error::AuthError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

/// Who is making a request. Handed explicitly to every gated operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated(Identity),
}

impl Caller {
    pub fn require_identity(self) -> Result<Identity, AuthError> {
        match self {
            Caller::Authenticated(identity) => Ok(identity),
            Caller::Anonymous => Err(AuthError::Unauthorized),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Caller::Authenticated(identity) => Some(identity),
            Caller::Anonymous => None,
        }
    }
}

#[derive(Clone)]
pub struct RequestAuthenticator {
    tokens: TokenService,
}

impl RequestAuthenticator {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }

    /// Verify an access token, if one was presented
    pub fn authenticate_request(&self, bearer: Option<&str>) -> Result<Caller, AuthError> {
        let token = match bearer {
            None => return Ok(Caller::Anonymous),
            Some(token) => token,
        };

        let identity = self
            .tokens
            .verify_access_token(token)
            .and_then(|claims| {
                Ok(Identity {
                    user_id: claims.user_id()?,
                    username: claims.username,
                })
            })
            .map_err(|e| {
                tracing::warn!(token = %fingerprint(token), reason = %e, "Access token rejected");
                AuthError::Unauthorized
            })?;

        Ok(Caller::Authenticated(identity))
    }
}

/// Extract the token from an `Authorization` header value.
///
/// Only the `Bearer` scheme is accepted; anything else yields `None`.
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenCodec;
    use crate::auth::AccessClaims;
    use crate::configuration::JwtSettings;
    use chrono::{Duration, Utc};

    fn jwt_settings() -> JwtSettings {
        JwtSettings {
            access_secret: "access-secret-key-at-least-32-characters".to_string(),
            refresh_secret: "refresh-secret-key-at-least-32-characters".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    fn authenticator() -> (RequestAuthenticator, TokenService) {
        let tokens = TokenService::new(&jwt_settings());
        (RequestAuthenticator::new(tokens.clone()), tokens)
    }

    #[test]
    fn test_no_bearer_is_anonymous() {
        let (auth, _) = authenticator();
        assert_eq!(auth.authenticate_request(None), Ok(Caller::Anonymous));
    }

    #[test]
    fn test_valid_token_yields_identity() {
        let (auth, tokens) = authenticator();
        let user_id = Uuid::new_v4();
        let token = tokens.issue_access_token(user_id, "bob", Utc::now()).unwrap();

        let caller = auth.authenticate_request(Some(&token)).unwrap();
        assert_eq!(
            caller,
            Caller::Authenticated(Identity {
                user_id,
                username: "bob".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_token_is_rejected_not_anonymous() {
        let (auth, _) = authenticator();
        assert_eq!(
            auth.authenticate_request(Some("garbage")),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let (auth, _) = authenticator();
        let settings = jwt_settings();
        let codec = TokenCodec::new(&settings.access_secret, &settings.issuer);
        let claims = AccessClaims::new(
            Uuid::new_v4(),
            "bob".to_string(),
            Utc::now() - Duration::hours(1),
            Duration::minutes(15),
            settings.issuer.clone(),
        );
        let token = codec.sign(&claims).unwrap();

        assert_eq!(
            auth.authenticate_request(Some(&token)),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let (auth, tokens) = authenticator();
        let token = tokens
            .issue_refresh_token(Uuid::new_v4(), Default::default(), Utc::now())
            .unwrap();

        assert_eq!(
            auth.authenticate_request(Some(&token)),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn test_require_identity() {
        assert_eq!(
            Caller::Anonymous.require_identity(),
            Err(AuthError::Unauthorized)
        );

        let identity = Identity {
            user_id: Uuid::new_v4(),
            username: "bob".to_string(),
        };
        assert_eq!(
            Caller::Authenticated(identity.clone()).require_identity(),
            Ok(identity)
        );
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(parse_bearer("bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("Basic dXNlcjpwYXNz"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("abc.def.ghi"), None);
    }
}
