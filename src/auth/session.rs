/// Session Management
///
/// Login, registration, refresh-token rotation and revoke-all. Every token
/// failure leaves this module as `AuthError::InvalidSession`; the precise
/// reason only goes to the log.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::jwt::{fingerprint, TokenError, TokenService};
use crate::auth::password::PasswordHasher;
use crate::auth::revocation::{ensure_current, TokenVersion};
use crate::error::{AppError, AuthError, StoreError};
use crate::store::{NewUser, UserProfile, UserRecord, UserStore};

/// Tokens handed out after a successful login or refresh
#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserProfile,
    pub access_token: String,
    /// Only ever sent through the refresh cookie
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenService,
    // Checked against when the username is unknown so both login failures
    // take the same time.
    dummy_digest: Arc<str>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        tokens: TokenService,
    ) -> Result<Self, AppError> {
        let dummy_digest = hasher.hash("timing-equalizer-password")?;
        Ok(Self {
            store,
            hasher,
            tokens,
            dummy_digest: Arc::from(dummy_digest),
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create a user. The returned profile never carries the digest.
    ///
    /// # Errors
    /// - `AuthError::AlreadyExists` if the username is taken
    /// - `AppError::Store` if the store fails
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AppError> {
        if self.store.find_by_username(username).await?.is_some() {
            return Err(AuthError::AlreadyExists.into());
        }

        let password_hash = self.hasher.hash_blocking(password.to_string()).await?;

        let record = self
            .store
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                StoreError::UniqueViolation(_) => AppError::Auth(AuthError::AlreadyExists),
                other => AppError::Store(other),
            })?;

        tracing::info!(user_id = %record.id, username = %record.username, "User registered");
        Ok(UserProfile::from(&record))
    }

    /// Check a username/password pair and mint a session.
    ///
    /// Unknown user and wrong password both give
    /// `AuthError::InvalidCredentials`.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Session, AppError> {
        let record = self.store.find_by_username(username).await?;

        let digest = match &record {
            Some(record) => record.password_hash.clone(),
            None => self.dummy_digest.to_string(),
        };
        let password_valid = self
            .hasher
            .verify_blocking(password.to_string(), digest)
            .await?;

        let record = match record {
            Some(record) if password_valid => record,
            _ => return Err(AuthError::InvalidCredentials.into()),
        };

        let session = self.mint_session(&record)?;
        tracing::info!(
            user_id = %record.id,
            token_version = %record.token_version,
            "User logged in"
        );
        Ok(session)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token is rotated: the returned session carries a new one
    /// stamped with the current counter. The presented token stays usable
    /// until it expires or the counter moves.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AppError> {
        let record = match self.check_refresh_token(refresh_token).await {
            Ok(record) => record,
            Err(RefreshFailure::Token(reason)) => {
                tracing::warn!(
                    token = %fingerprint(refresh_token),
                    reason = %reason,
                    "Refresh token rejected"
                );
                return Err(AuthError::InvalidSession.into());
            }
            Err(RefreshFailure::Store(e)) => return Err(e.into()),
        };

        let session = self.mint_session(&record)?;
        tracing::info!(user_id = %record.id, "Session refreshed");
        Ok(session)
    }

    /// Invalidate every refresh token issued to the user so far.
    ///
    /// # Errors
    /// - `StoreError::NotFound` for an unknown user
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<TokenVersion, AppError> {
        let version = self.store.increment_token_version(user_id).await?;
        tracing::info!(user_id = %user_id, token_version = %version, "All sessions revoked");
        Ok(version)
    }

    /// Load the profile of an authenticated user
    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, AppError> {
        let record = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        Ok(UserProfile::from(&record))
    }

    async fn check_refresh_token(&self, token: &str) -> Result<UserRecord, RefreshFailure> {
        let claims = self
            .tokens
            .verify_refresh_token(token)
            .map_err(RefreshFailure::Token)?;
        let user_id = claims.user_id().map_err(RefreshFailure::Token)?;

        let record = self
            .store
            .find_by_id(user_id)
            .await
            .map_err(RefreshFailure::Store)?
            // A deleted user's tokens are as dead as revoked ones
            .ok_or(RefreshFailure::Token(TokenError::RevocationMismatch))?;

        ensure_current(claims.token_version, record.token_version)
            .map_err(RefreshFailure::Token)?;
        Ok(record)
    }

    fn mint_session(&self, record: &UserRecord) -> Result<Session, AppError> {
        let now = Utc::now();
        let access_token = self
            .tokens
            .issue_access_token(record.id, &record.username, now)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let refresh_token = self
            .tokens
            .issue_refresh_token(record.id, record.token_version, now)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Session {
            user: UserProfile::from(record),
            access_token,
            refresh_token,
        })
    }
}

enum RefreshFailure {
    Token(TokenError),
    Store(StoreError),
}
