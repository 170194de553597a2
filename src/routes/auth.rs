/// Authentication Routes
///
/// Registration, login, logout, token refresh, revoke-all and the current
/// user's profile. The refresh token only ever travels in the
/// `refresh_token` cookie; JSON bodies carry the access token alone.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{Caller, Session, SessionManager};
use crate::configuration::SecuritySettings;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::store::UserProfile;
use crate::validators::{is_valid_email, is_valid_password, is_valid_username};

pub const REFRESH_COOKIE_NAME: &str = "refresh_token";
pub const REFRESH_COOKIE_PATH: &str = "/auth/refresh_token";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of login and refresh responses
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct AckResponse {
    pub success: bool,
}

#[derive(Serialize)]
pub struct RevokeResponse {
    pub success: bool,
    pub token_version: i64,
}

/// POST /auth/register
///
/// # Errors
/// - 400: invalid username, email or password shape
/// - 409: username already taken
pub async fn register(
    form: web::Json<RegisterRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let username = is_valid_username(&form.username)?;
    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;

    let profile = sessions.register(&username, &email, &form.password).await?;

    Ok(HttpResponse::Created().json(profile))
}

/// POST /auth/login
///
/// Returns the access token in the body and sets the refresh cookie.
///
/// # Errors
/// - 400: invalid username or password shape
/// - 401: invalid credentials, same response whether or not the user exists
/// - 503: user store unavailable
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionManager>,
    security: web::Data<SecuritySettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let username = is_valid_username(&form.username)?;
    is_valid_password(&form.password)?;

    let session = sessions
        .authenticate(&username, &form.password)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    Ok(session_response(&session, &sessions, &security))
}

/// POST /auth/logout
///
/// Clears the refresh cookie on this client. Other sessions are untouched;
/// use revoke for that.
pub async fn logout(security: web::Data<SecuritySettings>) -> HttpResponse {
    tracing::debug!("Clearing refresh cookie");
    HttpResponse::Ok()
        .cookie(clear_refresh_cookie(security.secure_cookies))
        .json(AckResponse { success: true })
}

/// POST /auth/refresh_token
///
/// Reads the refresh cookie, returns a new access token and rotates the
/// cookie.
///
/// # Errors
/// - 401: missing, invalid, expired or revoked refresh token
/// - 503: user store unavailable
pub async fn refresh(
    req: HttpRequest,
    sessions: web::Data<SessionManager>,
    security: web::Data<SecuritySettings>,
) -> Result<HttpResponse, AppError> {
    let token = req
        .cookie(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::InvalidSession)?;

    let session = sessions.refresh(&token).await?;

    Ok(session_response(&session, &sessions, &security))
}

/// POST /auth/revoke/{user_id}
///
/// Bumps the user's revocation counter. Callers may revoke their own
/// sessions; admins may revoke anyone's.
///
/// # Errors
/// - 401: anonymous caller
/// - 403: caller is neither the user nor an admin
/// - 404: unknown user
pub async fn revoke_all(
    path: web::Path<Uuid>,
    caller: web::ReqData<Caller>,
    sessions: web::Data<SessionManager>,
    security: web::Data<SecuritySettings>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let identity = caller.into_inner().require_identity()?;

    if identity.user_id != user_id && !security.is_admin(&identity.username) {
        tracing::warn!(
            caller = %identity.user_id,
            target_user = %user_id,
            "Revoke denied"
        );
        return Err(AuthError::Forbidden.into());
    }

    let context = ErrorContext::new("revoke_all").with_user_id(identity.user_id.to_string());
    let version = sessions.revoke_all(user_id).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    Ok(HttpResponse::Ok().json(RevokeResponse {
        success: true,
        token_version: version.value(),
    }))
}

/// GET /auth/me
///
/// # Errors
/// - 401: anonymous caller
pub async fn get_current_user(
    caller: web::ReqData<Caller>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let identity = caller.into_inner().require_identity()?;
    let context = ErrorContext::new("get_current_user").with_user_id(identity.user_id.to_string());
    let profile = sessions.profile(identity.user_id).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    Ok(HttpResponse::Ok().json(profile))
}

fn session_response(
    session: &Session,
    sessions: &SessionManager,
    security: &SecuritySettings,
) -> HttpResponse {
    let cookie = refresh_cookie(
        session.refresh_token.clone(),
        sessions.tokens().refresh_ttl().num_seconds(),
        security.secure_cookies,
    );

    HttpResponse::Ok().cookie(cookie).json(TokenResponse {
        access_token: session.access_token.clone(),
        token_type: "Bearer".to_string(),
        expires_in: sessions.tokens().access_ttl().num_seconds(),
        user: session.user.clone(),
    })
}

fn refresh_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE_NAME, token)
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

fn clear_refresh_cookie(secure: bool) -> Cookie<'static> {
    refresh_cookie(String::new(), 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = refresh_cookie("abc".to_string(), 604800, true);

        assert_eq!(cookie.name(), REFRESH_COOKIE_NAME);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some(REFRESH_COOKIE_PATH));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(604800)));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_refresh_cookie(false);

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.path(), Some(REFRESH_COOKIE_PATH));
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }
}
