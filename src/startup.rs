use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{PasswordHasher, RequestAuthenticator, SessionManager, TokenService};
use crate::configuration::Settings;
use crate::error::AppError;
use crate::middleware::{BearerAuth, RequestLogger};
use crate::routes::{
    get_current_user, health_check, login, logout, refresh, register, revoke_all,
};
use crate::store::UserStore;

/// Wire the auth core from validated settings and a store handle
pub fn build_session_manager(
    store: Arc<dyn UserStore>,
    settings: &Settings,
) -> Result<SessionManager, AppError> {
    SessionManager::new(
        store,
        PasswordHasher::new(settings.security.bcrypt_cost),
        TokenService::new(&settings.jwt),
    )
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let sessions = build_session_manager(store, &settings)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let authenticator = RequestAuthenticator::new(sessions.tokens().clone());

    let sessions = web::Data::new(sessions);
    let security = web::Data::new(settings.security.clone());

    let server = HttpServer::new(move || {
        App::new()
            // The last `wrap` runs first, so the logger also sees auth rejections
            .wrap(BearerAuth::new(authenticator.clone()))
            .wrap(RequestLogger)
            .app_data(sessions.clone())
            .app_data(security.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/logout", web::post().to(logout))
                    .route("/refresh_token", web::post().to(refresh))
                    .route("/revoke/{user_id}", web::post().to(revoke_all))
                    .route("/me", web::get().to(get_current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
