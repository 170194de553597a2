mod auth;
mod health_check;

pub use auth::{
    get_current_user, login, logout, refresh, register, revoke_all, AckResponse, LoginRequest,
    RegisterRequest, RevokeResponse, TokenResponse, REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH,
};
pub use health_check::health_check;
