/// Middleware module
///
/// Request authentication and request logging.

mod bearer_auth;
mod request_logger;

pub use bearer_auth::BearerAuth;
pub use request_logger::RequestLogger;
