/// Authentication module
///
/// Password hashing, JWT signing/validation, the per-user revocation counter,
/// session management and request authentication.

mod claims;
mod identity;
mod jwt;
mod password;
mod revocation;
mod session;

pub use claims::{AccessClaims, RefreshClaims};
pub use identity::{parse_bearer, Caller, Identity, RequestAuthenticator};
pub use jwt::{fingerprint, TokenCodec, TokenError, TokenService};
pub use password::{PasswordHasher, MAX_BCRYPT_COST, MAX_PASSWORD_BYTES, MIN_BCRYPT_COST};
pub use revocation::{ensure_current, TokenVersion};
pub use session::{Session, SessionManager};
