/// Per-user revocation counter
///
/// Every refresh token records the counter value it was minted under. Bumping
/// the stored counter makes every older refresh token fail verification, with
/// no blacklist to keep.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenVersion(i64);

impl TokenVersion {
    pub const INITIAL: TokenVersion = TokenVersion(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TokenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A refresh token is only good while its stamped version equals the user's
/// current one.
pub fn ensure_current(issued: TokenVersion, current: TokenVersion) -> Result<(), TokenError> {
    if issued == current {
        Ok(())
    } else {
        Err(TokenError::RevocationMismatch)
    }
}
