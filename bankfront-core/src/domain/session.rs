//! Session token claims

use serde::{Deserialize, Serialize};

/// Claims carried by the session JWT issued by the user service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub user: String,
    /// Account id
    pub acct: String,
    /// Display name
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Cookie lifetime in seconds
    pub fn max_age(&self) -> i64 {
        (self.exp - self.iat).max(0)
    }
}

/// A verified session: the raw bearer token plus its claims
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: Claims,
}

impl Session {
    pub fn account_id(&self) -> &str {
        &self.claims.acct
    }

    pub fn username(&self) -> &str {
        &self.claims.user
    }
}
