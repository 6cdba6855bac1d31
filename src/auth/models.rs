use serde::{Deserialize, Serialize};
use std::fmt;

/// Back-office roles. `Super` is the account created by first-run setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Super,
    Admin,
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminRole::Super => write!(f, "super"),
            AdminRole::Admin => write!(f, "admin"),
        }
    }
}

impl AdminRole {
    /// Parse a role from a string (case-insensitive).
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "super" => Some(AdminRole::Super),
            "admin" => Some(AdminRole::Admin),
            _ => None,
        }
    }
}

/// Claims carried by an admin session token.
///
/// Inserted into the request extensions by the admin middleware, so
/// handlers behind it can take `Extension<AdminClaims>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Hex `ObjectId` of the admin account.
    pub id: String,
    pub username: String,
    pub role: AdminRole,
    /// Expiry as a Unix timestamp (seconds).
    pub exp: u64,
}
