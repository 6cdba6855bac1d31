use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::models::AdminRole;
use crate::models::bson_serde::{object_id, opt_timestamp, timestamp};

/// A back-office account stored in the `admins` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    #[serde(rename = "_id", with = "object_id")]
    pub id: ObjectId,
    pub username: String,
    /// Argon2 PHC string.
    pub password: String,
    pub name: String,
    pub role: AdminRole,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn active_by_default() -> bool {
    true
}

/// What clients get to see of an admin account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: AdminRole,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&Admin> for AdminProfile {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id.to_hex(),
            username: admin.username.clone(),
            name: admin.name.clone(),
            role: admin.role,
            last_login: admin.last_login,
        }
    }
}
