use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::models::AdminClaims;
use crate::error::AppError;
use crate::models::admin::Admin;

/// Issues and verifies HS256 admin session tokens.
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtAuth {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Sign a token for the given account.
    pub fn issue(&self, admin: &Admin) -> Result<String, AppError> {
        let exp = (Utc::now() + self.ttl).timestamp().max(0) as u64;
        let claims = AdminClaims {
            id: admin.id.to_hex(),
            username: admin.username.clone(),
            role: admin.role,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Validate signature and expiry and return the claims.
    pub fn verify(&self, token: &str) -> Result<AdminClaims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<AdminClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected admin token: {e}");
                AppError::Auth("Invalid or expired token".into())
            })
    }
}
