use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::jwt::JwtAuth;
use crate::error::AppError;

/// Extract the bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Auth("Authentication required".into()))?
        .to_str()
        .map_err(|_| AppError::Auth("Invalid Authorization header".into()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AppError::Auth("Authentication required".into())),
    }
}

/// Gate for every admin route: verifies the token and stores the
/// [`AdminClaims`](crate::auth::models::AdminClaims) in the request extensions.
pub async fn require_admin(
    State(jwt): State<Arc<JwtAuth>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = jwt.verify(bearer_token(request.headers())?)?;
    tracing::debug!(admin = %claims.username, "admin request authorized");
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
