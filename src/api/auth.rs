use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{middleware, Extension, Router};
use bson::oid::ObjectId;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::response::{ApiResponse, JsonBody};
use crate::app::AppState;
use crate::auth::jwt::JwtAuth;
use crate::auth::middleware::require_admin;
use crate::auth::models::{AdminClaims, AdminRole};
use crate::auth::password::{hash_password, is_hashed, verify_stored_password};
use crate::db::admin_repository::AdminRepository;
use crate::error::AppError;
use crate::models::admin::{Admin, AdminProfile};
use crate::models::entity::non_blank;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub admin: AdminProfile,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetupRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Check the credentials of an active account and issue a session token.
///
/// Unknown usernames and wrong passwords get the same answer. An account
/// still holding a plaintext password is upgraded to a hash on its first
/// successful login.
pub async fn process_login(
    admins: &dyn AdminRepository,
    jwt: &JwtAuth,
    request: LoginRequest,
) -> Result<LoginResponse, AppError> {
    let (Some(username), Some(password)) = (non_blank(request.username), request.password) else {
        return Err(AppError::BadRequest("Username and password are required".into()));
    };

    let rejected = || AppError::Auth("Invalid username or password".into());
    let mut admin = admins
        .find_active_by_username(&username)
        .await?
        .ok_or_else(rejected)?;
    if !verify_stored_password(&password, &admin.password) {
        tracing::warn!(username = %username, "failed admin login");
        return Err(rejected());
    }
    if !is_hashed(&admin.password) {
        admin.password = hash_password(&password)?;
        admins.set_password(&admin.id, &admin.password).await?;
        tracing::info!(username = %username, "legacy admin password rehashed");
    }

    let now = Utc::now();
    admins.record_login(&admin.id, now).await?;
    admin.last_login = Some(now);

    let token = jwt.issue(&admin)?;
    tracing::info!(username = %admin.username, "admin logged in");
    Ok(LoginResponse {
        token,
        admin: AdminProfile::from(&admin),
    })
}

/// The account behind a verified token.
pub async fn process_me(
    admins: &dyn AdminRepository,
    claims: &AdminClaims,
) -> Result<AdminProfile, AppError> {
    let not_found = || AppError::NotFound("Admin not found".into());
    let id = ObjectId::parse_str(&claims.id).map_err(|_| not_found())?;
    let admin = admins.find_by_id(&id).await?.ok_or_else(not_found)?;
    Ok(AdminProfile::from(&admin))
}

/// Create the first account. Refused once any account exists.
pub async fn process_setup(
    admins: &dyn AdminRepository,
    request: SetupRequest,
) -> Result<AdminProfile, AppError> {
    if admins.has_any().await? {
        return Err(AppError::BadRequest("An admin account already exists".into()));
    }

    let (Some(username), Some(password), Some(name)) = (
        non_blank(request.username),
        request.password.filter(|p| !p.is_empty()),
        non_blank(request.name),
    ) else {
        return Err(AppError::BadRequest("Username, password and name are required".into()));
    };

    let now = Utc::now();
    let admin = Admin {
        id: ObjectId::new(),
        username,
        password: hash_password(&password)?,
        name,
        role: AdminRole::Super,
        is_active: true,
        last_login: None,
        created_at: now,
        updated_at: now,
    };
    admins.insert(&admin).await?;
    tracing::info!(username = %admin.username, "initial admin account created");
    Ok(AdminProfile::from(&admin))
}

async fn login_handler(
    State(admins): State<Arc<dyn AdminRepository>>,
    State(jwt): State<Arc<JwtAuth>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let response = process_login(admins.as_ref(), &jwt, request).await?;
    Ok(ApiResponse::ok(response))
}

async fn me_handler(
    State(admins): State<Arc<dyn AdminRepository>>,
    Extension(claims): Extension<AdminClaims>,
) -> Result<ApiResponse<AdminProfile>, AppError> {
    Ok(ApiResponse::ok(process_me(admins.as_ref(), &claims).await?))
}

async fn setup_handler(
    State(admins): State<Arc<dyn AdminRepository>>,
    JsonBody(request): JsonBody<SetupRequest>,
) -> Result<ApiResponse<AdminProfile>, AppError> {
    let profile = process_setup(admins.as_ref(), request).await?;
    Ok(ApiResponse::created(profile).with_message("Admin account created"))
}

/// `/api/auth`
pub fn routes(state: &AppState) -> Router<AppState> {
    let session = Router::new()
        .route("/me", get(me_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/login", post(login_handler))
        .route("/setup", post(setup_handler))
        .merge(session)
}
