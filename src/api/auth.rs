//! Authentication API endpoints.
//!
//! - POST `/register` - Create an account, returns both tokens
//! - POST `/login` - Password login, returns both tokens
//! - POST `/refresh` - Exchange a live refresh token for a new access token
//! - POST `/logout` - Revoke a refresh token (requires bearer access token)

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;

use super::error::{ApiError, ResultExt};
use crate::auth::{ApiAuth, HasAuthState};
use crate::db::{Database, User};
use crate::jwt::TokenKeys;
use crate::password;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub keys: Arc<TokenKeys>,
}

impl HasAuthState for AuthState {
    fn keys(&self) -> &TokenKeys {
        &self.keys
    }
}

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
}

// --- Request/response types ---

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize, Default)]
struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
struct UserInfo {
    id: String,
    username: String,
    email: String,
    role: crate::db::UserRole,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.uuid.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    message: &'static str,
    access_token: String,
    refresh_token: String,
    user: UserInfo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Mint both tokens for a user and persist the refresh token.
/// Expired tokens for the same user are pruned on the way.
async fn issue_session(
    state: &AuthState,
    user: &User,
) -> Result<(String, String), ApiError> {
    let access = state.keys.generate_access_token(&user.uuid).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        ApiError::internal("Failed to generate token")
    })?;
    let refresh = state.keys.generate_refresh_token(&user.uuid).map_err(|e| {
        error!("Failed to generate refresh token: {}", e);
        ApiError::internal("Failed to generate token")
    })?;

    state
        .db
        .refresh_tokens()
        .create(user.id, &refresh.token, refresh.expires_at)
        .await
        .db_err("Failed to persist refresh token")?;

    // Drop whatever sessions have already expired for this user
    state
        .db
        .refresh_tokens()
        .delete_expired_for_user(user.id, unix_now())
        .await
        .db_err("Failed to prune expired tokens")?;

    Ok((access.token, refresh.token))
}

// --- Handlers ---

/// Register a new user and open a session.
async fn register(
    State(state): State<AuthState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim();
    let email = req.email.trim();

    if username.is_empty() || email.is_empty() {
        return Err(ApiError::bad_request("Username and email are required"));
    }
    if req.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let taken = state
        .db
        .users()
        .exists(email, username)
        .await
        .db_err("Failed to check existing user")?;
    if taken {
        return Err(ApiError::bad_request("User already exists"));
    }

    let password_hash = password::hash_password(&req.password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to create user")
    })?;

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .users()
        .create(&uuid, username, email, &password_hash)
        .await
        .db_err("Failed to create user")?;

    let user = state
        .db
        .users()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::internal("Failed to create user"))?;

    let (access_token, refresh_token) = issue_session(&state, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            message: "User registered successfully",
            access_token,
            refresh_token,
            user: UserInfo::from(&user),
        }),
    ))
}

/// Password login. Unknown email and wrong password produce the same
/// response so the two cases cannot be told apart.
async fn login(
    State(state): State<AuthState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(req.email.trim())
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let valid = password::verify_password(&req.password, &user.password_hash).map_err(|e| {
        error!("Failed to verify password: {}", e);
        ApiError::internal("Failed to verify credentials")
    })?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let (access_token, refresh_token) = issue_session(&state, &user).await?;

    Ok((
        StatusCode::OK,
        Json(SessionResponse {
            message: "Login successful",
            access_token,
            refresh_token,
            user: UserInfo::from(&user),
        }),
    ))
}

/// Exchange a refresh token for a new access token.
///
/// The token must verify against the refresh secret AND still be present
/// in the user's persisted token list - a token revoked by logout is
/// rejected even before its own expiry. The refresh token itself is not
/// rotated here.
async fn refresh(
    State(state): State<AuthState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = req
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Refresh token is required"))?;

    let claims = state
        .keys
        .validate_refresh_token(&token)
        .map_err(|_| ApiError::forbidden("Invalid or expired refresh token"))?;

    let user = state
        .db
        .users()
        .get_by_uuid(&claims.sub)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::forbidden("Invalid refresh token"))?;

    state
        .db
        .refresh_tokens()
        .find(user.id, &token)
        .await
        .db_err("Failed to check refresh token")?
        .ok_or_else(|| ApiError::forbidden("Invalid refresh token"))?;

    let access = state.keys.generate_access_token(&user.uuid).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        ApiError::internal("Failed to generate token")
    })?;

    Ok((
        StatusCode::OK,
        Json(RefreshResponse {
            access_token: access.token,
        }),
    ))
}

/// Logout: revoke the presented refresh token for the authenticated user.
/// A missing token body still answers 200 - there is nothing to revoke.
async fn logout(
    State(state): State<AuthState>,
    ApiAuth(user): ApiAuth,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = req.refresh_token.filter(|t| !t.is_empty()) {
        if let Some(db_user) = state
            .db
            .users()
            .get_by_uuid(&user.user_uuid)
            .await
            .db_err("Failed to look up user")?
        {
            state
                .db
                .refresh_tokens()
                .delete(db_user.id, &token)
                .await
                .db_err("Failed to revoke refresh token")?;
        }
    }

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    ))
}
