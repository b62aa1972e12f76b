//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, logout, session restore
//! and password changes.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use nexus_core::domain::{User, UserRole};
use nexus_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::AppState;

/// Session cookies live this long; the stored session record expires with them.
const SESSION_DAYS: i64 = 30;

/// Display name assigned when the signup form leaves the field blank.
const DEFAULT_NAME: &str = "New User";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// The public view of an account. Password hashes never leave the store
/// through this type.
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let role = match user.role {
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
        };
        Self {
            email: user.email,
            name: user.name,
            role: role.to_string(),
            created_at: user.created_at,
        }
    }
}

//=========================================================================================
// Cookie Helpers
//=========================================================================================

fn session_cookie(session_id: &str) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id,
        Duration::days(SESSION_DAYS).num_seconds()
    )
}

async fn open_session(
    state: &Arc<AppState>,
    user: &User,
) -> Result<String, (StatusCode, String)> {
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);
    state
        .store
        .create_auth_session(&auth_session_id, &user.email, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session".to_string(),
            )
        })?;
    Ok(session_cookie(&auth_session_id))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new editor account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Missing email or password"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.email.trim().is_empty() || req.password.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please fill in all fields".to_string(),
        ));
    }

    let name = match req.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_NAME.to_string(),
    };

    let user = state
        .store
        .add_user(&req.email, &req.password, &name)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => (
                StatusCode::CONFLICT,
                "This email is already registered".to_string(),
            ),
            other => {
                error!("Failed to create user: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create user".to_string(),
                )
            }
        })?;

    let cookie = open_session(&state, &user).await?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.email.trim().is_empty() || req.password.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please fill in all fields".to_string(),
        ));
    }

    // One generic message for both "no such user" and "wrong password", so
    // this surface does not reveal which half failed.
    let user = state
        .store
        .authenticate(&req.email, &req.password)
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            )
        })?;

    let cookie = open_session(&state, &user).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Extract session cookie
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Parse session ID from cookie
    let auth_session_id = cookie_header
        .split(';')
        .find_map(|c| {
            let c = c.trim();
            c.strip_prefix("session=")
        })
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 3. Delete auth session from the store
    state
        .store
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to logout".to_string(),
            )
        })?;

    // 4. Clear cookie
    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// GET /auth/me - Restore the current session
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The logged-in user", body = UserResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me_handler(
    Extension(current_user): Extension<User>,
) -> Json<UserResponse> {
    Json(UserResponse::from(current_user))
}

/// PUT /auth/password - Self-service password change
#[utoipa::path(
    put,
    path = "/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 401, description = "Current password is incorrect"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.new_password != req.confirm_password {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "The new passwords do not match".to_string(),
        ));
    }
    if req.new_password.chars().count() < 6 {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "The new password must be at least 6 characters".to_string(),
        ));
    }

    state
        .store
        .authenticate(&current_user.email, &req.current_password)
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                "Current password is incorrect".to_string(),
            )
        })?;

    state
        .store
        .update_password(&current_user.email, &req.new_password)
        .await
        .map_err(|e| {
            error!("Failed to update password: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update password".to_string(),
            )
        })?;

    Ok(StatusCode::OK)
}
