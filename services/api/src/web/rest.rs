//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::analysis::run_analysis;
use crate::web::auth::UserResponse;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use nexus_core::domain::{Project, User, UserRole};
use nexus_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::me_handler,
        crate::web::auth::change_password_handler,
        analyze_handler,
        list_projects_handler,
        stats_handler,
        list_users_handler,
        admin_user_projects_handler,
        admin_reset_password_handler,
        export_handler,
    ),
    components(
        schemas(
            crate::web::auth::SignupRequest,
            crate::web::auth::LoginRequest,
            crate::web::auth::ChangePasswordRequest,
            crate::web::auth::UserResponse,
            AnalyzeRequest,
            ProjectResponse,
            StatsResponse,
            ResetPasswordRequest,
        )
    ),
    tags(
        (name = "Nexus API", description = "API endpoints for the content optimization dashboard.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    pub content: String,
}

/// One persisted analysis, as sent to the dashboard.
#[derive(Serialize, ToSchema)]
pub struct ProjectResponse {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub date: DateTime<Utc>,
    pub title: String,
    pub original_content_preview: String,
    pub full_response: String,
    pub seo_score: u32,
    pub aeo_score: u32,
    pub geo_score: u32,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            user_name: p.user_name,
            date: p.date,
            title: p.title,
            original_content_preview: p.original_content_preview,
            full_response: p.full_response,
            seo_score: p.seo_score,
            aeo_score: p.aeo_score,
            geo_score: p.geo_score,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_optimized: usize,
    pub avg_seo_score: u32,
}

#[derive(Deserialize, IntoParams)]
pub struct UserSearchQuery {
    /// Case-insensitive substring matched against email and display name.
    pub q: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

fn require_admin(user: &User) -> Result<(), (StatusCode, String)> {
    if user.role != UserRole::Admin {
        return Err((StatusCode::FORBIDDEN, "Admin access required".to_string()));
    }
    Ok(())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Run one content analysis and persist the result.
///
/// The submission goes to the generation provider under the fixed
/// optimization persona; the scores are scraped out of the report and the
/// finished project is saved and returned. A provider failure persists
/// nothing and surfaces one generic message.
#[utoipa::path(
    post,
    path = "/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 201, description = "Analysis completed and saved", body = ProjectResponse),
        (status = 400, description = "Empty content"),
        (status = 401, description = "Not logged in"),
        (status = 502, description = "Generation provider failure")
    )
)]
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.content.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Content must not be empty".to_string(),
        ));
    }

    let project = run_analysis(&state.store, &state.analysis, &req.content, &current_user)
        .await
        .map_err(|e| match e {
            PortError::Upstream(msg) => {
                error!("Analysis provider failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to analyze content. Check the API key.".to_string(),
                )
            }
            other => {
                error!("Failed to run analysis: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save the analysis".to_string(),
                )
            }
        })?;

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

/// List the caller's projects, newest first. Admins see every project.
#[utoipa::path(
    get,
    path = "/projects",
    responses(
        (status = 200, description = "Projects, newest first", body = [ProjectResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<ProjectResponse>>, (StatusCode, String)> {
    let projects = state
        .store
        .list_projects_for_user(&current_user)
        .await
        .map_err(|e| {
            error!("Failed to list projects: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list projects".to_string(),
            )
        })?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

/// Dashboard header aggregates over the caller's visible projects.
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Dashboard aggregates", body = StatsResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    let stats = state
        .store
        .dashboard_stats(&current_user)
        .await
        .map_err(|e| {
            error!("Failed to compute stats: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to compute stats".to_string(),
            )
        })?;
    Ok(Json(StatsResponse {
        total_optimized: stats.total_optimized,
        avg_seo_score: stats.avg_seo_score,
    }))
}

/// List every account, optionally filtered by a search term.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(UserSearchQuery),
    responses(
        (status = 200, description = "All accounts", body = [UserResponse]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<Vec<UserResponse>>, (StatusCode, String)> {
    require_admin(&current_user)?;

    let mut users = state.store.list_users().await.map_err(|e| {
        error!("Failed to list users: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to list users".to_string(),
        )
    })?;

    if let Some(term) = query.q.as_deref().map(str::to_lowercase) {
        if !term.is_empty() {
            users.retain(|u| {
                u.email.to_lowercase().contains(&term) || u.name.to_lowercase().contains(&term)
            });
        }
    }

    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Inspect one user's projects, newest first.
#[utoipa::path(
    get,
    path = "/admin/users/{email}/projects",
    params(
        ("email" = String, Path, description = "The inspected user's email.")
    ),
    responses(
        (status = 200, description = "The user's projects", body = [ProjectResponse]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn admin_user_projects_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(email): Path<String>,
) -> Result<Json<Vec<ProjectResponse>>, (StatusCode, String)> {
    require_admin(&current_user)?;

    let projects = state
        .store
        .list_projects_by_email(&email)
        .await
        .map_err(|e| {
            error!("Failed to list projects for {}: {:?}", email, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list projects".to_string(),
            )
        })?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

/// Reset any user's password.
///
/// Unlike the login surface, a 404 here does reveal whether the account
/// exists; this endpoint is admin-gated so that is acceptable.
#[utoipa::path(
    put,
    path = "/admin/users/{email}/password",
    request_body = ResetPasswordRequest,
    params(
        ("email" = String, Path, description = "The target user's email.")
    ),
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Empty password"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user")
    )
)]
pub async fn admin_reset_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(email): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_admin(&current_user)?;

    if req.new_password.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Enter a new password".to_string(),
        ));
    }

    state
        .store
        .update_password(&email, &req.new_password)
        .await
        .map_err(|e| match e {
            PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            other => {
                error!("Failed to reset password: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to reset password".to_string(),
                )
            }
        })?;

    Ok(StatusCode::OK)
}

/// Download the full store as a timestamped JSON backup. Password hashes are
/// replaced by a redaction placeholder before anything leaves the store.
#[utoipa::path(
    get,
    path = "/admin/export",
    responses(
        (status = 200, description = "The backup file", content_type = "application/json"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn export_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_admin(&current_user)?;

    let snapshot = state.store.export_snapshot().await.map_err(|e| {
        error!("Failed to export snapshot: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to export backup".to_string(),
        )
    })?;

    let body = serde_json::to_string_pretty(&snapshot).map_err(|e| {
        error!("Failed to serialize snapshot: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to export backup".to_string(),
        )
    })?;

    let filename = format!("nexus_full_backup_{}.json", Utc::now().format("%Y-%m-%d"));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}
