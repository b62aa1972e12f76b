//! crates/nexus_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the storage file
//! or the generation provider's API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DashboardStats, Project, StoreSnapshot, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., the
/// store file, the network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Conflict(String),
    #[error("Upstream provider error: {0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait StoreService: Send + Sync {
    // --- Lifecycle ---

    /// Idempotent first-run seeding. When the user collection is absent,
    /// unparsable, or empty it is (re)seeded with the two fixed demo
    /// accounts; when the project collection is absent it becomes `[]`.
    /// Safe to call on every startup.
    async fn initialize(&self) -> PortResult<()>;

    // --- User Management ---

    /// The full user collection in stored order. A missing or unparsable
    /// collection reads as empty rather than an error.
    async fn list_users(&self) -> PortResult<Vec<User>>;

    /// Registers a new editor account. Fails with `Conflict` when an
    /// existing user's email matches case-insensitively. Display casing of
    /// the email is preserved as submitted.
    async fn add_user(&self, email: &str, password: &str, name: &str) -> PortResult<User>;

    /// Looks the account up by case-insensitive email and verifies the
    /// password against the stored hash. Both the exact submission and its
    /// whitespace-trimmed form are accepted. Failure is a generic
    /// `NotFound` so this surface never reveals which half was wrong.
    async fn authenticate(&self, email: &str, password: &str) -> PortResult<User>;

    /// Overwrites the password hash of the first case-insensitive email
    /// match. Authorization is entirely the caller's responsibility.
    async fn update_password(&self, email: &str, new_password: &str) -> PortResult<()>;

    // --- Project Management ---

    /// Appends unconditionally; no validation of score ranges or fields.
    async fn save_project(&self, project: &Project) -> PortResult<()>;

    /// Admins see every project; everyone else only their own. Always
    /// ordered by `date` descending, ties in insertion order.
    async fn list_projects_for_user(&self, user: &User) -> PortResult<Vec<Project>>;

    /// Every project owned by `email`, newest first, regardless of caller
    /// role. Gating is the web layer's job, not this call's.
    async fn list_projects_by_email(&self, email: &str) -> PortResult<Vec<Project>>;

    /// Project count and rounded mean SEO score over the same set
    /// `list_projects_for_user` would return.
    async fn dashboard_stats(&self, user: &User) -> PortResult<DashboardStats>;

    /// All users (password hashes redacted) plus all projects, for the
    /// downloadable backup.
    async fn export_snapshot(&self) -> PortResult<StoreSnapshot>;

    // --- Auth Sessions ---

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_email: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a session id to its owning user. Expired sessions are
    /// dropped from the collection and read as `NotFound`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<User>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait ContentAnalysisService: Send + Sync {
    /// Runs one single-turn exchange with the generation provider under the
    /// fixed optimization persona and returns the full response text.
    async fn analyze_content(&self, content: &str) -> PortResult<String>;
}
