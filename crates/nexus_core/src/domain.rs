//! crates/nexus_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage backend or transport format,
//! but carry serde derives because every record round-trips through the
//! JSON-backed store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role attached to a user account. Admins can browse every user and
/// every project; editors only see their own work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
}

/// A registered account.
///
/// `email` doubles as the account identifier: display casing is preserved
/// exactly as submitted, but every lookup compares lower-cased. The password
/// is stored only as an argon2 PHC hash string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// True when `candidate` names this account, ignoring case.
    pub fn matches_email(&self, candidate: &str) -> bool {
        self.email.to_lowercase() == candidate.trim().to_lowercase()
    }
}

/// One completed analysis, owned by the user whose email is in `user_id`.
///
/// Ownership is by value: `user_name` is a snapshot taken at creation time
/// and is never refreshed afterwards. Projects are append-only and are never
/// re-parented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
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

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub id: String,
    pub user_email: String,
    pub expires_at: DateTime<Utc>,
}

/// The downloadable backup shape: every user with the password hash redacted,
/// every project unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub users: Vec<User>,
    pub projects: Vec<Project>,
}

/// Aggregates shown on the dashboard header cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_optimized: usize,
    pub avg_seo_score: u32,
}
