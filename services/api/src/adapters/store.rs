//! services/api/src/adapters/store.rs
//!
//! This module contains the store adapter, which is the concrete implementation
//! of the `StoreService` port from the `core` crate. It persists the three
//! collections (`users`, `projects`, auth sessions) as whole JSON arrays, one
//! file per collection, under the configured data directory.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nexus_core::domain::{AuthSession, DashboardStats, Project, StoreSnapshot, User, UserRole};
use nexus_core::ports::{PortError, PortResult, StoreService};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

const USERS_FILE: &str = "users.json";
const PROJECTS_FILE: &str = "projects.json";
const SESSIONS_FILE: &str = "sessions.json";

/// Written in place of every password hash in exported backups.
const REDACTED_PASSWORD: &str = "[PROTECTED]";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A store adapter that implements the `StoreService` port on top of plain
/// JSON files.
///
/// Every operation is one whole-collection read or rewrite under a single
/// mutex, so concurrent handlers observe the store as an atomic, serialized
/// key-value host. Writers in *other* processes still race last-write-wins
/// per collection; that limitation is accepted, not handled.
pub struct JsonStoreAdapter {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonStoreAdapter {
    /// Creates a new `JsonStoreAdapter` rooted at `data_dir`. The directory
    /// is created on `initialize`, not here.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    /// Reads a whole collection. A missing or unparsable file reads as an
    /// empty collection rather than an error.
    fn read_collection<T: DeserializeOwned>(&self, file: &str) -> Vec<T> {
        let path = self.path(file);
        if !path.exists() {
            return Vec::new();
        }
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(items) => items,
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Rewrites a whole collection in place.
    fn write_collection<T: Serialize>(&self, file: &str, items: &[T]) -> PortResult<()> {
        let path = self.path(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(items).map_err(|e| PortError::Unexpected(e.to_string()))?;
        fs::write(&path, json).map_err(|e| PortError::Unexpected(e.to_string()))
    }

    fn hash_password(password: &str) -> PortResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PortError::Unexpected(format!("Failed to hash password: {}", e)))
    }

    /// Verifies a submitted password against a stored hash. Both the exact
    /// submission and its whitespace-trimmed form are accepted, so a stray
    /// trailing space on the login form does not lock anyone out.
    fn verify_password(stored_hash: &str, submitted: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };
        let argon2 = Argon2::default();
        if argon2
            .verify_password(submitted.as_bytes(), &parsed)
            .is_ok()
        {
            return true;
        }
        let trimmed = submitted.trim();
        trimmed != submitted
            && argon2
                .verify_password(trimmed.as_bytes(), &parsed)
                .is_ok()
    }

    /// Newest-first ordering shared by every project listing. The sort is
    /// stable, so equal timestamps keep their insertion order.
    fn sort_newest_first(projects: &mut [Project]) {
        projects.sort_by(|a, b| b.date.cmp(&a.date));
    }

    fn stats_over(projects: &[Project]) -> DashboardStats {
        let total_optimized = projects.len();
        let avg_seo_score = if projects.is_empty() {
            0
        } else {
            let sum: u64 = projects.iter().map(|p| u64::from(p.seo_score)).sum();
            (sum as f64 / projects.len() as f64).round() as u32
        };
        DashboardStats {
            total_optimized,
            avg_seo_score,
        }
    }
}

//=========================================================================================
// `StoreService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoreService for JsonStoreAdapter {
    async fn initialize(&self) -> PortResult<()> {
        let _guard = self.lock.lock().expect("store lock poisoned");

        // Absent, unparsable and empty all read as an empty vec, which is
        // exactly the "needs seeding" condition.
        let users: Vec<User> = self.read_collection(USERS_FILE);
        if users.is_empty() {
            let now = Utc::now();
            let seeded = vec![
                User {
                    email: "admin@nexus.ai".to_string(),
                    name: "Super Admin".to_string(),
                    role: UserRole::Admin,
                    password_hash: Self::hash_password("admin123")?,
                    created_at: now,
                },
                User {
                    email: "user@nexus.ai".to_string(),
                    name: "Demo User".to_string(),
                    role: UserRole::Editor,
                    password_hash: Self::hash_password("user123")?,
                    created_at: now,
                },
            ];
            self.write_collection(USERS_FILE, &seeded)?;
        }

        if !self.path(PROJECTS_FILE).exists() {
            self.write_collection::<Project>(PROJECTS_FILE, &[])?;
        }
        if !self.path(SESSIONS_FILE).exists() {
            self.write_collection::<AuthSession>(SESSIONS_FILE, &[])?;
        }
        Ok(())
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        Ok(self.read_collection(USERS_FILE))
    }

    async fn add_user(&self, email: &str, password: &str, name: &str) -> PortResult<User> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let mut users: Vec<User> = self.read_collection(USERS_FILE);

        if users.iter().any(|u| u.matches_email(email)) {
            return Err(PortError::Conflict(format!(
                "A user with the email '{}' already exists",
                email.trim()
            )));
        }

        let user = User {
            // Keep the submitted casing for display; lookups lower-case.
            email: email.trim().to_string(),
            name: name.to_string(),
            role: UserRole::Editor,
            password_hash: Self::hash_password(password)?,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        self.write_collection(USERS_FILE, &users)?;
        Ok(user)
    }

    async fn authenticate(&self, email: &str, password: &str) -> PortResult<User> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let users: Vec<User> = self.read_collection(USERS_FILE);

        users
            .into_iter()
            .find(|u| u.matches_email(email) && Self::verify_password(&u.password_hash, password))
            .ok_or_else(|| PortError::NotFound("Invalid email or password".to_string()))
    }

    async fn update_password(&self, email: &str, new_password: &str) -> PortResult<()> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let mut users: Vec<User> = self.read_collection(USERS_FILE);

        let user = users
            .iter_mut()
            .find(|u| u.matches_email(email))
            .ok_or_else(|| PortError::NotFound(format!("No user with email '{}'", email)))?;

        user.password_hash = Self::hash_password(new_password)?;
        self.write_collection(USERS_FILE, &users)
    }

    async fn save_project(&self, project: &Project) -> PortResult<()> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let mut projects: Vec<Project> = self.read_collection(PROJECTS_FILE);
        projects.push(project.clone());
        self.write_collection(PROJECTS_FILE, &projects)
    }

    async fn list_projects_for_user(&self, user: &User) -> PortResult<Vec<Project>> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let mut projects: Vec<Project> = self.read_collection(PROJECTS_FILE);

        if user.role != UserRole::Admin {
            projects.retain(|p| p.user_id == user.email);
        }
        Self::sort_newest_first(&mut projects);
        Ok(projects)
    }

    async fn list_projects_by_email(&self, email: &str) -> PortResult<Vec<Project>> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let mut projects: Vec<Project> = self.read_collection(PROJECTS_FILE);
        projects.retain(|p| p.user_id == email);
        Self::sort_newest_first(&mut projects);
        Ok(projects)
    }

    async fn dashboard_stats(&self, user: &User) -> PortResult<DashboardStats> {
        let projects = self.list_projects_for_user(user).await?;
        Ok(Self::stats_over(&projects))
    }

    async fn export_snapshot(&self) -> PortResult<StoreSnapshot> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let users: Vec<User> = self
            .read_collection::<User>(USERS_FILE)
            .into_iter()
            .map(|u| User {
                password_hash: REDACTED_PASSWORD.to_string(),
                ..u
            })
            .collect();
        let projects: Vec<Project> = self.read_collection(PROJECTS_FILE);
        Ok(StoreSnapshot { users, projects })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_email: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let mut sessions: Vec<AuthSession> = self.read_collection(SESSIONS_FILE);
        sessions.push(AuthSession {
            id: session_id.to_string(),
            user_email: user_email.to_string(),
            expires_at,
        });
        self.write_collection(SESSIONS_FILE, &sessions)
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<User> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let mut sessions: Vec<AuthSession> = self.read_collection(SESSIONS_FILE);

        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|s| s.expires_at > now);
        if sessions.len() != before {
            self.write_collection(SESSIONS_FILE, &sessions)?;
        }

        let session = sessions
            .iter()
            .find(|s| s.id == session_id)
            .ok_or_else(|| PortError::NotFound("No such session".to_string()))?;

        let users: Vec<User> = self.read_collection(USERS_FILE);
        users
            .into_iter()
            .find(|u| u.matches_email(&session.user_email))
            .ok_or_else(|| PortError::NotFound("Session owner no longer exists".to_string()))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let mut sessions: Vec<AuthSession> = self.read_collection(SESSIONS_FILE);
        sessions.retain(|s| s.id != session_id);
        self.write_collection(SESSIONS_FILE, &sessions)
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::path::Path;
    use tempfile::tempdir;

    fn test_store(dir: &Path) -> JsonStoreAdapter {
        JsonStoreAdapter::new(dir)
    }

    fn test_project(id: &str, user_id: &str, date: DateTime<Utc>) -> Project {
        Project {
            id: id.to_string(),
            user_id: user_id.to_string(),
            user_name: "Test User".to_string(),
            date,
            title: format!("Analysis {}", date.format("%H:%M:%S")),
            original_content_preview: "Hello world".to_string(),
            full_response: "## Report".to_string(),
            seo_score: 80,
            aeo_score: 70,
            geo_score: 60,
        }
    }

    #[tokio::test]
    async fn initialize_seeds_two_accounts_once() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());

        store.initialize().await.unwrap();
        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].email, "admin@nexus.ai");
        assert_eq!(users[0].role, UserRole::Admin);
        assert_eq!(users[1].email, "user@nexus.ai");
        assert_eq!(users[1].role, UserRole::Editor);

        // A second call never re-seeds an already-populated collection.
        store.initialize().await.unwrap();
        assert_eq!(store.list_users().await.unwrap().len(), 2);

        store
            .add_user("alice@x.com", "pw123456", "Alice")
            .await
            .unwrap();
        store.initialize().await.unwrap();
        assert_eq!(store.list_users().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn initialize_reseeds_unparsable_users() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(USERS_FILE), "not json at all").unwrap();
        let store = test_store(dir.path());

        assert!(store.list_users().await.unwrap().is_empty());
        store.initialize().await.unwrap();
        assert_eq!(store.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn seeded_credentials_authenticate() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.initialize().await.unwrap();

        let admin = store.authenticate("admin@nexus.ai", "admin123").await.unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        let editor = store.authenticate("user@nexus.ai", "user123").await.unwrap();
        assert_eq!(editor.role, UserRole::Editor);
    }

    #[tokio::test]
    async fn add_user_then_authenticate() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.initialize().await.unwrap();

        let created = store
            .add_user("Alice@X.com", "pw123456", "Alice")
            .await
            .unwrap();
        assert_eq!(created.role, UserRole::Editor);
        // Display casing preserved as submitted.
        assert_eq!(created.email, "Alice@X.com");

        let authed = store.authenticate("alice@x.com", "pw123456").await.unwrap();
        assert_eq!(authed.email, "Alice@X.com");
    }

    #[tokio::test]
    async fn add_user_rejects_case_insensitive_duplicate() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.initialize().await.unwrap();

        store
            .add_user("alice@x.com", "pw123456", "Alice")
            .await
            .unwrap();
        let err = store
            .add_user("ALICE@X.COM", "other", "Impostor")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        assert_eq!(store.list_users().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn authenticate_tolerates_trailing_whitespace() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store
            .add_user("alice@x.com", "pw123456", "Alice")
            .await
            .unwrap();

        assert!(store.authenticate("alice@x.com", "pw123456").await.is_ok());
        assert!(store.authenticate("alice@x.com", "pw123456 ").await.is_ok());
        assert!(store.authenticate("alice@x.com", "wrong").await.is_err());
    }

    #[tokio::test]
    async fn update_password_invalidates_the_old_one() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store
            .add_user("alice@x.com", "oldpassword", "Alice")
            .await
            .unwrap();

        store
            .update_password("alice@x.com", "newpassword")
            .await
            .unwrap();
        assert!(store
            .authenticate("alice@x.com", "newpassword")
            .await
            .is_ok());
        assert!(store
            .authenticate("alice@x.com", "oldpassword")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn update_password_for_unknown_email_fails() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        let err = store
            .update_password("nobody@x.com", "whatever")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn save_project_round_trips_by_email() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.initialize().await.unwrap();

        let project = test_project("p1", "alice@x.com", Utc::now());
        store.save_project(&project).await.unwrap();

        let listed = store.list_projects_by_email("alice@x.com").await.unwrap();
        assert_eq!(listed, vec![project]);
    }

    #[tokio::test]
    async fn project_listing_filters_by_owner_and_sorts_newest_first() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.initialize().await.unwrap();

        let base = Utc::now();
        store
            .save_project(&test_project("old", "alice@x.com", base - Duration::hours(2)))
            .await
            .unwrap();
        store
            .save_project(&test_project("other", "bob@x.com", base - Duration::hours(1)))
            .await
            .unwrap();
        store
            .save_project(&test_project("new", "alice@x.com", base))
            .await
            .unwrap();

        let alice = store
            .add_user("alice@x.com", "pw123456", "Alice")
            .await
            .unwrap();
        let mine = store.list_projects_for_user(&alice).await.unwrap();
        let ids: Vec<&str> = mine.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        let admin = store.authenticate("admin@nexus.ai", "admin123").await.unwrap();
        let all = store.list_projects_for_user(&admin).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "other", "old"]);
    }

    #[tokio::test]
    async fn equal_dates_keep_insertion_order() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.initialize().await.unwrap();

        let when = Utc::now();
        store
            .save_project(&test_project("first", "alice@x.com", when))
            .await
            .unwrap();
        store
            .save_project(&test_project("second", "alice@x.com", when))
            .await
            .unwrap();

        let listed = store.list_projects_by_email("alice@x.com").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn dashboard_stats_round_the_mean() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.initialize().await.unwrap();

        let mut a = test_project("a", "alice@x.com", Utc::now());
        a.seo_score = 80;
        let mut b = test_project("b", "alice@x.com", Utc::now());
        b.seo_score = 85;
        store.save_project(&a).await.unwrap();
        store.save_project(&b).await.unwrap();

        let alice = store
            .add_user("alice@x.com", "pw123456", "Alice")
            .await
            .unwrap();
        let stats = store.dashboard_stats(&alice).await.unwrap();
        assert_eq!(stats.total_optimized, 2);
        // (80 + 85) / 2 = 82.5, rounded.
        assert_eq!(stats.avg_seo_score, 83);
    }

    #[tokio::test]
    async fn empty_history_reads_as_zero_stats() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        let alice = store
            .add_user("alice@x.com", "pw123456", "Alice")
            .await
            .unwrap();
        let stats = store.dashboard_stats(&alice).await.unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                total_optimized: 0,
                avg_seo_score: 0
            }
        );
    }

    #[tokio::test]
    async fn export_redacts_password_hashes() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.initialize().await.unwrap();
        store
            .save_project(&test_project("p1", "admin@nexus.ai", Utc::now()))
            .await
            .unwrap();

        let snapshot = store.export_snapshot().await.unwrap();
        assert_eq!(snapshot.users.len(), 2);
        assert!(snapshot
            .users
            .iter()
            .all(|u| u.password_hash == REDACTED_PASSWORD));
        assert_eq!(snapshot.projects.len(), 1);
        assert_eq!(snapshot.projects[0].id, "p1");
    }

    #[tokio::test]
    async fn auth_sessions_validate_and_expire() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.initialize().await.unwrap();

        store
            .create_auth_session("live", "admin@nexus.ai", Utc::now() + Duration::days(30))
            .await
            .unwrap();
        store
            .create_auth_session("stale", "admin@nexus.ai", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        let user = store.validate_auth_session("live").await.unwrap();
        assert_eq!(user.email, "admin@nexus.ai");
        assert!(store.validate_auth_session("stale").await.is_err());

        store.delete_auth_session("live").await.unwrap();
        assert!(store.validate_auth_session("live").await.is_err());
    }
}
