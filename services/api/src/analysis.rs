//! services/api/src/analysis.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! one full analysis cycle: call the generation provider, scrape the scores
//! out of the report, fill in any missing score with a plausible fallback,
//! and persist the finished project.

use std::sync::Arc;

use chrono::Utc;
use nexus_core::{
    domain::{Project, User},
    ports::{ContentAnalysisService, PortResult, StoreService},
    scores::extract_scores,
};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

/// Number of characters of the submission kept as the stored preview.
const PREVIEW_CHARS: usize = 100;

/// The main asynchronous task for handling a single content analysis.
///
/// A provider failure propagates untouched: nothing is persisted and the
/// caller surfaces one generic message. A missing or malformed scores block
/// is NOT a failure; each absent score is replaced by an independent draw
/// from 60..=89 so the result always carries plausible numbers. A score the
/// provider genuinely reported as 0 is indistinguishable from an absent one
/// and gets replaced the same way.
pub async fn run_analysis(
    store: &Arc<dyn StoreService>,
    analysis: &Arc<dyn ContentAnalysisService>,
    content: &str,
    current_user: &User,
) -> PortResult<Project> {
    let response_text = analysis.analyze_content(content).await?;

    let scores = extract_scores(&response_text);
    if !scores.is_complete() {
        info!("Scores block missing or partial; filling in fallback values.");
    }

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        user_id: current_user.email.clone(),
        user_name: current_user.name.clone(),
        date: now,
        title: format!("Analysis {}", now.format("%H:%M:%S")),
        original_content_preview: content.chars().take(PREVIEW_CHARS).collect(),
        full_response: response_text,
        seo_score: score_or_fallback(scores.seo),
        aeo_score: score_or_fallback(scores.aeo),
        geo_score: score_or_fallback(scores.geo),
    };

    store.save_project(&project).await?;
    Ok(project)
}

/// A zero score reads as "not found" and is replaced by a uniform draw from
/// 60..=89, independently per score.
fn score_or_fallback(extracted: u32) -> u32 {
    if extracted != 0 {
        extracted
    } else {
        rand::rng().random_range(60..=89)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::JsonStoreAdapter;
    use async_trait::async_trait;
    use nexus_core::ports::PortError;
    use tempfile::tempdir;

    /// A provider stub that returns a canned response or fails.
    struct StubProvider {
        response: Result<String, String>,
    }

    #[async_trait]
    impl ContentAnalysisService for StubProvider {
        async fn analyze_content(&self, _content: &str) -> PortResult<String> {
            self.response
                .clone()
                .map_err(PortError::Upstream)
        }
    }

    fn stub(response: &str) -> Arc<dyn ContentAnalysisService> {
        Arc::new(StubProvider {
            response: Ok(response.to_string()),
        })
    }

    async fn fresh_user(store: &Arc<dyn StoreService>) -> User {
        store
            .add_user("alice@x.com", "pw123456", "Alice")
            .await
            .unwrap()
    }

    fn fresh_store(dir: &std::path::Path) -> Arc<dyn StoreService> {
        Arc::new(JsonStoreAdapter::new(dir))
    }

    #[tokio::test]
    async fn extracted_scores_are_never_replaced() {
        let dir = tempdir().unwrap();
        let store = fresh_store(dir.path());
        let user = fresh_user(&store).await;
        let provider = stub("## Report\n[SCORES]\nSEO: 90\nAEO: 85\nGEO: 70\n[/SCORES]");

        let project = run_analysis(&store, &provider, "Hello world", &user)
            .await
            .unwrap();
        assert_eq!(project.seo_score, 90);
        assert_eq!(project.aeo_score, 85);
        assert_eq!(project.geo_score, 70);
        assert_eq!(project.original_content_preview, "Hello world");
        assert_eq!(project.user_id, "alice@x.com");
        assert_eq!(project.user_name, "Alice");
    }

    #[tokio::test]
    async fn missing_block_falls_back_into_range() {
        let dir = tempdir().unwrap();
        let store = fresh_store(dir.path());
        let user = fresh_user(&store).await;
        let provider = stub("A report that forgot its scores entirely.");

        let project = run_analysis(&store, &provider, "Hello world", &user)
            .await
            .unwrap();
        for score in [project.seo_score, project.aeo_score, project.geo_score] {
            assert!((60..=89).contains(&score), "score {} out of range", score);
        }
    }

    #[tokio::test]
    async fn partial_block_only_replaces_the_missing_scores() {
        let dir = tempdir().unwrap();
        let store = fresh_store(dir.path());
        let user = fresh_user(&store).await;
        let provider = stub("[SCORES]\nSEO: 42\n[/SCORES]");

        let project = run_analysis(&store, &provider, "content", &user)
            .await
            .unwrap();
        assert_eq!(project.seo_score, 42);
        assert!((60..=89).contains(&project.aeo_score));
        assert!((60..=89).contains(&project.geo_score));
    }

    #[tokio::test]
    async fn provider_failure_persists_nothing() {
        let dir = tempdir().unwrap();
        let store = fresh_store(dir.path());
        let user = fresh_user(&store).await;
        let provider: Arc<dyn ContentAnalysisService> = Arc::new(StubProvider {
            response: Err("connection refused".to_string()),
        });

        let result = run_analysis(&store, &provider, "content", &user).await;
        assert!(matches!(result, Err(PortError::Upstream(_))));
        assert!(store
            .list_projects_by_email("alice@x.com")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn preview_truncates_at_one_hundred_chars() {
        let dir = tempdir().unwrap();
        let store = fresh_store(dir.path());
        let user = fresh_user(&store).await;
        let provider = stub("[SCORES]\nSEO: 1\nAEO: 2\nGEO: 3\n[/SCORES]");

        // Multibyte characters must not split; count chars, not bytes.
        let content = "é".repeat(150);
        let project = run_analysis(&store, &provider, &content, &user)
            .await
            .unwrap();
        assert_eq!(project.original_content_preview.chars().count(), 100);
        assert!(project.full_response.contains("SEO: 1"));
    }

    #[tokio::test]
    async fn saved_project_is_listed_for_its_owner() {
        let dir = tempdir().unwrap();
        let store = fresh_store(dir.path());
        let user = fresh_user(&store).await;
        let provider = stub("[SCORES]\nSEO: 75\nAEO: 76\nGEO: 77\n[/SCORES]");

        let project = run_analysis(&store, &provider, "Hello", &user)
            .await
            .unwrap();
        let listed = store.list_projects_for_user(&user).await.unwrap();
        assert_eq!(listed, vec![project]);
    }

    #[tokio::test]
    async fn register_login_analyze_end_to_end() {
        let dir = tempdir().unwrap();
        let store = fresh_store(dir.path());
        store.initialize().await.unwrap();

        store
            .add_user("alice@x.com", "pw123456", "Alice")
            .await
            .unwrap();
        let alice = store.authenticate("alice@x.com", "pw123456").await.unwrap();

        let provider = stub("## Report\n[SCORES]\nSEO: 90\nAEO: 85\nGEO: 70\n[/SCORES]");
        let project = run_analysis(&store, &provider, "Hello world", &alice)
            .await
            .unwrap();

        assert_eq!(project.seo_score, 90);
        assert_eq!(project.aeo_score, 85);
        assert_eq!(project.geo_score, 70);
        assert_eq!(project.original_content_preview, "Hello world");
        assert_eq!(project.user_id, "alice@x.com");

        let listed = store.list_projects_by_email("alice@x.com").await.unwrap();
        assert_eq!(listed, vec![project]);
    }

    #[tokio::test]
    async fn project_ids_are_unique_under_rapid_submission() {
        let dir = tempdir().unwrap();
        let store = fresh_store(dir.path());
        let user = fresh_user(&store).await;
        let provider = stub("[SCORES]\nSEO: 75\nAEO: 76\nGEO: 77\n[/SCORES]");

        let a = run_analysis(&store, &provider, "one", &user).await.unwrap();
        let b = run_analysis(&store, &provider, "two", &user).await.unwrap();
        assert_ne!(a.id, b.id);
    }
}
