//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use nexus_core::ports::{ContentAnalysisService, StoreService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. The store and the analysis provider live behind their ports so
/// handlers never see a concrete adapter.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoreService>,
    pub analysis: Arc<dyn ContentAnalysisService>,
    pub config: Arc<Config>,
}
