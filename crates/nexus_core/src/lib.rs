pub mod domain;
pub mod ports;
pub mod scores;

pub use domain::{AuthSession, DashboardStats, Project, StoreSnapshot, User, UserRole};
pub use ports::{ContentAnalysisService, PortError, PortResult, StoreService};
pub use scores::{extract_scores, ScoreSet};
