pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the pieces the binary needs to build the web server router.
pub use middleware::require_auth;
pub use rest::{
    admin_reset_password_handler, admin_user_projects_handler, analyze_handler, export_handler,
    list_projects_handler, list_users_handler, stats_handler,
};
