/// Database access layer
///
/// This module provides:
/// - Embedded schema migrations
/// - Repositories for users, posts, likes, sessions, pending registrations
///   and OAuth states
///
/// Repositories are free async functions over `&SqlitePool`. Functions that
/// must run inside a transaction take `&mut SqliteConnection` instead, so they
/// accept both `&mut *tx` and a pooled connection.
pub mod like_repo;
pub mod oauth_state_repo;
pub mod pending_registration_repo;
pub mod post_repo;
pub mod session_repo;
pub mod user_repo;

use sqlx::migrate::MigrateError;
use sqlx::SqlitePool;

/// Apply every migration under `migrations/` that has not run yet
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
