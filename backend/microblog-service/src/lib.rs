/// MicroBlog Service Library
///
/// A small social-blogging service: local and Google sign-in, text posts with
/// optional image/video, like toggling, a sortable feed and generated letter
/// avatars. State lives in an embedded SQLite database.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers (JSON view models and form redirects)
/// - `models`: Users, posts, likes, sessions and feed entries
/// - `services`: Feed assembly, likes, posts, identity, avatars, OAuth
/// - `db`: Migrations and repositories
/// - `middleware`: Session resolution, auth extractors, request metrics
/// - `error`: Error types and their HTTP rendering
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

pub use app_state::AppState;
pub use config::Config;
pub use error::{AppError, Result};
