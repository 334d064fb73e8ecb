#![allow(dead_code, unused_macros)]

use async_trait::async_trait;
use microblog_service::config::{
    AppConfig, AvatarConfig, Config, DatabaseConfig, SessionConfig, UploadConfig,
};
use microblog_service::db::run_migrations;
use microblog_service::services::IdentityProvider;
use microblog_service::{AppError, AppState};
use std::sync::Arc;

pub const BOUNDARY: &str = "----microblog-test-boundary";

pub fn test_config() -> Config {
    Config {
        app: AppConfig {
            env: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        session: SessionConfig::default(),
        oauth: None,
        avatar: AvatarConfig::default(),
        uploads: UploadConfig {
            max_media_bytes: 64 * 1024,
        },
    }
}

/// State on a WAL database file with a real multi-connection pool
///
/// The in-memory pool is pinned to one connection, so writer contention
/// only shows up here. Keep `dir` alive for the duration of the test.
pub async fn build_file_state(dir: &tempfile::TempDir) -> AppState {
    let path = dir.path().join("microblog.db");
    let pool = db_pool::create_pool(db_pool::DbConfig {
        service_name: "microblog-test".to_string(),
        database_url: format!("sqlite://{}?mode=rwc", path.display()),
        max_connections: 8,
        ..db_pool::DbConfig::default()
    })
    .await
    .expect("create file-backed pool");
    run_migrations(&pool).await.expect("run migrations");

    AppState::new(pool, test_config(), None)
}

pub async fn build_state(provider: Option<Arc<dyn IdentityProvider>>) -> AppState {
    let pool = db_pool::create_memory_pool("microblog-test")
        .await
        .expect("create in-memory pool");
    run_migrations(&pool).await.expect("run migrations");

    AppState::new(pool, test_config(), provider)
}

/// Identity provider that maps every code except `bad-code` to one account
pub struct StubProvider {
    pub external_id: String,
}

impl StubProvider {
    pub fn shared(external_id: &str) -> Arc<dyn IdentityProvider> {
        Arc::new(Self {
            external_id: external_id.to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn authorize_url(&self, state: &str) -> microblog_service::Result<String> {
        Ok(format!("https://provider.test/authorize?state={}", state))
    }

    async fn exchange_code(&self, code: &str) -> microblog_service::Result<String> {
        if code == "bad-code" {
            return Err(AppError::OAuth("code rejected".to_string()));
        }
        Ok(self.external_id.clone())
    }
}

/// Build the service exactly as `main.rs` does, minus the loggers
macro_rules! init_app {
    ($state:expr) => {{
        let state: microblog_service::AppState = $state;
        let session = microblog_service::middleware::SessionMiddleware::new(
            state.db.clone(),
            state.config.session.cookie_name.clone(),
            state.config.session.ttl_hours,
        );
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(state))
                .wrap(session)
                .wrap(microblog_service::middleware::MetricsMiddleware)
                .configure(microblog_service::routes::configure_routes),
        )
        .await
    }};
}

/// Register `username`, log in, and return the session cookie
macro_rules! login_as {
    ($app:expr, $username:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/register")
            .set_form([("username", $username)])
            .to_request();
        let resp = actix_web::test::call_service($app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);

        let req = actix_web::test::TestRequest::post()
            .uri("/login")
            .set_form([("username", $username)])
            .to_request();
        let resp = actix_web::test::call_service($app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);
        $crate::common::session_cookie_of(&resp).expect("login sets the session cookie")
    }};
}

pub fn session_cookie_of<B>(
    resp: &actix_web::dev::ServiceResponse<B>,
) -> Option<actix_web::cookie::Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "sid")
        .map(|c| c.into_owned())
}

pub fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Encode a multipart/form-data body: `(name, content_type, bytes)` parts
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match content_type {
            Some(content_type) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}.bin\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, name, content_type
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Create a post through the repository and return its id
pub async fn seed_post(state: &AppState, author: &str, title: &str) -> i64 {
    microblog_service::db::post_repo::create_post(&state.db, author, title, "body", None, None)
        .await
        .expect("seed post")
        .id
}

pub async fn set_likes(state: &AppState, post_id: i64, likes: i64) {
    sqlx::query("UPDATE posts SET likes = ? WHERE id = ?")
        .bind(likes)
        .bind(post_id)
        .execute(&state.db)
        .await
        .expect("set likes");
}
