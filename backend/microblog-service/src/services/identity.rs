/// Identity service - sessions, local accounts and external identity linking
use crate::db::{oauth_state_repo, pending_registration_repo, session_repo, user_repo};
use crate::error::{AppError, Result};
use crate::metrics::REGISTRATION_TOTAL;
use crate::models::{FeedSort, PendingRegistration, Session, User};
use crate::services::oauth::IdentityProvider;
use chrono::Duration;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Lifetime of an OAuth `state` and of a pending username claim
const HANDSHAKE_TTL_MINUTES: i64 = 10;

/// Session attached to the current request, with its user if logged in
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub session: Session,
    pub user: Option<User>,
}

/// Outcome of the provider callback
#[derive(Debug)]
pub enum ExternalLogin {
    /// The external identity is linked to an account; a session was created
    LoggedIn(Session),
    /// Unknown identity; the caller must pick a username for this token
    PendingUsername(String),
}

pub struct IdentityService {
    pool: SqlitePool,
    session_ttl: Duration,
}

impl IdentityService {
    pub fn new(pool: SqlitePool, session_ttl_hours: i64) -> Self {
        Self {
            pool,
            session_ttl: Duration::hours(session_ttl_hours),
        }
    }

    /// Resolve the session cookie; stale or unknown tokens resolve to `None`
    pub async fn resolve_session(&self, token: Option<&str>) -> Result<Option<CurrentSession>> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let Some(session) = session_repo::find_active(&self.pool, token).await? else {
            return Ok(None);
        };

        let user = match session.user_id {
            Some(user_id) => user_repo::find_by_id(&self.pool, user_id).await?,
            None => None,
        };

        Ok(Some(CurrentSession { session, user }))
    }

    pub async fn resolve_current_user(&self, token: Option<&str>) -> Result<Option<User>> {
        Ok(self.resolve_session(token).await?.and_then(|c| c.user))
    }

    /// Create a local account
    pub async fn register_local(&self, username: &str) -> Result<User> {
        let username = normalize_username(username)?;
        if user_repo::username_exists(&self.pool, username).await? {
            return Err(AppError::UsernameTaken);
        }

        let user = user_repo::create_user(&self.pool, username, None)
            .await
            .map_err(unique_violation_to_app_error)?;

        REGISTRATION_TOTAL.with_label_values(&["local"]).inc();
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Log in by username and return the new session
    ///
    /// `previous` is the caller's current session token, if any; its feed
    /// preferences carry over and the old token is retired.
    pub async fn login_local(&self, username: &str, previous: Option<&str>) -> Result<Session> {
        let username = normalize_username(username)?;
        let user = user_repo::find_by_username(&self.pool, username)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let session = self.start_session(&user, previous).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(session)
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        session_repo::delete_session(&self.pool, token).await?;
        tracing::debug!("Session closed");
        Ok(())
    }

    /// Return the caller's active session, creating an anonymous one if needed
    pub async fn ensure_session(&self, token: Option<&str>) -> Result<Session> {
        if let Some(token) = token {
            if let Some(session) = session_repo::find_active(&self.pool, token).await? {
                return Ok(session);
            }
        }

        let token = new_token();
        Ok(session_repo::create_session(&self.pool, &token, None, self.session_ttl).await?)
    }

    /// Store the feed sort preference on the caller's session
    pub async fn set_sort_option(&self, token: Option<&str>, sort_key: &str) -> Result<Session> {
        let sort: FeedSort = sort_key.parse().map_err(AppError::BadRequest)?;
        let mut session = self.ensure_session(token).await?;

        session_repo::update_sort_option(&self.pool, &session.token, sort).await?;
        session.sort_option = sort.as_str().to_string();

        Ok(session)
    }

    /// Store the author filter on the caller's session; `all` or blank clears it
    pub async fn set_view_option(&self, token: Option<&str>, author: &str) -> Result<Session> {
        let author = author.trim();
        let author = (!author.is_empty() && !author.eq_ignore_ascii_case("all")).then_some(author);
        let mut session = self.ensure_session(token).await?;

        session_repo::update_view_option(&self.pool, &session.token, author).await?;
        session.view_option = author.map(str::to_string);

        Ok(session)
    }

    /// Issue a CSRF state and return the provider URL to redirect to
    pub async fn begin_external_login(&self, provider: &dyn IdentityProvider) -> Result<String> {
        let state = new_token();
        oauth_state_repo::create_state(
            &self.pool,
            &state,
            Duration::minutes(HANDSHAKE_TTL_MINUTES),
        )
        .await?;

        provider.authorize_url(&state)
    }

    /// Handle the provider callback
    pub async fn complete_external_login(
        &self,
        provider: &dyn IdentityProvider,
        code: &str,
        state: &str,
        previous: Option<&str>,
    ) -> Result<ExternalLogin> {
        if !oauth_state_repo::consume_state(&self.pool, state).await? {
            tracing::warn!(provider = provider.name(), "OAuth callback with unknown state");
            return Err(AppError::InvalidOAuthState);
        }

        let external_id = provider.exchange_code(code).await?;

        if let Some(user) = user_repo::find_by_external_id(&self.pool, &external_id).await? {
            let session = self.start_session(&user, previous).await?;
            tracing::info!(user_id = %user.id, provider = provider.name(), "External login");
            return Ok(ExternalLogin::LoggedIn(session));
        }

        let token = new_token();
        pending_registration_repo::create_pending(
            &self.pool,
            &token,
            &external_id,
            Duration::minutes(HANDSHAKE_TTL_MINUTES),
        )
        .await?;
        tracing::info!(provider = provider.name(), "External identity awaiting username");

        Ok(ExternalLogin::PendingUsername(token))
    }

    /// Check a pending token without consuming it
    pub async fn pending_registration(&self, token: &str) -> Result<PendingRegistration> {
        pending_registration_repo::find_active(&self.pool, token)
            .await?
            .ok_or(AppError::InvalidPendingToken)
    }

    /// Finish an external registration by claiming a username
    ///
    /// Consuming the token and creating the user commit together, so any
    /// failure (a taken username included) leaves the token usable.
    pub async fn claim_pending(
        &self,
        token: &str,
        username: &str,
        previous: Option<&str>,
    ) -> Result<Session> {
        let username = normalize_username(username)?;

        let mut tx = self.pool.begin().await?;
        let pending = pending_registration_repo::consume(&mut *tx, token)
            .await?
            .ok_or(AppError::InvalidPendingToken)?;

        if user_repo::username_exists(&mut *tx, username).await? {
            return Err(AppError::UsernameTaken);
        }

        let user = user_repo::create_user(&mut *tx, username, Some(&pending.external_id))
            .await
            .map_err(unique_violation_to_app_error)?;
        tx.commit().await?;

        REGISTRATION_TOTAL.with_label_values(&["external"]).inc();
        tracing::info!(user_id = %user.id, username = %user.username, "External user registered");

        self.start_session(&user, previous).await
    }

    /// Purge expired sessions, abandoned OAuth states and unclaimed registrations
    pub async fn purge_expired(&self) -> Result<u64> {
        let sessions = session_repo::delete_expired(&self.pool).await?;
        let states = oauth_state_repo::delete_expired(&self.pool).await?;
        let pending = pending_registration_repo::delete_expired(&self.pool).await?;
        Ok(sessions + states + pending)
    }

    async fn start_session(&self, user: &User, previous: Option<&str>) -> Result<Session> {
        let token = new_token();
        let mut session =
            session_repo::create_session(&self.pool, &token, Some(user.id), self.session_ttl)
                .await?;

        if let Some(previous) = previous {
            if let Some(old) = session_repo::find_active(&self.pool, previous).await? {
                session_repo::update_sort_option(&self.pool, &token, old.sort()).await?;
                session_repo::update_view_option(&self.pool, &token, old.view_option.as_deref())
                    .await?;
                session.sort_option = old.sort().as_str().to_string();
                session.view_option = old.view_option;
            }
            session_repo::delete_session(&self.pool, previous).await?;
        }

        Ok(session)
    }
}

fn unique_violation_to_app_error(err: sqlx::Error) -> AppError {
    // SQLite names the violated column (`users.external_id`)
    let unique_on_external_id = err
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| db.message().contains("external_id"));
    match unique_on_external_id {
        Some(true) => AppError::Conflict("external identity already linked".to_string()),
        Some(false) => AppError::UsernameTaken,
        None => AppError::Database(err),
    }
}

fn normalize_username(username: &str) -> Result<&str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("username is required".to_string()));
    }
    Ok(username)
}

fn new_token() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;

    async fn service() -> IdentityService {
        let pool = db_pool::create_memory_pool("identity-test").await.unwrap();
        run_migrations(&pool).await.unwrap();
        IdentityService::new(pool, 1)
    }

    #[test]
    fn usernames_are_trimmed() {
        assert_eq!(normalize_username("  alice ").unwrap(), "alice");
        assert!(matches!(
            normalize_username("   "),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn anonymous_preferences_survive_login() {
        let service = service().await;
        service.register_local("alice").await.unwrap();

        let anon = service.set_sort_option(None, "likes").await.unwrap();
        service
            .set_view_option(Some(&anon.token), "alice")
            .await
            .unwrap();

        let session = service
            .login_local("alice", Some(&anon.token))
            .await
            .unwrap();
        assert_ne!(session.token, anon.token);
        assert_eq!(session.sort(), FeedSort::Likes);
        assert_eq!(session.view_option.as_deref(), Some("alice"));

        // The anonymous token is retired
        assert!(service
            .resolve_session(Some(&anon.token))
            .await
            .unwrap()
            .is_none());

        let user = service
            .resolve_current_user(Some(&session.token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn view_option_all_clears_filter() {
        let service = service().await;

        let session = service.set_view_option(None, "bob").await.unwrap();
        assert_eq!(session.view_option.as_deref(), Some("bob"));

        let session = service
            .set_view_option(Some(&session.token), "All")
            .await
            .unwrap();
        assert!(session.view_option.is_none());
    }

    async fn pending_token(service: &IdentityService, external_id: &str) -> String {
        let token = new_token();
        pending_registration_repo::create_pending(
            &service.pool,
            &token,
            external_id,
            Duration::minutes(HANDSHAKE_TTL_MINUTES),
        )
        .await
        .unwrap();
        token
    }

    #[tokio::test]
    async fn failed_claim_keeps_token_usable() {
        let service = service().await;
        service.register_local("alice").await.unwrap();
        let token = pending_token(&service, "google-1").await;

        assert!(matches!(
            service.claim_pending(&token, "alice", None).await,
            Err(AppError::UsernameTaken)
        ));

        let session = service.claim_pending(&token, "carol", None).await.unwrap();
        let user = service
            .resolve_current_user(Some(&session.token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.username, "carol");
        assert_eq!(user.external_id.as_deref(), Some("google-1"));

        assert!(matches!(
            service.claim_pending(&token, "carol2", None).await,
            Err(AppError::InvalidPendingToken)
        ));
    }

    #[tokio::test]
    async fn claim_of_linked_identity_is_conflict_and_keeps_token() {
        let service = service().await;
        let first = pending_token(&service, "google-dup").await;
        let second = pending_token(&service, "google-dup").await;

        service.claim_pending(&first, "dana", None).await.unwrap();

        assert!(matches!(
            service.claim_pending(&second, "dana2", None).await,
            Err(AppError::Conflict(_))
        ));
        // Rolled back together with the failed insert
        assert!(service.pending_registration(&second).await.is_ok());
        assert!(!user_repo::username_exists(&service.pool, "dana2").await.unwrap());
    }

    #[tokio::test]
    async fn purge_removes_unclaimed_registrations() {
        let service = service().await;
        pending_registration_repo::create_pending(
            &service.pool,
            "stale",
            "google-9",
            Duration::seconds(-1),
        )
        .await
        .unwrap();
        let fresh = pending_token(&service, "google-10").await;

        assert_eq!(service.purge_expired().await.unwrap(), 1);
        assert!(service.pending_registration(&fresh).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_sort_option_is_rejected() {
        let service = service().await;
        assert!(matches!(
            service.set_sort_option(None, "random").await,
            Err(AppError::BadRequest(_))
        ));
    }
}
