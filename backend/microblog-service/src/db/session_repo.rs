use crate::models::{FeedSort, Session};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

/// Create a session; `user_id` is `None` for anonymous visitors
pub async fn create_session(
    pool: &SqlitePool,
    token: &str,
    user_id: Option<i64>,
    ttl: Duration,
) -> Result<Session, sqlx::Error> {
    let now = Utc::now();
    let session = sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions (token, user_id, sort_option, view_option, created_at, expires_at)
        VALUES (?, ?, ?, NULL, ?, ?)
        RETURNING token, user_id, sort_option, view_option, created_at, expires_at
        "#,
    )
    .bind(token)
    .bind(user_id)
    .bind(FeedSort::default().as_str())
    .bind(now)
    .bind(now + ttl)
    .fetch_one(pool)
    .await?;

    Ok(session)
}

/// Find a session by token, ignoring expired ones
pub async fn find_active(pool: &SqlitePool, token: &str) -> Result<Option<Session>, sqlx::Error> {
    let session = sqlx::query_as::<_, Session>(
        r#"
        SELECT token, user_id, sort_option, view_option, created_at, expires_at
        FROM sessions
        WHERE token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(session.filter(|s| !s.is_expired()))
}

pub async fn update_sort_option(
    pool: &SqlitePool,
    token: &str,
    sort: FeedSort,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE sessions SET sort_option = ? WHERE token = ?")
        .bind(sort.as_str())
        .bind(token)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Store the author filter; `None` means all authors
pub async fn update_view_option(
    pool: &SqlitePool,
    token: &str,
    author: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE sessions SET view_option = ? WHERE token = ?")
        .bind(author)
        .bind(token)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

/// Remove expired sessions; returns how many were purged
pub async fn delete_expired(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{run_migrations, user_repo};

    async fn pool() -> SqlitePool {
        let pool = db_pool::create_memory_pool("session-repo-test").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn anonymous_session_defaults() {
        let pool = pool().await;

        let session = create_session(&pool, "tok-1", None, Duration::hours(1))
            .await
            .unwrap();
        assert!(session.user_id.is_none());
        assert_eq!(session.sort(), FeedSort::Recency);
        assert!(session.view_option.is_none());

        assert!(find_active(&pool, "tok-1").await.unwrap().is_some());
        assert!(find_active(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_ignored_and_purged() {
        let pool = pool().await;
        create_session(&pool, "old", None, Duration::seconds(-5))
            .await
            .unwrap();

        assert!(find_active(&pool, "old").await.unwrap().is_none());
        assert_eq!(delete_expired(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn preferences_are_stored_per_token() {
        let pool = pool().await;
        let user = user_repo::create_user(&pool, "alice", None).await.unwrap();
        create_session(&pool, "tok", Some(user.id), Duration::hours(1))
            .await
            .unwrap();

        assert!(update_sort_option(&pool, "tok", FeedSort::Likes).await.unwrap());
        assert!(update_view_option(&pool, "tok", Some("alice")).await.unwrap());

        let session = find_active(&pool, "tok").await.unwrap().unwrap();
        assert_eq!(session.user_id, Some(user.id));
        assert_eq!(session.sort(), FeedSort::Likes);
        assert_eq!(session.view_option.as_deref(), Some("alice"));

        delete_session(&pool, "tok").await.unwrap();
        assert!(find_active(&pool, "tok").await.unwrap().is_none());
    }
}
