use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

/// Remember a CSRF state issued for the provider redirect
pub async fn create_state(pool: &SqlitePool, state: &str, ttl: Duration) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO oauth_states (state, created_at, expires_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(state)
    .bind(now)
    .bind(now + ttl)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete the state and report whether it was known and still fresh
pub async fn consume_state(pool: &SqlitePool, state: &str) -> Result<bool, sqlx::Error> {
    let expires_at: Option<DateTime<Utc>> = sqlx::query_scalar(
        r#"
        DELETE FROM oauth_states
        WHERE state = ?
        RETURNING expires_at
        "#,
    )
    .bind(state)
    .fetch_optional(pool)
    .await?;

    Ok(matches!(expires_at, Some(expires_at) if expires_at > Utc::now()))
}

/// Drop states whose handshake was abandoned
pub async fn delete_expired(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM oauth_states WHERE expires_at <= ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
