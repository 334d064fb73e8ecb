use crate::models::PendingRegistration;
use chrono::{Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};

/// Store an external identity awaiting a username claim
pub async fn create_pending(
    pool: &SqlitePool,
    token: &str,
    external_id: &str,
    ttl: Duration,
) -> Result<PendingRegistration, sqlx::Error> {
    let now = Utc::now();
    let pending = sqlx::query_as::<_, PendingRegistration>(
        r#"
        INSERT INTO pending_registrations (token, external_id, created_at, expires_at)
        VALUES (?, ?, ?, ?)
        RETURNING token, external_id, created_at, expires_at
        "#,
    )
    .bind(token)
    .bind(external_id)
    .bind(now)
    .bind(now + ttl)
    .fetch_one(pool)
    .await?;

    Ok(pending)
}

/// Look up a pending registration without consuming it
pub async fn find_active(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<PendingRegistration>, sqlx::Error> {
    let pending = sqlx::query_as::<_, PendingRegistration>(
        r#"
        SELECT token, external_id, created_at, expires_at
        FROM pending_registrations
        WHERE token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(pending.filter(|p| !p.is_expired()))
}

/// Delete and return the record; a token can be consumed only once
///
/// Expired records are deleted too but reported as absent. The delete takes
/// the write lock, so this opens the caller's transaction.
pub async fn consume(
    conn: &mut SqliteConnection,
    token: &str,
) -> Result<Option<PendingRegistration>, sqlx::Error> {
    let pending = sqlx::query_as::<_, PendingRegistration>(
        r#"
        DELETE FROM pending_registrations
        WHERE token = ?
        RETURNING token, external_id, created_at, expires_at
        "#,
    )
    .bind(token)
    .fetch_optional(conn)
    .await?;

    Ok(pending.filter(|p| !p.is_expired()))
}

/// Drop registrations nobody came back to claim
pub async fn delete_expired(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM pending_registrations WHERE expires_at <= ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;

    #[tokio::test]
    async fn pending_token_is_single_use() {
        let pool = db_pool::create_memory_pool("pending-repo-test").await.unwrap();
        run_migrations(&pool).await.unwrap();

        create_pending(&pool, "p-1", "google-42", Duration::minutes(10))
            .await
            .unwrap();
        assert!(find_active(&pool, "p-1").await.unwrap().is_some());

        let mut conn = pool.acquire().await.unwrap();
        let first = consume(&mut conn, "p-1").await.unwrap().unwrap();
        assert_eq!(first.external_id, "google-42");
        assert!(consume(&mut conn, "p-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_token_cannot_be_consumed() {
        let pool = db_pool::create_memory_pool("pending-repo-test").await.unwrap();
        run_migrations(&pool).await.unwrap();

        create_pending(&pool, "p-old", "google-7", Duration::seconds(-1))
            .await
            .unwrap();
        assert!(find_active(&pool, "p-old").await.unwrap().is_none());
        let mut conn = pool.acquire().await.unwrap();
        assert!(consume(&mut conn, "p-old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_registrations_are_purged() {
        let pool = db_pool::create_memory_pool("pending-repo-test").await.unwrap();
        run_migrations(&pool).await.unwrap();

        create_pending(&pool, "p-stale", "google-1", Duration::seconds(-1))
            .await
            .unwrap();
        create_pending(&pool, "p-stale-too", "google-2", Duration::seconds(-1))
            .await
            .unwrap();
        create_pending(&pool, "p-fresh", "google-3", Duration::minutes(10))
            .await
            .unwrap();

        assert_eq!(delete_expired(&pool).await.unwrap(), 2);
        assert!(find_active(&pool, "p-fresh").await.unwrap().is_some());
        assert_eq!(delete_expired(&pool).await.unwrap(), 0);
    }
}
