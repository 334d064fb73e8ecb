use sqlx::{SqliteConnection, SqlitePool};

/// Record a like; returns false if the pair was already present
pub async fn create_like(
    conn: &mut SqliteConnection,
    user_id: i64,
    post_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO likes (user_id, post_id)
        VALUES (?, ?)
        ON CONFLICT (user_id, post_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove a like; returns false if there was nothing to remove
pub async fn delete_like(
    conn: &mut SqliteConnection,
    user_id: i64,
    post_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM likes WHERE user_id = ? AND post_id = ?")
        .bind(user_id)
        .bind(post_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Drop every like of a post (used before deleting the post)
pub async fn delete_likes_for_post(
    conn: &mut SqliteConnection,
    post_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM likes WHERE post_id = ?")
        .bind(post_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

/// Count ledger rows for a post; matches `posts.likes` when the counter is in sync
pub async fn count_likes_by_post(pool: &SqlitePool, post_id: i64) -> Result<i64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{post_repo, run_migrations, user_repo};

    #[tokio::test]
    async fn like_rows_are_unique_per_pair() {
        let pool = db_pool::create_memory_pool("like-repo-test").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let alice = user_repo::create_user(&pool, "alice", None).await.unwrap();
        user_repo::create_user(&pool, "bob", None).await.unwrap();
        let post = post_repo::create_post(&pool, "bob", "t", "c", None, None)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert!(create_like(&mut conn, alice.id, post.id).await.unwrap());
        assert!(!create_like(&mut conn, alice.id, post.id).await.unwrap());
        drop(conn);

        assert_eq!(count_likes_by_post(&pool, post.id).await.unwrap(), 1);

        let mut conn = pool.acquire().await.unwrap();
        assert!(delete_like(&mut conn, alice.id, post.id).await.unwrap());
        assert!(!delete_like(&mut conn, alice.id, post.id).await.unwrap());
        assert_eq!(delete_likes_for_post(&mut conn, post.id).await.unwrap(), 0);
    }
}
