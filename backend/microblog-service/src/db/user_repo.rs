use crate::models::{avatar_path, User};
use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};

/// Create a user; the avatar URL points at the generated avatar endpoint
///
/// Fails with a unique violation when the username (or external id) exists.
/// Runs on the pool or inside a caller's transaction.
pub async fn create_user<'e, E>(
    executor: E,
    username: &str,
    external_id: Option<&str>,
) -> Result<User, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, avatar_url, member_since, external_id)
        VALUES (?, ?, ?, ?)
        RETURNING id, username, avatar_url, member_since, external_id
        "#,
    )
    .bind(username)
    .bind(avatar_path(username))
    .bind(Utc::now())
    .bind(external_id)
    .fetch_one(executor)
    .await?;

    Ok(user)
}

/// Find a user by exact (case-sensitive) username
pub async fn find_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, avatar_url, member_since, external_id
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &SqlitePool, user_id: i64) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, avatar_url, member_since, external_id
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Find the user linked to an external identity
pub async fn find_by_external_id(
    pool: &SqlitePool,
    external_id: &str,
) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, avatar_url, member_since, external_id
        FROM users
        WHERE external_id = ?
        "#,
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn username_exists<'e, E>(executor: E, username: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
            .bind(username)
            .fetch_one(executor)
            .await?;

    Ok(exists)
}
