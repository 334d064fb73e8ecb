use crate::models::{FeedSort, Media, Post};
use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

const POST_COLUMNS: &str = "p.id, p.title, p.content, p.username, p.created_at, p.likes, \
                            p.image, p.image_type, p.video, p.video_type";

/// A post joined with its author's stored avatar URL
///
/// `author_avatar` is `None` when the author has no avatar or no user row.
#[derive(Debug, Clone, FromRow)]
pub struct PostWithAuthor {
    #[sqlx(flatten)]
    pub post: Post,
    pub author_avatar: Option<String>,
}

/// Insert a new post with zero likes
pub async fn create_post(
    pool: &SqlitePool,
    username: &str,
    title: &str,
    content: &str,
    image: Option<&Media>,
    video: Option<&Media>,
) -> Result<Post, sqlx::Error> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (title, content, username, created_at, likes,
                           image, image_type, video, video_type)
        VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?)
        RETURNING id, title, content, username, created_at, likes,
                  image, image_type, video, video_type
        "#,
    )
    .bind(title)
    .bind(content)
    .bind(username)
    .bind(Utc::now())
    .bind(image.map(|m| m.bytes.as_slice()))
    .bind(image.map(|m| m.mime_type.as_str()))
    .bind(video.map(|m| m.bytes.as_slice()))
    .bind(video.map(|m| m.mime_type.as_str()))
    .fetch_one(pool)
    .await?;

    Ok(post)
}

pub async fn find_post_by_id(pool: &SqlitePool, post_id: i64) -> Result<Option<Post>, sqlx::Error> {
    let sql = format!("SELECT {} FROM posts p WHERE p.id = ?", POST_COLUMNS);
    let post = sqlx::query_as::<_, Post>(&sql)
        .bind(post_id)
        .fetch_optional(pool)
        .await?;

    Ok(post)
}

/// List posts joined with author avatars
///
/// Ordered by the sort key descending, ties broken by newest id first.
pub async fn list_posts(
    pool: &SqlitePool,
    sort: FeedSort,
    author: Option<&str>,
) -> Result<Vec<PostWithAuthor>, sqlx::Error> {
    let order_by = match sort {
        FeedSort::Recency => "p.created_at DESC, p.id DESC",
        FeedSort::Likes => "p.likes DESC, p.id DESC",
    };

    let sql = format!(
        r#"
        SELECT {}, u.avatar_url AS author_avatar
        FROM posts p
        LEFT JOIN users u ON u.username = p.username
        WHERE (? IS NULL OR p.username = ?)
        ORDER BY {}
        "#,
        POST_COLUMNS, order_by
    );

    let posts = sqlx::query_as::<_, PostWithAuthor>(&sql)
        .bind(author)
        .bind(author)
        .fetch_all(pool)
        .await?;

    Ok(posts)
}

/// Take the write lock and return the post's author
///
/// Must be the first statement of the caller's transaction. SQLite only
/// waits out `busy_timeout` for a lock requested before any read; a deferred
/// transaction that reads first fails with `SQLITE_BUSY` once another writer
/// commits.
pub async fn lock_for_update(
    conn: &mut SqliteConnection,
    post_id: i64,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("UPDATE posts SET likes = likes WHERE id = ? RETURNING username")
        .bind(post_id)
        .fetch_optional(conn)
        .await
}

/// Add `delta` to the denormalized like counter and return the new value
pub async fn adjust_likes(
    conn: &mut SqliteConnection,
    post_id: i64,
    delta: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        UPDATE posts
        SET likes = likes + ?
        WHERE id = ?
        RETURNING likes
        "#,
    )
    .bind(delta)
    .bind(post_id)
    .fetch_one(conn)
    .await
}

pub async fn delete_post(conn: &mut SqliteConnection, post_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(post_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn find_image(pool: &SqlitePool, post_id: i64) -> Result<Option<Media>, sqlx::Error> {
    let row: Option<(Option<Vec<u8>>, Option<String>)> =
        sqlx::query_as("SELECT image, image_type FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.and_then(into_media))
}

pub async fn find_video(pool: &SqlitePool, post_id: i64) -> Result<Option<Media>, sqlx::Error> {
    let row: Option<(Option<Vec<u8>>, Option<String>)> =
        sqlx::query_as("SELECT video, video_type FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.and_then(into_media))
}

fn into_media((bytes, mime_type): (Option<Vec<u8>>, Option<String>)) -> Option<Media> {
    match (bytes, mime_type) {
        (Some(bytes), mime_type) if !bytes.is_empty() => Some(Media {
            bytes,
            mime_type: mime_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        }),
        _ => None,
    }
}
