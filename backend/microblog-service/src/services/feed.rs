/// Feed assembler - turns stored posts into display-ready feed entries
use crate::db::post_repo::{self, PostWithAuthor};
use crate::metrics::{FEED_REQUEST_DURATION_SECONDS, FEED_REQUEST_TOTAL};
use crate::models::{avatar_path, EmbeddedMedia, FeedPost, FeedSort};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::time::Instant;

/// `MM/DD/YYYY hh:mm AM` in UTC
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M %p";

pub struct FeedAssembler {
    pool: SqlitePool,
}

impl FeedAssembler {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List posts ordered by `sort_key`, optionally limited to one author
    ///
    /// Never fails: an unknown sort key or a store error yields an empty feed.
    pub async fn list_posts(&self, sort_key: &str, author: Option<&str>) -> Vec<FeedPost> {
        let sort = match sort_key.parse::<FeedSort>() {
            Ok(sort) => sort,
            Err(err) => {
                FEED_REQUEST_TOTAL.with_label_values(&["invalid"]).inc();
                tracing::warn!(sort = %sort_key, "Rejecting feed request: {}", err);
                return Vec::new();
            }
        };

        self.list_sorted(sort, author).await
    }

    pub async fn list_sorted(&self, sort: FeedSort, author: Option<&str>) -> Vec<FeedPost> {
        let start = Instant::now();
        FEED_REQUEST_TOTAL.with_label_values(&[sort.as_str()]).inc();

        let rows = match post_repo::list_posts(&self.pool, sort, author).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(sort = %sort, author = ?author, error = %err, "Feed query failed");
                return Vec::new();
            }
        };

        let feed: Vec<FeedPost> = rows.into_iter().map(enrich).collect();

        FEED_REQUEST_DURATION_SECONDS
            .with_label_values(&[sort.as_str()])
            .observe(start.elapsed().as_secs_f64());
        tracing::debug!(sort = %sort, author = ?author, count = feed.len(), "Feed assembled");

        feed
    }

    /// Posts of one author, newest first (profile view)
    pub async fn list_posts_by_author(&self, username: &str) -> Vec<FeedPost> {
        self.list_sorted(FeedSort::Recency, Some(username)).await
    }
}

fn enrich(row: PostWithAuthor) -> FeedPost {
    let PostWithAuthor {
        post,
        author_avatar,
    } = row;

    let avatar_url = author_avatar
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| avatar_path(&post.username));

    FeedPost {
        id: post.id,
        title: post.title,
        content: post.content,
        avatar_url,
        timestamp: format_timestamp(&post.created_at),
        likes: post.likes,
        image: embed(post.image, post.image_type),
        video: embed(post.video, post.video_type),
        username: post.username,
    }
}

fn embed(bytes: Option<Vec<u8>>, mime_type: Option<String>) -> Option<EmbeddedMedia> {
    let bytes = bytes.filter(|b| !b.is_empty())?;
    Some(EmbeddedMedia {
        mime_type: mime_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        data: STANDARD.encode(bytes),
    })
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}
