/// Post service - handles post creation, deletion and media retrieval
use crate::db::{like_repo, post_repo};
use crate::error::{AppError, Result};
use crate::models::{Media, Post, User};
use sqlx::SqlitePool;

/// Validated input for a new post
#[derive(Debug, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub image: Option<Media>,
    pub video: Option<Media>,
}

pub struct PostService {
    pool: SqlitePool,
    max_media_bytes: usize,
}

impl PostService {
    pub fn new(pool: SqlitePool, max_media_bytes: usize) -> Self {
        Self {
            pool,
            max_media_bytes,
        }
    }

    /// Create a post authored by `author`
    pub async fn create_post(&self, author: &User, new_post: NewPost) -> Result<Post> {
        let title = new_post.title.trim();
        let content = new_post.content.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("title is required".to_string()));
        }
        if content.is_empty() {
            return Err(AppError::BadRequest("content is required".to_string()));
        }

        if let Some(image) = &new_post.image {
            self.check_media(image, "image")?;
        }
        if let Some(video) = &new_post.video {
            self.check_media(video, "video")?;
        }

        let post = post_repo::create_post(
            &self.pool,
            &author.username,
            title,
            content,
            new_post.image.as_ref(),
            new_post.video.as_ref(),
        )
        .await?;

        tracing::info!(
            user_id = %author.id,
            post_id = post.id,
            has_image = post.image.is_some(),
            has_video = post.video.is_some(),
            "Post created"
        );

        Ok(post)
    }

    fn check_media(&self, media: &Media, kind: &str) -> Result<()> {
        if !media.mime_type.starts_with(&format!("{}/", kind)) {
            return Err(AppError::BadRequest(format!(
                "{} must have an {}/* content type, got {}",
                kind, kind, media.mime_type
            )));
        }
        if media.bytes.len() > self.max_media_bytes {
            return Err(AppError::BadRequest(format!(
                "{} exceeds {} bytes",
                kind, self.max_media_bytes
            )));
        }
        Ok(())
    }

    /// Delete a post and its likes; only the author may do this
    pub async fn delete_post(&self, user: &User, post_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let author = post_repo::lock_for_update(&mut *tx, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post".to_string()))?;

        if author != user.username {
            tracing::warn!(
                user_id = %user.id,
                post_id = post_id,
                "Rejected delete of another user's post"
            );
            return Err(AppError::Unauthorized(
                "You are not authorized to delete this post".to_string(),
            ));
        }

        let removed_likes = like_repo::delete_likes_for_post(&mut *tx, post_id).await?;
        post_repo::delete_post(&mut *tx, post_id).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user.id,
            post_id = post_id,
            removed_likes = removed_likes,
            "Post deleted"
        );

        Ok(())
    }

    pub async fn get_post_image(&self, post_id: i64) -> Result<Media> {
        post_repo::find_image(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Image".to_string()))
    }

    pub async fn get_post_video(&self, post_id: i64) -> Result<Media> {
        post_repo::find_video(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Video".to_string()))
    }
}
