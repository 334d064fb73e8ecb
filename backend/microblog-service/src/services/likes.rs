/// Like service - toggles a user's like on a post
use crate::db::{like_repo, post_repo};
use crate::error::{AppError, Result};
use crate::metrics::LIKE_TOGGLE_TOTAL;
use crate::models::{LikeToggle, User};
use sqlx::SqlitePool;

pub struct LikeService {
    pool: SqlitePool,
}

impl LikeService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Like the post if the user has not liked it yet, otherwise unlike it
    ///
    /// Ledger row, counter and read-back share one transaction, which holds
    /// the write lock from its first statement.
    pub async fn toggle_like(&self, user: &User, post_id: i64) -> Result<LikeToggle> {
        let result = self.toggle_in_transaction(user, post_id).await;

        let outcome = match &result {
            Ok(toggle) if toggle.liked => "liked",
            Ok(_) => "unliked",
            Err(AppError::SelfLikeForbidden) => "self_like",
            Err(AppError::NotFound(_)) => "not_found",
            Err(_) => "error",
        };
        LIKE_TOGGLE_TOTAL.with_label_values(&[outcome]).inc();

        result
    }

    async fn toggle_in_transaction(&self, user: &User, post_id: i64) -> Result<LikeToggle> {
        let mut tx = self.pool.begin().await?;

        let author = post_repo::lock_for_update(&mut *tx, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post".to_string()))?;

        if author == user.username {
            return Err(AppError::SelfLikeForbidden);
        }

        // An existing row makes the insert a no-op, which means unlike
        let liked = if like_repo::create_like(&mut *tx, user.id, post_id).await? {
            true
        } else {
            like_repo::delete_like(&mut *tx, user.id, post_id).await?;
            false
        };

        let likes = post_repo::adjust_likes(&mut *tx, post_id, if liked { 1 } else { -1 }).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user.id,
            post_id = post_id,
            liked = liked,
            likes = likes,
            "Like toggled"
        );

        Ok(LikeToggle { liked, likes })
    }
}
