/// Like handler
use crate::app_state::AppState;
use crate::error::Result;
use crate::middleware::AuthUser;
use actix_web::{web, HttpResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub success: bool,
    pub liked: bool,
    pub likes: i64,
}

/// POST /like/{id} - toggle the caller's like
pub async fn toggle_like(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let toggle = state
        .likes()
        .toggle_like(&user.0, post_id.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(LikeResponse {
        success: true,
        liked: toggle.liked,
        likes: toggle.likes,
    }))
}
