/// Avatar handler
use crate::app_state::AppState;
use crate::db::user_repo;
use crate::error::{AppError, Result};
use crate::services::avatar;
use actix_web::http::header;
use actix_web::{web, HttpResponse};

/// GET /avatar/{username} - PNG of the username's first letter
pub async fn get_avatar(
    state: web::Data<AppState>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let username = username.into_inner();
    let user = user_repo::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    let size = &state.config.avatar;
    let png = avatar::generate(avatar::initial_of(&user.username), size.width, size.height)?;

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "image/png"))
        .insert_header((header::CACHE_CONTROL, "public, max-age=3600"))
        .body(png))
}
