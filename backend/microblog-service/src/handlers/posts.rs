/// Post handlers - create, delete and serve media
use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::handlers::see_other;
use crate::middleware::AuthUser;
use crate::models::Media;
use crate::services::NewPost;
use actix_multipart::{Field, Multipart};
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;

/// POST /posts - multipart `title`, `content`, optional `image` / `video`
pub async fn create_post(
    state: web::Data<AppState>,
    user: AuthUser,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let limit = state.config.uploads.max_media_bytes;
    let mut new_post = NewPost::default();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let name = field.name().unwrap_or_default().to_string();
        let mime_type = field.content_type().map(|m| m.essence_str().to_string());

        let bytes = read_field(&mut field, limit, &name).await?;

        match name.as_str() {
            "title" => new_post.title = into_text(bytes, "title")?,
            "content" | "postBody" => new_post.content = into_text(bytes, "content")?,
            "image" => new_post.image = into_media(bytes, mime_type),
            "video" => new_post.video = into_media(bytes, mime_type),
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    state.posts().create_post(&user.0, new_post).await?;

    Ok(see_other("/").finish())
}

async fn read_field(field: &mut Field, limit: usize, name: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::BadRequest(format!(
                "{} exceeds {} bytes",
                name, limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn into_text(bytes: Vec<u8>, name: &str) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| AppError::BadRequest(format!("{} must be UTF-8", name)))
}

/// Browsers send an empty part for an untouched file input
fn into_media(bytes: Vec<u8>, mime_type: Option<String>) -> Option<Media> {
    if bytes.is_empty() {
        return None;
    }
    Some(Media {
        bytes,
        mime_type: mime_type.unwrap_or_else(|| "application/octet-stream".to_string()),
    })
}

/// POST /delete/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    state.posts().delete_post(&user.0, post_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// GET /postImage/{id}
pub async fn post_image(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let media = state.posts().get_post_image(post_id.into_inner()).await?;
    Ok(media_response(media))
}

/// GET /postVideo/{id}
pub async fn post_video(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let media = state.posts().get_post_video(post_id.into_inner()).await?;
    Ok(media_response(media))
}

fn media_response(media: Media) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, media.mime_type))
        .body(media.bytes)
}
