/// External login handlers (Google) and the username claim step
use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::handlers::{see_other, session_cookie, with_error};
use crate::middleware::SessionToken;
use crate::services::{ExternalLogin, IdentityProvider};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user denies consent
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimQuery {
    pub token: String,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimForm {
    pub token: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimView {
    pub token: String,
    pub error: Option<String>,
}

fn provider(state: &AppState) -> Result<Arc<dyn IdentityProvider>> {
    state
        .identity_provider
        .clone()
        .ok_or(AppError::OAuthDisabled)
}

/// GET /auth/google - redirect to the provider consent screen
pub async fn google_start(state: web::Data<AppState>) -> Result<HttpResponse> {
    let provider = provider(&state)?;
    let url = state
        .identity()
        .begin_external_login(provider.as_ref())
        .await?;

    Ok(see_other(&url).finish())
}

/// GET /auth/google/callback
pub async fn google_callback(
    state: web::Data<AppState>,
    current: SessionToken,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse> {
    let provider = provider(&state)?;
    let query = query.into_inner();

    if let Some(error) = query.error {
        tracing::info!(provider = provider.name(), error = %error, "External login declined");
        return Ok(see_other(&with_error("/login", "External login was cancelled")).finish());
    }

    let state_param = query.state.ok_or(AppError::InvalidOAuthState)?;
    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("missing authorization code".to_string()))?;

    let outcome = state
        .identity()
        .complete_external_login(provider.as_ref(), &code, &state_param, current.token())
        .await?;

    match outcome {
        ExternalLogin::LoggedIn(session) => Ok(see_other("/")
            .cookie(session_cookie(&state, &session))
            .finish()),
        ExternalLogin::PendingUsername(token) => Ok(see_other(&format!(
            "/registerUsername?token={}",
            urlencoding::encode(&token)
        ))
        .finish()),
    }
}

/// GET /registerUsername?token=...
pub async fn register_username_page(
    state: web::Data<AppState>,
    query: web::Query<ClaimQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    state.identity().pending_registration(&query.token).await?;

    Ok(HttpResponse::Ok().json(ClaimView {
        token: query.token,
        error: query.error,
    }))
}

/// POST /registerUsername
pub async fn register_username(
    state: web::Data<AppState>,
    current: SessionToken,
    form: web::Form<ClaimForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let retry_path = format!("/registerUsername?token={}", urlencoding::encode(&form.token));

    match state
        .identity()
        .claim_pending(&form.token, &form.username, current.token())
        .await
    {
        Ok(session) => Ok(see_other("/")
            .cookie(session_cookie(&state, &session))
            .finish()),
        Err(AppError::UsernameTaken) => {
            Ok(see_other(&with_error(&retry_path, "Username taken")).finish())
        }
        Err(AppError::BadRequest(message)) => {
            Ok(see_other(&with_error(&retry_path, &message)).finish())
        }
        Err(err) => Err(err),
    }
}
