/// Local account handlers - register, login, logout and the error page
use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::handlers::{removal_cookie, see_other, session_cookie, with_error};
use crate::middleware::SessionToken;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UsernameForm {
    pub username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterView {
    pub reg_error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginView {
    pub login_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorView {
    pub error: Option<String>,
}

pub async fn register_page(query: web::Query<ErrorQuery>) -> HttpResponse {
    HttpResponse::Ok().json(RegisterView {
        reg_error: query.into_inner().error,
    })
}

/// POST /register
pub async fn register(
    state: web::Data<AppState>,
    form: web::Form<UsernameForm>,
) -> Result<HttpResponse> {
    match state.identity().register_local(&form.username).await {
        Ok(_) => Ok(see_other("/login").finish()),
        Err(AppError::UsernameTaken) => {
            Ok(see_other(&with_error("/register", "Username taken")).finish())
        }
        Err(AppError::BadRequest(message)) => {
            Ok(see_other(&with_error("/register", &message)).finish())
        }
        Err(err) => Err(err),
    }
}

pub async fn login_page(query: web::Query<ErrorQuery>) -> HttpResponse {
    HttpResponse::Ok().json(LoginView {
        login_error: query.into_inner().error,
    })
}

/// POST /login - username only
pub async fn login(
    state: web::Data<AppState>,
    current: SessionToken,
    form: web::Form<UsernameForm>,
) -> Result<HttpResponse> {
    match state
        .identity()
        .login_local(&form.username, current.token())
        .await
    {
        Ok(session) => Ok(see_other("/")
            .cookie(session_cookie(&state, &session))
            .finish()),
        Err(AppError::NotFound(_) | AppError::BadRequest(_)) => {
            tracing::debug!("Login rejected for unknown username");
            Ok(see_other(&with_error("/login", "Invalid username")).finish())
        }
        Err(err) => Err(err),
    }
}

/// GET /logout
pub async fn logout(state: web::Data<AppState>, current: SessionToken) -> Result<HttpResponse> {
    if let Some(token) = current.token() {
        state.identity().logout(token).await?;
    }

    Ok(see_other("/").cookie(removal_cookie(&state)).finish())
}

pub async fn error_page(query: web::Query<ErrorQuery>) -> HttpResponse {
    HttpResponse::Ok().json(ErrorView {
        error: query.into_inner().error,
    })
}
