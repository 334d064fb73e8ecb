/// Error types for MicroBlog Service
///
/// Every failure a handler can surface is an `AppError`. Errors render as a
/// JSON body `{"success": false, "message", "status"}` except `LoginRequired`,
/// which sends the browser to the login page.
use actix_web::{error::ResponseError, http::header, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

/// Result type for microblog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Username taken")]
    UsernameTaken,

    #[error("You cannot like your own post")]
    SelfLikeForbidden,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Login required")]
    LoginRequired,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid or expired OAuth state")]
    InvalidOAuthState,

    #[error("Invalid or expired registration token")]
    InvalidPendingToken,

    #[error("Identity provider error: {0}")]
    OAuth(String),

    #[error("External login is not configured")]
    OAuthDisabled,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    status: u16,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::UsernameTaken | AppError::SelfLikeForbidden | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::LoginRequired => StatusCode::SEE_OTHER,
            AppError::BadRequest(_)
            | AppError::InvalidOAuthState
            | AppError::InvalidPendingToken => StatusCode::BAD_REQUEST,
            AppError::OAuth(_) => StatusCode::BAD_GATEWAY,
            AppError::OAuthDisabled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::LoginRequired = self {
            return HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/login"))
                .finish();
        }

        let status = self.status_code();
        // Driver details stay in the logs
        let message = match self {
            AppError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(status).json(ErrorResponse {
            success: false,
            message,
            status: status.as_u16(),
        })
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::OAuth(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Internal(err.to_string())
    }
}
