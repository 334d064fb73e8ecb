/// Feed preference handlers - stored on the caller's session
use crate::app_state::AppState;
use crate::error::Result;
use crate::handlers::{see_other, session_cookie};
use crate::middleware::SessionToken;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SortForm {
    pub sort: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewForm {
    pub author: String,
}

/// POST /sortOption
pub async fn set_sort_option(
    state: web::Data<AppState>,
    current: SessionToken,
    form: web::Form<SortForm>,
) -> Result<HttpResponse> {
    let session = state
        .identity()
        .set_sort_option(current.token(), &form.sort)
        .await?;

    Ok(see_other("/")
        .cookie(session_cookie(&state, &session))
        .finish())
}

/// POST /viewOption
pub async fn set_view_option(
    state: web::Data<AppState>,
    current: SessionToken,
    form: web::Form<ViewForm>,
) -> Result<HttpResponse> {
    let session = state
        .identity()
        .set_view_option(current.token(), &form.author)
        .await?;

    Ok(see_other("/")
        .cookie(session_cookie(&state, &session))
        .finish())
}
