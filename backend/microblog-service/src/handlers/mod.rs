/// HTTP handlers
///
/// Page routes answer with JSON view models; form routes answer with
/// `303 See Other` redirects, carrying user-facing problems in `?error=`.
pub mod auth;
pub mod avatar;
pub mod feed;
pub mod health;
pub mod likes;
pub mod oauth;
pub mod posts;
pub mod preferences;

use crate::app_state::AppState;
use crate::models::{Session, User};
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::http::header;
use actix_web::{HttpResponse, HttpResponseBuilder};
use serde::Serialize;

/// Public view of a user
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub avatar_url: String,
    pub member_since: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            avatar_url: user.avatar_url_or_default(),
            member_since: crate::services::feed::format_timestamp(&user.member_since),
        }
    }
}

pub(crate) fn see_other(location: &str) -> HttpResponseBuilder {
    let mut builder = HttpResponse::SeeOther();
    builder.insert_header((header::LOCATION, location.to_string()));
    builder
}

/// `path?error=Some+message` (form-urlencoded, spaces as `+`)
pub(crate) fn with_error(path: &str, message: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!(
        "{}{}error={}",
        path,
        separator,
        urlencoding::encode(message).replace("%20", "+")
    )
}

pub(crate) fn session_cookie(state: &AppState, session: &Session) -> Cookie<'static> {
    let config = &state.config.session;
    Cookie::build(config.cookie_name.clone(), session.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookie)
        .max_age(CookieDuration::hours(config.ttl_hours))
        .finish()
}

pub(crate) fn removal_cookie(state: &AppState) -> Cookie<'static> {
    let mut cookie = Cookie::build(state.config.session.cookie_name.clone(), "")
        .path("/")
        .finish();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_query_uses_plus_for_spaces() {
        assert_eq!(
            with_error("/register", "Username taken"),
            "/register?error=Username+taken"
        );
        assert_eq!(
            with_error("/registerUsername?token=abc", "a&b"),
            "/registerUsername?token=abc&error=a%26b"
        );
    }
}
