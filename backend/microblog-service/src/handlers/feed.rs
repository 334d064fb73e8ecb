/// Feed handlers - home feed and profile view models
use crate::app_state::AppState;
use crate::handlers::UserView;
use crate::middleware::{AuthUser, SessionToken};
use crate::models::{FeedPost, FeedSort};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub sort: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HomeView {
    pub posts: Vec<FeedPost>,
    pub user: Option<UserView>,
    pub sort: String,
    pub author: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user: UserView,
    pub posts: Vec<FeedPost>,
}

/// GET / - feed ordered and filtered by query, then session preference
pub async fn home(
    state: web::Data<AppState>,
    session: SessionToken,
    query: web::Query<FeedQuery>,
) -> HttpResponse {
    let query = query.into_inner();
    let current = session.0.as_ref();

    let sort = query
        .sort
        .or_else(|| current.map(|c| c.session.sort_option.clone()))
        .unwrap_or_else(|| FeedSort::default().as_str().to_string());

    let author = match query.author {
        Some(author) => Some(author),
        None => current.and_then(|c| c.session.view_option.clone()),
    }
    .map(|a| a.trim().to_string())
    .filter(|a| !a.is_empty() && !a.eq_ignore_ascii_case("all"));

    let posts = state.feed().list_posts(&sort, author.as_deref()).await;
    let user = current.and_then(|c| c.user.as_ref()).map(UserView::from);

    HttpResponse::Ok().json(HomeView {
        posts,
        user,
        sort,
        author,
    })
}

/// GET /profile - the caller's own posts
pub async fn profile(state: web::Data<AppState>, user: AuthUser) -> HttpResponse {
    let user = user.0;
    let posts = state.feed().list_posts_by_author(&user.username).await;

    HttpResponse::Ok().json(ProfileView {
        user: UserView::from(&user),
        posts,
    })
}
