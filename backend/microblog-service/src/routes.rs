//! Route configuration
//!
//! Every route the service answers lives here; `main.rs` and the integration
//! tests mount the same table.

use crate::handlers::{auth, avatar, feed, health, likes, oauth, posts, preferences};
use crate::metrics::serve_metrics;
use actix_web::web;

/// Configure all routes for the application
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Operational endpoints
        .route("/health", web::get().to(health::health_check))
        .route("/metrics", web::get().to(serve_metrics))
        // Feed and profile
        .route("/", web::get().to(feed::home))
        .route("/profile", web::get().to(feed::profile))
        // Local accounts
        .service(
            web::resource("/register")
                .route(web::get().to(auth::register_page))
                .route(web::post().to(auth::register)),
        )
        .service(
            web::resource("/login")
                .route(web::get().to(auth::login_page))
                .route(web::post().to(auth::login)),
        )
        .route("/logout", web::get().to(auth::logout))
        .route("/error", web::get().to(auth::error_page))
        // External identity
        .route("/auth/google", web::get().to(oauth::google_start))
        .route("/auth/google/callback", web::get().to(oauth::google_callback))
        .service(
            web::resource("/registerUsername")
                .route(web::get().to(oauth::register_username_page))
                .route(web::post().to(oauth::register_username)),
        )
        // Posts, likes and media
        .route("/posts", web::post().to(posts::create_post))
        .route("/delete/{id}", web::post().to(posts::delete_post))
        .route("/like/{id}", web::post().to(likes::toggle_like))
        .route("/postImage/{id}", web::get().to(posts::post_image))
        .route("/postVideo/{id}", web::get().to(posts::post_video))
        .route("/avatar/{username}", web::get().to(avatar::get_avatar))
        // Per-session feed preferences
        .route("/sortOption", web::post().to(preferences::set_sort_option))
        .route("/viewOption", web::post().to(preferences::set_view_option));
}
