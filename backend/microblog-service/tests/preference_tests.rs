#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use common::{build_state, location, seed_post, session_cookie_of, set_likes};
use serde_json::Value;

#[actix_web::test]
async fn test_sort_preference_is_per_session() {
    // GIVEN: two logged-in sessions and posts with different like counts
    let state = build_state(None).await;
    let app = init_app!(state.clone());
    let alice = login_as!(&app, "alice");
    let bob = login_as!(&app, "bob");

    let popular = seed_post(&state, "alice", "popular").await;
    seed_post(&state, "alice", "recent").await;
    set_likes(&state, popular, 5).await;

    // WHEN: alice switches to sorting by likes
    let req = test::TestRequest::post()
        .uri("/sortOption")
        .cookie(alice.clone())
        .set_form([("sort", "likes")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    // THEN: alice sees likes order, bob still sees recency
    let req = test::TestRequest::get().uri("/").cookie(alice).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["sort"], "likes");
    assert_eq!(body["posts"][0]["title"], "popular");

    let req = test::TestRequest::get().uri("/").cookie(bob).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["sort"], "recency");
    assert_eq!(body["posts"][0]["title"], "recent");
}

#[actix_web::test]
async fn test_query_overrides_session_sort() {
    let state = build_state(None).await;
    let app = init_app!(state.clone());
    let alice = login_as!(&app, "alice");

    let popular = seed_post(&state, "alice", "popular").await;
    seed_post(&state, "alice", "recent").await;
    set_likes(&state, popular, 5).await;

    let req = test::TestRequest::post()
        .uri("/sortOption")
        .cookie(alice.clone())
        .set_form([("sort", "likes")])
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/?sort=recency")
        .cookie(alice)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["sort"], "recency");
    assert_eq!(body["posts"][0]["title"], "recent");
}

#[actix_web::test]
async fn test_invalid_sort_option_is_rejected() {
    let state = build_state(None).await;
    let app = init_app!(state);
    let alice = login_as!(&app, "alice");

    let req = test::TestRequest::post()
        .uri("/sortOption")
        .cookie(alice)
        .set_form([("sort", "random")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_view_option_filters_and_resets() {
    let state = build_state(None).await;
    let app = init_app!(state.clone());
    let alice = login_as!(&app, "alice");
    login_as!(&app, "bob");

    seed_post(&state, "alice", "by alice").await;
    seed_post(&state, "bob", "by bob").await;

    let req = test::TestRequest::post()
        .uri("/viewOption")
        .cookie(alice.clone())
        .set_form([("author", "bob")])
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/").cookie(alice.clone()).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["author"], "bob");
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri("/viewOption")
        .cookie(alice.clone())
        .set_form([("author", "all")])
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/").cookie(alice).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["author"].is_null());
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_anonymous_preference_creates_session() {
    let state = build_state(None).await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/sortOption")
        .set_form([("sort", "likes")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie_of(&resp).expect("anonymous session cookie");

    let req = test::TestRequest::get().uri("/").cookie(cookie).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["sort"], "likes");
    assert!(body["user"].is_null());
}

#[actix_web::test]
async fn test_login_keeps_anonymous_preferences() {
    let state = build_state(None).await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/register")
        .set_form([("username", "alice")])
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/sortOption")
        .set_form([("sort", "likes")])
        .to_request();
    let anonymous = session_cookie_of(&test::call_service(&app, req).await).unwrap();

    let req = test::TestRequest::post()
        .uri("/login")
        .cookie(anonymous)
        .set_form([("username", "alice")])
        .to_request();
    let logged_in = session_cookie_of(&test::call_service(&app, req).await).unwrap();

    let req = test::TestRequest::get().uri("/").cookie(logged_in).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["sort"], "likes");
    assert_eq!(body["user"]["username"], "alice");
}
