#[macro_use]
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use common::build_state;

#[actix_web::test]
async fn test_avatar_is_png_for_known_user() {
    let state = build_state(None).await;
    let app = init_app!(state);
    login_as!(&app, "alice");

    let req = test::TestRequest::get().uri("/avatar/alice").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");

    let bytes = test::read_body(resp).await;
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[actix_web::test]
async fn test_avatar_is_stable_across_requests() {
    let state = build_state(None).await;
    let app = init_app!(state);
    login_as!(&app, "alice");

    let first = test::call_and_read_body(
        &app,
        test::TestRequest::get().uri("/avatar/alice").to_request(),
    )
    .await;
    let second = test::call_and_read_body(
        &app,
        test::TestRequest::get().uri("/avatar/alice").to_request(),
    )
    .await;

    assert_eq!(first, second);
}

#[actix_web::test]
async fn test_avatar_for_unknown_user_is_not_found() {
    let state = build_state(None).await;
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/avatar/nobody").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
