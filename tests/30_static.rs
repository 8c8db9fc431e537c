#![cfg(unix)]

mod common;

use axum::http::StatusCode;
use common::{get, post, send, HandlerTree};

#[tokio::test]
async fn public_files_are_served_without_token() {
    let app = HandlerTree::new()
        .public_file("index.html", "<h1>hello</h1>")
        .app();

    let (status, body) = send(&app, get("/index.html", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>hello</h1>");

    let (status, body) = send(&app, get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>hello</h1>");
}

#[tokio::test]
async fn non_get_requests_do_not_reach_static_files() {
    let app = HandlerTree::new()
        .public_file("index.html", "<h1>hello</h1>")
        .app();

    let (status, _) = send(&app, post("/index.html", "{}", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
