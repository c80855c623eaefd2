//! End-to-end tests of the HTTP surface over the in-memory backends.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use tokio::sync::Notify;
use tower::ServiceExt;

use engagement::{
    memory::{MemorySnapshots, MemoryStore},
    router,
    routes::USER_ID_HEADER,
    state::AppState,
    types::{Engagement, ItemId},
    vote::VoteService,
};

async fn test_router() -> Router {
    let store = Arc::new(MemoryStore::new());
    let snapshots = Arc::new(MemorySnapshots::new());
    snapshots.seed_item(ItemId(1)).await;

    let votes = VoteService::new(store.clone(), store, Arc::new(Notify::new()));

    router(AppState::new(votes, snapshots))
}

fn request(method: &str, uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user);
    }

    builder.body(Body::empty()).unwrap()
}

async fn engagement_body(response: axum::response::Response) -> Engagement {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn vote_round_trip_over_http() {
    let app = test_router().await;

    let response = app
        .clone()
        .oneshot(request("POST", "/items/1/like", Some("42")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = engagement_body(response).await;
    assert!(body.liked);
    assert!(!body.disliked);
    assert_eq!(body.likes, 1);

    let status = app
        .oneshot(request("GET", "/items/1/engagement", Some("42")))
        .await
        .unwrap();
    let body = engagement_body(status).await;
    assert!(body.liked);
    assert_eq!((body.likes, body.dislikes), (1, 0));
}

#[tokio::test]
async fn second_user_sees_totals_but_not_the_first_users_state() {
    let app = test_router().await;

    app.clone()
        .oneshot(request("POST", "/items/1/like", Some("1")))
        .await
        .unwrap();

    let status = app
        .oneshot(request("GET", "/items/1/engagement", Some("2")))
        .await
        .unwrap();
    let body = engagement_body(status).await;

    assert!(!body.liked);
    assert_eq!(body.likes, 1);
}

#[tokio::test]
async fn unlike_without_like_is_a_bad_request() {
    let app = test_router().await;

    let response = app
        .clone()
        .oneshot(request("POST", "/items/1/unlike", Some("1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(request("POST", "/items/1/undislike", Some("1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_item_is_not_found() {
    let app = test_router().await;

    let response = app
        .oneshot(request("POST", "/items/999/like", Some("1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_or_malformed_identity_is_unauthorized() {
    let app = test_router().await;

    let response = app
        .clone()
        .oneshot(request("POST", "/items/1/like", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(request("POST", "/items/1/like", Some("not-a-number")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dislike_after_like_swaps_the_counters() {
    let app = test_router().await;

    app.clone()
        .oneshot(request("POST", "/items/1/like", Some("7")))
        .await
        .unwrap();

    let response = app
        .oneshot(request("POST", "/items/1/dislike", Some("7")))
        .await
        .unwrap();
    let body = engagement_body(response).await;

    assert!(!body.liked);
    assert!(body.disliked);
    assert_eq!((body.likes, body.dislikes), (0, 1));
}
