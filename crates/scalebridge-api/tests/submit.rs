//! HTTP submission tests.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot` and
//! checks the resulting store state.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use scalebridge_api::build_router;
use scalebridge_registry::*;

fn test_store() -> Arc<StatusStore> {
    Arc::new(StatusStore::new(DefaultStatus::new("queue_depth", 1)))
}

async fn submit(store: &Arc<StatusStore>, uri: &str) -> (StatusCode, serde_json::Value) {
    let router = build_router(EventIngestor::new(Arc::clone(store)));
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();

    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn global_update_is_applied() {
    let store = test_store();
    let (status, body) = submit(&store, "/?active=true&value=5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["outcome"], "default_updated");
    assert_eq!(
        store.status("anything"),
        ActivationStatus {
            active: true,
            metric_value: 5
        }
    );
}

#[tokio::test]
async fn post_is_accepted_too() {
    let store = test_store();
    let router = build_router(EventIngestor::new(Arc::clone(&store)));
    let req = Request::builder()
        .method("POST")
        .uri("/?name=&active=1&value=2")
        .body(Body::empty())
        .unwrap();

    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(store.defaults().metric_value, 2);
}

#[tokio::test]
async fn object_update_reaches_registered_entry() {
    let store = test_store();
    let mut reg = store.register("job-1");

    let (status, body) = submit(&store, "/?name=job-1&active=true&value=9").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "object_updated");
    assert_eq!(reg.try_recv(), Some(true));
    assert_eq!(store.status("job-1").metric_value, 9);
    assert_eq!(store.defaults(), ActivationStatus::default());
}

#[tokio::test]
async fn unregistered_object_is_ok_but_reported() {
    let store = test_store();
    let (status, body) = submit(&store, "/?name=ghost&active=true&value=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "unregistered");
    assert_eq!(body["data"]["applied"], false);
    assert_eq!(store.status("ghost"), store.defaults());
}

#[tokio::test]
async fn invalid_active_is_bad_request() {
    let store = test_store();
    let (status, body) = submit(&store, "/?active=maybe&value=1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("active"));
    assert_eq!(store.defaults(), ActivationStatus::default());
}

#[tokio::test]
async fn invalid_value_is_bad_request() {
    let store = test_store();
    let (status, body) = submit(&store, "/?active=true&value=lots").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("value"));
    assert_eq!(store.defaults(), ActivationStatus::default());
}

#[tokio::test]
async fn missing_parameters_are_bad_request() {
    let store = test_store();
    let (status, _) = submit(&store, "/").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = submit(&store, "/?active=true").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("value"));
}

#[tokio::test]
async fn repeated_keys_use_first_value() {
    let store = test_store();
    let (status, body) = submit(&store, "/?active=true&active=false&value=1&value=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        store.defaults(),
        ActivationStatus {
            active: true,
            metric_value: 1
        }
    );
}
