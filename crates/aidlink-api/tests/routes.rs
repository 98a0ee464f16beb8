use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use aidlink_api::state::AppStateInner;
use aidlink_core::Engine;
use aidlink_core::credentials::{Argon2Hasher, CredentialPolicy};
use aidlink_core::notify::Outbox;
use aidlink_db::Database;

fn app() -> Router {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let engine = Engine::new(
        db,
        Arc::new(Outbox::new(64)),
        Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap()),
        CredentialPolicy::default(),
    );
    aidlink_api::router(AppStateInner::new(Arc::new(engine), 10.0))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let req = match body {
        Some(v) => req.body(Body::from(v.to_string())).unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, name: &str, role: &str) -> String {
    let (status, user) = call(
        app,
        Method::POST,
        "/users",
        Some(json!({ "name": name, "email": format!("{name}@example.org"), "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    user["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn donation_flow_over_http() {
    let app = app();
    let owner = register(&app, "meera", "receiver").await;
    let donor = register(&app, "kabir", "donor").await;

    let (status, campaign) = call(
        &app,
        Method::POST,
        "/campaigns",
        Some(json!({
            "title": "Clean water for Barmer",
            "description": "Two hand pumps",
            "category": "water",
            "goal": 20000,
            "createdBy": owner,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = campaign["id"].as_str().unwrap();

    let donate_uri = format!("/campaigns/{id}/donations");
    let (status, err) = call(
        &app,
        Method::POST,
        &donate_uri,
        Some(json!({ "donorId": donor, "amount": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "invalid_state");

    let (status, _) = call(&app, Method::POST, &format!("/campaigns/{id}/approve"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, receipt) = call(
        &app,
        Method::POST,
        &donate_uri,
        Some(json!({ "donorId": donor, "amount": 5000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["campaign"]["raised"], 5000);
    assert_eq!(receipt["campaign"]["percent"], 25.0);

    let (status, err) = call(
        &app,
        Method::POST,
        &donate_uri,
        Some(json!({ "amount": -5, "isAnonymous": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "invalid_amount");

    let (status, receipt) = call(
        &app,
        Method::POST,
        &donate_uri,
        Some(json!({ "amount": 250, "isAnonymous": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let track = receipt["transaction"]["trackUrl"].as_str().unwrap().to_string();

    let (status, impact) = call(&app, Method::GET, &track, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(impact["campaign"]["raised"], 5250);

    let (status, audit) = call(&app, Method::GET, &format!("/campaigns/{id}/audit"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit["balanced"], true);
}

#[tokio::test]
async fn request_errors_map_to_status_codes() {
    let app = app();
    let receiver = register(&app, "ravi", "receiver").await;
    let first = register(&app, "anil", "helper").await;
    let second = register(&app, "sunita", "helper").await;

    let (status, err) = call(
        &app,
        Method::POST,
        "/requests",
        Some(json!({
            "userId": receiver,
            "category": "medical",
            "title": "Dialysis",
            "description": "",
            "type": "financial",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["kind"], "validation_error");

    let (status, request) = call(
        &app,
        Method::POST,
        "/requests",
        Some(json!({
            "userId": receiver,
            "category": "food",
            "title": "Groceries",
            "description": "Two people",
            "type": "service",
            "location": { "lat": 28.71, "lng": 77.11 },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = request["id"].as_str().unwrap();

    let (status, found) = call(&app, Method::GET, "/requests/nearby?lat=28.70&lng=77.10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    let accept = format!("/requests/{id}/accept");
    let (status, _) = call(&app, Method::POST, &accept, Some(json!({ "helperId": first }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, err) = call(&app, Method::POST, &accept, Some(json!({ "helperId": second }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "already_accepted");

    let (status, _) = call(
        &app,
        Method::GET,
        "/requests/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approval_returns_password_once() {
    let app = app();
    let receiver = register(&app, "lata", "receiver").await;
    let admin = register(&app, "admin", "admin").await;

    let (_, request) = call(
        &app,
        Method::POST,
        "/requests",
        Some(json!({
            "userId": receiver,
            "category": "medical",
            "title": "Cataract surgery",
            "description": "Left eye",
            "type": "financial",
            "amount": 15000,
        })),
    )
    .await;
    let approve = format!("/requests/{}/approve", request["id"].as_str().unwrap());

    let (status, outcome) = call(&app, Method::POST, &approve, Some(json!({ "adminId": admin }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["request"]["status"], "approved");
    assert!(outcome["password"].as_str().unwrap().contains('@'));

    let (status, _) = call(&app, Method::POST, &approve, Some(json!({ "adminId": admin }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
