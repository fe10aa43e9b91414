#![cfg(feature = "web")]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use tower::ServiceExt;
use usergrid::app::{AppState, DynRepository, router};
use usergrid::{JsonRepository, MemoryStore, UserStore};

fn app(seed_count: usize) -> Router {
    let repo: DynRepository = Box::new(JsonRepository::new(MemoryStore::new()));
    let store = UserStore::load(repo, seed_count, &mut StdRng::seed_from_u64(3)).unwrap();
    router(Arc::new(AppState::new(store)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::post("/api/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

#[tokio::test]
async fn table_page_reports_totals() {
    let app = app(42);
    let (status, body) = get(&app, "/api/users?page=5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 42);
    assert_eq!(body["totalPages"], 5);
    assert_eq!(body["page"], 5);
    assert_eq!(body["pageLabel"], "5 / 5");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn empty_search_shows_zero_pages() {
    let app = app(10);
    let (_, body) = get(&app, "/api/users?search=%24%24nothing%24%24").await;
    assert_eq!(body["totalCount"], 0);
    assert_eq!(body["pageLabel"], "0 / 0");
}

#[tokio::test]
async fn create_then_fetch_detail() {
    let app = app(5);
    let (status, created) = post(
        &app,
        json!({"name": "Ada", "email": "ada@x.io", "password": "secret1", "role": "Admin", "active": true}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (_, table) = get(&app, "/api/users?mode=all&visible=100").await;
    assert_eq!(table["totalCount"], 6);
    assert_eq!(table["items"][0]["id"], id.as_str());

    let (status, detail) = get(&app, &format!("/api/users/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Ada");
    assert!(detail["createdAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn invalid_form_is_rejected_with_field_errors() {
    let app = app(5);
    let (status, body) = post(
        &app,
        json!({"name": "", "email": "nope", "password": "123", "role": "User"}),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["name"], "Name is required");
    assert_eq!(body["errors"]["email"], "Enter a valid email address");
    assert_eq!(body["errors"]["password"], "Password must be at least 6 characters");

    let (_, table) = get(&app, "/api/users").await;
    assert_eq!(table["totalCount"], 5);
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let app = app(3);
    let (status, body) = get(&app, "/api/users/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn cards_infinite_window_reports_more() {
    let app = app(35);
    let (_, body) = get(&app, "/api/users/cards?mode=all&visible=30").await;
    assert_eq!(body["items"].as_array().unwrap().len(), 30);
    assert_eq!(body["hasMoreItems"], true);

    let (_, body) = get(&app, "/api/users/cards?mode=all&visible=35").await;
    assert_eq!(body["hasMoreItems"], false);
}

#[tokio::test]
async fn cards_page_past_the_end_is_empty() {
    let app = app(30);
    let (_, body) = get(&app, "/api/users/cards?page=3").await;
    assert_eq!(body["items"].as_array().unwrap().len(), 6);

    let (_, body) = get(&app, "/api/users/cards?page=99").await;
    assert_eq!(body["page"], 99);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn cards_report_grid_columns_for_width() {
    let app = app(5);
    let (_, body) = get(&app, "/api/users/cards?width=1400").await;
    assert_eq!(body["columns"], 4);

    let (_, body) = get(&app, "/api/users/cards").await;
    assert!(body.get("columns").is_none());
}

#[tokio::test]
async fn role_options_start_with_all() {
    let app = app(50);
    let (_, body) = get(&app, "/api/users/roles").await;
    assert_eq!(body[0], json!({"value": "all", "label": "All"}));
    assert!(body.as_array().unwrap().len() > 1);
}

#[tokio::test]
async fn group_values_only_for_groupable_columns() {
    let app = app(50);
    let (status, body) = get(&app, "/api/users/groups/role").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_array().unwrap().is_empty());

    let (status, _) = get(&app, "/api/users/groups/email").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn group_selection_filters_table() {
    let app = app(60);
    let (_, body) = get(&app, "/api/users?group=role:Admin&mode=all&visible=100").await;
    let items = body["items"].as_array().unwrap();
    assert!(items.iter().all(|u| u["role"] == "Admin"));
    assert_eq!(items.len(), body["totalCount"].as_u64().unwrap() as usize);
}
