use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use dirsvc_directory::DirectoryStore;
use dirsvc_rpc::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is JSON")
    }
}

fn test_router() -> (Router, DirectoryStore) {
    let store = DirectoryStore::new();
    let router = build_router(Arc::new(AppState::new(store.clone())));
    (router, store)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(Body::from(body.unwrap_or_default().to_string()))
        .expect("build request");

    let response = router.clone().oneshot(request).await.expect("route request");
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();

    TestResponse {
        status,
        content_type,
        body: String::from_utf8(bytes.to_vec()).expect("utf-8 body"),
    }
}

fn jsmith_body() -> String {
    json!({
        "first_name": "Joe",
        "last_name": "Smith",
        "userid": "jsmith",
        "groups": ["admins", "users"],
    })
    .to_string()
}

#[tokio::test]
async fn index_greets() {
    let (router, _) = test_router();
    let response = send(&router, Method::GET, "/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "Well, hello there.\n");
}

#[tokio::test]
async fn unknown_user_is_404_before_any_create() {
    let (router, _) = test_router();
    let response = send(&router, Method::GET, "/users/nonexistent", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, "User not found.\n");
}

#[tokio::test]
async fn create_user_populates_groups() {
    let (router, _) = test_router();
    let response = send(&router, Method::POST, "/users", Some(&jsmith_body())).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "first_name": "Joe",
            "last_name": "Smith",
            "userid": "jsmith",
            "groups": ["admins", "users"],
        })
    );

    for group in ["admins", "users"] {
        let members = send(&router, Method::GET, &format!("/groups/{group}"), None).await;
        assert_eq!(members.status, StatusCode::OK);
        assert_eq!(members.content_type.as_deref(), Some("application/json"));
        assert_eq!(members.json(), json!(["jsmith"]));
    }
}

#[tokio::test]
async fn duplicate_user_is_rejected_and_unchanged() {
    let (router, _) = test_router();
    send(&router, Method::POST, "/users", Some(&jsmith_body())).await;
    let before = send(&router, Method::GET, "/users/jsmith", None).await;

    let duplicate = json!({
        "first_name": "Jim",
        "last_name": "Smythe",
        "userid": "jsmith",
        "groups": ["ops"],
    })
    .to_string();
    let response = send(&router, Method::POST, "/users", Some(&duplicate)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body, "User already exists!\n");

    let after = send(&router, Method::GET, "/users/jsmith", None).await;
    assert_eq!(before.json(), after.json());
    let ops = send(&router, Method::GET, "/groups/ops", None).await;
    assert_eq!(ops.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_user_bodies_are_400() {
    let (router, store) = test_router();
    let cases = [
        ("", "No JSON request body sent.\n"),
        ("{\"first_name\":\"Joe\"}", "Malformed user entity\n"),
        (
            "{\"first_name\":\"Joe\",\"last_name\":\"Smith\",\"userid\":\"jsmith\",\"groups\":\"admins\"}",
            "Groups is not a list\n",
        ),
    ];

    for (body, message) in cases {
        let response = send(&router, Method::POST, "/users", Some(body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body, message);
    }
    assert_eq!(store.stats().users, 0);
}

#[tokio::test]
async fn replace_group_members_keeps_order() {
    let (router, _) = test_router();
    send(&router, Method::POST, "/groups", Some("{\"name\":\"users\"}")).await;
    send(&router, Method::PUT, "/groups/users", Some("[\"jjohnson\"]")).await;

    let response = send(
        &router,
        Method::PUT,
        "/groups/users",
        Some("[\"jjohnson\",\"jsmith\"]"),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some("application/json"));
    assert_eq!(response.json(), json!(["jjohnson", "jsmith"]));

    let members = send(&router, Method::GET, "/groups/users", None).await;
    assert_eq!(members.json(), json!(["jjohnson", "jsmith"]));
}

#[tokio::test]
async fn replace_group_members_errors() {
    let (router, _) = test_router();

    let unknown = send(&router, Method::PUT, "/groups/nope", Some("[]")).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.body, "Group not found.\n");

    send(&router, Method::POST, "/groups", Some("{\"name\":\"users\"}")).await;
    let not_list = send(&router, Method::PUT, "/groups/users", Some("{\"a\":1}")).await;
    assert_eq!(not_list.status, StatusCode::BAD_REQUEST);
    assert_eq!(not_list.body, "Request body not a list.\n");
}

#[tokio::test]
async fn delete_user_empties_groups_but_keeps_them() {
    let (router, _) = test_router();
    send(&router, Method::POST, "/users", Some(&jsmith_body())).await;

    let response = send(&router, Method::DELETE, "/users/jsmith", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "User jsmith has been deleted\n");

    let admins = send(&router, Method::GET, "/groups/admins", None).await;
    assert_eq!(admins.status, StatusCode::OK);
    assert_eq!(admins.json(), json!([]));

    let gone = send(&router, Method::GET, "/users/jsmith", None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let again = send(&router, Method::DELETE, "/users/jsmith", None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_group_twice() {
    let (router, _) = test_router();
    let body = "{\"name\":\"flowerpot\"}";

    let created = send(&router, Method::POST, "/groups", Some(body)).await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.json(), json!({"name": "flowerpot"}));

    let duplicate = send(&router, Method::POST, "/groups", Some(body)).await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.body, "Group flowerpot already exists");

    let missing = send(&router, Method::POST, "/groups", Some("{\"name\":\"\"}")).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body, "No name parameter sent.\n");
}

#[tokio::test]
async fn replace_user_renames_and_regroups() {
    let (router, _) = test_router();
    send(&router, Method::POST, "/users", Some(&jsmith_body())).await;

    let body = json!({
        "first_name": "Joe",
        "last_name": "Smith",
        "userid": "joe",
        "groups": ["ops"],
    })
    .to_string();
    let response = send(&router, Method::PUT, "/users/jsmith", Some(&body)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["userid"], "joe");
    assert_eq!(response.json()["groups"], json!(["ops"]));

    let old = send(&router, Method::GET, "/users/jsmith", None).await;
    assert_eq!(old.status, StatusCode::NOT_FOUND);
    let admins = send(&router, Method::GET, "/groups/admins", None).await;
    assert_eq!(admins.json(), json!([]));

    let unknown = send(&router, Method::PUT, "/users/ghost", Some(&body)).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_group_leaves_user_records() {
    let (router, _) = test_router();
    send(&router, Method::POST, "/users", Some(&jsmith_body())).await;

    let response = send(&router, Method::DELETE, "/groups/admins", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "Group admins has been deleted\n");

    let user = send(&router, Method::GET, "/users/jsmith", None).await;
    assert_eq!(user.json()["groups"], json!(["users"]));

    let again = send(&router, Method::DELETE, "/groups/admins", None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    assert_eq!(again.body, "Group not found.\n");
}

#[tokio::test]
async fn health_reports_directory_counts() {
    let (router, _) = test_router();
    send(&router, Method::POST, "/users", Some(&jsmith_body())).await;

    let response = send(&router, Method::GET, "/health", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let health = response.json();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["users"], 1);
    assert_eq!(health["groups"], 2);
    assert_eq!(health["memberships"], 2);
    assert_eq!(health["req_total"], 2);
}
