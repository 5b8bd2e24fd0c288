//! HTTP API tests, driving the router in-process.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tasklink::api::{AppState, USER_ID_HEADER, build_router};
use tasklink::config::Config;
use tasklink::db::Database;
use tower::ServiceExt;

fn setup() -> Router {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    build_router(AppState::new(Arc::new(db), Arc::new(Config::default())))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user_id: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header(USER_ID_HEADER, user_id.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Register the bootstrap admin and return its id.
async fn bootstrap_admin(app: &Router) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/users",
        None,
        Some(json!({"username": "admin", "password_hash": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["user_id"].as_i64().unwrap()
}

async fn create_task(app: &Router, user_id: i64, title: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/tasks",
        Some(user_id),
        Some(json!({"title": title})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["task_id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_needs_no_user() {
    let app = setup();
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn requests_without_user_are_unauthenticated() {
    let app = setup();
    bootstrap_admin(&app).await;

    let (status, body) = send(&app, "GET", "/api/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, _) = send(&app, "GET", "/api/tasks", Some(999), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_registration_bootstraps_then_requires_admin() {
    let app = setup();
    let admin = bootstrap_admin(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/users",
        None,
        Some(json!({"username": "bob", "password_hash": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, bob) = send(
        &app,
        "POST",
        "/api/users",
        Some(admin),
        Some(json!({"username": "bob", "password_hash": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bob["role"], "User");
    assert!(bob.get("password_hash").is_none());
    let bob_id = bob["user_id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        "/api/users",
        Some(bob_id),
        Some(json!({"username": "carol", "password_hash": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(admin),
        Some(json!({"username": "bob", "password_hash": "y"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["field"], "username");
}

#[tokio::test]
async fn users_update_themselves_and_admins_change_roles() {
    let app = setup();
    let admin = bootstrap_admin(&app).await;
    let mut ids = Vec::new();
    for (username, email) in [("bob", "bob@example.com"), ("carol", "carol@example.com")] {
        let (status, user) = send(
            &app,
            "POST",
            "/api/users",
            Some(admin),
            Some(json!({"username": username, "password_hash": "x", "email": email})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(user["user_id"].as_i64().unwrap());
    }
    let (bob, carol) = (ids[0], ids[1]);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", bob),
        Some(bob),
        Some(json!({"real_name": "Bob Builder"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["real_name"], "Bob Builder");
    assert_eq!(body["email"], "bob@example.com");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", bob),
        Some(bob),
        Some(json!({"role": "Admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", carol),
        Some(bob),
        Some(json!({"real_name": "Not Carol"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", bob),
        Some(bob),
        Some(json!({"email": "carol@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");
    assert_eq!(body["field"], "email");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", bob),
        Some(admin),
        Some(json!({"role": "Admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "Admin");
    assert_eq!(body["real_name"], "Bob Builder");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/404",
        Some(admin),
        Some(json!({"real_name": "Nobody"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn first_admin_cannot_be_deleted() {
    let app = setup();
    let admin = bootstrap_admin(&app).await;

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/users/{}", admin),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATE");
}

#[tokio::test]
async fn task_crud_and_delete_permissions() {
    let app = setup();
    let admin = bootstrap_admin(&app).await;
    let (_, bob) = send(
        &app,
        "POST",
        "/api/users",
        Some(admin),
        Some(json!({"username": "bob", "password_hash": "x"})),
    )
    .await;
    let bob = bob["user_id"].as_i64().unwrap();

    let task_id = create_task(&app, admin, "Ship release").await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/tasks/{}", task_id),
        Some(bob),
        Some(json!({"status": "InProgress", "assignee_ids": [bob]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "InProgress");
    assert_eq!(body["title"], "Ship release");
    assert_eq!(body["assignees"][0]["username"], "bob");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/tasks?assignee_id={}", bob),
        Some(bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/tasks/{}", task_id),
        Some(bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/tasks/{}", task_id),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/tasks/{}", task_id),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TASK_NOT_FOUND");
}

#[tokio::test]
async fn relationship_lifecycle() {
    let app = setup();
    let admin = bootstrap_admin(&app).await;
    let a = create_task(&app, admin, "A").await;
    let b = create_task(&app, admin, "B").await;
    let c = create_task(&app, admin, "C").await;

    let (status, rel) = send(
        &app,
        "POST",
        &format!("/api/tasks/{}/relationships", a),
        Some(admin),
        Some(json!({"related_task_id": b, "relationship_type": "child"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rel["parent_task_id"], a);
    assert_eq!(rel["child_task_title"], "B");
    assert_eq!(rel["relationship_type"], "Subtask");
    let rel_id = rel["relationship_id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/tasks/{}/relationships", b),
        Some(admin),
        Some(json!({"related_task_id": a, "relationship_type": "child"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "RELATIONSHIP_EXISTS");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/tasks/{}/relationships/{}", b, rel_id),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["relationship_id"], rel_id);

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/tasks/{}/relationships/{}", c, rel_id),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "RELATIONSHIP_MISMATCH");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/tasks/{}/relationships/{}", a, rel_id),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/tasks/{}/relationships/{}", a, rel_id),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn relationship_validation_errors() {
    let app = setup();
    let admin = bootstrap_admin(&app).await;
    let a = create_task(&app, admin, "A").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/tasks/{}/relationships", a),
        Some(admin),
        Some(json!({"related_task_id": a})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SELF_RELATIONSHIP");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/tasks/{}/relationships", a),
        Some(admin),
        Some(json!({"related_task_id": 404, "relationship_type": "parent"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TASK_NOT_FOUND");

    let (status, _) = send(
        &app,
        "GET",
        "/api/tasks/404/relationships",
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tree_route_returns_nested_view() {
    let app = setup();
    let admin = bootstrap_admin(&app).await;
    let a = create_task(&app, admin, "A").await;
    let b = create_task(&app, admin, "B").await;
    let c = create_task(&app, admin, "C").await;

    for (from, to) in [(a, b), (b, c)] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/tasks/{}/relationships", from),
            Some(admin),
            Some(json!({"related_task_id": to, "relationship_type": "child"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, tree) = send(
        &app,
        "GET",
        &format!("/api/tasks/{}/relationships/tree", b),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree["task_id"], b);
    assert_eq!(tree["children"][0]["title"], "C");
    assert_eq!(tree["parents"][0]["title"], "A");
    assert_eq!(tree["parents"][0]["children"], json!([]));
    assert_eq!(tree["creator"]["username"], "admin");

    let (status, _) = send(
        &app,
        "GET",
        "/api/tasks/404/relationships/tree",
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metadata_comes_from_config() {
    let app = setup();

    let (status, body) = send(&app, "GET", "/api/metadata/task-statuses", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["ToDo", "InProgress", "Done", "Cancelled"]));

    let (status, body) = send(&app, "GET", "/api/metadata", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task_priorities"], json!(["High", "Medium", "Low"]));
}
