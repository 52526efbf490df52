/// Integration tests for the Taskfolio API
///
/// These tests verify the full system works end-to-end:
/// - Authentication requirements on protected routes
/// - Duplicate account detection at registration
/// - Owner scoping of task listings under every filter
/// - The category deletion guard

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestContext;
use serde_json::json;
use tower::Service as _;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Test that protected routes reject anonymous requests
#[tokio::test]
async fn test_authentication_required() {
    let ctx = TestContext::new().await.unwrap();

    for uri in ["/v1/tasks", "/v1/categories", "/v1/auth/profile"] {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = ctx.app.clone().call(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{} should require a session token",
            uri
        );
    }

    ctx.cleanup().await.unwrap();
}

/// Test that registration rejects taken usernames and emails
#[tokio::test]
async fn test_register_duplicate_conflicts() {
    let ctx = TestContext::new().await.unwrap();

    let register = |username: String, email: String| {
        Request::builder()
            .method("POST")
            .uri("/v1/auth/register")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "username": username,
                    "email": email,
                    "password": "a-decent-password",
                    "confirm_password": "a-decent-password"
                })
                .to_string(),
            ))
            .unwrap()
    };

    // Same username as the context user
    let response = ctx
        .app
        .clone()
        .call(register(
            ctx.user.username.clone(),
            "fresh@example.com".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "conflict");

    // Same email as the context user
    let response = ctx
        .app
        .clone()
        .call(register("freshname".to_string(), ctx.user.email.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    ctx.cleanup().await.unwrap();
}

/// Test that task listings only ever return the caller's tasks
#[tokio::test]
async fn test_task_list_is_owner_scoped() {
    let alice = TestContext::new().await.unwrap();
    let bob = TestContext::new().await.unwrap();

    common::create_test_task(&alice, "alice thesis chapter", None)
        .await
        .unwrap();
    common::create_test_task(&bob, "bob thesis chapter", None)
        .await
        .unwrap();

    // Unfiltered and under each filter, alice sees only her own tasks
    for uri in [
        "/v1/tasks",
        "/v1/tasks?text=thesis",
        "/v1/tasks?status=pending",
        "/v1/tasks?priority=High",
    ] {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header("authorization", alice.auth_header())
            .body(Body::empty())
            .unwrap();

        let response = alice.app.clone().call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let tasks = body_json(response).await;
        let tasks = tasks.as_array().unwrap();
        assert_eq!(tasks.len(), 1, "{} should match exactly alice's task", uri);
        assert_eq!(tasks[0]["title"], "alice thesis chapter");
    }

    alice.cleanup().await.unwrap();
    bob.cleanup().await.unwrap();
}

/// Test that a category with tasks attached cannot be deleted
#[tokio::test]
async fn test_category_delete_guard() {
    let ctx = TestContext::new().await.unwrap();

    // Create a category through the API
    let request = Request::builder()
        .method("POST")
        .uri("/v1/categories")
        .header("authorization", ctx.auth_header())
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"name": "Coursework", "color": "#007bff"}).to_string(),
        ))
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let category = body_json(response).await;
    let category_id = category["id"].as_str().unwrap().to_string();

    let task_id = common::create_test_task(
        &ctx,
        "problem set 3",
        Some(category_id.parse().unwrap()),
    )
    .await
    .unwrap();

    // Deleting while referenced fails with the task count
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/categories/{}", category_id))
        .header("authorization", ctx.auth_header())
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "category_in_use");

    // Remove the task, then the delete goes through
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/tasks/{}", task_id))
        .header("authorization", ctx.auth_header())
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/categories/{}", category_id))
        .header("authorization", ctx.auth_header())
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}

/// Test that one user's task is invisible to another
#[tokio::test]
async fn test_foreign_task_access_denied() {
    let alice = TestContext::new().await.unwrap();
    let bob = TestContext::new().await.unwrap();

    let task_id = common::create_test_task(&alice, "private notes", None)
        .await
        .unwrap();

    let request = Request::builder()
        .method("GET")
        .uri(format!("/v1/tasks/{}", task_id))
        .header("authorization", bob.auth_header())
        .body(Body::empty())
        .unwrap();

    let response = bob.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    alice.cleanup().await.unwrap();
    bob.cleanup().await.unwrap();
}
