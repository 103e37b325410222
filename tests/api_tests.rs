// tests/api_tests.rs

mod common;

use common::spawn_app;

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/health"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works_and_hides_password() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "Grace@Example.com",
            "password": "password123",
            "first_name": "Grace",
            "last_name": "Hopper"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    let user: serde_json::Value = response.json().await.unwrap();
    assert_eq!(user["email"], "grace@example.com");
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let app = spawn_app().await;
    let body = serde_json::json!({
        "email": "dup@example.com",
        "password": "password123",
        "first_name": "Dup",
        "last_name": "User"
    });

    let first = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app().await;

    // Not an email, password too short.
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "not-an-email",
            "password": "pw",
            "first_name": "A",
            "last_name": "B"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn register_rejects_blank_names() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "blank@example.com",
            "password": "password123",
            "first_name": "   ",
            "last_name": "Lovelace"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = spawn_app().await;
    app.client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "linus@example.com",
            "password": "password123",
            "first_name": "Linus",
            "last_name": "T"
        }))
        .send()
        .await
        .unwrap();

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "email": "linus@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn login_returns_bearer_token() {
    let app = spawn_app().await;

    let token = app.login_new_user().await;

    assert!(!token.is_empty());
}
