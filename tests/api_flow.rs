//! End-to-end HTTP flows against the in-memory repository.

use accountd::{
    accounts::{AccountService, MemoryUserRepository},
    api,
    credentials::{AuthConfig, HashCost, TokenCodec},
};
use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        Request, Response, StatusCode,
    },
    Router,
};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "0123456789abcdef0123456789abcdef";

fn app() -> Result<Router> {
    let config = AuthConfig::new(SecretString::from(SECRET.to_string()))
        .with_hash_cost(HashCost::new(1024, 1, 1));
    let service = AccountService::new(Arc::new(MemoryUserRepository::new()), &config)?;
    Ok(api::router(Arc::new(service)))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Result<Response<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    Ok(app.clone().oneshot(request).await?)
}

async fn json_body(response: Response<Body>) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Returns the `name=value` part of the session Set-Cookie header.
fn session_cookie(response: &Response<Body>) -> Result<String> {
    let header = response
        .headers()
        .get(SET_COOKIE)
        .context("missing Set-Cookie")?
        .to_str()?;
    let pair = header.split(';').next().context("empty Set-Cookie")?;
    Ok(pair.trim().to_string())
}

async fn register(app: &Router, name: &str, email: &str, password: &str) -> Result<Value> {
    let response = send(
        app,
        "POST",
        "/users/register",
        None,
        Some(json!({ "name": name, "email": email, "password": password })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

async fn login(app: &Router, email: &str, password: &str) -> Result<String> {
    let response = send(
        app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    session_cookie(&response)
}

#[tokio::test]
async fn register_login_and_list() -> Result<()> {
    let app = app()?;

    let created = register(&app, "A", "a@x.com", "secret").await?;
    assert_eq!(created["message"], "User created successfully");
    assert_eq!(created["data"]["email"], "a@x.com");
    assert!(created["data"].get("password").is_none());
    assert!(created["data"].get("password_hash").is_none());

    let response = send(
        &app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "secret" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let raw_cookie = response
        .headers()
        .get(SET_COOKIE)
        .context("missing Set-Cookie")?
        .to_str()?
        .to_string();
    assert!(raw_cookie.starts_with("accountd_session="));
    assert!(raw_cookie.contains("HttpOnly"));
    assert!(raw_cookie.contains("Secure"));
    assert!(raw_cookie.contains("SameSite=Strict"));
    let cookie = session_cookie(&response)?;
    let body = json_body(response).await?;
    assert_eq!(body["data"]["user"]["email"], "a@x.com");
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));

    let response = send(&app, "GET", "/users", None, None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await?["error"], "authentication required");

    let response = send(&app, "GET", "/users", Some(&cookie), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["requested_by"], "a@x.com");
    let users = body["data"]["users"]
        .as_array()
        .context("users should be an array")?;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "a@x.com");
    assert!(users[0].get("password").is_none());
    assert!(users[0].get("password_hash").is_none());

    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts() -> Result<()> {
    let app = app()?;
    register(&app, "A", "a@x.com", "secret").await?;

    let response = send(
        &app,
        "POST",
        "/users/register",
        None,
        Some(json!({ "name": "B", "email": "a@x.com", "password": "other" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await?["error"], "email already exists");

    // The first password still works.
    login(&app, "a@x.com", "secret").await?;
    Ok(())
}

#[tokio::test]
async fn login_failures_look_identical() -> Result<()> {
    let app = app()?;
    register(&app, "A", "a@x.com", "secret").await?;

    let wrong_password = send(
        &app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "wrong" })),
    )
    .await?;
    let unknown_email = send(
        &app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "secret" })),
    )
    .await?;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert!(wrong_password.headers().get(SET_COOKIE).is_none());
    assert_eq!(
        json_body(wrong_password).await?,
        json_body(unknown_email).await?
    );
    Ok(())
}

#[tokio::test]
async fn bad_request_bodies_are_rejected() -> Result<()> {
    let app = app()?;

    let response = send(
        &app,
        "POST",
        "/users/register",
        None,
        Some(json!({ "name": "A", "email": "not-an-email", "password": "secret" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/users/register",
        None,
        Some(json!({ "email": "a@x.com" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn invalid_and_expired_tokens_are_rejected() -> Result<()> {
    let app = app()?;
    register(&app, "A", "a@x.com", "secret").await?;
    let cookie = login(&app, "a@x.com", "secret").await?;

    let tampered = format!("{cookie}x");
    let response = send(&app, "GET", "/users", Some(&tampered), None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await?["error"], "invalid or expired token");

    let codec = TokenCodec::new(&SecretString::from(SECRET.to_string()), 60);
    let expired = codec.issue_at("a@x.com", Utc::now() - Duration::hours(1))?;
    let response = send(
        &app,
        "GET",
        "/users",
        Some(&format!("accountd_session={expired}")),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await?["error"], "invalid or expired token");
    Ok(())
}

#[tokio::test]
async fn get_and_delete_by_id() -> Result<()> {
    let app = app()?;
    let created = register(&app, "A", "a@x.com", "secret").await?;
    let id = created["data"]["id"].as_i64().context("id should be a number")?;
    let cookie = login(&app, "a@x.com", "secret").await?;

    let response = send(&app, "GET", &format!("/users/{id}"), Some(&cookie), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["data"]["email"], "a@x.com");

    let response = send(&app, "GET", "/users/abc", Some(&cookie), None).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "DELETE", &format!("/users/{id}"), Some(&cookie), None).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", &format!("/users/{id}"), Some(&cookie), None).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Tokens are not revoked by deletion.
    let response = send(&app, "GET", "/users", Some(&cookie), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn update_profile_enforces_ownership_and_refreshes_cookie() -> Result<()> {
    let app = app()?;
    register(&app, "A", "a@x.com", "secret").await?;
    let cookie = login(&app, "a@x.com", "secret").await?;

    let response = send(
        &app,
        "PUT",
        "/users",
        Some(&cookie),
        Some(json!({ "name": "B", "email": "b@x.com", "current_email": "other@x.com" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        "PUT",
        "/users",
        Some(&cookie),
        Some(json!({ "name": "Alice", "email": "alice@x.com", "current_email": "a@x.com" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let new_cookie = session_cookie(&response)?;
    let body = json_body(response).await?;
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["email"], "alice@x.com");

    let response = send(&app, "GET", "/users", Some(&new_cookie), None).await?;
    assert_eq!(json_body(response).await?["requested_by"], "alice@x.com");
    Ok(())
}

#[tokio::test]
async fn change_password_with_wrong_current_keeps_old_one() -> Result<()> {
    let app = app()?;
    register(&app, "A", "a@x.com", "secret").await?;
    let cookie = login(&app, "a@x.com", "secret").await?;

    let response = send(
        &app,
        "PATCH",
        "/users",
        Some(&cookie),
        Some(json!({ "current_password": "wrong", "new_password": "next" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await?["error"],
        "current password does not match"
    );

    // Old password and old token still work.
    login(&app, "a@x.com", "secret").await?;
    let response = send(&app, "GET", "/users", Some(&cookie), None).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "PATCH",
        "/users",
        Some(&cookie),
        Some(json!({ "currentpassword": "secret", "newpassword": "next" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert_eq!(
        json_body(response).await?["message"],
        "change password successfully"
    );

    login(&app, "a@x.com", "next").await?;
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookie() -> Result<()> {
    let app = app()?;

    let response = send(&app, "POST", "/users/logout", None, None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .context("missing Set-Cookie")?
        .to_str()?
        .to_string();
    assert!(cookie.starts_with("accountd_session=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(json_body(response).await?["message"], "logout success");
    Ok(())
}

#[tokio::test]
async fn health_and_request_id() -> Result<()> {
    let app = app()?;

    let response = send(&app, "GET", "/health", None, None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());
    assert!(response.headers().get("X-App").is_some());
    let body = json_body(response).await?;
    assert_eq!(body["name"], "accountd");
    assert_eq!(body["database"], "ok");

    let response = send(&app, "GET", "/openapi.json", None, None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = json_body(response).await?;
    assert!(doc["paths"].get("/users/login").is_some());
    Ok(())
}

#[tokio::test]
async fn update_profile_accepts_compact_field_name() -> Result<()> {
    let app = app()?;
    register(&app, "A", "a@x.com", "secret").await?;
    let cookie = login(&app, "a@x.com", "secret").await?;

    let response = send(
        &app,
        "PUT",
        "/users",
        Some(&cookie),
        Some(json!({ "name": "B", "email": "b@x.com", "currentemail": "a@x.com" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await?["email"], "b@x.com");
    Ok(())
}
