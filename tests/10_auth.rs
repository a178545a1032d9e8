mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn me_is_null_without_a_session() -> Result<()> {
    let server = common::spawn_app().await?;

    let res = reqwest::get(server.url("/auth/me")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["statusCode"], 200);
    assert!(body["data"].is_null());
    Ok(())
}

#[tokio::test]
async fn token_resolves_from_header_cookie_or_query() -> Result<()> {
    let server = common::spawn_app().await?;
    let token = server.login_as(&common::admin()).await?;
    let client = reqwest::Client::new();

    let by_header: Value = client
        .get(server.url("/auth/me"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(by_header["data"]["email"], "root@example.com");
    assert_eq!(by_header["data"]["roles"], json!(["admin"]));

    let by_cookie: Value = client
        .get(server.url("/auth/me"))
        .header("Cookie", format!("token={}", token))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(by_cookie["data"]["id"], 1);

    let by_query: Value = client
        .get(server.url(&format!("/auth/me?token={}", token)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(by_query["data"]["id"], 1);
    Ok(())
}

#[tokio::test]
async fn header_token_takes_precedence() -> Result<()> {
    let server = common::spawn_app().await?;
    let admin_token = server.login_as(&common::admin()).await?;
    let member_token = server.login_as(&common::member()).await?;

    let body: Value = reqwest::Client::new()
        .get(server.url("/auth/me"))
        .bearer_auth(&member_token)
        .header("Cookie", format!("token={}", admin_token))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"]["email"], "member@example.com");
    Ok(())
}

#[tokio::test]
async fn unknown_token_is_anonymous() -> Result<()> {
    let server = common::spawn_app().await?;

    let body: Value = reqwest::Client::new()
        .get(server.url("/auth/me"))
        .bearer_auth("not-a-session")
        .send()
        .await?
        .json()
        .await?;
    assert!(body["data"].is_null());
    Ok(())
}

#[tokio::test]
async fn logout_destroys_the_session() -> Result<()> {
    let server = common::spawn_app().await?;
    let token = server.login_as(&common::member()).await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["message"], "Logged out successfully");

    assert!(!server.state.sessions.validate_token(&token).await);

    let me: Value = client
        .get(server.url("/auth/me"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert!(me["data"].is_null());
    Ok(())
}

#[tokio::test]
async fn anonymous_logout_still_succeeds() -> Result<()> {
    let server = common::spawn_app().await?;

    let res = reqwest::Client::new().post(server.url("/auth/logout")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn refresh_extends_the_session() -> Result<()> {
    let server = common::spawn_app().await?;
    let token = server.login_as(&common::member()).await?;

    let res = reqwest::Client::new()
        .post(server.url("/auth/refresh"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["data"]["refreshed"], true);
    assert_eq!(body["data"]["expiresIn"], server.state.sessions.default_ttl());
    Ok(())
}

#[tokio::test]
async fn refresh_requires_a_session() -> Result<()> {
    let server = common::spawn_app().await?;

    let res = reqwest::Client::new().post(server.url("/auth/refresh")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: Value = res.json().await?;
    assert_eq!(body["statusCode"], 401);
    assert_eq!(body["message"], "Please log in first");
    assert_eq!(body["path"], "/auth/refresh");
    assert!(body["timestamp"].is_string());
    Ok(())
}

#[tokio::test]
async fn login_requires_email_and_password() -> Result<()> {
    let server = common::spawn_app().await?;

    let res = reqwest::Client::new()
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "root@example.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Email and password are required");
    assert_eq!(body["path"], "/auth/login");
    Ok(())
}

#[tokio::test]
async fn user_writes_require_login() -> Result<()> {
    let server = common::spawn_app().await?;
    let client = reqwest::Client::new();

    let create = client
        .post(server.url("/users"))
        .json(&json!({ "email": "new@example.com" }))
        .send()
        .await?;
    assert_eq!(create.status(), StatusCode::UNAUTHORIZED);

    let update = client
        .put(server.url("/users/1"))
        .json(&json!({ "name": "Renamed" }))
        .send()
        .await?;
    assert_eq!(update.status(), StatusCode::UNAUTHORIZED);

    let delete = client.delete(server.url("/users/1")).send().await?;
    assert_eq!(delete.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn delete_requires_admin_role() -> Result<()> {
    let server = common::spawn_app().await?;
    let token = server.login_as(&common::member()).await?;

    let res = reqwest::Client::new()
        .delete(server.url("/users/1"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let body: Value = res.json().await?;
    assert_eq!(body["statusCode"], 403);
    assert_eq!(body["message"], "Insufficient permissions");
    assert_eq!(body["path"], "/users/1");
    Ok(())
}

#[tokio::test]
async fn members_cannot_assign_roles() -> Result<()> {
    let server = common::spawn_app().await?;
    let token = server.login_as(&common::member()).await?;
    let client = reqwest::Client::new();

    let promote = client
        .put(server.url("/users/2"))
        .bearer_auth(&token)
        .json(&json!({ "roles": ["admin"] }))
        .send()
        .await?;
    assert_eq!(promote.status(), StatusCode::FORBIDDEN);

    let create = client
        .post(server.url("/users"))
        .bearer_auth(&token)
        .json(&json!({ "email": "evil@example.com", "roles": ["admin"] }))
        .send()
        .await?;
    assert_eq!(create.status(), StatusCode::FORBIDDEN);

    let body: Value = create.json().await?;
    assert_eq!(body["message"], "Insufficient permissions");
    assert_eq!(body["path"], "/users");
    Ok(())
}
