mod common;

use std::sync::Arc;

use anyhow::Result;

use admin_api_rust::http_client::{HttpClientFactory, HttpClientService, TransportDefaults};
use admin_api_rust::services::clients::AdminApiClient;

fn factory() -> HttpClientFactory {
    HttpClientFactory::new(Arc::new(HttpClientService::new(TransportDefaults::default())))
}

#[tokio::test]
async fn info_unwraps_the_envelope() -> Result<()> {
    let server = common::spawn_app().await?;
    let client = AdminApiClient::new(&factory(), &server.base_url)?;

    let info = client.info().await?;
    assert_eq!(info["name"], "Admin API (Rust)");
    assert!(info.get("statusCode").is_none());
    Ok(())
}

#[tokio::test]
async fn token_travels_as_bearer_header() -> Result<()> {
    let server = common::spawn_app().await?;
    let token = server.login_as(&common::admin()).await?;

    let anonymous = AdminApiClient::new(&factory(), &server.base_url)?;
    assert!(anonymous.me().await?.is_null());

    let client = anonymous.with_token(Some(token.clone()));
    let me = client.me().await?;
    assert_eq!(me["email"], "root@example.com");

    let refreshed = client.refresh().await?;
    assert_eq!(refreshed["refreshed"], true);

    client.logout().await?;
    assert!(!server.state.sessions.validate_token(&token).await);
    Ok(())
}

#[tokio::test]
async fn server_rejections_surface_as_status_errors() -> Result<()> {
    let server = common::spawn_app().await?;
    let client = AdminApiClient::new(&factory(), &server.base_url)?;

    let err = client.create_user("new@example.com", None).await.unwrap_err();
    assert_eq!(err.status(), Some(401));

    let err = client.login("root@example.com", "").await.unwrap_err();
    assert_eq!(err.status(), Some(400));

    let err = client.health().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    Ok(())
}
