use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use admin_api_rust::http_client::{
    batch, batch_with_limit, ClientDescriptor, HttpClientFactory, HttpClientService, MethodDescriptor,
    TransportDefaults,
};

#[tokio::test]
async fn limit_caps_operations_in_flight() -> Result<()> {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let ops = (0..10u64).map(|i| {
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            // later operations finish first
            tokio::time::sleep(Duration::from_millis(5 * (10 - i))).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            i
        }
    });

    let results = batch_with_limit(ops, 3).await;

    assert_eq!(results, (0..10).collect::<Vec<_>>());
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 2);
    Ok(())
}

#[tokio::test]
async fn batch_keeps_failures_in_place() -> Result<()> {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/users/[12]$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/users/3$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstream)
        .await;

    let factory = HttpClientFactory::new(Arc::new(HttpClientService::new(TransportDefaults::default())));
    let client = factory.build(
        ClientDescriptor::new("batch-api", upstream.uri())
            .method("getUser", MethodDescriptor::get("/users/:id").path_param("id")),
    )?;

    let ids = [json!(1), json!(3), json!(2)];
    let results = batch(ids.iter().map(|id| client.call("getUser", std::slice::from_ref(id)))).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert_eq!(results[1].as_ref().unwrap_err().status(), Some(404));
    assert!(results[2].is_ok());
    Ok(())
}

#[tokio::test]
async fn zero_limit_still_makes_progress() -> Result<()> {
    let results = batch_with_limit((0..4).map(|i| async move { i * 2 }), 0).await;
    assert_eq!(results, vec![0, 2, 4, 6]);
    Ok(())
}
