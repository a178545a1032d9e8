// handlers/stream.rs - /users/stream, responses that skip the success envelope

use axum::body::Body;
use axum::extract::Path;
use axum::http::header::CONTENT_TYPE;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, Stream};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;

const EVENT_INTERVAL: Duration = Duration::from_secs(1);
const NDJSON_ROWS: u32 = 10;

/// GET /users/stream/events - one SSE message per second until the client
/// disconnects
pub async fn events() -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = stream::unfold(0u64, |n| async move {
        tokio::time::sleep(EVENT_INTERVAL).await;
        let event = Event::default().json_data(json!({
            "message": format!("Realtime message {}", n),
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }));
        Some((event, n + 1))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /users/stream/raw/:id
pub async fn raw(Path(id): Path<String>) -> Json<Value> {
    Json(json!({
        "userId": id,
        "customFormat": true,
        "data": "Raw payload, returned without the response envelope",
    }))
}

/// GET /users/stream/stream-json - newline-delimited JSON
pub async fn stream_json() -> Response {
    let rows = stream::iter((0..NDJSON_ROWS).map(|i| {
        let line = format!("{}\n", json!({ "id": i, "name": format!("User {}", i) }));
        Ok::<_, Infallible>(line)
    }));
    ([(CONTENT_TYPE, "application/x-ndjson")], Body::from_stream(rows)).into_response()
}
