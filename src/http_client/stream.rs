use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tracing::{debug, error};

use super::HttpClientError;

const PREVIEW_CHARS: usize = 200;

type DataFn = Box<dyn FnMut(&Bytes) + Send>;
type EndFn = Box<dyn FnOnce() + Send>;
type ErrorFn = Box<dyn FnOnce(&HttpClientError) + Send>;

/// Callbacks fired while a [`ResponseStream`] is consumed
#[derive(Default)]
pub struct StreamObserver {
    on_data: Option<DataFn>,
    on_end: Option<EndFn>,
    on_error: Option<ErrorFn>,
}

impl StreamObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_data(mut self, f: impl FnMut(&Bytes) + Send + 'static) -> Self {
        self.on_data = Some(Box::new(f));
        self
    }

    pub fn on_end(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&HttpClientError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for StreamObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamObserver")
            .field("on_data", &self.on_data.is_some())
            .field("on_end", &self.on_end.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Chunked response body. Observers fire as chunks are pulled; the stream
/// ends after the first error.
pub struct ResponseStream {
    service: String,
    inner: BoxStream<'static, Result<Bytes, HttpClientError>>,
    observer: StreamObserver,
    done: bool,
}

impl ResponseStream {
    pub fn new<S>(service: impl Into<String>, inner: S, observer: StreamObserver) -> Self
    where
        S: Stream<Item = Result<Bytes, HttpClientError>> + Send + 'static,
    {
        Self {
            service: service.into(),
            inner: inner.boxed(),
            observer,
            done: false,
        }
    }

    /// `idle` bounds the wait for each chunk, not the whole body
    pub(crate) fn from_response(
        service: &str,
        response: reqwest::Response,
        observer: StreamObserver,
        idle: Duration,
    ) -> Self {
        Self::new(service, with_idle_timeout(response.bytes_stream(), idle), observer)
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Drain the remaining chunks into one buffer
    pub async fn collect_bytes(mut self) -> Result<Bytes, HttpClientError> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }
}

fn with_idle_timeout<S>(chunks: S, idle: Duration) -> impl Stream<Item = Result<Bytes, HttpClientError>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    stream::unfold(Some(chunks.boxed()), move |state| async move {
        let mut chunks = state?;
        match tokio::time::timeout(idle, chunks.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(chunks))),
            Ok(Some(Err(e))) => Some((Err(HttpClientError::from(e)), None)),
            Ok(None) => None,
            Err(_) => Some((
                Err(HttpClientError::Timeout {
                    phase: "next stream chunk",
                    after: idle,
                }),
                None,
            )),
        }
    })
}

impl Stream for ResponseStream {
    type Item = Result<Bytes, HttpClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match this.inner.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => {
                let preview: String = String::from_utf8_lossy(&chunk).chars().take(PREVIEW_CHARS).collect();
                debug!("[{}] stream chunk: {}...", this.service, preview);
                if let Some(on_data) = this.observer.on_data.as_mut() {
                    on_data(&chunk);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.done = true;
                error!("[{}] stream error: {}", this.service, err);
                if let Some(on_error) = this.observer.on_error.take() {
                    on_error(&err);
                }
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.done = true;
                debug!("[{}] stream ended", this.service);
                if let Some(on_end) = this.observer.on_end.take() {
                    on_end();
                }
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn observers_see_every_chunk_and_one_end() {
        let chunks = Arc::new(AtomicUsize::new(0));
        let ends = Arc::new(AtomicUsize::new(0));
        let (c, e) = (chunks.clone(), ends.clone());

        let observer = StreamObserver::new()
            .on_data(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .on_end(move || {
                e.fetch_add(1, Ordering::SeqCst);
            });

        let source = stream::iter(vec![Ok(Bytes::from("a")), Ok(Bytes::from("b")), Ok(Bytes::from("c"))]);
        let mut rs = ResponseStream::new("svc", source, observer);
        let mut seen = Vec::new();
        while let Some(chunk) = rs.next().await {
            seen.push(chunk.unwrap());
        }
        // polling past the end must not re-fire on_end
        assert!(rs.next().await.is_none());

        assert_eq!(seen, vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")]);
        assert_eq!(chunks.load(Ordering::SeqCst), 3);
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_fires_error_observer_and_ends_stream() {
        let errors = Arc::new(AtomicUsize::new(0));
        let ends = Arc::new(AtomicUsize::new(0));
        let (er, en) = (errors.clone(), ends.clone());

        let observer = StreamObserver::new()
            .on_error(move |_| {
                er.fetch_add(1, Ordering::SeqCst);
            })
            .on_end(move || {
                en.fetch_add(1, Ordering::SeqCst);
            });

        let source = stream::iter(vec![
            Ok(Bytes::from("a")),
            Err(HttpClientError::Decode("broken".to_string())),
            Ok(Bytes::from("never")),
        ]);
        let rs = ResponseStream::new("svc", source, observer);
        assert!(rs.collect_bytes().await.is_err());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(ends.load(Ordering::SeqCst), 0);
    }
}
