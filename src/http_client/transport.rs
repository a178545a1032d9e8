use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::descriptor::Verb;
use super::request::resolve_url;
use super::stream::{ResponseStream, StreamObserver};
use super::HttpClientError;
use crate::config::HttpClientConfig;

/// Pool and timing defaults applied to every cached client
#[derive(Debug, Clone)]
pub struct TransportDefaults {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry_delay: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
}

impl Default for TransportDefaults {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            connect_timeout: Duration::from_millis(5_000),
            retry_delay: Duration::from_millis(1_000),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl From<&HttpClientConfig> for TransportDefaults {
    fn from(config: &HttpClientConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            pool_max_idle_per_host: config.pool_max_idle_per_host,
            pool_idle_timeout: Duration::from_secs(config.pool_idle_timeout_secs),
        }
    }
}

/// Per-call settings. Anything left unset falls back to [`TransportDefaults`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub retries: u32,
    pub retry_delay: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }
}

/// Full response, for callers that need status and headers
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn json(&self) -> Result<Value, HttpClientError> {
        serde_json::from_slice(&self.body).map_err(|e| HttpClientError::Decode(e.to_string()))
    }
}

enum Payload<'a> {
    Empty,
    Json(&'a Value),
    File { data: Bytes, filename: &'a str },
}

/// Outbound HTTP transport with one pooled client per service name
pub struct HttpClientService {
    clients: RwLock<HashMap<String, reqwest::Client>>,
    defaults: TransportDefaults,
}

impl HttpClientService {
    pub fn new(defaults: TransportDefaults) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            defaults,
        }
    }

    pub fn defaults(&self) -> &TransportDefaults {
        &self.defaults
    }

    /// Cached client for `service`, created on first use
    pub async fn client(&self, service: &str) -> Result<reqwest::Client, HttpClientError> {
        if let Some(client) = self.clients.read().await.get(service) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(service) {
            return Ok(client.clone());
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .connect_timeout(self.defaults.connect_timeout)
            .pool_max_idle_per_host(self.defaults.pool_max_idle_per_host)
            .pool_idle_timeout(self.defaults.pool_idle_timeout)
            .tcp_keepalive(self.defaults.pool_idle_timeout)
            .default_headers(default_headers)
            .build()?;

        debug!("[{}] created HTTP client", service);
        clients.insert(service.to_string(), client.clone());
        Ok(client)
    }

    pub async fn has_client(&self, service: &str) -> bool {
        self.clients.read().await.contains_key(service)
    }

    /// Drop the cached client; the next call builds a fresh pool
    pub async fn clear_client(&self, service: &str) -> bool {
        self.clients.write().await.remove(service).is_some()
    }

    pub async fn clear_all_clients(&self) {
        self.clients.write().await.clear();
    }

    pub async fn get(&self, service: &str, url: &str, options: &RequestOptions) -> Result<Value, HttpClientError> {
        let response = self.execute(service, Verb::Get, url, Payload::Empty, options).await?;
        read_json(response, self.timeout_for(options)).await
    }

    pub async fn post(
        &self,
        service: &str,
        url: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Value, HttpClientError> {
        let response = self.execute(service, Verb::Post, url, payload(body), options).await?;
        read_json(response, self.timeout_for(options)).await
    }

    pub async fn put(
        &self,
        service: &str,
        url: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Value, HttpClientError> {
        let response = self.execute(service, Verb::Put, url, payload(body), options).await?;
        read_json(response, self.timeout_for(options)).await
    }

    pub async fn delete(&self, service: &str, url: &str, options: &RequestOptions) -> Result<Value, HttpClientError> {
        let response = self.execute(service, Verb::Delete, url, Payload::Empty, options).await?;
        read_json(response, self.timeout_for(options)).await
    }

    pub async fn patch(
        &self,
        service: &str,
        url: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Value, HttpClientError> {
        let response = self.execute(service, Verb::Patch, url, payload(body), options).await?;
        read_json(response, self.timeout_for(options)).await
    }

    pub async fn get_stream(
        &self,
        service: &str,
        url: &str,
        options: &RequestOptions,
        observer: StreamObserver,
    ) -> Result<ResponseStream, HttpClientError> {
        debug!("[{}] starting streaming GET: {}", service, url);
        let response = self.execute(service, Verb::Get, url, Payload::Empty, options).await?;
        Ok(ResponseStream::from_response(service, response, observer, self.timeout_for(options)))
    }

    pub async fn post_stream(
        &self,
        service: &str,
        url: &str,
        body: Option<&Value>,
        options: &RequestOptions,
        observer: StreamObserver,
    ) -> Result<ResponseStream, HttpClientError> {
        debug!("[{}] starting streaming POST: {}", service, url);
        let response = self.execute(service, Verb::Post, url, payload(body), options).await?;
        Ok(ResponseStream::from_response(service, response, observer, self.timeout_for(options)))
    }

    pub async fn get_raw(&self, service: &str, url: &str, options: &RequestOptions) -> Result<RawResponse, HttpClientError> {
        let response = self.execute(service, Verb::Get, url, Payload::Empty, options).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = read_body(response, self.timeout_for(options)).await?;
        Ok(RawResponse { status, headers, body })
    }

    pub async fn download_file(&self, service: &str, url: &str, options: &RequestOptions) -> Result<Bytes, HttpClientError> {
        let response = self.execute(service, Verb::Get, url, Payload::Empty, options).await?;
        read_body(response, self.timeout_for(options)).await
    }

    /// POST `data` as multipart field `file`
    pub async fn upload_file(
        &self,
        service: &str,
        url: &str,
        data: Bytes,
        filename: &str,
        options: &RequestOptions,
    ) -> Result<Value, HttpClientError> {
        let mut options = options.clone();
        options.headers.remove(CONTENT_TYPE);
        let response = self
            .execute(service, Verb::Post, url, Payload::File { data, filename }, &options)
            .await?;
        read_json(response, self.timeout_for(&options)).await
    }

    fn timeout_for(&self, options: &RequestOptions) -> Duration {
        options.timeout.unwrap_or(self.defaults.timeout)
    }

    /// Send with the retry policy: network failures and 5xx responses are
    /// retried after a fixed delay until the budget runs out.
    async fn execute(
        &self,
        service: &str,
        verb: Verb,
        url: &str,
        payload: Payload<'_>,
        options: &RequestOptions,
    ) -> Result<reqwest::Response, HttpClientError> {
        let client = self.client(service).await?;
        let full_url = resolve_url(options.base_url.as_deref(), url);
        let timeout = self.timeout_for(options);
        let delay = options.retry_delay.unwrap_or(self.defaults.retry_delay);
        let mut remaining = options.retries;

        loop {
            debug!("[{}] {} {}", service, verb, full_url);

            let mut request = client
                .request(verb.into(), &full_url)
                .headers(options.headers.clone());
            if !options.query.is_empty() {
                request = request.query(&options.query);
            }
            request = match &payload {
                Payload::Empty => request,
                Payload::Json(body) => request.json(body),
                Payload::File { data, filename } => {
                    let part = Part::bytes(data.to_vec()).file_name(filename.to_string());
                    request.multipart(Form::new().part("file", part))
                }
            };

            // The deadline covers connect and response headers; bodies are
            // timed separately by whoever reads them
            let err = match tokio::time::timeout(timeout, request.send()).await {
                Ok(Ok(response)) if response.status().is_success() => {
                    debug!("[{}] response: {}", service, response.status().as_u16());
                    return Ok(response);
                }
                Ok(Ok(response)) => {
                    let status = response.status().as_u16();
                    let body = match tokio::time::timeout(timeout, response.text()).await {
                        Ok(Ok(text)) => text,
                        _ => String::new(),
                    };
                    HttpClientError::Status { status, body }
                }
                Ok(Err(e)) => HttpClientError::Transport(e),
                Err(_) => HttpClientError::Timeout {
                    phase: "response headers",
                    after: timeout,
                },
            };

            if remaining > 0 && err.is_retryable() {
                remaining -= 1;
                warn!("[{}] retrying request, {} retries left: {}", service, remaining, err);
                tokio::time::sleep(delay).await;
                continue;
            }

            error!("[{}] response error: {}", service, err);
            return Err(err);
        }
    }
}

fn payload(body: Option<&Value>) -> Payload<'_> {
    match body {
        Some(body) => Payload::Json(body),
        None => Payload::Empty,
    }
}

async fn read_body(response: reqwest::Response, timeout: Duration) -> Result<Bytes, HttpClientError> {
    tokio::time::timeout(timeout, response.bytes())
        .await
        .map_err(|_| HttpClientError::Timeout {
            phase: "response body",
            after: timeout,
        })?
        .map_err(HttpClientError::from)
}

/// Empty bodies become `null`; bodies that are not JSON come back as a string
async fn read_json(response: reqwest::Response, timeout: Duration) -> Result<Value, HttpClientError> {
    let bytes = read_body(response, timeout).await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}
