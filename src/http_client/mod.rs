//! Outbound HTTP: a pooled, retrying transport plus a declarative client
//! layer that turns a static service description into real requests.
//!
//! ```rust,ignore
//! let descriptor = ClientDescriptor::new("jsonplaceholder", "https://jsonplaceholder.typicode.com")
//!     .retries(2)
//!     .method("getUser", MethodDescriptor::get("/users/:id").path_param("id"));
//!
//! let client = factory.build(descriptor)?;
//! let user = client.call("getUser", &[json!(42)]).await?;
//! ```

use std::time::Duration;
use thiserror::Error;

pub mod batch;
pub mod descriptor;
pub mod factory;
pub mod request;
pub mod stream;
pub mod transport;

pub use batch::{batch, batch_with_limit};
pub use descriptor::{ClientDescriptor, MethodDescriptor, ParamRole, Verb};
pub use factory::{ClientResponse, DeclarativeClient, HttpClientFactory};
pub use request::{build_request, PreparedRequest};
pub use stream::{ResponseStream, StreamObserver};
pub use transport::{HttpClientService, RawResponse, RequestOptions, TransportDefaults};

#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Timed out after {after:?} waiting for {phase}")]
    Timeout { phase: &'static str, after: Duration },

    #[error("Request failed with status code {status}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("No value bound for path placeholder '{0}'")]
    MissingPathParam(String),

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Unknown client method '{0}'")]
    UnknownMethod(String),

    #[error("Streaming is only supported for GET and POST, not {0}")]
    UnsupportedStream(Verb),

    #[error("Method '{0}' streams its response; use stream() instead of call()")]
    StreamingMethod(String),

    #[error("Method '{0}' does not stream its response; use call() instead of stream()")]
    NotStreaming(String),

    #[error("Invalid client descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("[{service}] {verb} {url} failed: {source}")]
    Call {
        service: String,
        verb: Verb,
        url: String,
        source: Box<HttpClientError>,
    },
}

impl HttpClientError {
    /// Network failures and 5xx responses are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpClientError::Transport(e) => !e.is_builder() && !e.is_decode() && !e.is_redirect(),
            HttpClientError::Status { status, .. } => (500..600).contains(status),
            HttpClientError::Timeout { .. } => true,
            HttpClientError::Call { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Defects in how a client was described or called, as opposed to
    /// failures of the remote service
    pub fn is_descriptor_error(&self) -> bool {
        match self {
            HttpClientError::MissingPathParam(_)
            | HttpClientError::InvalidHeader { .. }
            | HttpClientError::UnknownMethod(_)
            | HttpClientError::UnsupportedStream(_)
            | HttpClientError::StreamingMethod(_)
            | HttpClientError::NotStreaming(_)
            | HttpClientError::InvalidDescriptor(_) => true,
            HttpClientError::Call { source, .. } => source.is_descriptor_error(),
            _ => false,
        }
    }

    /// Upstream HTTP status, if the remote answered
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpClientError::Status { status, .. } => Some(*status),
            HttpClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            HttpClientError::Call { source, .. } => source.status(),
            _ => None,
        }
    }
}
