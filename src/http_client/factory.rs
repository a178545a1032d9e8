use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

use super::descriptor::{ClientDescriptor, Verb};
use super::request::{build_request, PreparedRequest};
use super::stream::{ResponseStream, StreamObserver};
use super::transport::{HttpClientService, RequestOptions};
use super::HttpClientError;

/// Turns client descriptors into callable clients sharing one transport
#[derive(Clone)]
pub struct HttpClientFactory {
    transport: Arc<HttpClientService>,
}

impl HttpClientFactory {
    pub fn new(transport: Arc<HttpClientService>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<HttpClientService> {
        &self.transport
    }

    /// Validate `descriptor` and bind it to the shared transport
    pub fn build(&self, descriptor: ClientDescriptor) -> Result<DeclarativeClient, HttpClientError> {
        descriptor.validate()?;
        Ok(DeclarativeClient {
            descriptor: Arc::new(descriptor),
            transport: self.transport.clone(),
        })
    }
}

pub enum ClientResponse {
    Json(Value),
    Stream(ResponseStream),
}

#[derive(Clone)]
pub struct DeclarativeClient {
    descriptor: Arc<ClientDescriptor>,
    transport: Arc<HttpClientService>,
}

impl DeclarativeClient {
    pub fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    pub fn service_name(&self) -> &str {
        &self.descriptor.service_name
    }

    /// Build the concrete request without sending it
    pub fn prepare(&self, method: &str, args: &[Value]) -> Result<PreparedRequest, HttpClientError> {
        let method = self.descriptor.get_method(method)?;
        build_request(&self.descriptor, method, args)
    }

    /// Run `method` with positional `args`. Streaming methods hand back the
    /// body as a [`ResponseStream`]; everything else is parsed JSON.
    pub async fn invoke(
        &self,
        method: &str,
        args: &[Value],
        observer: StreamObserver,
    ) -> Result<ClientResponse, HttpClientError> {
        let request = self.prepare(method, args)?;
        let options = self.options_for(&request);
        let service = self.descriptor.service_name.as_str();
        let transport = &self.transport;
        let path = request.path.as_str();
        let body = request.body.as_ref();

        let result = if request.stream {
            let stream = match request.verb {
                Verb::Get => transport.get_stream(service, path, &options, observer).await,
                Verb::Post => transport.post_stream(service, path, body, &options, observer).await,
                other => return Err(HttpClientError::UnsupportedStream(other)),
            };
            stream.map(ClientResponse::Stream)
        } else {
            let value = match request.verb {
                Verb::Get => transport.get(service, path, &options).await,
                Verb::Post => transport.post(service, path, body, &options).await,
                Verb::Put => transport.put(service, path, body, &options).await,
                Verb::Delete => transport.delete(service, path, &options).await,
                Verb::Patch => transport.patch(service, path, body, &options).await,
            };
            value.map(ClientResponse::Json)
        };

        result.map_err(|source| {
            let err = HttpClientError::Call {
                service: service.to_string(),
                verb: request.verb,
                url: request.path.clone(),
                source: Box::new(source),
            };
            error!("{}", err);
            err
        })
    }

    pub async fn call(&self, method: &str, args: &[Value]) -> Result<Value, HttpClientError> {
        if self.descriptor.get_method(method)?.stream {
            return Err(HttpClientError::StreamingMethod(method.to_string()));
        }
        match self.invoke(method, args, StreamObserver::default()).await? {
            ClientResponse::Json(value) => Ok(value),
            ClientResponse::Stream(_) => Err(HttpClientError::StreamingMethod(method.to_string())),
        }
    }

    /// [`call`](Self::call), deserialized into `T`
    pub async fn call_as<T: DeserializeOwned>(&self, method: &str, args: &[Value]) -> Result<T, HttpClientError> {
        let value = self.call(method, args).await?;
        serde_json::from_value(value).map_err(|e| HttpClientError::Decode(e.to_string()))
    }

    pub async fn stream(
        &self,
        method: &str,
        args: &[Value],
        observer: StreamObserver,
    ) -> Result<ResponseStream, HttpClientError> {
        if !self.descriptor.get_method(method)?.stream {
            return Err(HttpClientError::NotStreaming(method.to_string()));
        }
        match self.invoke(method, args, observer).await? {
            ClientResponse::Stream(stream) => Ok(stream),
            ClientResponse::Json(_) => Err(HttpClientError::NotStreaming(method.to_string())),
        }
    }

    fn options_for(&self, request: &PreparedRequest) -> RequestOptions {
        RequestOptions {
            base_url: Some(self.descriptor.base_url.clone()),
            timeout: self.descriptor.timeout,
            headers: request.headers.clone(),
            query: request.query.clone(),
            retries: self.descriptor.retries,
            retry_delay: self.descriptor.retry_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{MethodDescriptor, TransportDefaults};
    use serde_json::json;

    fn factory() -> HttpClientFactory {
        HttpClientFactory::new(Arc::new(HttpClientService::new(TransportDefaults::default())))
    }

    #[test]
    fn build_rejects_invalid_descriptor() {
        let descriptor = ClientDescriptor::new("svc", "https://api.example.com")
            .method("getUser", MethodDescriptor::get("/users/:id"));
        assert!(factory().build(descriptor).is_err());
    }

    #[test]
    fn prepare_resolves_method_by_name() {
        let descriptor = ClientDescriptor::new("svc", "https://api.example.com")
            .method("getUser", MethodDescriptor::get("/users/:id").path_param("id"));
        let client = factory().build(descriptor).unwrap();

        let request = client.prepare("getUser", &[json!(7)]).unwrap();
        assert_eq!(request.path, "/users/7");
        assert!(matches!(client.prepare("nope", &[]), Err(HttpClientError::UnknownMethod(_))));
    }

    #[tokio::test]
    async fn call_and_stream_are_not_interchangeable() {
        let descriptor = ClientDescriptor::new("svc", "https://api.example.com")
            .method("list", MethodDescriptor::get("/users"))
            .method("events", MethodDescriptor::get("/events").stream());
        let client = factory().build(descriptor).unwrap();

        assert!(matches!(
            client.call("events", &[]).await,
            Err(HttpClientError::StreamingMethod(_))
        ));
        assert!(matches!(
            client.stream("list", &[], StreamObserver::default()).await,
            Err(HttpClientError::NotStreaming(_))
        ));
    }
}
