use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use super::request::placeholders;
use super::HttpClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Verb> for reqwest::Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Put => reqwest::Method::PUT,
            Verb::Delete => reqwest::Method::DELETE,
            Verb::Patch => reqwest::Method::PATCH,
        }
    }
}

/// What a positional argument feeds into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamRole {
    /// Replaces `:name` / `{name}` in the path template
    Path(String),
    /// A single query key, or with `None` an object whose fields are merged
    /// into the query string
    Query(Option<String>),
    /// Request payload
    Body,
    /// A single request header
    Header(String),
    /// An object of headers merged over everything else
    Headers,
}

/// One remote operation: verb, path template, and argument roles in
/// positional order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub verb: Verb,
    pub path: String,
    pub stream: bool,
    pub params: Vec<ParamRole>,
}

impl MethodDescriptor {
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            stream: false,
            params: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Verb::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Verb::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Verb::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Verb::Delete, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Verb::Patch, path)
    }

    /// Response is consumed as a chunk stream instead of parsed JSON
    pub fn stream(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn path_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamRole::Path(name.into()));
        self
    }

    pub fn query_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamRole::Query(Some(name.into())));
        self
    }

    pub fn query_map(mut self) -> Self {
        self.params.push(ParamRole::Query(None));
        self
    }

    pub fn body(mut self) -> Self {
        self.params.push(ParamRole::Body);
        self
    }

    pub fn header(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamRole::Header(name.into()));
        self
    }

    pub fn headers(mut self) -> Self {
        self.params.push(ParamRole::Headers);
        self
    }

    fn validate(&self, name: &str) -> Result<(), HttpClientError> {
        if self.stream && !matches!(self.verb, Verb::Get | Verb::Post) {
            return Err(HttpClientError::UnsupportedStream(self.verb));
        }

        for placeholder in placeholders(&self.path) {
            let bound = self
                .params
                .iter()
                .any(|p| matches!(p, ParamRole::Path(n) if *n == placeholder));
            if !bound {
                return Err(HttpClientError::MissingPathParam(placeholder));
            }
        }

        let bodies = self.params.iter().filter(|p| **p == ParamRole::Body).count();
        let bags = self.params.iter().filter(|p| **p == ParamRole::Headers).count();
        if bodies > 1 || bags > 1 {
            return Err(HttpClientError::InvalidDescriptor(format!(
                "method '{}' binds more than one body or header bag",
                name
            )));
        }

        Ok(())
    }
}

/// Static description of a remote service. Read on every call, never
/// mutated by one.
#[derive(Debug, Clone)]
pub struct ClientDescriptor {
    pub service_name: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub headers: BTreeMap<String, String>,
    pub retries: u32,
    pub retry_delay: Option<Duration>,
    pub methods: HashMap<String, MethodDescriptor>,
}

impl ClientDescriptor {
    pub fn new(service_name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            base_url: base_url.into(),
            timeout: None,
            headers: BTreeMap::new(),
            retries: 0,
            retry_delay: None,
            methods: HashMap::new(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
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

    pub fn method(mut self, name: impl Into<String>, method: MethodDescriptor) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    pub fn get_method(&self, name: &str) -> Result<&MethodDescriptor, HttpClientError> {
        self.methods
            .get(name)
            .ok_or_else(|| HttpClientError::UnknownMethod(name.to_string()))
    }

    /// Reject descriptors that could never produce a valid request
    pub fn validate(&self) -> Result<(), HttpClientError> {
        if self.service_name.is_empty() {
            return Err(HttpClientError::InvalidDescriptor("service name is empty".to_string()));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(HttpClientError::InvalidDescriptor(format!(
                "base URL '{}' is not absolute",
                self.base_url
            )));
        }
        for (name, method) in &self.methods {
            method.validate(name)?;
        }
        Ok(())
    }
}
