//! Request normalization over the HTTP transport
//!
//! Every vendor call is described by a [`RequestSpec`] and performed by the
//! shared [`RequestExecutor`]. The executor owns the `reqwest` client (and
//! with it the connection pool and timeouts); specs carry the per-call
//! method, URL, headers, query parameters, and body.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Result, StarlineError};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request body variants.
///
/// A tagged enum rather than runtime type inspection: JSON bodies merge,
/// multipart bodies pass through untouched with the transport deriving the
/// `multipart/form-data; boundary=…` content type from the form itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// Multipart form fields, in submission order
    Form(Vec<(String, String)>),
}

/// A normalized description of one vendor call
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    url: Url,
    headers: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
    body: Body,
}

impl RequestSpec {
    fn new(method: Method, url: Url) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        Self {
            method,
            url,
            headers,
            query: BTreeMap::new(),
            body: Body::Empty,
        }
    }

    /// Describe a GET request
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Describe a POST request
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a header; replaces an existing value for the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set a query parameter; replaces an existing value for the same name
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Attach a JSON body.
    ///
    /// If a JSON body is already present the new value deep-merges into it;
    /// any other body kind is replaced.
    pub fn json(mut self, value: Value) -> Self {
        match &mut self.body {
            Body::Json(base) => merge_json(base, value),
            _ => self.body = Body::Json(value),
        }
        self
    }

    /// Attach a multipart form body, replacing any previous body
    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Body::Form(fields);
        self
    }

    /// The request method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URL (without query parameters)
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Deep-merge `overlay` into `base`.
///
/// Objects merge key-by-key, recursing where both sides hold objects;
/// everything else is last-write-wins.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) if slot.is_object() && value.is_object() => {
                        merge_json(slot, value);
                    }
                    _ => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// A parsed vendor response: status, headers, JSON body
#[derive(Debug, Clone)]
pub struct VendorResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Shared HTTP executor for all vendor calls
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: Client,
}

impl RequestExecutor {
    /// Create an executor with the default timeouts
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create an executor with custom timeouts
    pub fn with_config(timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Perform one call.
    ///
    /// Transport failures and non-2xx statuses come back as `Err`; a 2xx
    /// response always parses to `Ok` — vendor-level success predicates are
    /// the caller's business.
    #[instrument(skip_all, fields(method = %spec.method, url = %spec.url))]
    pub async fn execute(&self, spec: RequestSpec) -> Result<VendorResponse> {
        let mut request = self.client.request(spec.method, spec.url);

        for (name, value) in &spec.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        request = match spec.body {
            Body::Empty => request,
            Body::Json(value) => request.json(&value),
            Body::Form(fields) => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                request.multipart(form)
            }
        };

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            debug!(status = status.as_u16(), "request rejected by server");
            return Err(StarlineError::server_error(status.as_u16(), body));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| StarlineError::Parse(e.to_string()))?;

        Ok(VendorResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}
