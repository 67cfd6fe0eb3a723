//! HTTP transports: direct via reqwest, or through a proxy middleware

use async_trait::async_trait;
use blog_bridge_domain::{HttpMethod, HttpRequest, HttpResponse, RequestBody, Transport, TransportError};
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Direct transport backed by a reqwest client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("blog-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        };

        tracing::debug!(method = request.method.as_str(), url = %request.url, "Sending request");

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Text { content_type, body }) => {
                builder.header("Content-Type", content_type).body(body)
            }
            Some(RequestBody::Form(fields)) => builder.form(&fields),
            None => builder,
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(HttpResponse { status, body })
    }
}

/// Envelope posted to the proxy middleware
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyEnvelope<'a> {
    url: &'a str,
    method: &'a str,
    headers: BTreeMap<&'a str, &'a str>,
    content_type: Option<&'a str>,
    payload: Option<serde_json::Value>,
}

/// Transport that routes requests through a middleware
///
/// With `force` every request goes through the middleware. Otherwise the
/// middleware is only tried when no connection to the platform could be
/// made, so a request is never delivered twice.
pub struct ProxyTransport {
    inner: Arc<dyn Transport>,
    middleware_url: String,
    force: bool,
}

impl ProxyTransport {
    pub fn new(inner: Arc<dyn Transport>, middleware_url: impl Into<String>, force: bool) -> Self {
        Self {
            inner,
            middleware_url: middleware_url.into(),
            force,
        }
    }

    async fn via_middleware(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let payload = match &request.body {
            Some(RequestBody::Json(value)) => Some(value.clone()),
            Some(RequestBody::Text { body, .. }) => Some(serde_json::Value::String(body.clone())),
            Some(RequestBody::Form(fields)) => Some(serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect(),
            )),
            None => None,
        };

        let envelope = ProxyEnvelope {
            url: &request.url,
            method: request.method.as_str(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            content_type: request.body.as_ref().map(|b| b.content_type()),
            payload,
        };
        let envelope = serde_json::to_value(&envelope)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        tracing::debug!(url = %request.url, middleware = %self.middleware_url, "Sending request via middleware");
        self.inner
            .send(HttpRequest::post(&self.middleware_url).json(envelope))
            .await
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if self.force {
            return self.via_middleware(&request).await;
        }

        match self.inner.send(request.clone()).await {
            Err(TransportError::Connect(reason)) => {
                tracing::warn!(url = %request.url, reason = %reason, "Direct connection failed, sending via middleware");
                self.via_middleware(&request).await
            }
            other => other,
        }
    }
}
