//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

use crate::model::{
    CategoryInfo, Document, PlatformConfig, PostMeta, PublishConfig, TagInfo, UserBlog,
};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// HTTP verbs supported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Text { content_type: String, body: String },
    Form(Vec<(String, String)>),
}

impl RequestBody {
    pub fn content_type(&self) -> &str {
        match self {
            RequestBody::Json(_) => "application/json",
            RequestBody::Text { content_type, .. } => content_type,
            RequestBody::Form(_) => "application/x-www-form-urlencoded",
        }
    }
}

/// Description of a single HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: vec![],
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    pub fn text(mut self, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text {
            content_type: content_type.into(),
            body: body.into(),
        });
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }
}

/// Raw response as returned by the transport
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Error type for transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// No connection was established; the request never reached the server
    #[error("Connection failed: {0}")]
    Connect(String),
    /// Failure after the request may have been delivered
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Port for performing HTTP requests, directly or through a proxy
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// Platform adaptors
// ---------------------------------------------------------------------------

/// Error type for platform adaptor operations
#[derive(Debug, Error)]
pub enum AdaptorError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Platform returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Platform error: {0}")]
    Platform(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    /// The remote post does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Uniform capability contract every publishing platform implements
#[async_trait]
pub trait Adaptor: Send + Sync {
    /// Platform name (e.g., "yuque", "metaweblog")
    fn platform(&self) -> &'static str;

    /// Verify the configured credentials
    async fn check_auth(&self) -> Result<bool, AdaptorError>;

    /// Destinations the credentials can publish to
    async fn get_users_blogs(&self) -> Result<Vec<UserBlog>, AdaptorError>;

    /// Categories or knowledge spaces, optionally filtered by keyword
    async fn get_categories(
        &self,
        keyword: Option<&str>,
    ) -> Result<Vec<CategoryInfo>, AdaptorError>;

    async fn get_tags(&self) -> Result<Vec<TagInfo>, AdaptorError>;

    /// Create a post, returns the remote post id
    async fn new_post(&self, document: &Document) -> Result<String, AdaptorError>;

    async fn edit_post(
        &self,
        remote_post_id: &str,
        document: &Document,
    ) -> Result<bool, AdaptorError>;

    async fn delete_post(&self, remote_post_id: &str) -> Result<bool, AdaptorError>;

    /// Fetch a post mapped back into the canonical shape
    async fn get_post(&self, remote_post_id: &str) -> Result<Document, AdaptorError>;

    /// Preview URL for a post; may be absolute or relative to the home URL
    async fn get_preview_url(&self, remote_post_id: &str) -> Result<String, AdaptorError>;

    /// Platform hook run right before dispatch
    async fn pre_edit_post(
        &self,
        document: Document,
        _document_id: &str,
        _publish: &PublishConfig,
    ) -> Result<Document, AdaptorError> {
        Ok(document)
    }
}

/// How the remote id of a document is determined on a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteIdPolicy {
    /// Looked up in the mapping store under `posid_key`
    Mapped,
    /// First-party target: the remote id is the host document id itself
    HostDocumentId,
}

/// An adaptor together with its remote id policy
#[derive(Clone)]
pub struct ResolvedAdaptor {
    pub adaptor: Arc<dyn Adaptor>,
    pub remote_ids: RemoteIdPolicy,
}

/// Port for resolving a platform key and config to an adaptor
pub trait AdaptorFactory: Send + Sync {
    /// Fails fast with [`AdaptorError::Config`] when required settings are missing
    fn resolve(
        &self,
        platform_key: &str,
        config: &PlatformConfig,
    ) -> Result<ResolvedAdaptor, AdaptorError>;
}

// ---------------------------------------------------------------------------
// Mapping store
// ---------------------------------------------------------------------------

/// Error type for mapping store operations
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the durable document -> remote post bookkeeping
///
/// Writes are per key so that concurrent runs for different platforms of the
/// same document never overwrite each other.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// All metadata recorded for a document; empty when none
    async fn get_meta(&self, document_id: &str) -> Result<PostMeta, MappingError>;

    /// Insert or overwrite the given keys
    async fn merge_meta(&self, document_id: &str, updates: &PostMeta) -> Result<(), MappingError>;

    /// Remove the given keys; missing keys are ignored
    async fn remove_keys(&self, document_id: &str, keys: &[&str]) -> Result<(), MappingError>;
}

// ---------------------------------------------------------------------------
// Content preprocessing
// ---------------------------------------------------------------------------

/// Error type for content preprocessing
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Image upload failed: {0}")]
    Upload(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Port for moving embedded images to a remote image host
#[async_trait]
pub trait ImageRehoster: Send + Sync {
    async fn rehost_images(
        &self,
        document_id: &str,
        markdown: &str,
    ) -> Result<String, PreprocessError>;
}

/// Port for rendering markdown to HTML
pub trait MarkdownRenderer: Send + Sync {
    fn render_to_html(&self, markdown: &str) -> String;
}

/// Port for deriving a URL-safe slug from a title
pub trait SlugGenerator: Send + Sync {
    fn slug_for(&self, title: &str) -> String;
}
