//! Domain models and value objects

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping key under which the portable slug is stored for a document
pub const CUSTOM_SLUG_KEY: &str = "custom-slug";

/// Publication status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

/// Body format a platform expects to receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    #[default]
    Markdown,
    Html,
}

/// The canonical unit being published
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Post title
    pub title: String,
    /// Body in markdown form
    #[serde(default)]
    pub markdown: String,
    /// Body rendered to HTML
    #[serde(default)]
    pub html: String,
    /// Outgoing body, either `markdown` or `html` depending on the platform
    #[serde(default)]
    pub content: String,
    /// URL-safe identifier, portable across platforms
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub status: PostStatus,
    /// Ordered category references
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Platform-specific extension fields
    #[serde(default)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl Document {
    pub fn new(title: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            markdown: markdown.into(),
            ..Default::default()
        }
    }

    /// Read a string extension field
    pub fn extension_str(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).and_then(|v| v.as_str())
    }
}

/// Credentials for a platform; the shape varies per platform
#[derive(Debug, Clone, Default)]
pub enum Credentials {
    #[default]
    None,
    UsernamePassword {
        username: String,
        password: SecretString,
    },
    Cookie {
        /// Account name used in preview URLs, if the platform needs one
        username: Option<String>,
        cookie: SecretString,
    },
    Token {
        /// Login name the token belongs to
        username: Option<String>,
        token: SecretString,
    },
}

impl Credentials {
    pub fn username(&self) -> Option<&str> {
        match self {
            Credentials::None => None,
            Credentials::UsernamePassword { username, .. } => Some(username.as_str()),
            Credentials::Cookie { username, .. } | Credentials::Token { username, .. } => {
                username.as_deref()
            }
        }
    }

    /// Short label for logs and diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::None => "none",
            Credentials::UsernamePassword { .. } => "username_password",
            Credentials::Cookie { .. } => "cookie",
            Credentials::Token { .. } => "token",
        }
    }
}

/// How a platform groups posts when it uses a "knowledge space"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    /// Exactly one space per post
    #[default]
    Single,
    /// Any number of spaces per post
    Multi,
}

/// Knowledge-space configuration for platforms that model categories that way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSpace {
    pub kind: CategoryType,
    /// Whether the space may change after the post was created
    pub allow_change: bool,
}

/// Category capability flags of a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCapability {
    /// Platform supports classic (multi-select) categories
    pub enabled: bool,
    pub knowledge_space: Option<KnowledgeSpace>,
}

impl Default for CategoryCapability {
    fn default() -> Self {
        Self {
            enabled: true,
            knowledge_space: None,
        }
    }
}

/// Per-platform static and user-supplied settings
#[derive(Debug, Clone, Default)]
pub struct PlatformConfig {
    /// Public home URL, used to absolutize relative preview URLs
    pub home: String,
    /// API endpoint (for the local site target: output directory)
    pub api_url: String,
    pub credentials: Credentials,
    pub page_type: PageType,
    /// Default destination blog / knowledge space
    pub blog_id: Option<String>,
    /// Field name under which the remote post id is stored in the mapping
    pub posid_key: String,
    /// Preview path template, e.g. `/p/[postid].html`
    pub preview_url: String,
    /// Proxy middleware used when direct access is blocked
    pub middleware_url: Option<String>,
    /// Always route through the middleware
    pub force_proxy: bool,
    pub categories: CategoryCapability,
}

impl PlatformConfig {
    /// Fill the preview template for a remote post id
    pub fn preview_path(&self, remote_post_id: &str) -> String {
        self.preview_url
            .replace("[postid]", remote_post_id)
            .replace("[userid]", self.credentials.username().unwrap_or_default())
            .replace("[blogid]", self.blog_id.as_deref().unwrap_or_default())
    }
}

/// Per-document publish metadata as kept by the mapping store
///
/// Keys are platform `posid_key`s, [`CUSTOM_SLUG_KEY`] and any extras.
pub type PostMeta = BTreeMap<String, String>;

/// One (platform, document) entry projected out of [`PostMeta`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMapping {
    pub remote_post_id: String,
    pub slug: Option<String>,
    pub extra_meta: BTreeMap<String, String>,
}

impl RemoteMapping {
    /// Project the mapping for one platform; `None` when not published there
    pub fn from_meta(meta: &PostMeta, posid_key: &str) -> Option<Self> {
        let remote_post_id = meta
            .get(posid_key)
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())?;

        let extra_meta = meta
            .iter()
            .filter(|(k, _)| k.as_str() != posid_key && k.as_str() != CUSTOM_SLUG_KEY)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Some(Self {
            remote_post_id: remote_post_id.to_string(),
            slug: meta
                .get(CUSTOM_SLUG_KEY)
                .filter(|s| !s.trim().is_empty())
                .cloned(),
            extra_meta,
        })
    }
}

/// Platform config plus the document's current publish metadata
#[derive(Debug, Clone, Default)]
pub struct PublishConfig {
    pub platform: PlatformConfig,
    pub meta: PostMeta,
}

impl PublishConfig {
    /// Remote id for this platform, if already published
    pub fn remote_post_id(&self) -> Option<&str> {
        self.meta
            .get(&self.platform.posid_key)
            .map(|id| id.as_str())
            .filter(|id| !id.trim().is_empty())
    }
}

/// A category (or knowledge space) as reported by a platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub category_id: String,
    pub category_name: String,
    pub description: String,
}

/// A tag as reported by a platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub tag_id: String,
    pub name: String,
}

/// A destination the credentials can publish to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBlog {
    pub blog_id: String,
    pub blog_name: String,
    pub url: String,
}

/// Uniform result of a publish run, regardless of platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub platform_key: String,
    pub success: bool,
    /// Remote post id after the run, if known
    pub remote_post_id: Option<String>,
    pub preview_url: Option<String>,
    pub error_message: Option<String>,
}

impl PublishResult {
    pub fn failed(platform_key: &str, error_message: impl Into<String>) -> Self {
        Self {
            platform_key: platform_key.to_string(),
            success: false,
            remote_post_id: None,
            preview_url: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// Result of a delete run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub platform_key: String,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Mode for page initialisation before editing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageMode {
    #[default]
    Add,
    Update,
}

/// Read-only reconciliation of source and remote documents
#[derive(Debug, Clone, Serialize)]
pub struct InitPage {
    pub source_document: Document,
    /// Only fetched in [`PageMode::Update`]
    pub remote_document: Option<Document>,
    /// Editable base; currently the source document with attributes assigned
    pub merged_document: Document,
    pub preview_url: Option<String>,
}
