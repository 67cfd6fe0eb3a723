//! CSDN adaptor (cookie auth, HTML delivery)
//!
//! CSDN exposes a single-select category that cannot be changed once an
//! article exists, so updates that move an article are refused up front.

use async_trait::async_trait;
use blog_bridge_domain::policy::apply_category_policy;
use blog_bridge_domain::{
    Adaptor, AdaptorError, CategoryInfo, Credentials, Document, HttpRequest, PlatformConfig,
    PublishConfig, TagInfo, Transport, UserBlog,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;

use super::{ensure_success, matches_keyword};

pub const DEFAULT_HOME: &str = "https://blog.csdn.net";
pub const DEFAULT_API_URL: &str = "https://blog.csdn.net/api";
pub const DEFAULT_PREVIEW_URL: &str = "[userid]/article/details/[postid]";

/// CSDN adaptor
pub struct CsdnAdaptor {
    transport: Arc<dyn Transport>,
    config: PlatformConfig,
    username: Option<String>,
    cookie: SecretString,
}

impl CsdnAdaptor {
    pub fn new(transport: Arc<dyn Transport>, config: PlatformConfig) -> Result<Self, AdaptorError> {
        let (username, cookie) = match &config.credentials {
            Credentials::Cookie { username, cookie } => (username.clone(), cookie.clone()),
            other => {
                return Err(AdaptorError::Config(format!(
                    "csdn requires a cookie, got {} credentials",
                    other.kind()
                )));
            }
        };

        Ok(Self {
            transport,
            config,
            username,
            cookie,
        })
    }

    fn url(&self, path: &str) -> String {
        let base = if self.config.api_url.is_empty() {
            DEFAULT_API_URL
        } else {
            self.config.api_url.trim_end_matches('/')
        };
        format!("{}{}", base, path)
    }

    async fn call<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, AdaptorError> {
        self.call_optional(request)
            .await?
            .ok_or_else(|| AdaptorError::InvalidResponse("csdn: missing data".to_string()))
    }

    /// Like `call`, but `data` may be null or absent on success
    async fn call_optional<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<Option<T>, AdaptorError> {
        let request = request.header("Cookie", self.cookie.expose_secret());
        let response = ensure_success(self.transport.send(request).await?)?;
        let envelope: Envelope<T> = response
            .json()
            .map_err(|e| AdaptorError::InvalidResponse(format!("csdn: {}", e)))?;

        match envelope.code {
            200 => Ok(envelope.data),
            400101 | 401 => Err(AdaptorError::Auth(envelope.msg)),
            code => Err(AdaptorError::Platform(format!("csdn {}: {}", code, envelope.msg))),
        }
    }

    async fn user(&self) -> Result<CsdnUser, AdaptorError> {
        self.call(HttpRequest::get(self.url("/user/info"))).await
    }

    async fn article(&self, remote_post_id: &str) -> Result<CsdnArticle, AdaptorError> {
        self.call(HttpRequest::get(self.url(&format!("/articles/{}", remote_post_id))))
            .await
    }

    async fn save(
        &self,
        remote_post_id: Option<&str>,
        document: &Document,
    ) -> Result<SaveResult, AdaptorError> {
        self.call(HttpRequest::post(self.url("/articles/save")).json(json!({
            "article_id": remote_post_id.unwrap_or_default(),
            "title": document.title,
            "content": document.content,
            "markdowncontent": document.markdown,
            "categories": document.categories.join(","),
            "tags": document.tags.join(","),
            "status": 0,
            "type": "original",
            "read_type": "public",
        })))
        .await
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct CsdnUser {
    username: String,
    #[serde(default)]
    nickname: String,
}

#[derive(Deserialize)]
struct CsdnCategory {
    name: String,
}

#[derive(Deserialize)]
struct SaveResult {
    id: serde_json::Value,
}

#[derive(Deserialize)]
struct CsdnArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    markdowncontent: String,
    #[serde(default)]
    categories: String,
    #[serde(default)]
    tags: String,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[async_trait]
impl Adaptor for CsdnAdaptor {
    fn platform(&self) -> &'static str {
        "csdn"
    }

    async fn check_auth(&self) -> Result<bool, AdaptorError> {
        match self.user().await {
            Ok(user) => {
                tracing::debug!(username = %user.username, "CSDN cookie accepted");
                Ok(true)
            }
            Err(AdaptorError::Auth(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_users_blogs(&self) -> Result<Vec<UserBlog>, AdaptorError> {
        let user = self.user().await?;
        let home = if self.config.home.is_empty() {
            DEFAULT_HOME
        } else {
            self.config.home.trim_end_matches('/')
        };
        Ok(vec![UserBlog {
            blog_id: user.username.clone(),
            blog_name: if user.nickname.is_empty() {
                user.username.clone()
            } else {
                user.nickname
            },
            url: format!("{}/{}", home, user.username),
        }])
    }

    async fn get_categories(
        &self,
        keyword: Option<&str>,
    ) -> Result<Vec<CategoryInfo>, AdaptorError> {
        let categories: Vec<CsdnCategory> =
            self.call(HttpRequest::get(self.url("/categories"))).await?;
        Ok(categories
            .into_iter()
            .filter(|c| matches_keyword(keyword, &[c.name.as_str()]))
            .map(|c| CategoryInfo {
                category_id: c.name.clone(),
                description: c.name.clone(),
                category_name: c.name,
            })
            .collect())
    }

    async fn get_tags(&self) -> Result<Vec<TagInfo>, AdaptorError> {
        Ok(vec![])
    }

    async fn new_post(&self, document: &Document) -> Result<String, AdaptorError> {
        let saved = self.save(None, document).await?;
        match saved.id {
            serde_json::Value::Number(n) => Ok(n.to_string()),
            serde_json::Value::String(s) => Ok(s),
            other => Err(AdaptorError::InvalidResponse(format!(
                "csdn returned article id {}",
                other
            ))),
        }
    }

    async fn edit_post(
        &self,
        remote_post_id: &str,
        document: &Document,
    ) -> Result<bool, AdaptorError> {
        self.save(Some(remote_post_id), document).await?;
        Ok(true)
    }

    async fn delete_post(&self, remote_post_id: &str) -> Result<bool, AdaptorError> {
        let _: Option<serde_json::Value> = self
            .call_optional(HttpRequest::post(self.url("/articles/delete")).json(json!({
                "article_id": remote_post_id,
                "deep": false,
            })))
            .await?;
        Ok(true)
    }

    async fn get_post(&self, remote_post_id: &str) -> Result<Document, AdaptorError> {
        let article = self.article(remote_post_id).await?;

        let mut document = Document::new(article.title, article.markdowncontent);
        document.html = article.content.clone();
        document.content = article.content;
        document.categories = split_list(&article.categories);
        document.tags = split_list(&article.tags);
        Ok(document)
    }

    async fn get_preview_url(&self, remote_post_id: &str) -> Result<String, AdaptorError> {
        let template = if self.config.preview_url.is_empty() {
            DEFAULT_PREVIEW_URL
        } else {
            self.config.preview_url.as_str()
        };

        let username = match self.username.as_deref().filter(|u| !u.is_empty()) {
            Some(username) => username.to_string(),
            None if template.contains("[userid]") => self.user().await?.username,
            None => String::new(),
        };

        Ok(template
            .replace("[postid]", remote_post_id)
            .replace("[userid]", &username))
    }

    async fn pre_edit_post(
        &self,
        mut document: Document,
        _document_id: &str,
        publish: &PublishConfig,
    ) -> Result<Document, AdaptorError> {
        apply_category_policy(
            &mut document,
            &self.config.categories,
            self.config.blog_id.as_deref(),
        );

        let locked = self
            .config
            .categories
            .knowledge_space
            .is_some_and(|space| !space.allow_change);

        if let (true, Some(remote_post_id)) = (locked, publish.remote_post_id()) {
            let remote = self.article(remote_post_id).await?;
            let remote_categories = split_list(&remote.categories);

            if document.categories.is_empty() {
                document.categories = remote_categories;
            } else if !remote_categories.is_empty() && remote_categories != document.categories {
                return Err(AdaptorError::Unsupported(format!(
                    "csdn category cannot change from {:?} to {:?}; delete and republish instead",
                    remote_categories, document.categories
                )));
            }
        }

        Ok(document)
    }
}
