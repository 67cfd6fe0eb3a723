//! Yuque adaptor (REST API v2, token auth)
//!
//! Repositories of type `Book` act as knowledge spaces. The remote post id is
//! `"<namespace>/<docId>"`, where the namespace itself is `"<login>/<repo>"`.

use async_trait::async_trait;
use blog_bridge_domain::policy::apply_category_policy;
use blog_bridge_domain::{
    Adaptor, AdaptorError, CategoryInfo, Credentials, Document, HttpRequest, PageType,
    PlatformConfig, PublishConfig, TagInfo, Transport, UserBlog,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;

use super::{ensure_success, matches_keyword};

pub const DEFAULT_API_URL: &str = "https://www.yuque.com/api/v2";
pub const DEFAULT_HOME: &str = "https://www.yuque.com";

/// Yuque adaptor
pub struct YuqueAdaptor {
    transport: Arc<dyn Transport>,
    config: PlatformConfig,
    login: Option<String>,
    token: SecretString,
}

impl YuqueAdaptor {
    pub fn new(transport: Arc<dyn Transport>, config: PlatformConfig) -> Result<Self, AdaptorError> {
        let (login, token) = match &config.credentials {
            Credentials::Token { username, token } => (username.clone(), token.clone()),
            other => {
                return Err(AdaptorError::Config(format!(
                    "yuque requires a token, got {} credentials",
                    other.kind()
                )));
            }
        };

        Ok(Self {
            transport,
            config,
            login,
            token,
        })
    }

    /// Yuque stores the body as whichever format the content was rendered to
    fn body_format(&self) -> &'static str {
        match self.config.page_type {
            PageType::Markdown => "markdown",
            PageType::Html => "html",
        }
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
        let request = request.header("X-Auth-Token", self.token.expose_secret());
        let response = ensure_success(self.transport.send(request).await?)?;
        let envelope: Envelope<T> = response
            .json()
            .map_err(|e| AdaptorError::InvalidResponse(format!("yuque: {}", e)))?;
        Ok(envelope.data)
    }

    async fn login(&self) -> Result<String, AdaptorError> {
        if let Some(login) = self.login.as_deref().filter(|l| !l.is_empty()) {
            return Ok(login.to_string());
        }
        let user: YuqueUser = self.call(HttpRequest::get(self.url("/user"))).await?;
        Ok(user.login)
    }

    async fn repos(&self) -> Result<Vec<YuqueRepo>, AdaptorError> {
        let login = self.login().await?;
        self.call(HttpRequest::get(self.url(&format!("/users/{}/repos", login))))
            .await
    }

    async fn doc(&self, remote_post_id: &str) -> Result<YuqueDoc, AdaptorError> {
        let (namespace, doc_id) = split_remote_id(remote_post_id)?;
        self.call(HttpRequest::get(
            self.url(&format!("/repos/{}/docs/{}", namespace, doc_id)),
        ))
        .await
    }

    /// Knowledge space a new document goes to
    fn target_namespace(&self, document: &Document) -> Result<String, AdaptorError> {
        document
            .categories
            .first()
            .cloned()
            .or_else(|| self.config.blog_id.clone())
            .filter(|ns| !ns.trim().is_empty())
            .ok_or_else(|| {
                AdaptorError::Config(
                    "yuque needs a knowledge space: set blog_id or a category".to_string(),
                )
            })
    }
}

/// Split `"<login>/<repo>/<docId>"` into namespace and doc id
fn split_remote_id(remote_post_id: &str) -> Result<(&str, &str), AdaptorError> {
    match remote_post_id.rsplit_once('/') {
        Some((namespace, doc_id)) if namespace.contains('/') && !doc_id.is_empty() => {
            Ok((namespace, doc_id))
        }
        _ => Err(AdaptorError::InvalidResponse(format!(
            "malformed yuque post id: {}",
            remote_post_id
        ))),
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct YuqueUser {
    login: String,
}

#[derive(Deserialize)]
struct YuqueRepo {
    #[serde(rename = "type", default)]
    kind: String,
    name: String,
    namespace: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct YuqueDoc {
    id: serde_json::Value,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    book: Option<YuqueBook>,
}

#[derive(Deserialize)]
struct YuqueBook {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

fn id_to_string(id: &serde_json::Value) -> Option<String> {
    match id {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Adaptor for YuqueAdaptor {
    fn platform(&self) -> &'static str {
        "yuque"
    }

    async fn check_auth(&self) -> Result<bool, AdaptorError> {
        match self.call::<YuqueUser>(HttpRequest::get(self.url("/user"))).await {
            Ok(user) => {
                tracing::debug!(login = %user.login, "Yuque token accepted");
                Ok(true)
            }
            Err(AdaptorError::Auth(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_users_blogs(&self) -> Result<Vec<UserBlog>, AdaptorError> {
        Ok(self
            .repos()
            .await?
            .into_iter()
            .map(|repo| UserBlog {
                blog_id: repo.namespace.clone(),
                blog_name: repo.name,
                url: repo.namespace,
            })
            .collect())
    }

    async fn get_categories(
        &self,
        keyword: Option<&str>,
    ) -> Result<Vec<CategoryInfo>, AdaptorError> {
        Ok(self
            .repos()
            .await?
            .into_iter()
            .filter(|repo| repo.kind == "Book")
            .filter(|repo| matches_keyword(keyword, &[repo.name.as_str(), repo.namespace.as_str()]))
            .map(|repo| CategoryInfo {
                category_id: repo.namespace,
                description: repo.description.unwrap_or_else(|| repo.name.clone()),
                category_name: repo.name,
            })
            .collect())
    }

    async fn get_tags(&self) -> Result<Vec<TagInfo>, AdaptorError> {
        Ok(vec![])
    }

    async fn new_post(&self, document: &Document) -> Result<String, AdaptorError> {
        let namespace = self.target_namespace(document)?;
        let doc: YuqueDoc = self
            .call(
                HttpRequest::post(self.url(&format!("/repos/{}/docs", namespace))).json(json!({
                    "title": document.title,
                    "slug": document.slug,
                    "body": document.content,
                    "format": self.body_format(),
                    "public": 1,
                })),
            )
            .await?;

        let doc_id = id_to_string(&doc.id)
            .ok_or_else(|| AdaptorError::InvalidResponse("yuque doc id missing".to_string()))?;
        Ok(format!("{}/{}", namespace, doc_id))
    }

    async fn edit_post(
        &self,
        remote_post_id: &str,
        document: &Document,
    ) -> Result<bool, AdaptorError> {
        let (namespace, doc_id) = split_remote_id(remote_post_id)?;
        let _: YuqueDoc = self
            .call(
                HttpRequest::put(self.url(&format!("/repos/{}/docs/{}", namespace, doc_id))).json(
                    json!({
                        "title": document.title,
                        "slug": document.slug,
                        "body": document.content,
                        "format": self.body_format(),
                    }),
                ),
            )
            .await?;
        Ok(true)
    }

    async fn delete_post(&self, remote_post_id: &str) -> Result<bool, AdaptorError> {
        let (namespace, doc_id) = split_remote_id(remote_post_id)?;
        let _: serde_json::Value = self
            .call(HttpRequest::delete(
                self.url(&format!("/repos/{}/docs/{}", namespace, doc_id)),
            ))
            .await?;
        Ok(true)
    }

    async fn get_post(&self, remote_post_id: &str) -> Result<Document, AdaptorError> {
        let doc = self.doc(remote_post_id).await?;

        let mut document = Document::new(doc.title, doc.body.clone());
        document.content = doc.body;
        document.slug = doc.slug;
        if let Some(book) = doc.book {
            document.categories.push(book.name);
        }
        Ok(document)
    }

    async fn get_preview_url(&self, remote_post_id: &str) -> Result<String, AdaptorError> {
        let doc = self.doc(remote_post_id).await?;
        let (namespace, _) = split_remote_id(remote_post_id)?;
        let namespace = doc
            .book
            .and_then(|b| b.namespace)
            .unwrap_or_else(|| namespace.to_string());
        Ok(format!("/{}/{}", namespace, doc.slug))
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

        // Existing docs stay in their knowledge space
        if let Some(remote_post_id) = publish.remote_post_id() {
            let (namespace, _) = split_remote_id(remote_post_id)?;
            document.categories = vec![namespace.to_string()];
        }
        Ok(document)
    }
}
