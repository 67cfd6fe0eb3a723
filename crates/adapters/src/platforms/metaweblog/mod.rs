//! MetaWeblog family adaptor (XML-RPC, username/password)

pub mod xmlrpc;

use async_trait::async_trait;
use blog_bridge_domain::policy::apply_category_policy;
use blog_bridge_domain::{
    Adaptor, AdaptorError, CategoryInfo, Credentials, Document, HttpRequest, PageType,
    PlatformConfig, PublishConfig, TagInfo, Transport, UserBlog,
};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::sync::Arc;

use self::xmlrpc::{Value, XmlRpcError, encode_call, parse_response};
use super::{ensure_success, matches_keyword};

/// Server dialects with known quirks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaWeblogFlavor {
    Generic,
    Cnblogs,
    Wordpress,
}

impl MetaWeblogFlavor {
    pub fn name(&self) -> &'static str {
        match self {
            MetaWeblogFlavor::Generic => "metaweblog",
            MetaWeblogFlavor::Cnblogs => "cnblogs",
            MetaWeblogFlavor::Wordpress => "wordpress",
        }
    }

    /// Preview template used when the config leaves it empty
    pub fn default_preview_url(&self) -> &'static str {
        match self {
            MetaWeblogFlavor::Generic => "",
            MetaWeblogFlavor::Cnblogs => "/p/[postid].html",
            MetaWeblogFlavor::Wordpress => "/?p=[postid]",
        }
    }

    pub fn default_page_type(&self) -> PageType {
        match self {
            MetaWeblogFlavor::Generic | MetaWeblogFlavor::Cnblogs => PageType::Markdown,
            MetaWeblogFlavor::Wordpress => PageType::Html,
        }
    }

    fn supports_tags(&self) -> bool {
        matches!(self, MetaWeblogFlavor::Wordpress)
    }
}

/// CNBlogs renders posts as markdown only when this category is present
const CNBLOGS_MARKDOWN_CATEGORY: &str = "[Markdown]";

/// MetaWeblog adaptor
pub struct MetaWeblogAdaptor {
    transport: Arc<dyn Transport>,
    config: PlatformConfig,
    flavor: MetaWeblogFlavor,
    username: String,
    password: SecretString,
}

impl MetaWeblogAdaptor {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: PlatformConfig,
        flavor: MetaWeblogFlavor,
    ) -> Result<Self, AdaptorError> {
        let (username, password) = match &config.credentials {
            Credentials::UsernamePassword { username, password } => {
                (username.clone(), password.clone())
            }
            other => {
                return Err(AdaptorError::Config(format!(
                    "{} requires username and password, got {} credentials",
                    flavor.name(),
                    other.kind()
                )));
            }
        };
        if config.api_url.trim().is_empty() {
            return Err(AdaptorError::Config(format!(
                "{} requires api_url (the XML-RPC endpoint)",
                flavor.name()
            )));
        }

        Ok(Self {
            transport,
            config,
            flavor,
            username,
            password,
        })
    }

    fn blog_id(&self) -> Value {
        Value::string(self.config.blog_id.clone().unwrap_or_default())
    }

    fn username(&self) -> Value {
        Value::string(self.username.clone())
    }

    fn password(&self) -> Value {
        Value::string(self.password.expose_secret())
    }

    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, AdaptorError> {
        tracing::debug!(platform = self.flavor.name(), method, "XML-RPC call");

        let request = HttpRequest::post(&self.config.api_url)
            .text("text/xml; charset=utf-8", encode_call(method, params));
        let response = ensure_success(self.transport.send(request).await?)?;

        parse_response(&response.body).map_err(|e| match e {
            XmlRpcError::Fault { code, message } if code == 401 || code == 403 => {
                AdaptorError::Auth(message)
            }
            XmlRpcError::Fault { code, message } => {
                AdaptorError::Platform(format!("{} fault {}: {}", method, code, message))
            }
            other => AdaptorError::InvalidResponse(format!("{}: {}", method, other)),
        })
    }

    fn post_struct(&self, document: &Document) -> Value {
        let mut categories: Vec<Value> = document
            .categories
            .iter()
            .map(|c| Value::string(c.clone()))
            .collect();
        if self.flavor == MetaWeblogFlavor::Cnblogs
            && self.config.page_type == PageType::Markdown
            && !document
                .categories
                .iter()
                .any(|c| c == CNBLOGS_MARKDOWN_CATEGORY)
        {
            categories.insert(0, Value::string(CNBLOGS_MARKDOWN_CATEGORY));
        }

        let mut post = BTreeMap::new();
        post.insert("title".to_string(), Value::string(document.title.clone()));
        post.insert(
            "description".to_string(),
            Value::string(document.content.clone()),
        );
        post.insert("categories".to_string(), Value::Array(categories));
        post.insert(
            "mt_keywords".to_string(),
            Value::string(document.tags.join(",")),
        );
        post.insert("wp_slug".to_string(), Value::string(document.slug.clone()));
        Value::Struct(post)
    }
}

fn text_member(value: &Value, names: &[&str]) -> String {
    names
        .iter()
        .find_map(|name| value.member(name).and_then(Value::to_text))
        .unwrap_or_default()
}

fn expect_bool(method: &str, value: Value) -> Result<bool, AdaptorError> {
    value.as_bool().ok_or_else(|| {
        AdaptorError::InvalidResponse(format!("{} returned {:?}, expected boolean", method, value))
    })
}

fn expect_array(method: &str, value: &Value) -> Result<Vec<Value>, AdaptorError> {
    value.as_array().map(<[Value]>::to_vec).ok_or_else(|| {
        AdaptorError::InvalidResponse(format!("{} returned {:?}, expected array", method, value))
    })
}

#[async_trait]
impl Adaptor for MetaWeblogAdaptor {
    fn platform(&self) -> &'static str {
        self.flavor.name()
    }

    async fn check_auth(&self) -> Result<bool, AdaptorError> {
        match self.get_users_blogs().await {
            Ok(blogs) => Ok(!blogs.is_empty()),
            Err(AdaptorError::Auth(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_users_blogs(&self) -> Result<Vec<UserBlog>, AdaptorError> {
        let method = "blogger.getUsersBlogs";
        let value = self
            .call(method, &[Value::string(""), self.username(), self.password()])
            .await?;

        Ok(expect_array(method, &value)?
            .iter()
            .map(|blog| UserBlog {
                blog_id: text_member(blog, &["blogid"]),
                blog_name: text_member(blog, &["blogName"]),
                url: text_member(blog, &["url"]),
            })
            .collect())
    }

    async fn get_categories(
        &self,
        keyword: Option<&str>,
    ) -> Result<Vec<CategoryInfo>, AdaptorError> {
        let method = "metaWeblog.getCategories";
        let value = self
            .call(method, &[self.blog_id(), self.username(), self.password()])
            .await?;

        Ok(expect_array(method, &value)?
            .iter()
            .map(|cat| {
                let name = text_member(cat, &["categoryName", "title", "description"]);
                CategoryInfo {
                    category_id: text_member(cat, &["categoryId", "categoryid", "title"]),
                    description: text_member(cat, &["description", "categoryDescription"]),
                    category_name: name,
                }
            })
            .filter(|cat| matches_keyword(keyword, &[cat.category_name.as_str(), cat.category_id.as_str()]))
            .collect())
    }

    async fn get_tags(&self) -> Result<Vec<TagInfo>, AdaptorError> {
        if !self.flavor.supports_tags() {
            return Ok(vec![]);
        }

        let method = "wp.getTags";
        let value = self
            .call(method, &[self.blog_id(), self.username(), self.password()])
            .await?;

        Ok(expect_array(method, &value)?
            .iter()
            .map(|tag| TagInfo {
                tag_id: text_member(tag, &["tag_id"]),
                name: text_member(tag, &["name"]),
            })
            .collect())
    }

    async fn new_post(&self, document: &Document) -> Result<String, AdaptorError> {
        let method = "metaWeblog.newPost";
        let value = self
            .call(
                method,
                &[
                    self.blog_id(),
                    self.username(),
                    self.password(),
                    self.post_struct(document),
                    Value::Bool(true),
                ],
            )
            .await?;

        match value {
            Value::String(id) => Ok(id),
            Value::Int(id) => Ok(id.to_string()),
            other => Err(AdaptorError::InvalidResponse(format!(
                "{} returned {:?}, expected post id",
                method, other
            ))),
        }
    }

    async fn edit_post(
        &self,
        remote_post_id: &str,
        document: &Document,
    ) -> Result<bool, AdaptorError> {
        let method = "metaWeblog.editPost";
        let value = self
            .call(
                method,
                &[
                    Value::string(remote_post_id),
                    self.username(),
                    self.password(),
                    self.post_struct(document),
                    Value::Bool(true),
                ],
            )
            .await?;
        expect_bool(method, value)
    }

    async fn delete_post(&self, remote_post_id: &str) -> Result<bool, AdaptorError> {
        let method = "blogger.deletePost";
        let value = self
            .call(
                method,
                &[
                    Value::string(""),
                    Value::string(remote_post_id),
                    self.username(),
                    self.password(),
                    Value::Bool(true),
                ],
            )
            .await?;
        expect_bool(method, value)
    }

    async fn get_post(&self, remote_post_id: &str) -> Result<Document, AdaptorError> {
        let value = self
            .call(
                "metaWeblog.getPost",
                &[
                    Value::string(remote_post_id),
                    self.username(),
                    self.password(),
                ],
            )
            .await?;

        let body = text_member(&value, &["description"]);
        let mut document = Document::new(text_member(&value, &["title"]), body.clone());
        match self.config.page_type {
            PageType::Markdown => document.markdown = body.clone(),
            PageType::Html => {
                document.markdown = String::new();
                document.html = body.clone();
            }
        }
        document.content = body;
        document.slug = text_member(&value, &["wp_slug"]);
        document.categories = value
            .member("categories")
            .and_then(Value::as_array)
            .map(|cats| {
                cats.iter()
                    .filter_map(Value::to_text)
                    .filter(|c| c != CNBLOGS_MARKDOWN_CATEGORY)
                    .collect()
            })
            .unwrap_or_default();
        document.tags = text_member(&value, &["mt_keywords"])
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Ok(document)
    }

    async fn get_preview_url(&self, remote_post_id: &str) -> Result<String, AdaptorError> {
        if self.config.preview_url.is_empty() {
            let template = self.flavor.default_preview_url();
            return Ok(template.replace("[postid]", remote_post_id));
        }
        Ok(self.config.preview_path(remote_post_id))
    }

    async fn pre_edit_post(
        &self,
        mut document: Document,
        _document_id: &str,
        _publish: &PublishConfig,
    ) -> Result<Document, AdaptorError> {
        apply_category_policy(&mut document, &self.config.categories, None);
        Ok(document)
    }
}
