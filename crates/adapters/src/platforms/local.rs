//! First-party local site target
//!
//! Posts are written as `<documentId>.md` (or `.html`) with a front matter
//! header into the directory given as `api_url`. The remote id is the host
//! document id, so no mapping is needed to find a post again.

use async_trait::async_trait;
use blog_bridge_domain::policy::apply_category_policy;
use blog_bridge_domain::{
    Adaptor, AdaptorError, CategoryInfo, Document, PageType, PlatformConfig, PublishConfig,
    TagInfo, UserBlog,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

use crate::document_fs::{parse_front_matter, render_front_matter};

/// Local site adaptor
pub struct LocalSiteAdaptor {
    output_dir: PathBuf,
    config: PlatformConfig,
    write_lock: Mutex<()>,
}

impl LocalSiteAdaptor {
    pub fn new(config: PlatformConfig) -> Result<Self, AdaptorError> {
        if config.api_url.trim().is_empty() {
            return Err(AdaptorError::Config(
                "local site requires api_url (the output directory)".to_string(),
            ));
        }

        Ok(Self {
            output_dir: PathBuf::from(config.api_url.trim()),
            config,
            write_lock: Mutex::new(()),
        })
    }

    fn extension(&self) -> &'static str {
        match self.config.page_type {
            PageType::Markdown => "md",
            PageType::Html => "html",
        }
    }

    fn post_path(&self, remote_post_id: &str) -> Result<PathBuf, AdaptorError> {
        if remote_post_id.is_empty()
            || remote_post_id.starts_with('.')
            || remote_post_id.contains(['/', '\\'])
        {
            return Err(AdaptorError::Unsupported(format!(
                "'{}' cannot be used as a file name",
                remote_post_id
            )));
        }
        Ok(self
            .output_dir
            .join(format!("{}.{}", remote_post_id, self.extension())))
    }

    async fn write_post(&self, remote_post_id: &str, document: &Document) -> Result<(), AdaptorError> {
        let path = self.post_path(remote_post_id)?;
        let contents = format!(
            "{}{}",
            render_front_matter(document, remote_post_id),
            document.content
        );

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.output_dir).await.map_err(io_error)?;
        fs::write(&path, contents).await.map_err(io_error)?;

        tracing::debug!(path = %path.display(), "Wrote local post");
        Ok(())
    }

    async fn read_posts(&self) -> Result<Vec<Document>, AdaptorError> {
        let mut posts = Vec::new();
        let mut entries = match fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(posts),
            Err(e) => return Err(io_error(e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension()) {
                continue;
            }
            let content = fs::read_to_string(&path).await.map_err(io_error)?;
            let (fm, body) = parse_front_matter(&content);
            let mut document = Document::new(fm.title.unwrap_or_default(), body);
            document.categories = fm.categories;
            document.tags = fm.tags;
            posts.push(document);
        }
        Ok(posts)
    }
}

fn io_error(e: std::io::Error) -> AdaptorError {
    AdaptorError::Platform(format!("local site IO error: {}", e))
}

fn read_error(remote_post_id: &str, e: std::io::Error) -> AdaptorError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AdaptorError::NotFound(format!("local site has no post '{}'", remote_post_id))
    } else {
        io_error(e)
    }
}

#[async_trait]
impl Adaptor for LocalSiteAdaptor {
    fn platform(&self) -> &'static str {
        "local"
    }

    async fn check_auth(&self) -> Result<bool, AdaptorError> {
        fs::create_dir_all(&self.output_dir).await.map_err(io_error)?;
        let metadata = fs::metadata(&self.output_dir).await.map_err(io_error)?;
        Ok(metadata.is_dir() && !metadata.permissions().readonly())
    }

    async fn get_users_blogs(&self) -> Result<Vec<UserBlog>, AdaptorError> {
        Ok(vec![UserBlog {
            blog_id: "local".to_string(),
            blog_name: self.output_dir.display().to_string(),
            url: self.config.home.clone(),
        }])
    }

    async fn get_categories(
        &self,
        keyword: Option<&str>,
    ) -> Result<Vec<CategoryInfo>, AdaptorError> {
        let names: BTreeSet<String> = self
            .read_posts()
            .await?
            .into_iter()
            .flat_map(|post| post.categories)
            .filter(|c| super::matches_keyword(keyword, &[c.as_str()]))
            .collect();

        Ok(names
            .into_iter()
            .map(|name| CategoryInfo {
                category_id: name.clone(),
                description: name.clone(),
                category_name: name,
            })
            .collect())
    }

    async fn get_tags(&self) -> Result<Vec<TagInfo>, AdaptorError> {
        let names: BTreeSet<String> = self
            .read_posts()
            .await?
            .into_iter()
            .flat_map(|post| post.tags)
            .collect();

        Ok(names
            .into_iter()
            .map(|name| TagInfo {
                tag_id: name.clone(),
                name,
            })
            .collect())
    }

    async fn new_post(&self, _document: &Document) -> Result<String, AdaptorError> {
        Err(AdaptorError::Unsupported(
            "local site posts are keyed by the document id; use edit_post".to_string(),
        ))
    }

    async fn edit_post(
        &self,
        remote_post_id: &str,
        document: &Document,
    ) -> Result<bool, AdaptorError> {
        self.write_post(remote_post_id, document).await?;
        Ok(true)
    }

    async fn delete_post(&self, remote_post_id: &str) -> Result<bool, AdaptorError> {
        let path = self.post_path(remote_post_id)?;
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) => Err(read_error(remote_post_id, e)),
        }
    }

    async fn get_post(&self, remote_post_id: &str) -> Result<Document, AdaptorError> {
        let path = self.post_path(remote_post_id)?;
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| read_error(remote_post_id, e))?;
        let (fm, body) = parse_front_matter(&content);

        let mut document = Document::new(fm.title.unwrap_or_default(), body.clone());
        if self.config.page_type == PageType::Html {
            document.markdown = String::new();
            document.html = body.clone();
        }
        document.content = body;
        document.slug = fm.slug.unwrap_or_default();
        document.status = fm.status.unwrap_or_default();
        document.categories = fm.categories;
        document.tags = fm.tags;
        Ok(document)
    }

    async fn get_preview_url(&self, remote_post_id: &str) -> Result<String, AdaptorError> {
        if self.config.preview_url.is_empty() {
            return Ok(format!("/{}.{}", remote_post_id, self.extension()));
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
