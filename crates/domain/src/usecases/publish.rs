//! Publish use case - the per-platform publish/update/delete lifecycle

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    model::{
        CUSTOM_SLUG_KEY, DeleteResult, Document, InitPage, PageMode, PageType, PlatformConfig,
        PostMeta, PostStatus, PublishConfig, PublishResult, RemoteMapping,
    },
    ports::{
        Adaptor, AdaptorError, AdaptorFactory, ImageRehoster, MappingError, MappingStore,
        MarkdownRenderer, PreprocessError, RemoteIdPolicy, ResolvedAdaptor, SlugGenerator,
    },
};

/// Phases of a single publish invocation, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPhase {
    Idle,
    ResolvingMapping,
    AssigningAttributes,
    Preprocessing,
    PlatformDispatch,
    PersistingMapping,
    ResolvingPreview,
    Done,
    Failed,
}

/// Per-invocation state passed through the pipeline
struct PublishContext<'a> {
    run_id: Uuid,
    platform_key: &'a str,
    document_id: &'a str,
    config: &'a PlatformConfig,
    /// Working copy, owned by this invocation only
    document: Document,
    phase: PublishPhase,
    remote_post_id: Option<String>,
}

impl<'a> PublishContext<'a> {
    fn new(
        platform_key: &'a str,
        document_id: &'a str,
        config: &'a PlatformConfig,
        document: Document,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            platform_key,
            document_id,
            config,
            document,
            phase: PublishPhase::Idle,
            remote_post_id: None,
        }
    }

    fn advance(&mut self, phase: PublishPhase) {
        tracing::debug!(
            run_id = %self.run_id,
            platform = %self.platform_key,
            from = ?self.phase,
            to = ?phase,
            "Publish phase"
        );
        self.phase = phase;
    }
}

/// Successful publish outcome
struct PublishOutcome {
    remote_post_id: String,
    preview_url: String,
}

/// Orchestrates publishing one document to one platform at a time
pub struct PublishOrchestrator<F, M, I, R, S>
where
    F: AdaptorFactory + ?Sized,
    M: MappingStore + ?Sized,
    I: ImageRehoster + ?Sized,
    R: MarkdownRenderer + ?Sized,
    S: SlugGenerator + ?Sized,
{
    factory: Arc<F>,
    store: Arc<M>,
    rehoster: Arc<I>,
    renderer: Arc<R>,
    slugger: Arc<S>,
}

impl<F, M, I, R, S> PublishOrchestrator<F, M, I, R, S>
where
    F: AdaptorFactory + ?Sized,
    M: MappingStore + ?Sized,
    I: ImageRehoster + ?Sized,
    R: MarkdownRenderer + ?Sized,
    S: SlugGenerator + ?Sized,
{
    pub fn new(
        factory: Arc<F>,
        store: Arc<M>,
        rehoster: Arc<I>,
        renderer: Arc<R>,
        slugger: Arc<S>,
    ) -> Self {
        Self {
            factory,
            store,
            rehoster,
            renderer,
            slugger,
        }
    }

    /// Publish or update `document` on one platform
    ///
    /// The source document is cloned; callers may reuse it for other platforms.
    /// Errors never escape: they are reported through [`PublishResult`].
    pub async fn publish(
        &self,
        platform_key: &str,
        document_id: &str,
        config: &PlatformConfig,
        document: &Document,
    ) -> PublishResult {
        let mut ctx = PublishContext::new(platform_key, document_id, config, document.clone());

        match self.run_publish(&mut ctx).await {
            Ok(outcome) => {
                tracing::info!(
                    run_id = %ctx.run_id,
                    platform = %platform_key,
                    document_id = %document_id,
                    remote_post_id = %outcome.remote_post_id,
                    preview_url = %outcome.preview_url,
                    "Published"
                );
                PublishResult {
                    platform_key: platform_key.to_string(),
                    success: true,
                    remote_post_id: Some(outcome.remote_post_id),
                    preview_url: Some(outcome.preview_url),
                    error_message: None,
                }
            }
            Err(error) => {
                tracing::error!(
                    run_id = %ctx.run_id,
                    platform = %platform_key,
                    document_id = %document_id,
                    phase = ?ctx.phase,
                    error = %error,
                    "Publish failed"
                );
                ctx.advance(PublishPhase::Failed);
                let mut result =
                    PublishResult::failed(platform_key, format!("Publish failed: {}", error));
                result.remote_post_id = ctx.remote_post_id.take();
                result
            }
        }
    }

    async fn run_publish(
        &self,
        ctx: &mut PublishContext<'_>,
    ) -> Result<PublishOutcome, PublishError> {
        ctx.advance(PublishPhase::ResolvingMapping);
        ensure_posid_key(ctx.config)?;
        let resolved = self.resolve(ctx.platform_key, ctx.config)?;
        let meta = self.store.get_meta(ctx.document_id).await?;
        let existing_id = remote_id_for(&resolved, ctx.document_id, &meta, ctx.config);

        tracing::info!(
            run_id = %ctx.run_id,
            platform = %ctx.platform_key,
            document_id = %ctx.document_id,
            is_new = existing_id.is_none(),
            "Resolved mapping state"
        );

        ctx.advance(PublishPhase::AssigningAttributes);
        self.apply_attrs(&mut ctx.document, &meta);

        ctx.advance(PublishPhase::Preprocessing);
        self.preprocess(&mut ctx.document, ctx.document_id).await?;

        let publish_config = PublishConfig {
            platform: ctx.config.clone(),
            meta,
        };
        let document = std::mem::take(&mut ctx.document);
        ctx.document = resolved
            .adaptor
            .pre_edit_post(document, ctx.document_id, &publish_config)
            .await?;
        select_format(&mut ctx.document, ctx.config.page_type);

        ctx.advance(PublishPhase::PlatformDispatch);
        let adaptor = resolved.adaptor.as_ref();
        let (remote_post_id, created) = match existing_id {
            None => {
                let raw_id = adaptor.new_post(&ctx.document).await?;
                (guard_remote_id(&raw_id)?, true)
            }
            Some(remote_post_id) => {
                if !adaptor.edit_post(&remote_post_id, &ctx.document).await? {
                    return Err(PublishError::Rejected {
                        operation: "edit",
                        remote_post_id,
                    });
                }
                (remote_post_id, false)
            }
        };
        ctx.remote_post_id = Some(remote_post_id.clone());

        ctx.advance(PublishPhase::PersistingMapping);
        let mut updates = PostMeta::new();
        if created && resolved.remote_ids == RemoteIdPolicy::Mapped {
            updates.insert(ctx.config.posid_key.clone(), remote_post_id.clone());
        }
        updates.insert(CUSTOM_SLUG_KEY.to_string(), ctx.document.slug.clone());
        self.store
            .merge_meta(ctx.document_id, &updates)
            .await
            .map_err(|source| PublishError::MappingPersist {
                remote_post_id: remote_post_id.clone(),
                source,
            })?;

        ctx.advance(PublishPhase::ResolvingPreview);
        let preview_url = preview_url(adaptor, &remote_post_id, ctx.config).await?;

        ctx.advance(PublishPhase::Done);
        Ok(PublishOutcome {
            remote_post_id,
            preview_url,
        })
    }

    /// Delete the remote post, then forget the mapping
    pub async fn delete(
        &self,
        platform_key: &str,
        document_id: &str,
        config: &PlatformConfig,
    ) -> DeleteResult {
        match self.run_delete(platform_key, document_id, config).await {
            Ok(()) => {
                tracing::info!(
                    platform = %platform_key,
                    document_id = %document_id,
                    "Deleted post and removed mapping"
                );
                DeleteResult {
                    platform_key: platform_key.to_string(),
                    success: true,
                    error_message: None,
                }
            }
            Err(error) => {
                tracing::error!(
                    platform = %platform_key,
                    document_id = %document_id,
                    error = %error,
                    "Delete failed"
                );
                DeleteResult {
                    platform_key: platform_key.to_string(),
                    success: false,
                    error_message: Some(format!("Delete failed: {}", error)),
                }
            }
        }
    }

    async fn run_delete(
        &self,
        platform_key: &str,
        document_id: &str,
        config: &PlatformConfig,
    ) -> Result<(), PublishError> {
        ensure_posid_key(config)?;
        let resolved = self.resolve(platform_key, config)?;
        let meta = self.store.get_meta(document_id).await?;
        let remote_post_id = remote_id_for(&resolved, document_id, &meta, config)
            .ok_or_else(|| PublishError::not_published(platform_key, document_id))?;

        let deleted = resolved
            .adaptor
            .delete_post(&remote_post_id)
            .await
            .map_err(|e| host_not_found(e, &resolved, platform_key, document_id))?;
        if !deleted {
            return Err(PublishError::Rejected {
                operation: "delete",
                remote_post_id,
            });
        }

        self.store
            .remove_keys(document_id, &[config.posid_key.as_str(), CUSTOM_SLUG_KEY])
            .await?;
        Ok(())
    }

    /// Forget the mapping without calling the platform
    ///
    /// Idempotent. The slug is kept because other platforms share it.
    pub async fn force_delete(
        &self,
        platform_key: &str,
        document_id: &str,
        config: &PlatformConfig,
    ) -> Result<(), PublishError> {
        ensure_posid_key(config)?;
        self.store
            .remove_keys(document_id, &[config.posid_key.as_str()])
            .await?;

        tracing::info!(
            platform = %platform_key,
            document_id = %document_id,
            "Mapping forcibly removed"
        );
        Ok(())
    }

    /// Prepare the editable document before a publish
    ///
    /// In update mode the remote post is fetched, but the source document stays
    /// the editable base.
    pub async fn init_page(
        &self,
        platform_key: &str,
        document_id: &str,
        mode: PageMode,
        config: &PlatformConfig,
        source: &Document,
    ) -> Result<InitPage, PublishError> {
        ensure_posid_key(config)?;
        let resolved = self.resolve(platform_key, config)?;
        let meta = self.store.get_meta(document_id).await?;

        let mut merged = source.clone();
        let (remote_document, preview) = match mode {
            PageMode::Add => {
                tracing::info!(platform = %platform_key, "Add mode, using source document");
                (None, None)
            }
            PageMode::Update => {
                let remote_post_id = remote_id_for(&resolved, document_id, &meta, config)
                    .ok_or_else(|| PublishError::not_published(platform_key, document_id))?;

                tracing::info!(
                    platform = %platform_key,
                    remote_post_id = %remote_post_id,
                    "Reading post from remote platform"
                );
                let adaptor = resolved.adaptor.as_ref();
                let remote = adaptor
                    .get_post(&remote_post_id)
                    .await
                    .map_err(|e| host_not_found(e, &resolved, platform_key, document_id))?;
                let preview = preview_url(adaptor, &remote_post_id, config).await?;
                (Some(remote), Some(preview))
            }
        };

        self.apply_attrs(&mut merged, &meta);

        Ok(InitPage {
            source_document: source.clone(),
            remote_document,
            merged_document: merged,
            preview_url: preview,
        })
    }

    /// Assign slug and status from the stored metadata
    pub async fn assign_attrs(
        &self,
        document: &mut Document,
        document_id: &str,
    ) -> Result<(), PublishError> {
        let meta = self.store.get_meta(document_id).await?;
        self.apply_attrs(document, &meta);
        Ok(())
    }

    fn apply_attrs(&self, document: &mut Document, meta: &PostMeta) {
        let existing = meta
            .get(CUSTOM_SLUG_KEY)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .or_else(|| Some(document.slug.trim().to_string()).filter(|s| !s.is_empty()));

        match existing {
            Some(slug) => {
                tracing::debug!(slug = %slug, "Using existing slug");
                document.slug = slug;
            }
            None => {
                document.slug = self.slugger.slug_for(&document.title);
                tracing::debug!(slug = %document.slug, "Generated new slug");
            }
        }

        document.status = PostStatus::Published;
    }

    async fn preprocess(
        &self,
        document: &mut Document,
        document_id: &str,
    ) -> Result<(), PublishError> {
        document.markdown = self
            .rehoster
            .rehost_images(document_id, &document.markdown)
            .await?;
        document.html = self.renderer.render_to_html(&document.markdown);
        Ok(())
    }

    fn resolve(
        &self,
        platform_key: &str,
        config: &PlatformConfig,
    ) -> Result<ResolvedAdaptor, PublishError> {
        Ok(self.factory.resolve(platform_key, config)?)
    }
}

/// Remote id of a document on the resolved platform
///
/// First-party targets use the host document id; everything else consults the
/// mapping store.
fn remote_id_for(
    resolved: &ResolvedAdaptor,
    document_id: &str,
    meta: &PostMeta,
    config: &PlatformConfig,
) -> Option<String> {
    match resolved.remote_ids {
        RemoteIdPolicy::HostDocumentId => Some(document_id.to_string()),
        RemoteIdPolicy::Mapped => {
            RemoteMapping::from_meta(meta, &config.posid_key).map(|m| m.remote_post_id)
        }
    }
}

fn ensure_posid_key(config: &PlatformConfig) -> Result<(), PublishError> {
    if config.posid_key.trim().is_empty() {
        return Err(PublishError::Configuration(
            "posid_key must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn select_format(document: &mut Document, page_type: PageType) {
    document.content = match page_type {
        PageType::Markdown => document.markdown.clone(),
        PageType::Html => document.html.clone(),
    };
}

/// Reject ids that would corrupt the mapping store
fn guard_remote_id(raw: &str) -> Result<String, PublishError> {
    let id = raw.trim();
    let unusable = id.is_empty()
        || matches!(id, "null" | "undefined" | "false" | "NaN")
        || id.chars().any(|c| c.is_whitespace() || c.is_control());

    if unusable {
        return Err(PublishError::MappingCorruption(format!(
            "platform returned unusable post id {:?}",
            raw
        )));
    }
    Ok(id.to_string())
}

async fn preview_url<A: Adaptor + ?Sized>(
    adaptor: &A,
    remote_post_id: &str,
    config: &PlatformConfig,
) -> Result<String, PublishError> {
    let preview = adaptor.get_preview_url(remote_post_id).await?;
    Ok(normalize_preview_url(&preview, &config.home))
}

/// Prefix relative preview paths with the platform home URL
pub fn normalize_preview_url(preview: &str, home: &str) -> String {
    let lowered = preview.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return preview.to_string();
    }

    let home = home.trim_end_matches('/');
    if preview.is_empty() {
        return home.to_string();
    }
    if preview.starts_with('/') {
        format!("{}{}", home, preview)
    } else {
        format!("{}/{}", home, preview)
    }
}

/// Errors from the publish use case
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Document {document_id} is not published on {platform_key}; publish it first")]
    NotPublished {
        platform_key: String,
        document_id: String,
    },
    #[error(transparent)]
    Adaptor(AdaptorError),
    #[error("Platform rejected {operation} of post {remote_post_id}")]
    Rejected {
        operation: &'static str,
        remote_post_id: String,
    },
    #[error("Refusing to record post id: {0}")]
    MappingCorruption(String),
    #[error("Mapping store error: {0}")]
    Mapping(#[from] MappingError),
    #[error(
        "Post {remote_post_id} was accepted by the platform but the local mapping could not be saved: {source}"
    )]
    MappingPersist {
        remote_post_id: String,
        source: MappingError,
    },
    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
}

impl PublishError {
    fn not_published(platform_key: &str, document_id: &str) -> Self {
        Self::NotPublished {
            platform_key: platform_key.to_string(),
            document_id: document_id.to_string(),
        }
    }

    /// Whether re-running the same invocation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            PublishError::Adaptor(AdaptorError::Transport(_)) => true,
            PublishError::Adaptor(AdaptorError::Http { status, .. }) => *status >= 500,
            PublishError::Preprocess(PreprocessError::Upload(_)) => true,
            _ => false,
        }
    }
}

/// A missing post on a platform keyed by the document id means it was never published
fn host_not_found(
    error: AdaptorError,
    resolved: &ResolvedAdaptor,
    platform_key: &str,
    document_id: &str,
) -> PublishError {
    match error {
        AdaptorError::NotFound(_) if resolved.remote_ids == RemoteIdPolicy::HostDocumentId => {
            PublishError::not_published(platform_key, document_id)
        }
        other => other.into(),
    }
}

impl From<AdaptorError> for PublishError {
    fn from(error: AdaptorError) -> Self {
        match error {
            AdaptorError::Config(message) => PublishError::Configuration(message),
            other => PublishError::Adaptor(other),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{CategoryInfo, TagInfo, UserBlog};
    use crate::ports::TransportError;
    use crate::slug::TitleSlugGenerator;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct FakeAdaptor {
        pub calls: Mutex<Vec<String>>,
        pub sent: Mutex<Vec<Document>>,
        pub new_post_id: Option<String>,
        pub edit_ok: bool,
        pub delete_ok: bool,
        pub preview: String,
        pub reject_pre_edit: bool,
        pub missing_posts: bool,
    }

    impl FakeAdaptor {
        pub(crate) fn ok() -> Self {
            Self {
                new_post_id: Some("123".to_string()),
                edit_ok: true,
                delete_ok: true,
                preview: "/p/[postid].html".to_string(),
                ..Default::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl Adaptor for FakeAdaptor {
        fn platform(&self) -> &'static str {
            "fake"
        }

        async fn check_auth(&self) -> Result<bool, AdaptorError> {
            Ok(true)
        }

        async fn get_users_blogs(&self) -> Result<Vec<UserBlog>, AdaptorError> {
            Ok(vec![])
        }

        async fn get_categories(
            &self,
            _keyword: Option<&str>,
        ) -> Result<Vec<CategoryInfo>, AdaptorError> {
            Ok(vec![])
        }

        async fn get_tags(&self) -> Result<Vec<TagInfo>, AdaptorError> {
            Ok(vec![])
        }

        async fn new_post(&self, document: &Document) -> Result<String, AdaptorError> {
            self.record("new_post".to_string());
            self.sent.lock().unwrap().push(document.clone());
            self.new_post_id.clone().ok_or_else(|| {
                AdaptorError::Transport(TransportError::Network("connection reset".to_string()))
            })
        }

        async fn edit_post(
            &self,
            remote_post_id: &str,
            document: &Document,
        ) -> Result<bool, AdaptorError> {
            self.record(format!("edit_post:{}", remote_post_id));
            self.sent.lock().unwrap().push(document.clone());
            Ok(self.edit_ok)
        }

        async fn delete_post(&self, remote_post_id: &str) -> Result<bool, AdaptorError> {
            self.record(format!("delete_post:{}", remote_post_id));
            if self.missing_posts {
                return Err(AdaptorError::NotFound(remote_post_id.to_string()));
            }
            Ok(self.delete_ok)
        }

        async fn get_post(&self, remote_post_id: &str) -> Result<Document, AdaptorError> {
            self.record(format!("get_post:{}", remote_post_id));
            if self.missing_posts {
                return Err(AdaptorError::NotFound(remote_post_id.to_string()));
            }
            Ok(Document::new("Remote title", "remote body"))
        }

        async fn get_preview_url(&self, remote_post_id: &str) -> Result<String, AdaptorError> {
            Ok(self.preview.replace("[postid]", remote_post_id))
        }

        async fn pre_edit_post(
            &self,
            mut document: Document,
            _document_id: &str,
            _publish: &PublishConfig,
        ) -> Result<Document, AdaptorError> {
            self.record("pre_edit_post".to_string());
            if self.reject_pre_edit {
                return Err(AdaptorError::Unsupported(
                    "category cannot change".to_string(),
                ));
            }
            document.tags.push("pre-edited".to_string());
            Ok(document)
        }
    }

    pub(crate) struct FakeFactory {
        pub adaptor: Arc<FakeAdaptor>,
        pub policy: RemoteIdPolicy,
    }

    impl AdaptorFactory for FakeFactory {
        fn resolve(
            &self,
            _platform_key: &str,
            _config: &PlatformConfig,
        ) -> Result<ResolvedAdaptor, AdaptorError> {
            Ok(ResolvedAdaptor {
                adaptor: self.adaptor.clone(),
                remote_ids: self.policy,
            })
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub entries: Mutex<HashMap<String, PostMeta>>,
        pub fail_writes: bool,
    }

    impl FakeStore {
        pub(crate) fn meta(&self, document_id: &str) -> PostMeta {
            self.entries
                .lock()
                .unwrap()
                .get(document_id)
                .cloned()
                .unwrap_or_default()
        }

        pub(crate) fn seed(&self, document_id: &str, pairs: &[(&str, &str)]) {
            let meta = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            self.entries
                .lock()
                .unwrap()
                .insert(document_id.to_string(), meta);
        }
    }

    #[async_trait]
    impl MappingStore for FakeStore {
        async fn get_meta(&self, document_id: &str) -> Result<PostMeta, MappingError> {
            Ok(self.meta(document_id))
        }

        async fn merge_meta(
            &self,
            document_id: &str,
            updates: &PostMeta,
        ) -> Result<(), MappingError> {
            if self.fail_writes {
                return Err(MappingError::Database("disk full".to_string()));
            }
            let mut entries = self.entries.lock().unwrap();
            let meta = entries.entry(document_id.to_string()).or_default();
            meta.extend(updates.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(())
        }

        async fn remove_keys(&self, document_id: &str, keys: &[&str]) -> Result<(), MappingError> {
            if self.fail_writes {
                return Err(MappingError::Database("disk full".to_string()));
            }
            if let Some(meta) = self.entries.lock().unwrap().get_mut(document_id) {
                for key in keys {
                    meta.remove(*key);
                }
            }
            Ok(())
        }
    }

    pub(crate) struct FakeRehoster;

    #[async_trait]
    impl ImageRehoster for FakeRehoster {
        async fn rehost_images(
            &self,
            _document_id: &str,
            markdown: &str,
        ) -> Result<String, PreprocessError> {
            Ok(markdown.replace("](assets/", "](https://img.example.com/"))
        }
    }

    pub(crate) struct FakeRenderer;

    impl MarkdownRenderer for FakeRenderer {
        fn render_to_html(&self, markdown: &str) -> String {
            format!("<p>{}</p>", markdown)
        }
    }

    pub(crate) type TestOrchestrator =
        PublishOrchestrator<FakeFactory, FakeStore, FakeRehoster, FakeRenderer, TitleSlugGenerator>;

    pub(crate) fn orchestrator(
        adaptor: Arc<FakeAdaptor>,
        policy: RemoteIdPolicy,
        store: Arc<FakeStore>,
    ) -> TestOrchestrator {
        PublishOrchestrator::new(
            Arc::new(FakeFactory { adaptor, policy }),
            store,
            Arc::new(FakeRehoster),
            Arc::new(FakeRenderer),
            Arc::new(TitleSlugGenerator::default()),
        )
    }

    pub(crate) fn config() -> PlatformConfig {
        PlatformConfig {
            home: "https://example.com".to_string(),
            posid_key: "cnblogs-post-id".to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn document() -> Document {
        Document::new("Hello World", "Body ![img](assets/a.png)")
    }

    #[tokio::test]
    async fn test_first_publish_creates_post_and_mapping() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(adaptor.clone(), RemoteIdPolicy::Mapped, store.clone());

        let result = orchestrator
            .publish("cnblogs", "doc-1", &config(), &document())
            .await;

        assert!(result.success, "{:?}", result.error_message);
        assert_eq!(result.remote_post_id.as_deref(), Some("123"));
        assert_eq!(
            result.preview_url.as_deref(),
            Some("https://example.com/p/123.html")
        );
        assert_eq!(adaptor.calls(), vec!["pre_edit_post", "new_post"]);

        let meta = store.meta("doc-1");
        assert_eq!(meta.get("cnblogs-post-id").map(String::as_str), Some("123"));
        assert_eq!(
            meta.get(CUSTOM_SLUG_KEY).map(String::as_str),
            Some("hello-world")
        );
    }

    #[tokio::test]
    async fn test_republish_takes_edit_path() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(adaptor.clone(), RemoteIdPolicy::Mapped, store.clone());

        let first = orchestrator
            .publish("cnblogs", "doc-1", &config(), &document())
            .await;
        let second = orchestrator
            .publish("cnblogs", "doc-1", &config(), &document())
            .await;

        assert!(first.success && second.success);
        assert_eq!(
            adaptor.calls(),
            vec![
                "pre_edit_post",
                "new_post",
                "pre_edit_post",
                "edit_post:123"
            ]
        );
        assert_eq!(second.remote_post_id.as_deref(), Some("123"));
    }

    #[tokio::test]
    async fn test_failed_new_post_leaves_mapping_untouched() {
        let adaptor = Arc::new(FakeAdaptor {
            new_post_id: None,
            ..FakeAdaptor::ok()
        });
        let store = Arc::new(FakeStore::default());
        store.seed("doc-1", &[("yuque-post-id", "ns/9")]);
        let before = store.meta("doc-1");
        let orchestrator = orchestrator(adaptor, RemoteIdPolicy::Mapped, store.clone());

        let result = orchestrator
            .publish("cnblogs", "doc-1", &config(), &document())
            .await;

        assert!(!result.success);
        assert!(
            result
                .error_message
                .as_deref()
                .unwrap()
                .contains("connection reset")
        );
        assert_eq!(store.meta("doc-1"), before);
    }

    #[tokio::test]
    async fn test_unusable_post_id_is_not_persisted() {
        let adaptor = Arc::new(FakeAdaptor {
            new_post_id: Some("  ".to_string()),
            ..FakeAdaptor::ok()
        });
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(adaptor, RemoteIdPolicy::Mapped, store.clone());

        let result = orchestrator
            .publish("cnblogs", "doc-1", &config(), &document())
            .await;

        assert!(!result.success);
        assert!(store.meta("doc-1").is_empty());
    }

    #[tokio::test]
    async fn test_empty_posid_key_is_configuration_error() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(adaptor.clone(), RemoteIdPolicy::Mapped, store);
        let config = PlatformConfig {
            posid_key: String::new(),
            ..config()
        };

        let result = orchestrator
            .publish("cnblogs", "doc-1", &config, &document())
            .await;

        assert!(!result.success);
        assert!(
            result
                .error_message
                .unwrap()
                .contains("Configuration error")
        );
        assert!(adaptor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_preprocessing_and_format_selection() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(adaptor.clone(), RemoteIdPolicy::Mapped, store);
        let config = PlatformConfig {
            page_type: PageType::Html,
            ..config()
        };
        let source = document();

        orchestrator
            .publish("csdn", "doc-1", &config, &source)
            .await;

        let sent = adaptor.sent.lock().unwrap()[0].clone();
        assert_eq!(
            sent.markdown,
            "Body ![img](https://img.example.com/a.png)"
        );
        assert_eq!(sent.content, sent.html);
        assert!(sent.content.starts_with("<p>"));
        assert_eq!(sent.status, PostStatus::Published);
        assert_eq!(sent.tags, vec!["pre-edited"]);
        // Source stays untouched
        assert_eq!(source.markdown, "Body ![img](assets/a.png)");
        assert!(source.slug.is_empty());
    }

    #[tokio::test]
    async fn test_pre_edit_rejection_aborts_before_dispatch() {
        let adaptor = Arc::new(FakeAdaptor {
            reject_pre_edit: true,
            ..FakeAdaptor::ok()
        });
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(adaptor.clone(), RemoteIdPolicy::Mapped, store.clone());

        let result = orchestrator
            .publish("csdn", "doc-1", &config(), &document())
            .await;

        assert!(!result.success);
        assert_eq!(adaptor.calls(), vec!["pre_edit_post"]);
        assert!(store.meta("doc-1").is_empty());
    }

    #[tokio::test]
    async fn test_mapping_persist_failure_reports_remote_id() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore {
            fail_writes: true,
            ..Default::default()
        });
        let orchestrator = orchestrator(adaptor, RemoteIdPolicy::Mapped, store);

        let result = orchestrator
            .publish("cnblogs", "doc-1", &config(), &document())
            .await;

        assert!(!result.success);
        assert_eq!(result.remote_post_id.as_deref(), Some("123"));
        assert!(result.error_message.unwrap().contains("accepted by the platform"));
    }

    #[tokio::test]
    async fn test_rejected_edit_is_a_failure() {
        let adaptor = Arc::new(FakeAdaptor {
            edit_ok: false,
            ..FakeAdaptor::ok()
        });
        let store = Arc::new(FakeStore::default());
        store.seed("doc-1", &[("cnblogs-post-id", "77"), (CUSTOM_SLUG_KEY, "old")]);
        let orchestrator = orchestrator(adaptor, RemoteIdPolicy::Mapped, store.clone());

        let result = orchestrator
            .publish("cnblogs", "doc-1", &config(), &document())
            .await;

        assert!(!result.success);
        assert_eq!(
            store.meta("doc-1").get(CUSTOM_SLUG_KEY).map(String::as_str),
            Some("old")
        );
    }

    #[tokio::test]
    async fn test_host_document_id_policy_always_edits() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore::default());
        let orchestrator =
            orchestrator(adaptor.clone(), RemoteIdPolicy::HostDocumentId, store.clone());

        let result = orchestrator
            .publish("local", "doc-1", &config(), &document())
            .await;

        assert!(result.success);
        assert_eq!(adaptor.calls(), vec!["pre_edit_post", "edit_post:doc-1"]);
        assert!(!store.meta("doc-1").contains_key("cnblogs-post-id"));
    }

    #[tokio::test]
    async fn test_slug_reuse_from_mapping() {
        let store = Arc::new(FakeStore::default());
        store.seed("doc-1", &[(CUSTOM_SLUG_KEY, "foo")]);
        let orchestrator =
            orchestrator(Arc::new(FakeAdaptor::ok()), RemoteIdPolicy::Mapped, store);

        let mut doc = document();
        orchestrator.assign_attrs(&mut doc, "doc-1").await.unwrap();

        assert_eq!(doc.slug, "foo");
        assert_eq!(doc.status, PostStatus::Published);
    }

    #[tokio::test]
    async fn test_slug_generated_when_missing() {
        let store = Arc::new(FakeStore::default());
        let orchestrator =
            orchestrator(Arc::new(FakeAdaptor::ok()), RemoteIdPolicy::Mapped, store);

        let mut first = document();
        let mut second = document();
        orchestrator.assign_attrs(&mut first, "doc-1").await.unwrap();
        orchestrator.assign_attrs(&mut second, "doc-1").await.unwrap();

        assert!(!first.slug.is_empty());
        assert_eq!(first.slug, second.slug);
    }

    #[tokio::test]
    async fn test_delete_without_mapping_is_not_published() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(adaptor.clone(), RemoteIdPolicy::Mapped, store);

        let result = orchestrator.delete("cnblogs", "doc-1", &config()).await;

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("publish it first"));
        assert!(adaptor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unpublished_host_document_is_not_published() {
        let adaptor = Arc::new(FakeAdaptor {
            missing_posts: true,
            ..FakeAdaptor::ok()
        });
        let store = Arc::new(FakeStore::default());
        let orchestrator =
            orchestrator(adaptor.clone(), RemoteIdPolicy::HostDocumentId, store);

        let result = orchestrator
            .delete("local", "never-published", &config())
            .await;

        assert!(!result.success);
        let message = result.error_message.unwrap();
        assert!(message.contains("publish it first"), "{message}");
        assert!(!message.contains("rejected"));
        assert_eq!(adaptor.calls(), vec!["delete_post:never-published"]);
    }

    #[tokio::test]
    async fn test_missing_mapped_post_stays_an_adaptor_error() {
        let adaptor = Arc::new(FakeAdaptor {
            missing_posts: true,
            ..FakeAdaptor::ok()
        });
        let store = Arc::new(FakeStore::default());
        store.seed("doc-1", &[("cnblogs-post-id", "77")]);
        let orchestrator = orchestrator(adaptor, RemoteIdPolicy::Mapped, store.clone());

        let result = orchestrator.delete("cnblogs", "doc-1", &config()).await;

        assert!(!result.success);
        assert!(!result.error_message.unwrap().contains("publish it first"));
        assert!(store.meta("doc-1").contains_key("cnblogs-post-id"));
    }

    #[tokio::test]
    async fn test_delete_removes_mapping_on_success() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore::default());
        store.seed(
            "doc-1",
            &[
                ("cnblogs-post-id", "77"),
                (CUSTOM_SLUG_KEY, "foo"),
                ("yuque-post-id", "ns/9"),
            ],
        );
        let orchestrator = orchestrator(adaptor.clone(), RemoteIdPolicy::Mapped, store.clone());

        let result = orchestrator.delete("cnblogs", "doc-1", &config()).await;

        assert!(result.success);
        assert_eq!(adaptor.calls(), vec!["delete_post:77"]);
        let meta = store.meta("doc-1");
        assert!(!meta.contains_key("cnblogs-post-id"));
        assert!(!meta.contains_key(CUSTOM_SLUG_KEY));
        assert!(meta.contains_key("yuque-post-id"));
    }

    #[tokio::test]
    async fn test_declined_delete_keeps_mapping() {
        let adaptor = Arc::new(FakeAdaptor {
            delete_ok: false,
            ..FakeAdaptor::ok()
        });
        let store = Arc::new(FakeStore::default());
        store.seed("doc-1", &[("cnblogs-post-id", "77")]);
        let orchestrator = orchestrator(adaptor, RemoteIdPolicy::Mapped, store.clone());

        let result = orchestrator.delete("cnblogs", "doc-1", &config()).await;

        assert!(!result.success);
        assert!(store.meta("doc-1").contains_key("cnblogs-post-id"));
    }

    #[tokio::test]
    async fn test_force_delete_without_mapping_succeeds() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(adaptor.clone(), RemoteIdPolicy::Mapped, store.clone());

        orchestrator
            .force_delete("cnblogs", "doc-1", &config())
            .await
            .unwrap();
        orchestrator
            .force_delete("cnblogs", "doc-1", &config())
            .await
            .unwrap();

        assert!(store.meta("doc-1").is_empty());
        assert!(adaptor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_force_delete_keeps_shared_slug() {
        let store = Arc::new(FakeStore::default());
        store.seed("doc-1", &[("cnblogs-post-id", "77"), (CUSTOM_SLUG_KEY, "foo")]);
        let orchestrator =
            orchestrator(Arc::new(FakeAdaptor::ok()), RemoteIdPolicy::Mapped, store.clone());

        orchestrator
            .force_delete("cnblogs", "doc-1", &config())
            .await
            .unwrap();

        let meta = store.meta("doc-1");
        assert!(!meta.contains_key("cnblogs-post-id"));
        assert_eq!(meta.get(CUSTOM_SLUG_KEY).map(String::as_str), Some("foo"));
    }

    #[tokio::test]
    async fn test_init_page_add_returns_source() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(adaptor.clone(), RemoteIdPolicy::Mapped, store);

        let page = orchestrator
            .init_page("cnblogs", "doc-1", PageMode::Add, &config(), &document())
            .await
            .unwrap();

        assert!(page.remote_document.is_none());
        assert!(page.preview_url.is_none());
        assert_eq!(page.merged_document.title, "Hello World");
        assert_eq!(page.merged_document.slug, "hello-world");
        assert!(adaptor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_init_page_update_fetches_remote() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore::default());
        store.seed("doc-1", &[("cnblogs-post-id", "77")]);
        let orchestrator = orchestrator(adaptor.clone(), RemoteIdPolicy::Mapped, store);

        let page = orchestrator
            .init_page("cnblogs", "doc-1", PageMode::Update, &config(), &document())
            .await
            .unwrap();

        assert_eq!(page.remote_document.unwrap().title, "Remote title");
        assert_eq!(page.merged_document.title, "Hello World");
        assert_eq!(
            page.preview_url.as_deref(),
            Some("https://example.com/p/77.html")
        );
    }

    #[tokio::test]
    async fn test_init_page_update_requires_mapping() {
        let store = Arc::new(FakeStore::default());
        let orchestrator =
            orchestrator(Arc::new(FakeAdaptor::ok()), RemoteIdPolicy::Mapped, store);

        let result = orchestrator
            .init_page("cnblogs", "doc-1", PageMode::Update, &config(), &document())
            .await;

        assert!(matches!(result, Err(PublishError::NotPublished { .. })));
    }

    #[tokio::test]
    async fn test_init_page_update_of_missing_host_document() {
        let adaptor = Arc::new(FakeAdaptor {
            missing_posts: true,
            ..FakeAdaptor::ok()
        });
        let orchestrator = orchestrator(
            adaptor,
            RemoteIdPolicy::HostDocumentId,
            Arc::new(FakeStore::default()),
        );

        let result = orchestrator
            .init_page("local", "doc-1", PageMode::Update, &config(), &document())
            .await;

        assert!(matches!(result, Err(PublishError::NotPublished { .. })));
    }

    #[test]
    fn test_preview_url_normalization() {
        assert_eq!(
            normalize_preview_url("/p/123.html", "https://example.com"),
            "https://example.com/p/123.html"
        );
        assert_eq!(
            normalize_preview_url("https://other.com/x", "https://example.com"),
            "https://other.com/x"
        );
        assert_eq!(
            normalize_preview_url("user/article/details/1", "https://blog.csdn.net/"),
            "https://blog.csdn.net/user/article/details/1"
        );
    }

    #[test]
    fn test_retryable_classification() {
        let transport = PublishError::Adaptor(AdaptorError::Transport(TransportError::Timeout));
        let not_published = PublishError::not_published("cnblogs", "doc-1");

        assert!(transport.is_retryable());
        assert!(!not_published.is_retryable());
    }
}
