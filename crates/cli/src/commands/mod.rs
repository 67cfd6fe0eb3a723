//! Subcommands and the wiring they share

pub mod categories;
pub mod config;
pub mod delete;
pub mod doctor;
pub mod page;
pub mod publish;
pub mod status;

use anyhow::{Context, Result};
use blog_bridge_adapters::documents::{FsDocumentLoader, LoadedDocument};
use blog_bridge_adapters::mapping::SqliteMappingStore;
use blog_bridge_adapters::preprocess::{NoopImageRehoster, PicgoImageRehoster, PulldownRenderer};
use blog_bridge_adapters::registry::AdaptorRegistry;
use blog_bridge_adapters::transport::ReqwestTransport;
use blog_bridge_domain::slug::TitleSlugGenerator;
use blog_bridge_domain::usecases::PublishOrchestrator;
use blog_bridge_domain::{ImageRehoster, PlatformConfig, Transport};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::args::DocumentSelector;
use crate::config::AppConfig;

pub(crate) type Orchestrator = PublishOrchestrator<
    AdaptorRegistry,
    SqliteMappingStore,
    dyn ImageRehoster,
    PulldownRenderer,
    TitleSlugGenerator,
>;

/// Long-lived collaborators built once per command
pub(crate) struct App {
    pub config: AppConfig,
    pub transport: Arc<dyn Transport>,
    pub registry: Arc<AdaptorRegistry>,
    pub store: Arc<SqliteMappingStore>,
}

impl App {
    pub async fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = AppConfig::load(config_path)?;

        let transport: Arc<dyn Transport> = Arc::new(
            ReqwestTransport::new(Duration::from_secs(config.general.timeout_secs))
                .context("Failed to build HTTP client")?,
        );
        let registry = Arc::new(AdaptorRegistry::new(transport.clone()));
        let store = Arc::new(
            SqliteMappingStore::new(&config.general.state_db_path)
                .await
                .context("Failed to initialize SQLite mapping store")?,
        );

        Ok(Self {
            config,
            transport,
            registry,
            store,
        })
    }

    /// Domain config for a platform key, secrets resolved
    pub fn platform_config(&self, platform_key: &str) -> Result<PlatformConfig> {
        self.config
            .platform(platform_key)?
            .to_platform_config(platform_key)
    }

    /// Domain config for a platform key without resolving secrets
    pub fn offline_platform_config(&self, platform_key: &str) -> Result<PlatformConfig> {
        Ok(self
            .config
            .platform(platform_key)?
            .to_offline_platform_config())
    }

    /// Orchestrator whose image rehoster resolves paths against `base_dir`
    pub fn orchestrator(&self, base_dir: &Path) -> Result<Orchestrator> {
        let rehoster: Arc<dyn ImageRehoster> = if self.config.preprocess.picgo_enabled {
            Arc::new(
                PicgoImageRehoster::new(
                    self.transport.clone(),
                    self.config.preprocess.picgo_url.clone(),
                    base_dir,
                )
                .context("Failed to configure PicGo image rehoster")?,
            )
        } else {
            Arc::new(NoopImageRehoster)
        };

        Ok(PublishOrchestrator::new(
            self.registry.clone(),
            self.store.clone(),
            rehoster,
            Arc::new(PulldownRenderer::new(self.config.preprocess.gfm)),
            Arc::new(TitleSlugGenerator::default()),
        ))
    }
}

pub(crate) async fn load_document(path: &Path) -> Result<LoadedDocument> {
    let loader = FsDocumentLoader::new().context("Failed to initialize document loader")?;
    loader
        .load(path)
        .await
        .with_context(|| format!("Failed to load document: {}", path.display()))
}

/// Document id from `--id` or from the file's front matter
pub(crate) async fn document_id(selector: &DocumentSelector) -> Result<String> {
    if let Some(id) = &selector.id {
        let loader = FsDocumentLoader::new().context("Failed to initialize document loader")?;
        loader.validate_id(id)?;
        return Ok(id.clone());
    }

    match &selector.file {
        Some(path) => Ok(load_document(path).await?.id),
        None => anyhow::bail!("Either --file or --id is required"),
    }
}

/// Folder of a document file, used for relative image paths
pub(crate) fn base_dir(file: &Path) -> &Path {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
