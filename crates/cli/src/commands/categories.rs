//! Categories command - list categories or knowledge spaces

use anyhow::{Context, Result};
use blog_bridge_adapters::registry::AdaptorRegistry;
use blog_bridge_adapters::transport::ReqwestTransport;
use blog_bridge_domain::AdaptorFactory;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::args::CategoriesArgs;
use crate::config::AppConfig;

pub async fn execute(args: CategoriesArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let platform_config = config
        .platform(&args.platform)?
        .to_platform_config(&args.platform)?;

    let transport = Arc::new(
        ReqwestTransport::new(Duration::from_secs(config.general.timeout_secs))
            .context("Failed to build HTTP client")?,
    );
    let registry = AdaptorRegistry::new(transport);
    let resolved = registry.resolve(&args.platform, &platform_config)?;

    let categories = resolved
        .adaptor
        .get_categories(args.keyword.as_deref())
        .await
        .with_context(|| format!("Failed to list categories for {}", args.platform))?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&categories).context("Failed to serialize categories")?;
        println!("{}", json);
        return Ok(());
    }

    if categories.is_empty() {
        println!("No categories found.");
        return Ok(());
    }

    println!("Categories on {}", args.platform);
    println!();
    for category in &categories {
        println!("  - {} ({})", category.category_name, category.category_id);
    }

    Ok(())
}
