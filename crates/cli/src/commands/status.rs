//! Status command - show the stored publish metadata of a document

use anyhow::{Context, Result};
use blog_bridge_adapters::registry::PlatformKind;
use blog_bridge_domain::{MappingStore, PostMeta, RemoteIdPolicy, RemoteMapping};
use serde::Serialize;
use std::path::PathBuf;

use crate::args::StatusArgs;
use crate::commands::{App, document_id};

#[derive(Debug, Serialize)]
struct StatusReport {
    document_id: String,
    platforms: Vec<PlatformStatus>,
    meta: PostMeta,
}

#[derive(Debug, Serialize)]
struct PlatformStatus {
    platform_key: String,
    published: bool,
    remote_post_id: Option<String>,
    /// Set when the platform uses the document id as its remote id
    uses_document_id: bool,
}

pub async fn execute(args: StatusArgs, config_path: Option<PathBuf>) -> Result<()> {
    let app = App::open(config_path.as_deref()).await?;
    let document_id = document_id(&args.document).await?;

    let meta = app
        .store
        .get_meta(&document_id)
        .await
        .context("Failed to read mapping store")?;

    let platforms = app
        .config
        .platforms
        .iter()
        .map(|(key, settings)| {
            let policy = PlatformKind::from_key(key).map(|kind| kind.remote_ids());
            if policy == Some(RemoteIdPolicy::HostDocumentId) {
                return PlatformStatus {
                    platform_key: key.clone(),
                    published: false,
                    remote_post_id: None,
                    uses_document_id: true,
                };
            }

            let mapping = RemoteMapping::from_meta(&meta, settings.posid_key.trim());
            PlatformStatus {
                platform_key: key.clone(),
                published: mapping.is_some(),
                remote_post_id: mapping.map(|m| m.remote_post_id),
                uses_document_id: false,
            }
        })
        .collect();

    let report = StatusReport {
        document_id,
        platforms,
        meta,
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize status")?
        );
        return Ok(());
    }

    println!("Status of {}", report.document_id);
    println!();
    for status in &report.platforms {
        if status.uses_document_id {
            println!("• {}: remote id is the document id", status.platform_key);
        } else if let Some(id) = &status.remote_post_id {
            println!("✓ {}: published (id {})", status.platform_key, id);
        } else {
            println!("✗ {}: not published", status.platform_key);
        }
    }
    if let Some(slug) = report.meta.get(blog_bridge_domain::CUSTOM_SLUG_KEY) {
        println!();
        println!("Slug: {}", slug);
    }

    Ok(())
}
