//! Publish command - publish or update a document on one or more platforms

use anyhow::{Context, Result, bail};
use blog_bridge_domain::PublishResult;
use blog_bridge_domain::usecases::PublishTarget;
use std::path::PathBuf;

use crate::args::PublishArgs;
use crate::commands::{App, base_dir, load_document};

pub async fn execute(args: PublishArgs, config_path: Option<PathBuf>) -> Result<()> {
    let app = App::open(config_path.as_deref()).await?;
    let loaded = load_document(&args.file).await?;

    let keys = if args.all {
        app.config.enabled_platforms()
    } else {
        args.platforms.clone()
    };
    if keys.is_empty() {
        bail!("No platforms selected; pass --platform or enable platforms in the config");
    }

    tracing::info!(
        document_id = %loaded.id,
        title = %loaded.document.title,
        platforms = ?keys,
        "Publishing document"
    );

    // Platforms whose config cannot be built fail individually
    let mut targets = Vec::with_capacity(keys.len());
    let mut results = Vec::with_capacity(keys.len());
    for key in &keys {
        match app.platform_config(key) {
            Ok(config) => targets.push(PublishTarget {
                platform_key: key.clone(),
                config,
            }),
            Err(e) => {
                tracing::error!(platform = %key, error = %e, "Invalid platform configuration");
                results.push(PublishResult::failed(key, format!("{:#}", e)));
            }
        }
    }

    let orchestrator = app.orchestrator(base_dir(&args.file))?;
    results.extend(
        orchestrator
            .publish_to_all(
                &targets,
                &loaded.id,
                &loaded.document,
                app.config.general.max_concurrent,
            )
            .await,
    );
    results.sort_by_key(|r| keys.iter().position(|k| *k == r.platform_key));

    if args.json {
        let json = serde_json::to_string_pretty(&results).context("Failed to serialize results")?;
        println!("{}", json);
    } else {
        print_results(&loaded.id, &results);
    }

    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        bail!("{} of {} platforms failed", failed, results.len());
    }

    Ok(())
}

fn print_results(document_id: &str, results: &[PublishResult]) {
    println!("Publish results for {}", document_id);
    println!();

    for result in results {
        if result.success {
            println!(
                "✓ {}: {} (id {})",
                result.platform_key,
                result.preview_url.as_deref().unwrap_or("-"),
                result.remote_post_id.as_deref().unwrap_or("-")
            );
        } else {
            println!(
                "✗ {}: {}",
                result.platform_key,
                result.error_message.as_deref().unwrap_or("unknown error")
            );
            if let Some(id) = &result.remote_post_id {
                println!("    remote post id: {}", id);
            }
        }
    }
}
