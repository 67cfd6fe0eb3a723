//! Page command - prepare the editable document for a platform

use anyhow::{Context, Result};
use blog_bridge_domain::PageMode;
use std::path::PathBuf;

use crate::args::{PageArgs, PageModeArg};
use crate::commands::{App, base_dir, load_document};

pub async fn execute(args: PageArgs, config_path: Option<PathBuf>) -> Result<()> {
    let app = App::open(config_path.as_deref()).await?;
    let loaded = load_document(&args.file).await?;
    let platform_config = app.platform_config(&args.platform)?;
    let orchestrator = app.orchestrator(base_dir(&args.file))?;

    let mode = match args.mode {
        PageModeArg::Add => PageMode::Add,
        PageModeArg::Update => PageMode::Update,
    };

    let page = orchestrator
        .init_page(
            &args.platform,
            &loaded.id,
            mode,
            &platform_config,
            &loaded.document,
        )
        .await
        .with_context(|| format!("Failed to prepare page for {}", args.platform))?;

    if args.json {
        let json = serde_json::to_string_pretty(&page).context("Failed to serialize page")?;
        println!("{}", json);
        return Ok(());
    }

    let merged = &page.merged_document;
    println!("Page for {} on {}", loaded.id, args.platform);
    println!();
    println!("Title:      {}", merged.title);
    println!("Slug:       {}", merged.slug);
    println!("Categories: {}", join_or_dash(&merged.categories));
    println!("Tags:       {}", join_or_dash(&merged.tags));

    if let Some(remote) = &page.remote_document {
        println!();
        println!("Remote title:      {}", remote.title);
        println!("Remote categories: {}", join_or_dash(&remote.categories));
    }
    if let Some(preview) = &page.preview_url {
        println!("Preview:           {}", preview);
    }

    Ok(())
}

fn join_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}
