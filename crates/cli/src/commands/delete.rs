//! Delete command - remove a post from a platform

use anyhow::{Context, Result, bail};
use blog_bridge_domain::DeleteResult;
use std::path::PathBuf;

use crate::args::DeleteArgs;
use crate::commands::{App, document_id};

pub async fn execute(args: DeleteArgs, config_path: Option<PathBuf>) -> Result<()> {
    let app = App::open(config_path.as_deref()).await?;
    let document_id = document_id(&args.document).await?;
    // A forced delete only touches the mapping store, so no secret is needed
    let platform_config = if args.force {
        app.offline_platform_config(&args.platform)?
    } else {
        app.platform_config(&args.platform)?
    };
    let orchestrator = app.orchestrator(std::path::Path::new("."))?;

    let result = if args.force {
        match orchestrator
            .force_delete(&args.platform, &document_id, &platform_config)
            .await
        {
            Ok(()) => DeleteResult {
                platform_key: args.platform.clone(),
                success: true,
                error_message: None,
            },
            Err(e) => DeleteResult {
                platform_key: args.platform.clone(),
                success: false,
                error_message: Some(e.to_string()),
            },
        }
    } else {
        orchestrator
            .delete(&args.platform, &document_id, &platform_config)
            .await
    };

    if args.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        println!("{}", json);
    } else if result.success {
        if args.force {
            println!(
                "✓ {}: local mapping for {} removed",
                result.platform_key, document_id
            );
        } else {
            println!("✓ {}: {} deleted", result.platform_key, document_id);
        }
    }

    if !result.success {
        bail!(
            "{}",
            result
                .error_message
                .unwrap_or_else(|| "Delete failed".to_string())
        );
    }

    Ok(())
}
