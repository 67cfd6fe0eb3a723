//! Doctor command - validate configuration and show status

use anyhow::Result;
use blog_bridge_adapters::mapping::SqliteMappingStore;
use blog_bridge_adapters::registry::AdaptorRegistry;
use blog_bridge_adapters::transport::ReqwestTransport;
use blog_bridge_domain::AdaptorFactory;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::args::DoctorArgs;
use crate::config::{AppConfig, PlatformSettings};

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    state_store: CheckResult,
    platforms: BTreeMap<String, CheckResult>,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        state_store: CheckResult::error("Not checked"),
        platforms: BTreeMap::new(),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.state_store = check_state_store(&config.general.state_db_path).await;

        if config.platforms.is_empty() {
            report.config = CheckResult::warn("Configuration loaded, but no platforms configured");
        }

        let registry = if args.online {
            match ReqwestTransport::new(Duration::from_secs(config.general.timeout_secs)) {
                Ok(transport) => Some(AdaptorRegistry::new(Arc::new(transport))),
                Err(e) => {
                    report.config = CheckResult::error(format!("Failed to build HTTP client: {}", e));
                    None
                }
            }
        } else {
            None
        };

        for (key, settings) in &config.platforms {
            let result = check_platform(key, settings, registry.as_ref()).await;
            report.platforms.insert(key.clone(), result);
        }
    }

    let checks: Vec<&CheckResult> = [&report.config, &report.state_store]
        .into_iter()
        .chain(report.platforms.values())
        .collect();

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_state_store(path: &Path) -> CheckResult {
    if !path.exists() {
        return CheckResult::warn(format!(
            "Mapping store {} does not exist yet; it is created on first use",
            path.display()
        ));
    }

    match SqliteMappingStore::new(path).await {
        Ok(_) => CheckResult::ok(format!("Mapping store: {}", path.display())),
        Err(e) => CheckResult::error(format!("Failed to open mapping store: {}", e)),
    }
}

async fn check_platform(
    key: &str,
    settings: &PlatformSettings,
    registry: Option<&AdaptorRegistry>,
) -> CheckResult {
    if !settings.enabled {
        return CheckResult::ok("Disabled");
    }

    let platform_config = match settings.to_platform_config(key) {
        Ok(c) => c,
        Err(e) => return CheckResult::error(format!("{:#}", e)),
    };

    let kind = match AdaptorRegistry::validate(key, &platform_config) {
        Ok(kind) => kind,
        Err(e) => return CheckResult::error(e.to_string()),
    };

    let details = serde_json::json!({
        "kind": kind.name(),
        "credentials": platform_config.credentials.kind(),
        "secret_env": settings.secret_env(),
        "posid_key": platform_config.posid_key,
        "proxy": platform_config.middleware_url,
    });

    let Some(registry) = registry else {
        return CheckResult::ok(format!("{} configured", kind.name())).with_details(details);
    };

    let resolved = match registry.resolve(key, &platform_config) {
        Ok(r) => r,
        Err(e) => return CheckResult::error(e.to_string()).with_details(details),
    };

    match resolved.adaptor.check_auth().await {
        Ok(true) => {
            CheckResult::ok(format!("{} authenticated", kind.name())).with_details(details)
        }
        Ok(false) => CheckResult::error(format!("{} rejected the credentials", kind.name()))
            .with_details(details),
        Err(e) => CheckResult::warn(format!("{} auth check failed: {}", kind.name(), e))
            .with_details(details),
    }
}

fn print_report(report: &DoctorReport) {
    println!("blog-bridge Doctor Report");
    println!("=========================");
    println!();

    print_check("Config", &report.config);
    print_check("Mapping store", &report.state_store);
    for (key, result) in &report.platforms {
        print_check(&format!("Platform {}", key), result);
    }

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to publish! Try: blog-bridge publish --file post.md --all");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
