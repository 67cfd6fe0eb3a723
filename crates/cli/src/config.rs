//! Configuration loading and management

use anyhow::{Context, Result, bail};
use blog_bridge_domain::{
    CategoryCapability, CategoryType, Credentials, KnowledgeSpace, PageType, PlatformConfig,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub preprocess: PreprocessConfig,

    /// Publishing targets keyed by platform key (`cnblogs`, `yuque-notes`, ...)
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_db_path")]
    pub state_db_path: PathBuf,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Render with GitHub-flavoured extensions
    #[serde(default = "default_true")]
    pub gfm: bool,

    /// Upload local images through PicGo before publishing
    #[serde(default)]
    pub picgo_enabled: bool,

    #[serde(default = "default_picgo_url")]
    pub picgo_url: String,
}

/// One platform target as written in the config file
///
/// Secrets are never stored here; only the names of the environment
/// variables holding them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub home: String,

    #[serde(default)]
    pub api_url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password_env: Option<String>,

    #[serde(default)]
    pub token_env: Option<String>,

    #[serde(default)]
    pub cookie_env: Option<String>,

    #[serde(default)]
    pub posid_key: String,

    #[serde(default)]
    pub page_type: PageType,

    #[serde(default)]
    pub blog_id: Option<String>,

    #[serde(default)]
    pub preview_url: String,

    #[serde(default)]
    pub middleware_url: Option<String>,

    #[serde(default)]
    pub force_proxy: bool,

    #[serde(default = "default_true")]
    pub categories_enabled: bool,

    /// `single` or `multi`; absent when the platform has plain categories
    #[serde(default)]
    pub knowledge_space: Option<CategoryType>,

    #[serde(default = "default_true")]
    pub allow_category_change: bool,
}

// Default value functions
fn default_state_db_path() -> PathBuf {
    PathBuf::from("./blog-bridge.sqlite")
}

fn default_max_concurrent() -> usize {
    4
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_picgo_url() -> String {
    blog_bridge_adapters::preprocess::DEFAULT_PICGO_URL.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_db_path: default_state_db_path(),
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            gfm: true,
            picgo_enabled: false,
            picgo_url: default_picgo_url(),
        }
    }
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            home: String::new(),
            api_url: String::new(),
            username: None,
            password_env: None,
            token_env: None,
            cookie_env: None,
            posid_key: String::new(),
            page_type: PageType::default(),
            blog_id: None,
            preview_url: String::new(),
            middleware_url: None,
            force_proxy: false,
            categories_enabled: true,
            knowledge_space: None,
            allow_category_change: true,
        }
    }
}

impl PlatformSettings {
    /// Resolve secrets from the environment and build the domain config
    pub fn to_platform_config(&self, platform_key: &str) -> Result<PlatformConfig> {
        let credentials = self.credentials(platform_key)?;
        Ok(self.build_platform_config(credentials))
    }

    /// Domain config without credentials, for operations that never reach the platform
    pub fn to_offline_platform_config(&self) -> PlatformConfig {
        self.build_platform_config(Credentials::None)
    }

    fn build_platform_config(&self, credentials: Credentials) -> PlatformConfig {
        let knowledge_space = self.knowledge_space.map(|kind| KnowledgeSpace {
            kind,
            allow_change: self.allow_category_change,
        });

        PlatformConfig {
            home: self.home.trim().to_string(),
            api_url: self.api_url.trim().to_string(),
            credentials,
            page_type: self.page_type,
            blog_id: non_empty(self.blog_id.as_deref()),
            posid_key: self.posid_key.trim().to_string(),
            preview_url: self.preview_url.clone(),
            middleware_url: non_empty(self.middleware_url.as_deref()),
            force_proxy: self.force_proxy,
            categories: CategoryCapability {
                enabled: self.categories_enabled,
                knowledge_space,
            },
        }
    }

    fn credentials(&self, platform_key: &str) -> Result<Credentials> {
        let username = non_empty(self.username.as_deref());

        if let Some(env_var) = non_empty(self.token_env.as_deref()) {
            return Ok(Credentials::Token {
                username,
                token: load_secret(&env_var, platform_key)?,
            });
        }

        if let Some(env_var) = non_empty(self.cookie_env.as_deref()) {
            return Ok(Credentials::Cookie {
                username,
                cookie: load_secret(&env_var, platform_key)?,
            });
        }

        if let Some(env_var) = non_empty(self.password_env.as_deref()) {
            let Some(username) = username else {
                bail!(
                    "Platform {} has password_env set but no username",
                    platform_key
                );
            };
            return Ok(Credentials::UsernamePassword {
                username,
                password: load_secret(&env_var, platform_key)?,
            });
        }

        Ok(Credentials::None)
    }

    /// Environment variable holding this platform's secret, if any
    pub fn secret_env(&self) -> Option<&str> {
        [&self.token_env, &self.cookie_env, &self.password_env]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn load_secret(env_var: &str, platform_key: &str) -> Result<SecretString> {
    let value = std::env::var(env_var).with_context(|| {
        format!(
            "Missing secret env var {} for platform {}",
            env_var, platform_key
        )
    })?;

    if value.trim().is_empty() {
        bail!(
            "Secret env var {} is empty for platform {}",
            env_var,
            platform_key
        );
    }

    Ok(SecretString::new(value.into()))
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BLOG_BRIDGE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Settings for one platform key
    pub fn platform(&self, platform_key: &str) -> Result<&PlatformSettings> {
        self.platforms.get(platform_key).with_context(|| {
            let known: Vec<&str> = self.platforms.keys().map(|k| k.as_str()).collect();
            format!(
                "Platform '{}' is not configured (known: {})",
                platform_key,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            )
        })
    }

    /// Keys of all enabled platforms, sorted by key
    pub fn enabled_platforms(&self) -> Vec<String> {
        self.platforms
            .iter()
            .filter(|(_, settings)| settings.enabled)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# blog-bridge configuration

[general]
state_db_path = "./blog-bridge.sqlite"
max_concurrent = 4
timeout_secs = 30

[preprocess]
gfm = true
picgo_enabled = false
picgo_url = "http://127.0.0.1:36677/upload"

# Platform keys start with the platform kind:
# yuque, csdn, cnblogs, metaweblog, wordpress, local

[platforms.cnblogs]
home = "https://www.cnblogs.com/your-blog"
api_url = "https://rpc.cnblogs.com/metaweblog/your-blog"
username = "your-blog"
password_env = "CNBLOGS_TOKEN"
posid_key = "cnblogs-post-id"
page_type = "markdown"

[platforms.yuque]
enabled = false
token_env = "YUQUE_TOKEN"
posid_key = "yuque-post-id"
blog_id = "your-login/your-book"
page_type = "markdown"
knowledge_space = "single"

[platforms.csdn]
enabled = false
username = "your-csdn-id"
cookie_env = "CSDN_COOKIE"
posid_key = "csdn-post-id"
page_type = "html"
knowledge_space = "single"
allow_category_change = false
# middleware_url = "https://your-proxy.example.com/api/proxy"

[platforms.wordpress]
enabled = false
home = "https://your-site.example.com"
api_url = "https://your-site.example.com/xmlrpc.php"
username = "admin"
password_env = "WORDPRESS_PASSWORD"
posid_key = "wordpress-post-id"
page_type = "html"

[platforms.local]
enabled = false
home = "https://you.example.com"
api_url = "./site/posts"
posid_key = "local-post-id"
"#
        .to_string()
    }
}
