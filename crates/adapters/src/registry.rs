//! Adaptor registry: platform key -> adaptor instance

use blog_bridge_domain::{
    AdaptorError, AdaptorFactory, Credentials, PlatformConfig, RemoteIdPolicy, ResolvedAdaptor,
    Transport, config_fingerprint,
};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::platforms::{
    CsdnAdaptor, LocalSiteAdaptor, MetaWeblogAdaptor, MetaWeblogFlavor, YuqueAdaptor,
};
use crate::transport::ProxyTransport;

/// Supported platform families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    Yuque,
    Csdn,
    Cnblogs,
    MetaWeblog,
    Wordpress,
    Local,
}

impl PlatformKind {
    pub const ALL: [PlatformKind; 6] = [
        PlatformKind::Yuque,
        PlatformKind::Csdn,
        PlatformKind::Cnblogs,
        PlatformKind::MetaWeblog,
        PlatformKind::Wordpress,
        PlatformKind::Local,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PlatformKind::Yuque => "yuque",
            PlatformKind::Csdn => "csdn",
            PlatformKind::Cnblogs => "cnblogs",
            PlatformKind::MetaWeblog => "metaweblog",
            PlatformKind::Wordpress => "wordpress",
            PlatformKind::Local => "local",
        }
    }

    /// Kind from a platform key such as `cnblogs` or `wordpress-work`
    pub fn from_key(platform_key: &str) -> Option<Self> {
        let prefix = platform_key
            .split(['-', '_', '.'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.name() == prefix)
    }

    /// How posts on this kind of platform are addressed
    pub fn remote_ids(&self) -> RemoteIdPolicy {
        match self {
            PlatformKind::Local => RemoteIdPolicy::HostDocumentId,
            _ => RemoteIdPolicy::Mapped,
        }
    }
}

struct CachedAdaptor {
    fingerprint: String,
    resolved: ResolvedAdaptor,
}

/// Builds adaptors on demand and caches one instance per platform key
///
/// A cached entry is reused only while the configuration fingerprint is
/// unchanged.
pub struct AdaptorRegistry {
    transport: Arc<dyn Transport>,
    cache: RwLock<HashMap<String, CachedAdaptor>>,
}

impl AdaptorRegistry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Check a platform configuration without building an adaptor
    pub fn validate(platform_key: &str, config: &PlatformConfig) -> Result<PlatformKind, AdaptorError> {
        let kind = PlatformKind::from_key(platform_key).ok_or_else(|| {
            AdaptorError::Config(format!(
                "unknown platform '{}', expected a key starting with one of: {}",
                platform_key,
                PlatformKind::ALL.map(|k| k.name()).join(", ")
            ))
        })?;

        if config.posid_key.trim().is_empty() {
            return Err(AdaptorError::Config(format!(
                "platform '{}' has no posid_key configured",
                platform_key
            )));
        }

        let credentials_ok = match kind {
            PlatformKind::Yuque => matches!(config.credentials, Credentials::Token { .. }),
            PlatformKind::Csdn => matches!(config.credentials, Credentials::Cookie { .. }),
            PlatformKind::Cnblogs | PlatformKind::MetaWeblog | PlatformKind::Wordpress => {
                matches!(config.credentials, Credentials::UsernamePassword { .. })
            }
            PlatformKind::Local => true,
        };
        if !credentials_ok {
            return Err(AdaptorError::Config(format!(
                "platform '{}' ({}) cannot use {} credentials",
                platform_key,
                kind.name(),
                config.credentials.kind()
            )));
        }

        Ok(kind)
    }

    /// Drop every cached adaptor
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn build(
        &self,
        kind: PlatformKind,
        config: &PlatformConfig,
    ) -> Result<ResolvedAdaptor, AdaptorError> {
        let transport: Arc<dyn Transport> = match config.middleware_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Arc::new(ProxyTransport::new(
                self.transport.clone(),
                url.trim(),
                config.force_proxy,
            )),
            _ => self.transport.clone(),
        };
        let config = config.clone();

        let adaptor: Arc<dyn blog_bridge_domain::Adaptor> = match kind {
            PlatformKind::Yuque => Arc::new(YuqueAdaptor::new(transport, config)?),
            PlatformKind::Csdn => Arc::new(CsdnAdaptor::new(transport, config)?),
            PlatformKind::Cnblogs => Arc::new(MetaWeblogAdaptor::new(
                transport,
                config,
                MetaWeblogFlavor::Cnblogs,
            )?),
            PlatformKind::MetaWeblog => Arc::new(MetaWeblogAdaptor::new(
                transport,
                config,
                MetaWeblogFlavor::Generic,
            )?),
            PlatformKind::Wordpress => Arc::new(MetaWeblogAdaptor::new(
                transport,
                config,
                MetaWeblogFlavor::Wordpress,
            )?),
            PlatformKind::Local => Arc::new(LocalSiteAdaptor::new(config)?),
        };

        Ok(ResolvedAdaptor {
            adaptor,
            remote_ids: kind.remote_ids(),
        })
    }
}

impl AdaptorFactory for AdaptorRegistry {
    fn resolve(
        &self,
        platform_key: &str,
        config: &PlatformConfig,
    ) -> Result<ResolvedAdaptor, AdaptorError> {
        let kind = Self::validate(platform_key, config)?;
        let fingerprint = fingerprint(kind, config);

        {
            let cache = self
                .cache
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(cached) = cache.get(platform_key) {
                if cached.fingerprint == fingerprint {
                    return Ok(cached.resolved.clone());
                }
            }
        }

        let resolved = self.build(kind, config)?;
        tracing::debug!(
            platform = %platform_key,
            kind = kind.name(),
            "Built platform adaptor"
        );

        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(
                platform_key.to_string(),
                CachedAdaptor {
                    fingerprint,
                    resolved: resolved.clone(),
                },
            );

        Ok(resolved)
    }
}

fn fingerprint(kind: PlatformKind, config: &PlatformConfig) -> String {
    let (username, secret) = match &config.credentials {
        Credentials::None => (None, String::new()),
        Credentials::UsernamePassword { username, password } => {
            (Some(username.as_str()), digest(password.expose_secret()))
        }
        Credentials::Cookie { username, cookie } => {
            (username.as_deref(), digest(cookie.expose_secret()))
        }
        Credentials::Token { username, token } => {
            (username.as_deref(), digest(token.expose_secret()))
        }
    };
    let page_type = format!("{:?}", config.page_type);
    let knowledge_space = format!("{:?}", config.categories);

    config_fingerprint(&[
        kind.name(),
        &config.home,
        &config.api_url,
        config.credentials.kind(),
        username.unwrap_or_default(),
        &secret,
        &page_type,
        config.blog_id.as_deref().unwrap_or_default(),
        &config.posid_key,
        &config.preview_url,
        config.middleware_url.as_deref().unwrap_or_default(),
        if config.force_proxy { "1" } else { "0" },
        &knowledge_space,
    ])
}

fn digest(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}
