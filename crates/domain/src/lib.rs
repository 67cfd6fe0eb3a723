//! blog-bridge domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Publish orchestration and fan-out
//! - `policy`: Category constraints per platform
//! - `slug`: Deterministic slug generation

pub mod model;
pub mod policy;
pub mod ports;
pub mod slug;
pub mod usecases;

pub use model::*;
pub use ports::*;

use sha2::{Digest, Sha256};

/// Fingerprint of a platform's connection settings
///
/// Used to invalidate cached adaptors when the configuration changes.
/// Secrets are not part of the input; callers pass a digest of them.
pub fn config_fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
