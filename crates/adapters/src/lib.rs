//! blog-bridge adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `transport`: reqwest HTTP transport and the middleware proxy
//! - `platforms`: Yuque, CSDN, MetaWeblog family and the local site
//! - `registry`: platform key to adaptor resolution
//! - `mapping`: SQLite and in-memory mapping stores
//! - `preprocess`: markdown rendering and image rehosting
//! - `documents`: markdown documents with front matter on disk

mod document_fs;
mod mapping_memory;
mod mapping_sqlite;

pub mod platforms;
pub mod preprocess;
pub mod registry;
pub mod transport;

/// Re-exports for document loading
pub mod documents {
    pub use crate::document_fs::{DocumentError, FsDocumentLoader, LoadedDocument};
}

/// Re-exports for mapping stores
pub mod mapping {
    pub use crate::mapping_memory::InMemoryMappingStore;
    pub use crate::mapping_sqlite::SqliteMappingStore;
}
