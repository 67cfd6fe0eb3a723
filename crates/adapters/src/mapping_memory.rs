//! In-memory mapping store for testing and dry runs

use async_trait::async_trait;
use blog_bridge_domain::{MappingError, MappingStore, PostMeta};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory mapping store implementation
pub struct InMemoryMappingStore {
    documents: RwLock<HashMap<String, PostMeta>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryMappingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn get_meta(&self, document_id: &str) -> Result<PostMeta, MappingError> {
        let documents = self
            .documents
            .read()
            .map_err(|e| MappingError::Database(e.to_string()))?;
        Ok(documents.get(document_id).cloned().unwrap_or_default())
    }

    async fn merge_meta(&self, document_id: &str, updates: &PostMeta) -> Result<(), MappingError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| MappingError::Database(e.to_string()))?;
        let meta = documents.entry(document_id.to_string()).or_default();
        for (key, value) in updates {
            meta.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn remove_keys(&self, document_id: &str, keys: &[&str]) -> Result<(), MappingError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| MappingError::Database(e.to_string()))?;
        if let Some(meta) = documents.get_mut(document_id) {
            for key in keys {
                meta.remove(*key);
            }
            if meta.is_empty() {
                documents.remove(document_id);
            }
        }
        Ok(())
    }
}
