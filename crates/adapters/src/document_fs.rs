//! Filesystem document loader (markdown with front matter)

use blog_bridge_domain::{Document, PostStatus};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// Error type for loading documents
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid document {file}: {message}")]
    Invalid { file: String, message: String },
    #[error("Invalid document id '{id}': use letters, digits, '-', '_' or '.'")]
    InvalidId { id: String },
}

/// A document together with its host id
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub id: String,
    pub document: Document,
}

/// Loads markdown files from disk
pub struct FsDocumentLoader {
    id_pattern: Regex,
}

impl FsDocumentLoader {
    pub fn new() -> Result<Self, DocumentError> {
        let id_pattern =
            Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").map_err(|e| DocumentError::Invalid {
                file: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { id_pattern })
    }

    /// Load one document
    ///
    /// The id falls back to the file stem and the title to the first H1.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<LoadedDocument, DocumentError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;

        let file_stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DocumentError::Invalid {
                file: path.display().to_string(),
                message: "Invalid filename".to_string(),
            })?;

        let (front_matter, body) = parse_front_matter(&content);

        let id = front_matter
            .id
            .clone()
            .unwrap_or_else(|| file_stem.to_string());
        self.validate_id(&id)?;

        let title = front_matter
            .title
            .clone()
            .or_else(|| extract_title_from_markdown(&body))
            .unwrap_or_else(|| file_stem.replace(['-', '_'], " "));

        let mut document = Document::new(title, body);
        document.slug = front_matter.slug.unwrap_or_default();
        document.status = front_matter.status.unwrap_or_default();
        document.categories = front_matter.categories;
        document.tags = front_matter.tags;
        document.extensions = front_matter
            .extra
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();

        tracing::debug!(
            document_id = %id,
            path = %path.display(),
            "Loaded document"
        );

        Ok(LoadedDocument { id, document })
    }

    /// Validate a document id
    pub fn validate_id(&self, id: &str) -> Result<(), DocumentError> {
        if !self.id_pattern.is_match(id) {
            return Err(DocumentError::InvalidId { id: id.to_string() });
        }
        Ok(())
    }
}

/// Front matter fields understood by the loader
#[derive(Debug, Default, PartialEq)]
pub(crate) struct FrontMatter {
    pub id: Option<String>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub status: Option<PostStatus>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub extra: BTreeMap<String, String>,
}

/// Split front matter from the body
///
/// Only a simple `key: value` subset of YAML is supported. Values may be
/// JSON-quoted strings, and lists may be `[a, b]` or JSON arrays.
pub(crate) fn parse_front_matter(content: &str) -> (FrontMatter, String) {
    let mut fm = FrontMatter::default();

    let Some(rest) = content.strip_prefix("---") else {
        return (fm, content.to_string());
    };
    let Some((header, body)) = rest.split_once("\n---") else {
        return (fm, content.to_string());
    };
    let body = body.trim_start_matches(['-']).trim_start_matches(['\r', '\n']);

    for line in header.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "id" => fm.id = Some(parse_scalar(value)).filter(|v| !v.is_empty()),
            "title" => fm.title = Some(parse_scalar(value)).filter(|v| !v.is_empty()),
            "slug" => fm.slug = Some(parse_scalar(value)).filter(|v| !v.is_empty()),
            "status" => {
                fm.status = match parse_scalar(value).to_lowercase().as_str() {
                    "published" | "publish" => Some(PostStatus::Published),
                    "draft" => Some(PostStatus::Draft),
                    _ => None,
                }
            }
            "categories" => fm.categories = parse_list(value),
            "tags" => fm.tags = parse_list(value),
            other => {
                fm.extra.insert(other.to_string(), parse_scalar(value));
            }
        }
    }

    (fm, body.to_string())
}

/// Render front matter in the format [`parse_front_matter`] reads
pub(crate) fn render_front_matter(document: &Document, id: &str) -> String {
    let quote = |s: &str| serde_json::Value::String(s.to_string()).to_string();
    let list = |items: &[String]| serde_json::Value::from(items.to_vec()).to_string();
    let status = match document.status {
        PostStatus::Published => "published",
        PostStatus::Draft => "draft",
    };

    let mut out = String::from("---\n");
    out.push_str(&format!("id: {}\n", quote(id)));
    out.push_str(&format!("title: {}\n", quote(&document.title)));
    out.push_str(&format!("slug: {}\n", quote(&document.slug)));
    out.push_str(&format!("status: {}\n", status));
    out.push_str(&format!("categories: {}\n", list(&document.categories)));
    out.push_str(&format!("tags: {}\n", list(&document.tags)));
    out.push_str("---\n");
    out
}

fn parse_scalar(value: &str) -> String {
    if value.starts_with('"') {
        if let Ok(parsed) = serde_json::from_str::<String>(value) {
            return parsed;
        }
    }
    value.trim_matches('"').trim_matches('\'').to_string()
}

fn parse_list(value: &str) -> Vec<String> {
    if let Ok(items) = serde_json::from_str::<Vec<String>>(value) {
        return items;
    }

    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value);
    inner
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extract title from first H1 in markdown
fn extract_title_from_markdown(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_plain_markdown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello-world.md");
        std::fs::write(&path, "# Hello World\n\nSome content here.").unwrap();

        let loaded = FsDocumentLoader::new().unwrap().load(&path).await.unwrap();

        assert_eq!(loaded.id, "hello-world");
        assert_eq!(loaded.document.title, "Hello World");
        assert!(loaded.document.markdown.contains("Some content here."));
        assert_eq!(loaded.document.status, PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_load_with_front_matter() {
        let dir = TempDir::new().unwrap();
        let content = r#"---
id: 20240101-abc
title: "Custom: Title"
slug: custom
status: published
categories: [Rust, Notes]
tags: ["a", "b"]
cover: cover.png
---
# Ignored H1

Full content here.
"#;
        let path = dir.path().join("whatever.md");
        std::fs::write(&path, content).unwrap();

        let loaded = FsDocumentLoader::new().unwrap().load(&path).await.unwrap();
        let doc = loaded.document;

        assert_eq!(loaded.id, "20240101-abc");
        assert_eq!(doc.title, "Custom: Title");
        assert_eq!(doc.slug, "custom");
        assert_eq!(doc.status, PostStatus::Published);
        assert_eq!(doc.categories, vec!["Rust", "Notes"]);
        assert_eq!(doc.tags, vec!["a", "b"]);
        assert_eq!(doc.extension_str("cover"), Some("cover.png"));
        assert!(doc.markdown.starts_with("# Ignored H1"));
    }

    #[tokio::test]
    async fn test_invalid_id_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "---\nid: ../escape\n---\nbody").unwrap();

        let result = FsDocumentLoader::new().unwrap().load(&path).await;

        assert!(matches!(result, Err(DocumentError::InvalidId { .. })));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = FsDocumentLoader::new()
            .unwrap()
            .load("/nonexistent/path.md")
            .await;
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }

    #[test]
    fn test_rendered_front_matter_parses_back() {
        let mut document = Document::new("He said \"hi\"", "body");
        document.slug = "hi".to_string();
        document.status = PostStatus::Published;
        document.categories = vec!["a, b".to_string()];

        let rendered = format!("{}body", render_front_matter(&document, "doc-1"));
        let (fm, body) = parse_front_matter(&rendered);

        assert_eq!(fm.id.as_deref(), Some("doc-1"));
        assert_eq!(fm.title.as_deref(), Some("He said \"hi\""));
        assert_eq!(fm.categories, vec!["a, b"]);
        assert_eq!(body, "body");
    }
}
