//! Image rehosting through a PicGo HTTP server

use async_trait::async_trait;
use blog_bridge_domain::{HttpRequest, ImageRehoster, PreprocessError, Transport};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default upload endpoint of the PicGo desktop server
pub const DEFAULT_PICGO_URL: &str = "http://127.0.0.1:36677/upload";

/// Uploads local images referenced from markdown and rewrites the links
pub struct PicgoImageRehoster {
    transport: Arc<dyn Transport>,
    upload_url: String,
    base_dir: PathBuf,
    image_pattern: Regex,
}

impl PicgoImageRehoster {
    /// `base_dir` resolves relative image paths, usually the document's folder
    pub fn new(
        transport: Arc<dyn Transport>,
        upload_url: impl Into<String>,
        base_dir: impl AsRef<Path>,
    ) -> Result<Self, PreprocessError> {
        let image_pattern = Regex::new(r#"!\[([^\]]*)\]\(\s*([^)\s]+)((?:\s+"[^"]*")?)\s*\)"#)
            .map_err(|e| PreprocessError::Io(e.to_string()))?;

        Ok(Self {
            transport,
            upload_url: upload_url.into(),
            base_dir: base_dir.as_ref().to_path_buf(),
            image_pattern,
        })
    }

    fn local_images(&self, markdown: &str) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        for captures in self.image_pattern.captures_iter(markdown) {
            let src = &captures[2];
            if is_remote(src) || sources.iter().any(|s| s == src) {
                continue;
            }
            sources.push(src.to_string());
        }
        sources
    }

    fn resolve(&self, src: &str) -> PathBuf {
        let path = Path::new(src.strip_prefix("file://").unwrap_or(src));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

fn is_remote(src: &str) -> bool {
    let lowered = src.to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://") || lowered.starts_with("data:")
}

#[derive(Deserialize)]
struct PicgoResponse {
    success: bool,
    #[serde(default)]
    result: Vec<String>,
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
impl ImageRehoster for PicgoImageRehoster {
    async fn rehost_images(
        &self,
        document_id: &str,
        markdown: &str,
    ) -> Result<String, PreprocessError> {
        let sources = self.local_images(markdown);
        if sources.is_empty() {
            return Ok(markdown.to_string());
        }

        let mut paths = Vec::with_capacity(sources.len());
        for src in &sources {
            let path = self.resolve(src);
            if !path.exists() {
                return Err(PreprocessError::Io(format!(
                    "image not found: {}",
                    path.display()
                )));
            }
            paths.push(path.display().to_string());
        }

        tracing::info!(
            document_id = %document_id,
            images = paths.len(),
            "Uploading images via PicGo"
        );

        let response = self
            .transport
            .send(HttpRequest::post(&self.upload_url).json(json!({ "list": paths })))
            .await
            .map_err(|e| PreprocessError::Upload(e.to_string()))?;
        if !response.is_success() {
            return Err(PreprocessError::Upload(format!(
                "PicGo returned HTTP {}",
                response.status
            )));
        }

        let parsed: PicgoResponse = response
            .json()
            .map_err(|e| PreprocessError::Upload(format!("invalid PicGo response: {}", e)))?;
        if !parsed.success || parsed.result.len() != sources.len() {
            return Err(PreprocessError::Upload(parsed.message.unwrap_or_else(|| {
                format!(
                    "PicGo uploaded {} of {} images",
                    parsed.result.len(),
                    sources.len()
                )
            })));
        }

        let rewritten = self
            .image_pattern
            .replace_all(markdown, |captures: &regex::Captures<'_>| {
                let src = &captures[2];
                match sources.iter().position(|s| s == src) {
                    Some(index) => {
                        format!("![{}]({}{})", &captures[1], parsed.result[index], &captures[3])
                    }
                    None => captures[0].to_string(),
                }
            });

        Ok(rewritten.into_owned())
    }
}

/// Rehoster that leaves markdown untouched
#[derive(Debug, Clone, Default)]
pub struct NoopImageRehoster;

#[async_trait]
impl ImageRehoster for NoopImageRehoster {
    async fn rehost_images(
        &self,
        _document_id: &str,
        markdown: &str,
    ) -> Result<String, PreprocessError> {
        Ok(markdown.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ReqwestTransport;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rehoster(server: &MockServer, dir: &TempDir) -> PicgoImageRehoster {
        let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap());
        PicgoImageRehoster::new(transport, format!("{}/upload", server.uri()), dir.path()).unwrap()
    }

    #[tokio::test]
    async fn test_uploads_local_images_and_rewrites_links() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": ["https://img.example.com/a.png"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/a.png"), b"png").unwrap();

        let markdown = "![one](assets/a.png) and ![again](assets/a.png \"t\") ![web](https://x.io/b.png)";
        let rewritten = rehoster(&server, &dir)
            .rehost_images("doc-1", markdown)
            .await
            .unwrap();

        assert_eq!(
            rewritten,
            "![one](https://img.example.com/a.png) and ![again](https://img.example.com/a.png \"t\") ![web](https://x.io/b.png)"
        );
    }

    #[tokio::test]
    async fn test_remote_only_markdown_skips_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let markdown = "![web](https://x.io/b.png)";
        let rewritten = rehoster(&server, &dir)
            .rehost_images("doc-1", markdown)
            .await
            .unwrap();

        assert_eq!(rewritten, markdown);
    }

    #[tokio::test]
    async fn test_failed_upload_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "no uploader configured"
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.png"), b"png").unwrap();

        let result = rehoster(&server, &dir)
            .rehost_images("doc-1", "![x](a.png)")
            .await;

        match result {
            Err(PreprocessError::Upload(message)) => assert_eq!(message, "no uploader configured"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_image_file() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        let result = rehoster(&server, &dir)
            .rehost_images("doc-1", "![x](missing.png)")
            .await;

        assert!(matches!(result, Err(PreprocessError::Io(_))));
    }

    #[tokio::test]
    async fn test_noop_rehoster() {
        let out = NoopImageRehoster
            .rehost_images("doc-1", "![x](a.png)")
            .await
            .unwrap();
        assert_eq!(out, "![x](a.png)");
    }
}
