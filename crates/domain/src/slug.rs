//! Deterministic slug generation

use sha2::{Digest, Sha256};

use crate::ports::SlugGenerator;

/// Slug generator working from the title alone
///
/// ASCII words are lower-cased and joined with dashes. When characters outside
/// ASCII had to be dropped (e.g. CJK titles) a short digest of the full title
/// is appended so that distinct titles keep distinct slugs.
#[derive(Debug, Clone)]
pub struct TitleSlugGenerator {
    max_len: usize,
}

impl TitleSlugGenerator {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(16),
        }
    }
}

impl Default for TitleSlugGenerator {
    fn default() -> Self {
        Self::new(64)
    }
}

impl SlugGenerator for TitleSlugGenerator {
    fn slug_for(&self, title: &str) -> String {
        let lowered = title.trim().to_lowercase();
        let dropped_non_ascii = lowered
            .chars()
            .any(|c| !c.is_ascii() && c.is_alphanumeric());

        let mut slug = String::new();
        for word in lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            // Leave room for the digest suffix
            if slug.len() + word.len() + 1 > self.max_len - 9 {
                break;
            }
            if !slug.is_empty() {
                slug.push('-');
            }
            slug.push_str(word);
        }

        if slug.is_empty() {
            return format!("post-{}", short_digest(title));
        }

        if dropped_non_ascii {
            slug.push('-');
            slug.push_str(&short_digest(title));
        }

        slug
    }
}

fn short_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..8].to_string()
}
