//! Platform adaptors implementing the [`Adaptor`](blog_bridge_domain::Adaptor) contract
//!
//! - `yuque`: Yuque REST API (token auth)
//! - `csdn`: CSDN web API (cookie auth)
//! - `metaweblog`: XML-RPC MetaWeblog family (CNBlogs, WordPress, generic)
//! - `local`: first-party static site written to a directory

pub mod csdn;
pub mod local;
pub mod metaweblog;
pub mod yuque;

pub use csdn::CsdnAdaptor;
pub use local::LocalSiteAdaptor;
pub use metaweblog::{MetaWeblogAdaptor, MetaWeblogFlavor};
pub use yuque::YuqueAdaptor;

use blog_bridge_domain::{AdaptorError, HttpResponse};

/// Turn a non-2xx response into the matching adaptor error
pub(crate) fn ensure_success(response: HttpResponse) -> Result<HttpResponse, AdaptorError> {
    match response.status {
        200..=299 => Ok(response),
        401 | 403 => Err(AdaptorError::Auth(format!(
            "HTTP {}: {}",
            response.status,
            truncate(&response.body, 200)
        ))),
        status => Err(AdaptorError::Http {
            status,
            body: truncate(&response.body, 500),
        }),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

/// Keep categories whose name or id contains the keyword (case-insensitive)
pub(crate) fn matches_keyword(keyword: Option<&str>, fields: &[&str]) -> bool {
    match keyword.map(str::trim).filter(|k| !k.is_empty()) {
        None => true,
        Some(keyword) => {
            let keyword = keyword.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&keyword))
        }
    }
}
