//! Category policy: fitting generic categories to a platform's capabilities

use crate::model::{CategoryCapability, CategoryType, Document};

/// Outcome of applying the category policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryAdjustment {
    Unchanged,
    /// Categories were removed because the platform has none
    Cleared { dropped: usize },
    /// Only the first category was kept for a single-select space
    Truncated { dropped: usize },
}

/// Fit `document.categories` to what the platform can express
///
/// Duplicates and blank entries are removed first. A platform with a
/// single-select knowledge space keeps the first category, falling back to
/// `default_space` when the document carries none.
pub fn apply_category_policy(
    document: &mut Document,
    capability: &CategoryCapability,
    default_space: Option<&str>,
) -> CategoryAdjustment {
    let mut seen = Vec::with_capacity(document.categories.len());
    for category in document.categories.drain(..) {
        let category = category.trim().to_string();
        if !category.is_empty() && !seen.contains(&category) {
            seen.push(category);
        }
    }
    document.categories = seen;

    match capability.knowledge_space {
        Some(space) if space.kind == CategoryType::Single => {
            if document.categories.is_empty() {
                if let Some(default_space) = default_space.filter(|s| !s.trim().is_empty()) {
                    document.categories.push(default_space.to_string());
                }
                return CategoryAdjustment::Unchanged;
            }
            let dropped = document.categories.len() - 1;
            document.categories.truncate(1);
            if dropped > 0 {
                CategoryAdjustment::Truncated { dropped }
            } else {
                CategoryAdjustment::Unchanged
            }
        }
        Some(_) => CategoryAdjustment::Unchanged,
        None if !capability.enabled => {
            let dropped = document.categories.len();
            document.categories.clear();
            if dropped > 0 {
                CategoryAdjustment::Cleared { dropped }
            } else {
                CategoryAdjustment::Unchanged
            }
        }
        None => CategoryAdjustment::Unchanged,
    }
}
