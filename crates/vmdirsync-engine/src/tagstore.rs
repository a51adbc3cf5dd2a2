//! Tag category storage capability and tag-name normalization.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::SyncResult;

/// Normalize an arbitrary value into a tag name: lowercased, with every
/// run of characters outside `[a-z0-9_]` collapsed into a single
/// underscore.
pub fn to_tag_name(value: &str) -> String {
    let mut name = String::with_capacity(value.len());
    let mut last_was_underscore = false;
    for c in value.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            name.push(c);
            last_was_underscore = c == '_';
        } else if !last_was_underscore {
            name.push('_');
            last_was_underscore = true;
        }
    }
    name
}

/// Category-scoped tag registry, provided by the host platform.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Check whether a tag exists in a category. The tag name is already
    /// normalized by the caller.
    async fn tag_exists(&self, category: &str, tag: &str) -> SyncResult<bool>;

    /// Create a tag in a category if it does not exist yet.
    async fn ensure_tag(&self, category: &str, tag: &str, description: &str) -> SyncResult<()>;
}

/// In-memory tag registry. Useful in tests and for single-process runs
/// that do not need tags to outlive the process.
#[derive(Debug, Default)]
pub struct MemoryTagStore {
    categories: Mutex<HashMap<String, HashSet<String>>>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TagStore for MemoryTagStore {
    async fn tag_exists(&self, category: &str, tag: &str) -> SyncResult<bool> {
        let categories = self.categories.lock().unwrap();
        Ok(categories
            .get(category)
            .map(|tags| tags.contains(tag))
            .unwrap_or(false))
    }

    async fn ensure_tag(&self, category: &str, tag: &str, _description: &str) -> SyncResult<()> {
        let mut categories = self.categories.lock().unwrap();
        let inserted = categories
            .entry(category.to_string())
            .or_default()
            .insert(tag.to_string());
        if inserted {
            debug!(category = %category, tag = %tag, "Created tag");
        }
        Ok(())
    }
}
