//! Directory transport capability.

use async_trait::async_trait;

use crate::entry::{DirectoryEntry, SearchScope};
use crate::error::DirectoryResult;
use crate::operation::{AttributeOperation, DesiredAttributes};

/// The directory operations the reconciliation engine depends on.
///
/// Connections are not pooled or shared between operations: every call is
/// a self-contained bind, operation, unbind cycle, released on all exit
/// paths. All operations passed to one `modify` call apply atomically from
/// the caller's perspective.
#[async_trait]
pub trait DirectoryOps: Send + Sync {
    /// Search for entries where `filter_attribute` equals `filter_value`
    /// under `treebase`.
    async fn search(
        &self,
        treebase: &str,
        scope: SearchScope,
        filter_attribute: &str,
        filter_value: &str,
    ) -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Add a new entry with the given attributes.
    async fn add(&self, dn: &str, attributes: &DesiredAttributes) -> DirectoryResult<()>;

    /// Apply a modify request carrying the given operations to one entry.
    async fn modify(&self, dn: &str, operations: &[AttributeOperation]) -> DirectoryResult<()>;

    /// Delete an entry by DN.
    async fn delete(&self, dn: &str) -> DirectoryResult<()>;
}
