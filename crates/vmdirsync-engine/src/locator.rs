//! Entry location: resolving a VM to its matching directory entries.

use std::sync::Arc;

use tracing::debug;

use vmdirsync_directory::{DirectoryConfig, DirectoryEntry, DirectoryOps, SearchScope};

use crate::error::{SyncError, SyncResult};
use crate::inventory::VmRecord;

/// Parameters for an entry search. Every field is optional; whatever is
/// not supplied falls back to the configuration default (treebase, filter
/// attribute) or the VM's identifying hostname (filter value).
#[derive(Debug, Clone, Copy, Default)]
pub struct EntrySearch<'a> {
    /// Explicit treebase to search under.
    pub treebase: Option<&'a str>,
    /// Explicit filter attribute.
    pub filter_attribute: Option<&'a str>,
    /// Explicit filter value; takes priority over the VM hostname.
    pub filter_value: Option<&'a str>,
    /// VM whose hostname identifies the entries.
    pub vm: Option<&'a VmRecord>,
    /// Search scope, whole-subtree by default.
    pub scope: SearchScope,
}

impl<'a> EntrySearch<'a> {
    /// Search by VM hostname with all defaults.
    pub fn for_vm(vm: &'a VmRecord) -> Self {
        Self {
            vm: Some(vm),
            ..Self::default()
        }
    }

    /// Search by explicit filter value with all defaults.
    pub fn for_value(filter_value: &'a str) -> Self {
        Self {
            filter_value: Some(filter_value),
            ..Self::default()
        }
    }
}

/// Resolves VMs to directory entry snapshots. Read-only.
pub struct EntryLocator {
    directory: Arc<dyn DirectoryOps>,
    config: DirectoryConfig,
}

impl EntryLocator {
    /// Create a locator over the given transport and configuration.
    pub fn new(directory: Arc<dyn DirectoryOps>, config: DirectoryConfig) -> Self {
        Self { directory, config }
    }

    /// Resolve the effective treebase, filter attribute, and filter value
    /// for a search request.
    fn resolve<'a>(&'a self, search: &EntrySearch<'a>) -> SyncResult<(&'a str, &'a str, &'a str)> {
        let treebase = search.treebase.unwrap_or(&self.config.treebase);
        let attribute = search
            .filter_attribute
            .unwrap_or(&self.config.hostname_filter_attribute);
        let value = match search.filter_value {
            Some(v) => v,
            None => search
                .vm
                .map(VmRecord::hostname)
                .ok_or_else(|| SyncError::missing_parameter("filter_value or vm"))?,
        };
        Ok((treebase, attribute, value))
    }

    /// Find the entries matching a search. Zero matches is a legitimate
    /// empty result here; callers that require at least one entry use
    /// [`EntryLocator::find_required`].
    pub async fn find(&self, search: &EntrySearch<'_>) -> SyncResult<Vec<DirectoryEntry>> {
        let (treebase, attribute, value) = self.resolve(search)?;
        debug!(
            treebase = %treebase,
            filter_attribute = %attribute,
            filter_value = %value,
            scope = %search.scope,
            "Locating directory entries"
        );
        let entries = self
            .directory
            .search(treebase, search.scope, attribute, value)
            .await?;
        Ok(entries)
    }

    /// Find the entries matching a search, failing with `NotFound` if
    /// nothing matches.
    pub async fn find_required(&self, search: &EntrySearch<'_>) -> SyncResult<Vec<DirectoryEntry>> {
        let (_, attribute, value) = self.resolve(search)?;
        let (attribute, value) = (attribute.to_string(), value.to_string());
        let entries = self.find(search).await?;
        if entries.is_empty() {
            return Err(SyncError::not_found(attribute, value));
        }
        Ok(entries)
    }
}
