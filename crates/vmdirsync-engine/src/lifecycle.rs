//! Entry lifecycle: creation with replication-lag handling, attribute
//! reconciliation, and deletion of all matching entries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vmdirsync_directory::{
    AttributeOperation, DesiredAttributes, DirectoryConfig, DirectoryEntry, DirectoryOps,
};

use crate::diff::AttributeDiffEngine;
use crate::error::{DeletionFailure, SyncError, SyncResult};
use crate::locator::{EntryLocator, EntrySearch};
use crate::workflow::Outcome;

/// Delay before re-checking visibility of a newly created entry.
///
/// Multi-server directories replicate asynchronously; a freshly added
/// entry may not be returned by a search against another replica for a
/// short window.
pub const REPLICATION_RETRY_DELAY_SECS: u64 = 30;

/// Persisted progress of an in-flight entry creation. Carried across
/// workflow retries so a resumed creation does not add the entry twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    /// Whether the add operation has already been issued.
    #[serde(default)]
    pub entry_added: bool,
}

/// A request to create a directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// DN of the entry to create.
    pub dn: String,
    /// Initial attributes.
    pub attributes: DesiredAttributes,
}

impl CreateRequest {
    pub fn new(dn: impl Into<String>, attributes: DesiredAttributes) -> Self {
        Self {
            dn: dn.into(),
            attributes,
        }
    }
}

/// Result of a creation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The entry was added and is visible to searches. Carries every
    /// matching entry snapshot, since the search may match pre-existing
    /// entries alongside the new one.
    Created { entries: Vec<DirectoryEntry> },
    /// The entry was added but a search does not return it yet. The
    /// caller should persist the state and retry after the delay.
    AwaitingReplication { state: RetryState, delay_secs: u64 },
}

impl CreateOutcome {
    /// The control-flow signal to hand back to the workflow engine.
    pub fn workflow_outcome(&self) -> Outcome {
        match self {
            CreateOutcome::Created { .. } => Outcome::Continue,
            CreateOutcome::AwaitingReplication { delay_secs, .. } => Outcome::RetryAfter {
                delay_secs: *delay_secs,
                reason: "Waiting for created directory entry to become visible".to_string(),
            },
        }
    }
}

/// Result of an update attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The entry already matched the desired attributes.
    Unchanged { dn: String },
    /// The entry was modified with the listed operations.
    Modified {
        dn: String,
        operations: Vec<AttributeOperation>,
    },
}

/// Manages the create, update, and delete lifecycle of the directory
/// entries backing VMs.
pub struct EntryLifecycleManager {
    directory: Arc<dyn DirectoryOps>,
    locator: EntryLocator,
}

impl EntryLifecycleManager {
    /// Create a lifecycle manager over the given transport and
    /// configuration.
    pub fn new(directory: Arc<dyn DirectoryOps>, config: DirectoryConfig) -> Self {
        let locator = EntryLocator::new(directory.clone(), config);
        Self { directory, locator }
    }

    /// Create an entry and confirm it is visible to searches.
    ///
    /// Pass the state from a previous [`CreateOutcome::AwaitingReplication`]
    /// when resuming; the add is then skipped and only visibility is
    /// re-checked.
    pub async fn create(
        &self,
        request: &CreateRequest,
        search: &EntrySearch<'_>,
        state: RetryState,
    ) -> SyncResult<CreateOutcome> {
        if state.entry_added {
            debug!(dn = %request.dn, "Entry already added on a previous attempt, re-checking visibility");
        } else {
            info!(dn = %request.dn, "Adding directory entry");
            self.directory.add(&request.dn, &request.attributes).await?;
        }

        let entries = self.locator.find(search).await?;
        if entries.is_empty() {
            info!(
                dn = %request.dn,
                delay_secs = REPLICATION_RETRY_DELAY_SECS,
                "Created entry not yet visible, deferring to replication"
            );
            return Ok(CreateOutcome::AwaitingReplication {
                state: RetryState { entry_added: true },
                delay_secs: REPLICATION_RETRY_DELAY_SECS,
            });
        }
        info!(
            dn = %request.dn,
            entry_count = entries.len(),
            "Directory entry is visible"
        );
        Ok(CreateOutcome::Created { entries })
    }

    /// Bring the single entry matching the search to the desired
    /// attribute state.
    ///
    /// Requires exactly one match: zero is `NotFound`, more than one is
    /// `AmbiguousEntry`. An empty diff issues no modify request.
    pub async fn update(
        &self,
        search: &EntrySearch<'_>,
        desired: &DesiredAttributes,
    ) -> SyncResult<UpdateOutcome> {
        let mut entries = self.locator.find_required(search).await?;
        if entries.len() > 1 {
            return Err(SyncError::AmbiguousEntry {
                vm: search
                    .vm
                    .map(|vm| vm.name.clone())
                    .or_else(|| search.filter_value.map(str::to_string))
                    .unwrap_or_default(),
                count: entries.len(),
            });
        }
        let entry = entries.remove(0);

        let operations = AttributeDiffEngine::diff(&entry, desired)?;
        if operations.is_empty() {
            debug!(dn = %entry.dn, "Entry already matches desired attributes");
            return Ok(UpdateOutcome::Unchanged { dn: entry.dn });
        }

        info!(
            dn = %entry.dn,
            operation_count = operations.len(),
            "Modifying directory entry"
        );
        self.directory.modify(&entry.dn, &operations).await?;
        Ok(UpdateOutcome::Modified {
            dn: entry.dn,
            operations,
        })
    }

    /// Delete every entry matching the search.
    ///
    /// A failed deletion does not stop the rest: all entries are
    /// attempted, and failures are aggregated into one error. Returns
    /// the DNs that were deleted.
    pub async fn delete_all(&self, search: &EntrySearch<'_>) -> SyncResult<Vec<String>> {
        let entries = self.locator.find(search).await?;
        if entries.is_empty() {
            debug!("No directory entries to delete");
            return Ok(Vec::new());
        }

        let mut deleted = Vec::new();
        let mut failures = Vec::new();
        for entry in entries {
            match self.directory.delete(&entry.dn).await {
                Ok(()) => {
                    info!(dn = %entry.dn, "Deleted directory entry");
                    deleted.push(entry.dn);
                }
                Err(e) => {
                    warn!(dn = %entry.dn, error = %e, "Failed to delete directory entry");
                    failures.push(DeletionFailure {
                        dn: entry.dn,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(deleted)
        } else {
            Err(SyncError::Deletion { failures })
        }
    }
}
