//! # vmdirsync engine
//!
//! Reconciliation engine keeping directory (LDAP) entries in step with a
//! virtualization platform's VM inventory.
//!
//! The engine is driven by an external workflow engine and built around
//! a handful of cooperating parts:
//!
//! - [`EntryLocator`] - resolves a VM to its directory entries
//! - [`AttributeDiffEngine`] - computes the minimal modify operations
//! - [`EntryLifecycleManager`] - create (with replication-lag retry),
//!   update, and delete of the entries backing a VM
//! - [`TagAggregator`] - mirrors directory attributes onto platform
//!   tags and custom attributes
//! - [`BatchScheduler`] - fans a container's VMs out into per-batch
//!   automation requests
//! - [`EmailValidator`] - validates owner addresses with a tag-backed
//!   positive cache
//!
//! Platform capabilities (VM inventory, tag storage, automation request
//! submission) and the directory transport are all traits, so the engine
//! itself stays host-agnostic and fully testable in memory.

pub mod batch;
pub mod diff;
pub mod email;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod locator;
pub mod tags;
pub mod tagstore;
pub mod workflow;

pub use batch::{
    parse_vm_ids, AutomationDispatch, AutomationRequest, Batch, BatchScheduler,
    DEFAULT_BATCH_SIZE, VM_IDS_PARAMETER,
};
pub use diff::AttributeDiffEngine;
pub use email::{
    AddressPartition, EmailValidator, ValidationOutcome, DEFAULT_EMAIL_ATTRIBUTE,
    VALID_EMAILS_CATEGORY,
};
pub use error::{DeletionFailure, SyncError, SyncResult};
pub use inventory::{ContainerKind, VmContainer, VmInventory, VmRecord};
pub use lifecycle::{
    CreateOutcome, CreateRequest, EntryLifecycleManager, RetryState, UpdateOutcome,
    REPLICATION_RETRY_DELAY_SECS,
};
pub use locator::{EntryLocator, EntrySearch};
pub use tags::{
    AttributeClassifier, AttributeMapping, CustomAttributeAssignments, MappingClassifier,
    SyncStatus, TagAggregator, TagAssignments, TagValue, SYNC_LAST_ATTEMPT_ATTRIBUTE,
    SYNC_STATUS_ATTRIBUTE, SYNC_SUCCESSFUL_ATTRIBUTE,
};
pub use tagstore::{to_tag_name, MemoryTagStore, TagStore};
pub use workflow::{ObjectOutputs, Outcome, RequestContext};
