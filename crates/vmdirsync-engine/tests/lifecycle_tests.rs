//! Integration tests for the entry lifecycle against a mock directory.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vmdirsync_directory::{
    AttributeOperation, DesiredAttributes, DirectoryConfig, DirectoryEntry, DirectoryError,
    DirectoryOps, DirectoryResult, SearchScope,
};
use vmdirsync_engine::{
    CreateOutcome, CreateRequest, EntryLifecycleManager, EntrySearch, Outcome, RetryState,
    SyncError, UpdateOutcome, VmRecord, REPLICATION_RETRY_DELAY_SECS,
};

/// Mock directory with scripted search results and per-DN delete
/// failures.
struct MockDirectory {
    /// Successive search results; the last one repeats once drained.
    search_results: Mutex<Vec<Vec<DirectoryEntry>>>,
    /// DNs whose deletion fails.
    failing_deletes: HashSet<String>,
    search_calls: AtomicUsize,
    add_calls: AtomicUsize,
    modify_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    deleted_dns: Mutex<Vec<String>>,
    modified: Mutex<Vec<(String, Vec<AttributeOperation>)>>,
}

impl MockDirectory {
    fn new(search_results: Vec<Vec<DirectoryEntry>>) -> Self {
        Self {
            search_results: Mutex::new(search_results),
            failing_deletes: HashSet::new(),
            search_calls: AtomicUsize::new(0),
            add_calls: AtomicUsize::new(0),
            modify_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            deleted_dns: Mutex::new(Vec::new()),
            modified: Mutex::new(Vec::new()),
        }
    }

    fn with_failing_delete(mut self, dn: &str) -> Self {
        self.failing_deletes.insert(dn.to_string());
        self
    }
}

#[async_trait]
impl DirectoryOps for MockDirectory {
    async fn search(
        &self,
        _treebase: &str,
        _scope: SearchScope,
        _filter_attribute: &str,
        _filter_value: &str,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let mut results = self.search_results.lock().unwrap();
        if results.len() > 1 {
            Ok(results.remove(0))
        } else {
            Ok(results.first().cloned().unwrap_or_default())
        }
    }

    async fn add(&self, _dn: &str, _attributes: &DesiredAttributes) -> DirectoryResult<()> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn modify(&self, dn: &str, operations: &[AttributeOperation]) -> DirectoryResult<()> {
        self.modify_calls.fetch_add(1, Ordering::SeqCst);
        self.modified
            .lock()
            .unwrap()
            .push((dn.to_string(), operations.to_vec()));
        Ok(())
    }

    async fn delete(&self, dn: &str) -> DirectoryResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.contains(dn) {
            return Err(DirectoryError::delete(dn, "insufficient access"));
        }
        self.deleted_dns.lock().unwrap().push(dn.to_string());
        Ok(())
    }
}

fn config() -> DirectoryConfig {
    DirectoryConfig::new(
        "ldap.example.com",
        "cn=computers,dc=example,dc=com",
        "cn=admin,dc=example,dc=com",
    )
}

fn entry(dn: &str) -> DirectoryEntry {
    DirectoryEntry::new(dn)
}

fn manager(directory: Arc<MockDirectory>) -> EntryLifecycleManager {
    EntryLifecycleManager::new(directory, config())
}

fn create_request() -> CreateRequest {
    CreateRequest::new(
        "cn=vm01,cn=computers,dc=example,dc=com",
        DesiredAttributes::new()
            .with("cn", "vm01")
            .with("objectClass", vec!["top".to_string(), "device".to_string()]),
    )
}

#[tokio::test]
async fn test_create_defers_until_entry_is_visible() {
    // The add succeeds but the follow-up search sees nothing yet.
    let directory = Arc::new(MockDirectory::new(vec![vec![]]));
    let manager = manager(directory.clone());

    let vm = VmRecord::new("1", "vm01");
    let outcome = manager
        .create(&create_request(), &EntrySearch::for_vm(&vm), RetryState::default())
        .await
        .unwrap();

    match &outcome {
        CreateOutcome::AwaitingReplication { state, delay_secs } => {
            assert!(state.entry_added);
            assert_eq!(*delay_secs, REPLICATION_RETRY_DELAY_SECS);
        }
        other => panic!("expected AwaitingReplication, got {other:?}"),
    }
    assert_eq!(directory.add_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        outcome.workflow_outcome(),
        Outcome::RetryAfter {
            delay_secs: REPLICATION_RETRY_DELAY_SECS,
            reason: "Waiting for created directory entry to become visible".to_string(),
        }
    );
}

#[tokio::test]
async fn test_resumed_create_skips_the_add() {
    let directory = Arc::new(MockDirectory::new(vec![vec![entry(
        "cn=vm01,cn=computers,dc=example,dc=com",
    )]]));
    let manager = manager(directory.clone());

    let vm = VmRecord::new("1", "vm01");
    let outcome = manager
        .create(
            &create_request(),
            &EntrySearch::for_vm(&vm),
            RetryState { entry_added: true },
        )
        .await
        .unwrap();

    match outcome {
        CreateOutcome::Created { entries } => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].dn, "cn=vm01,cn=computers,dc=example,dc=com");
        }
        other => panic!("expected Created, got {other:?}"),
    }
    assert_eq!(directory.add_calls.load(Ordering::SeqCst), 0);
    assert_eq!(directory.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_create_returns_every_visible_match() {
    let directory = Arc::new(MockDirectory::new(vec![vec![
        entry("cn=vm01,cn=computers,dc=example,dc=com"),
        entry("cn=vm01,ou=stale,dc=example,dc=com"),
    ]]));
    let manager = manager(directory);

    let vm = VmRecord::new("1", "vm01");
    let outcome = manager
        .create(&create_request(), &EntrySearch::for_vm(&vm), RetryState::default())
        .await
        .unwrap();

    match outcome {
        CreateOutcome::Created { entries } => {
            let dns: Vec<&str> = entries.iter().map(|e| e.dn.as_str()).collect();
            assert_eq!(
                dns,
                vec![
                    "cn=vm01,cn=computers,dc=example,dc=com",
                    "cn=vm01,ou=stale,dc=example,dc=com",
                ]
            );
        }
        other => panic!("expected Created, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_succeeds_when_immediately_visible() {
    let directory = Arc::new(MockDirectory::new(vec![vec![entry(
        "cn=vm01,cn=computers,dc=example,dc=com",
    )]]));
    let manager = manager(directory.clone());

    let vm = VmRecord::new("1", "vm01");
    let outcome = manager
        .create(&create_request(), &EntrySearch::for_vm(&vm), RetryState::default())
        .await
        .unwrap();

    assert!(matches!(&outcome, CreateOutcome::Created { .. }));
    assert_eq!(directory.add_calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.workflow_outcome(), Outcome::Continue);
}

#[tokio::test]
async fn test_delete_continues_past_failures_and_aggregates() {
    let dns = [
        "cn=vm01,cn=computers,dc=example,dc=com",
        "cn=vm01,ou=stale,dc=example,dc=com",
        "cn=vm01,ou=old,dc=example,dc=com",
    ];
    let directory = Arc::new(
        MockDirectory::new(vec![dns.iter().map(|dn| entry(dn)).collect()])
            .with_failing_delete(dns[1]),
    );
    let manager = manager(directory.clone());

    let vm = VmRecord::new("1", "vm01");
    let err = manager
        .delete_all(&EntrySearch::for_vm(&vm))
        .await
        .unwrap_err();

    // All three deletions were attempted.
    assert_eq!(directory.delete_calls.load(Ordering::SeqCst), 3);
    let deleted = directory.deleted_dns.lock().unwrap();
    assert_eq!(*deleted, vec![dns[0].to_string(), dns[2].to_string()]);

    match err {
        SyncError::Deletion { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].dn, dns[1]);
        }
        other => panic!("expected Deletion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_with_no_entries_is_a_noop() {
    let directory = Arc::new(MockDirectory::new(vec![vec![]]));
    let manager = manager(directory.clone());

    let vm = VmRecord::new("1", "vm01");
    let deleted = manager.delete_all(&EntrySearch::for_vm(&vm)).await.unwrap();
    assert!(deleted.is_empty());
    assert_eq!(directory.delete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_rejects_ambiguous_matches() {
    let directory = Arc::new(MockDirectory::new(vec![vec![
        entry("cn=vm01,cn=computers,dc=example,dc=com"),
        entry("cn=vm01,ou=stale,dc=example,dc=com"),
    ]]));
    let manager = manager(directory.clone());

    let vm = VmRecord::new("1", "vm01");
    let desired = DesiredAttributes::new().with("description", "updated");
    let err = manager
        .update(&EntrySearch::for_vm(&vm), &desired)
        .await
        .unwrap_err();

    match err {
        SyncError::AmbiguousEntry { vm, count } => {
            assert_eq!(vm, "vm01");
            assert_eq!(count, 2);
        }
        other => panic!("expected AmbiguousEntry, got {other:?}"),
    }
    assert_eq!(directory.modify_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_with_no_match_is_not_found() {
    let directory = Arc::new(MockDirectory::new(vec![vec![]]));
    let manager = manager(directory);

    let vm = VmRecord::new("1", "vm01");
    let desired = DesiredAttributes::new().with("description", "updated");
    let err = manager
        .update(&EntrySearch::for_vm(&vm), &desired)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_update_skips_modify_when_nothing_changed() {
    let existing = entry("cn=vm01,cn=computers,dc=example,dc=com")
        .with("description", vec!["web server".to_string()]);
    let directory = Arc::new(MockDirectory::new(vec![vec![existing]]));
    let manager = manager(directory.clone());

    let vm = VmRecord::new("1", "vm01");
    let desired = DesiredAttributes::new().with("description", "web server");
    let outcome = manager
        .update(&EntrySearch::for_vm(&vm), &desired)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Unchanged {
            dn: "cn=vm01,cn=computers,dc=example,dc=com".to_string()
        }
    );
    assert_eq!(directory.modify_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_issues_the_computed_operations() {
    let existing = entry("cn=vm01,cn=computers,dc=example,dc=com")
        .with("description", vec!["old".to_string()]);
    let directory = Arc::new(MockDirectory::new(vec![vec![existing]]));
    let manager = manager(directory.clone());

    let vm = VmRecord::new("1", "vm01");
    let desired = DesiredAttributes::new()
        .with("description", "new")
        .with("fqdn", "vm01.example.com");
    let outcome = manager
        .update(&EntrySearch::for_vm(&vm), &desired)
        .await
        .unwrap();

    match outcome {
        UpdateOutcome::Modified { dn, operations } => {
            assert_eq!(dn, "cn=vm01,cn=computers,dc=example,dc=com");
            assert_eq!(
                operations,
                vec![
                    AttributeOperation::Replace {
                        attribute: "description".to_string(),
                        values: vec!["new".to_string()],
                    },
                    AttributeOperation::Add {
                        attribute: "fqdn".to_string(),
                        value: "vm01.example.com".to_string(),
                    },
                ]
            );
        }
        other => panic!("expected Modified, got {other:?}"),
    }

    let modified = directory.modified.lock().unwrap();
    assert_eq!(modified.len(), 1);
    assert_eq!(modified[0].0, "cn=vm01,cn=computers,dc=example,dc=com");
}
