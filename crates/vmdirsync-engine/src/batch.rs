//! Batch scheduling: fanning a container's VMs out into per-batch
//! automation requests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SyncResult;
use crate::inventory::{VmContainer, VmInventory};

/// Default number of VMs handed to one automation request.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Parameter name carrying the batch's VM identifiers.
pub const VM_IDS_PARAMETER: &str = "vm_ids";

/// A batch of VM identifiers scheduled as one automation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Zero-based position of this batch within the run.
    pub index: usize,
    /// VM identifiers, in inventory order.
    pub vm_ids: Vec<String>,
}

impl Batch {
    /// The wire form of the identifier list: comma-joined.
    pub fn vm_ids_parameter(&self) -> String {
        self.vm_ids.join(",")
    }
}

/// Parse a comma-joined identifier list back into identifiers. Blank
/// segments are dropped.
pub fn parse_vm_ids(parameter: &str) -> Vec<String> {
    parameter
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// A request for the workflow engine to run an instance with parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationRequest {
    /// Namespace of the instance to run.
    pub namespace: String,
    /// Class of the instance to run.
    pub class_name: String,
    /// Instance name.
    pub instance: String,
    /// Request parameters.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl AutomationRequest {
    /// Create a request with no parameters.
    pub fn new(
        namespace: impl Into<String>,
        class_name: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            class_name: class_name.into(),
            instance: instance.into(),
            parameters: HashMap::new(),
        }
    }

    /// Add a request parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// Submission capability for automation requests, provided by the host
/// platform.
#[async_trait]
pub trait AutomationDispatch: Send + Sync {
    async fn dispatch(&self, request: &AutomationRequest) -> SyncResult<()>;
}

/// Splits a container's VMs into fixed-size batches and dispatches one
/// automation request per batch.
pub struct BatchScheduler {
    inventory: Arc<dyn VmInventory>,
    dispatch: Arc<dyn AutomationDispatch>,
    batch_size: usize,
}

impl BatchScheduler {
    /// Create a scheduler with the default batch size.
    pub fn new(inventory: Arc<dyn VmInventory>, dispatch: Arc<dyn AutomationDispatch>) -> Self {
        Self {
            inventory,
            dispatch,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size. Zero is clamped to one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Enumerate the container's VMs, split them into batches, and
    /// dispatch one copy of the template request per batch with the
    /// batch's identifiers added as the `vm_ids` parameter.
    ///
    /// Returns the batches that were dispatched. An empty container
    /// dispatches nothing.
    pub async fn schedule(
        &self,
        container: &VmContainer,
        template: &AutomationRequest,
    ) -> SyncResult<Vec<Batch>> {
        let vms = self.inventory.container_vms(container).await?;
        if vms.is_empty() {
            debug!(
                container_kind = %container.kind,
                container_id = %container.id,
                "Container has no VMs, nothing to schedule"
            );
            return Ok(Vec::new());
        }

        let vm_ids: Vec<String> = vms.into_iter().map(|vm| vm.id).collect();
        let mut batches = Vec::new();
        for (index, chunk) in vm_ids.chunks(self.batch_size).enumerate() {
            let batch = Batch {
                index,
                vm_ids: chunk.to_vec(),
            };
            let request = template
                .clone()
                .with_parameter(VM_IDS_PARAMETER, batch.vm_ids_parameter());
            self.dispatch.dispatch(&request).await?;
            batches.push(batch);
        }

        info!(
            container_kind = %container.kind,
            container_id = %container.id,
            vm_count = batches.iter().map(|b| b.vm_ids.len()).sum::<usize>(),
            batch_count = batches.len(),
            "Dispatched batch requests"
        );
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::inventory::{ContainerKind, VmRecord};
    use std::sync::Mutex;

    struct FixedInventory {
        vms: Vec<VmRecord>,
    }

    #[async_trait]
    impl VmInventory for FixedInventory {
        async fn find_vm(&self, id: &str) -> SyncResult<Option<VmRecord>> {
            Ok(self.vms.iter().find(|vm| vm.id == id).cloned())
        }

        async fn container_vms(&self, _container: &VmContainer) -> SyncResult<Vec<VmRecord>> {
            Ok(self.vms.clone())
        }
    }

    #[derive(Default)]
    struct RecordingDispatch {
        requests: Mutex<Vec<AutomationRequest>>,
    }

    #[async_trait]
    impl AutomationDispatch for RecordingDispatch {
        async fn dispatch(&self, request: &AutomationRequest) -> SyncResult<()> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    fn vms(count: usize) -> Vec<VmRecord> {
        (0..count)
            .map(|i| VmRecord::new(format!("{}", i + 1), format!("vm{:02}", i + 1)))
            .collect()
    }

    fn template() -> AutomationRequest {
        AutomationRequest::new("Integration/Directory", "Methods", "sync_vms")
    }

    #[tokio::test]
    async fn test_vms_are_chunked_in_inventory_order() {
        let inventory = Arc::new(FixedInventory { vms: vms(25) });
        let dispatch = Arc::new(RecordingDispatch::default());
        let scheduler = BatchScheduler::new(inventory, dispatch.clone());

        let container = VmContainer::new(ContainerKind::Cluster, "7");
        let batches = scheduler.schedule(&container, &template()).await.unwrap();

        let sizes: Vec<usize> = batches.iter().map(|b| b.vm_ids.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(batches[0].vm_ids[0], "1");
        assert_eq!(batches[2].vm_ids, vec!["21", "22", "23", "24", "25"]);

        // Every VM appears exactly once across the batches.
        let all_ids: Vec<&str> = batches
            .iter()
            .flat_map(|b| b.vm_ids.iter().map(String::as_str))
            .collect();
        assert_eq!(all_ids.len(), 25);

        let requests = dispatch.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[2].parameters.get(VM_IDS_PARAMETER).unwrap(),
            "21,22,23,24,25"
        );
        assert_eq!(requests[0].instance, "sync_vms");
    }

    #[tokio::test]
    async fn test_custom_batch_size() {
        let inventory = Arc::new(FixedInventory { vms: vms(5) });
        let dispatch = Arc::new(RecordingDispatch::default());
        let scheduler = BatchScheduler::new(inventory, dispatch).with_batch_size(2);

        let container = VmContainer::new(ContainerKind::Host, "3");
        let batches = scheduler.schedule(&container, &template()).await.unwrap();
        let sizes: Vec<usize> = batches.iter().map(|b| b.vm_ids.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_clamped() {
        let inventory = Arc::new(FixedInventory { vms: vms(2) });
        let dispatch = Arc::new(RecordingDispatch::default());
        let scheduler = BatchScheduler::new(inventory, dispatch).with_batch_size(0);

        let container = VmContainer::new(ContainerKind::ManagementSystem, "1");
        let batches = scheduler.schedule(&container, &template()).await.unwrap();
        assert_eq!(batches.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_container_dispatches_nothing() {
        let inventory = Arc::new(FixedInventory { vms: vec![] });
        let dispatch = Arc::new(RecordingDispatch::default());
        let scheduler = BatchScheduler::new(inventory, dispatch.clone());

        let container = VmContainer::new(ContainerKind::Cluster, "7");
        let batches = scheduler.schedule(&container, &template()).await.unwrap();
        assert!(batches.is_empty());
        assert!(dispatch.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_error_propagates() {
        struct FailingDispatch;

        #[async_trait]
        impl AutomationDispatch for FailingDispatch {
            async fn dispatch(&self, _request: &AutomationRequest) -> SyncResult<()> {
                Err(SyncError::configuration_missing("automation endpoint"))
            }
        }

        let inventory = Arc::new(FixedInventory { vms: vms(1) });
        let scheduler = BatchScheduler::new(inventory, Arc::new(FailingDispatch));

        let container = VmContainer::new(ContainerKind::Host, "3");
        let err = scheduler
            .schedule(&container, &template())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_MISSING");
    }

    #[test]
    fn test_parse_vm_ids() {
        assert_eq!(parse_vm_ids("1,2,3"), vec!["1", "2", "3"]);
        assert_eq!(parse_vm_ids(" 1 , ,2,"), vec!["1", "2"]);
        assert!(parse_vm_ids("").is_empty());
    }

    #[test]
    fn test_batch_parameter_round_trip() {
        let batch = Batch {
            index: 0,
            vm_ids: vec!["10".to_string(), "11".to_string()],
        };
        assert_eq!(parse_vm_ids(&batch.vm_ids_parameter()), batch.vm_ids);
    }
}
