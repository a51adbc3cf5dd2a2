//! VM inventory types and lookup capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// A virtual machine as seen by the platform inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmRecord {
    /// Platform identifier for the VM.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Hostnames configured on the guest, in configuration order.
    #[serde(default)]
    pub hostnames: Vec<String>,
}

impl VmRecord {
    /// Create a VM record with no configured hostnames.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hostnames: Vec::new(),
        }
    }

    /// Set the configured hostnames.
    pub fn with_hostnames(mut self, hostnames: Vec<String>) -> Self {
        self.hostnames = hostnames;
        self
    }

    /// The identifying hostname for directory lookups: the first
    /// configured hostname, or the display name if none is configured.
    pub fn hostname(&self) -> &str {
        self.hostnames
            .iter()
            .map(String::as_str)
            .find(|h| !h.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

/// The kinds of VM containers batch runs can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// A whole management system (provider).
    ManagementSystem,
    /// A cluster within a management system.
    Cluster,
    /// A single hypervisor host.
    Host,
}

impl std::str::FromStr for ContainerKind {
    type Err = SyncError;

    /// Parse the platform's object-type string into a container kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ext_management_system" => Ok(ContainerKind::ManagementSystem),
            "ems_cluster" => Ok(ContainerKind::Cluster),
            "host" => Ok(ContainerKind::Host),
            other => Err(SyncError::UnsupportedContainerType {
                object_type: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerKind::ManagementSystem => write!(f, "ext_management_system"),
            ContainerKind::Cluster => write!(f, "ems_cluster"),
            ContainerKind::Host => write!(f, "host"),
        }
    }
}

/// A VM container reference: a kind plus the platform identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmContainer {
    pub kind: ContainerKind,
    pub id: String,
}

impl VmContainer {
    /// Create a container reference.
    pub fn new(kind: ContainerKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// VM inventory lookup capability, provided by the host platform.
#[async_trait]
pub trait VmInventory: Send + Sync {
    /// Resolve a VM by its platform identifier.
    async fn find_vm(&self, id: &str) -> SyncResult<Option<VmRecord>>;

    /// List the VMs belonging to a container, in inventory order.
    async fn container_vms(&self, container: &VmContainer) -> SyncResult<Vec<VmRecord>>;
}
