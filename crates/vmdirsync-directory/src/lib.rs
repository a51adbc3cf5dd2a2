//! # vmdirsync directory layer
//!
//! Directory (LDAP) configuration, entry model, and transport for the
//! vmdirsync reconciliation engine.
//!
//! This crate owns everything that touches the directory protocol:
//!
//! - [`DirectoryConfig`] - connection and sync policy parameters
//! - [`DirectoryEntry`] - cached snapshot of a remote entry
//! - [`DesiredAttributes`] / [`AttributeOperation`] - desired state and
//!   the modify operations derived from it
//! - [`DirectoryOps`] - the transport capability consumed by the engine
//! - [`LdapDirectory`] - the `ldap3`-backed transport implementation
//!
//! ## Example
//!
//! ```ignore
//! use vmdirsync_directory::{DirectoryConfig, DirectoryOps, LdapDirectory, SearchScope};
//!
//! let config = DirectoryConfig::new(
//!     "ldap.example.com",
//!     "cn=computers,dc=example,dc=com",
//!     "cn=admin,dc=example,dc=com",
//! )
//! .with_password("secret")
//! .with_tls();
//!
//! let directory = LdapDirectory::new(config)?;
//! let entries = directory
//!     .search("cn=computers,dc=example,dc=com", SearchScope::Subtree, "cn", "vm01")
//!     .await?;
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod ldap;
pub mod operation;
pub mod transport;

pub use config::{DirectoryConfig, EncryptionMode};
pub use entry::{DirectoryEntry, SearchScope};
pub use error::{DirectoryError, DirectoryResult};
pub use ldap::LdapDirectory;
pub use operation::{AttributeOperation, DesiredAttributes, DesiredValue};
pub use transport::DirectoryOps;
