//! Engine error taxonomy.
//!
//! Every error here is terminal for the current unit of work; the one
//! condition that is not an error, replication lag after entry creation,
//! is signalled through [`crate::lifecycle::CreateOutcome::AwaitingReplication`]
//! instead.

use thiserror::Error;

use vmdirsync_directory::DirectoryError;

/// A single failed deletion within an aggregate deletion error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    /// DN of the entry that could not be deleted.
    pub dn: String,
    /// Diagnostic from the directory server.
    pub reason: String,
}

impl std::fmt::Display for DeletionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.dn, self.reason)
    }
}

/// Error raised by the reconciliation engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level failure (bind, add, modify, delete, search).
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A required configuration object or field was not found.
    #[error("configuration missing: {message}")]
    ConfigurationMissing { message: String },

    /// A required workflow parameter was not found in any scope.
    #[error("required parameter not found: {parameter}")]
    MissingParameter { parameter: String },

    /// A search that required at least one entry found none.
    #[error("no directory entries found for {filter_attribute}={filter_value}")]
    NotFound {
        filter_attribute: String,
        filter_value: String,
    },

    /// More than one entry matched a VM where exactly one was expected.
    #[error("found {count} directory entries for VM {vm}, expected exactly one")]
    AmbiguousEntry { vm: String, count: usize },

    /// The diff algorithm reached a state that should be unreachable.
    #[error("could not compute operation for attribute {attribute}; this should never happen")]
    DiffComputation { attribute: String },

    /// One or more entries could not be deleted. Deletion of the remaining
    /// entries was still attempted; this aggregates every failure.
    #[error("failed to delete {} directory entries: {}", failures.len(), format_failures(failures))]
    Deletion { failures: Vec<DeletionFailure> },

    /// The VM container type is not one of the recognized kinds.
    #[error(
        "container type {object_type} is not one of expected \
         [management system, cluster, host]"
    )]
    UnsupportedContainerType { object_type: String },
}

fn format_failures(failures: &[DeletionFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SyncError {
    /// Create a configuration-missing error.
    pub fn configuration_missing(message: impl Into<String>) -> Self {
        SyncError::ConfigurationMissing {
            message: message.into(),
        }
    }

    /// Create a missing-parameter error.
    pub fn missing_parameter(parameter: impl Into<String>) -> Self {
        SyncError::MissingParameter {
            parameter: parameter.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(
        filter_attribute: impl Into<String>,
        filter_value: impl Into<String>,
    ) -> Self {
        SyncError::NotFound {
            filter_attribute: filter_attribute.into(),
            filter_value: filter_value.into(),
        }
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Directory(e) => e.error_code(),
            SyncError::ConfigurationMissing { .. } => "CONFIGURATION_MISSING",
            SyncError::MissingParameter { .. } => "MISSING_PARAMETER",
            SyncError::NotFound { .. } => "NOT_FOUND",
            SyncError::AmbiguousEntry { .. } => "AMBIGUOUS_ENTRY",
            SyncError::DiffComputation { .. } => "DIFF_COMPUTATION",
            SyncError::Deletion { .. } => "DELETION_ERROR",
            SyncError::UnsupportedContainerType { .. } => "UNSUPPORTED_CONTAINER_TYPE",
        }
    }
}

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_deletion_display() {
        let err = SyncError::Deletion {
            failures: vec![
                DeletionFailure {
                    dn: "cn=vm1,dc=example,dc=com".to_string(),
                    reason: "insufficient access".to_string(),
                },
                DeletionFailure {
                    dn: "cn=vm2,dc=example,dc=com".to_string(),
                    reason: "busy".to_string(),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("2 directory entries"));
        assert!(message.contains("cn=vm1,dc=example,dc=com: insufficient access"));
        assert!(message.contains("cn=vm2,dc=example,dc=com: busy"));
    }

    #[test]
    fn test_directory_error_passthrough() {
        let err: SyncError = DirectoryError::bind("ldap.example.com", "refused").into();
        assert_eq!(err.error_code(), "BIND_ERROR");
        assert!(err.to_string().contains("ldap.example.com"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SyncError::missing_parameter("vm").error_code(),
            "MISSING_PARAMETER"
        );
        assert_eq!(
            SyncError::not_found("cn", "vm1").error_code(),
            "NOT_FOUND"
        );
    }
}
