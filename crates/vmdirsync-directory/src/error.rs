//! Directory transport error types.

use thiserror::Error;

/// Error raised by the directory transport layer.
///
/// Every variant carries the diagnostic message reported by the directory
/// server so that operators can act on the failure without digging through
/// server logs first.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Failed to connect or bind to the directory server.
    #[error("directory bind to {server} failed: {message}")]
    Bind { server: String, message: String },

    /// A search operation was rejected or the connection dropped mid-search.
    #[error("directory search failed: {message}")]
    Search { message: String },

    /// An add operation was rejected by the server.
    #[error("failed to add directory entry {dn}: {message}")]
    Add { dn: String, message: String },

    /// A modify operation was rejected by the server.
    #[error("failed to modify directory entry {dn}: {message}")]
    Modify { dn: String, message: String },

    /// A delete operation was rejected by the server.
    #[error("failed to delete directory entry {dn}: {message}")]
    Delete { dn: String, message: String },

    /// The directory configuration is unusable.
    #[error("invalid directory configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl DirectoryError {
    /// Create a bind error.
    pub fn bind(server: impl Into<String>, message: impl Into<String>) -> Self {
        DirectoryError::Bind {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a search error.
    pub fn search(message: impl Into<String>) -> Self {
        DirectoryError::Search {
            message: message.into(),
        }
    }

    /// Create an add error.
    pub fn add(dn: impl Into<String>, message: impl Into<String>) -> Self {
        DirectoryError::Add {
            dn: dn.into(),
            message: message.into(),
        }
    }

    /// Create a modify error.
    pub fn modify(dn: impl Into<String>, message: impl Into<String>) -> Self {
        DirectoryError::Modify {
            dn: dn.into(),
            message: message.into(),
        }
    }

    /// Create a delete error.
    pub fn delete(dn: impl Into<String>, message: impl Into<String>) -> Self {
        DirectoryError::Delete {
            dn: dn.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        DirectoryError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::Bind { .. } => "BIND_ERROR",
            DirectoryError::Search { .. } => "SEARCH_ERROR",
            DirectoryError::Add { .. } => "ADD_ERROR",
            DirectoryError::Modify { .. } => "MODIFY_ERROR",
            DirectoryError::Delete { .. } => "DELETE_ERROR",
            DirectoryError::InvalidConfiguration { .. } => "INVALID_CONFIG",
        }
    }
}

/// Result type for directory transport operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
