//! Directory connection and policy configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};

/// Transport encryption mode for the directory connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionMode {
    /// Plain LDAP, no encryption.
    #[default]
    None,
    /// LDAPS (TLS from connection start).
    SimpleTls,
    /// STARTTLS upgrade on a plain connection.
    StartTls,
}

/// Configuration for the directory connection and sync policy.
///
/// The password is held decrypted in memory; the surrounding platform's
/// configuration store is responsible for encryption at rest. It is
/// redacted in Debug output and by [`DirectoryConfig::redacted`].
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory server hostname or IP address.
    pub server: String,

    /// Directory server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind DN or username for authentication.
    pub username: String,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Transport encryption mode.
    #[serde(default)]
    pub encryption: EncryptionMode,

    /// Base treebase under which searches are scoped.
    pub treebase: String,

    /// Attribute used to match entries to VM hostnames.
    #[serde(default = "default_hostname_filter_attribute")]
    pub hostname_filter_attribute: String,

    /// Number of VMs per dispatched batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,
}

fn default_port() -> u16 {
    389
}

fn default_hostname_filter_attribute() -> String {
    "cn".to_string()
}

fn default_batch_size() -> usize {
    10
}

fn default_connection_timeout() -> u64 {
    30
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field(
                "password",
                &self.password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("encryption", &self.encryption)
            .field("treebase", &self.treebase)
            .field("hostname_filter_attribute", &self.hostname_filter_attribute)
            .field("batch_size", &self.batch_size)
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .finish()
    }
}

impl DirectoryConfig {
    /// Create a new configuration with required fields.
    pub fn new(
        server: impl Into<String>,
        treebase: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port: default_port(),
            username: username.into(),
            password: None,
            encryption: EncryptionMode::None,
            treebase: treebase.into(),
            hostname_filter_attribute: default_hostname_filter_attribute(),
            batch_size: default_batch_size(),
            connection_timeout_secs: default_connection_timeout(),
        }
    }

    /// Set the bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Enable LDAPS.
    #[must_use]
    pub fn with_tls(mut self) -> Self {
        self.encryption = EncryptionMode::SimpleTls;
        self.port = 636;
        self
    }

    /// Enable STARTTLS.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.encryption = EncryptionMode::StartTls;
        self
    }

    /// Set the hostname filter attribute.
    pub fn with_hostname_filter_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.hostname_filter_attribute = attribute.into();
        self
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Get the directory URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.encryption == EncryptionMode::SimpleTls {
            "ldaps"
        } else {
            "ldap"
        };
        format!("{}://{}:{}", scheme, self.server, self.port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.server.is_empty() {
            return Err(DirectoryError::invalid_configuration("server is required"));
        }
        if self.treebase.is_empty() {
            return Err(DirectoryError::invalid_configuration(
                "treebase is required",
            ));
        }
        if self.username.is_empty() {
            return Err(DirectoryError::invalid_configuration(
                "username is required",
            ));
        }
        if self.batch_size == 0 {
            return Err(DirectoryError::invalid_configuration(
                "batch_size must be at least 1",
            ));
        }
        Ok(())
    }

    /// Create a redacted version of this config for logging and display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.password.is_some() {
            config.password = Some("***REDACTED***".to_string());
        }
        config
    }
}
