//! Email address validation against the directory, with a tag-backed
//! positive cache.
//!
//! An address is valid when a directory entry carries it in the email
//! attribute; the directory is the sole authority, so every uncached
//! non-blank address is searched. Addresses that validate once are
//! recorded as tags in a dedicated category, so repeat syncs of the
//! same owners never touch the directory again.

use std::sync::Arc;

use tracing::debug;

use vmdirsync_directory::{DirectoryConfig, DirectoryOps, SearchScope};

use crate::error::SyncResult;
use crate::tagstore::{to_tag_name, TagStore};

/// Tag category caching addresses that have validated successfully.
pub const VALID_EMAILS_CATEGORY: &str = "valid_emails";

/// Directory attribute searched for candidate addresses.
pub const DEFAULT_EMAIL_ATTRIBUTE: &str = "mail";

/// Result of validating a single address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// The address as given, trimmed.
    pub address: String,
    /// Whether the directory knows this address.
    pub valid: bool,
    /// Whether validity came from the cache rather than a search.
    pub from_cache: bool,
}

/// The input address list split into the addresses the directory knows
/// and the ones it does not. Together the two sides contain every input
/// occurrence exactly once, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressPartition {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

/// Validates candidate notification addresses against the directory,
/// consulting and feeding the positive cache.
pub struct EmailValidator {
    directory: Arc<dyn DirectoryOps>,
    tag_store: Arc<dyn TagStore>,
    config: DirectoryConfig,
    email_attribute: String,
}

impl EmailValidator {
    /// Create a validator searching the configured treebase with the
    /// default email attribute and cache category.
    pub fn new(
        directory: Arc<dyn DirectoryOps>,
        tag_store: Arc<dyn TagStore>,
        config: DirectoryConfig,
    ) -> Self {
        Self {
            directory,
            tag_store,
            config,
            email_attribute: DEFAULT_EMAIL_ATTRIBUTE.to_string(),
        }
    }

    /// Override the attribute searched for addresses.
    pub fn with_email_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.email_attribute = attribute.into();
        self
    }

    /// Validate one address. A cache hit short-circuits the directory
    /// search; a fresh hit in the directory records the address in the
    /// cache. Valid once means valid forever. Only a blank address
    /// skips the search.
    pub async fn validate(&self, address: &str) -> SyncResult<ValidationOutcome> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(ValidationOutcome {
                address: String::new(),
                valid: false,
                from_cache: false,
            });
        }

        let tag = to_tag_name(address);
        if self
            .tag_store
            .tag_exists(VALID_EMAILS_CATEGORY, &tag)
            .await?
        {
            debug!(address = %address, "Address already known valid");
            return Ok(ValidationOutcome {
                address: address.to_string(),
                valid: true,
                from_cache: true,
            });
        }

        let entries = self
            .directory
            .search(
                &self.config.treebase,
                SearchScope::Subtree,
                &self.email_attribute,
                address,
            )
            .await?;
        let valid = !entries.is_empty();
        if valid {
            self.tag_store
                .ensure_tag(VALID_EMAILS_CATEGORY, &tag, address)
                .await?;
        } else {
            debug!(address = %address, "No directory entry carries this address");
        }
        Ok(ValidationOutcome {
            address: address.to_string(),
            valid,
            from_cache: false,
        })
    }

    /// Split a list of addresses into the valid and invalid sides.
    /// Order is preserved and duplicate inputs land on their side once
    /// per occurrence; the cache ensures each distinct address is
    /// searched at most once.
    pub async fn partition(&self, addresses: &[String]) -> SyncResult<AddressPartition> {
        let mut partition = AddressPartition::default();
        for address in addresses {
            let outcome = self.validate(address).await?;
            if outcome.valid {
                partition.valid.push(outcome.address);
            } else {
                partition.invalid.push(outcome.address);
            }
        }
        Ok(partition)
    }
}
