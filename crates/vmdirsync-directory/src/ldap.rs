//! LDAP implementation of the directory transport.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use crate::config::{DirectoryConfig, EncryptionMode};
use crate::entry::{DirectoryEntry, SearchScope};
use crate::error::{DirectoryError, DirectoryResult};
use crate::operation::{AttributeOperation, DesiredAttributes};
use crate::transport::DirectoryOps;

/// LDAP-backed directory transport.
///
/// Each operation binds a fresh connection and unbinds when done,
/// whether the operation succeeded or not.
pub struct LdapDirectory {
    config: DirectoryConfig,
}

impl LdapDirectory {
    /// Create a new LDAP transport with the given configuration.
    pub fn new(config: DirectoryConfig) -> DirectoryResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Connect and bind to the directory server.
    async fn bind(&self) -> DirectoryResult<Ldap> {
        let url = self.config.url();
        debug!(url = %url, "Connecting to directory server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.connection_timeout_secs))
            .set_starttls(self.config.encryption == EncryptionMode::StartTls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| DirectoryError::bind(&self.config.server, e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let password = self.config.password.as_deref().unwrap_or("");
        debug!(username = %self.config.username, "Performing LDAP bind");

        let result = ldap
            .simple_bind(&self.config.username, password)
            .await
            .map_err(|e| DirectoryError::bind(&self.config.server, e.to_string()))?;

        if result.rc != 0 {
            return Err(DirectoryError::bind(
                &self.config.server,
                format!("bind failed with code {}: {}", result.rc, result.text),
            ));
        }

        Ok(ldap)
    }

    /// Escape special characters in LDAP filter values (RFC 4515).
    fn escape_filter_value(value: &str) -> String {
        value
            .replace('\\', "\\5c")
            .replace('*', "\\2a")
            .replace('(', "\\28")
            .replace(')', "\\29")
            .replace('\0', "\\00")
    }

    fn to_ldap_scope(scope: SearchScope) -> Scope {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }

    /// Convert an LDAP search entry to a snapshot.
    fn to_directory_entry(entry: SearchEntry) -> DirectoryEntry {
        let mut snapshot = DirectoryEntry::new(entry.dn);
        for (name, values) in entry.attrs {
            snapshot.set(name, values);
        }
        snapshot
    }

    fn to_mods(operations: &[AttributeOperation]) -> Vec<Mod<String>> {
        operations
            .iter()
            .map(|op| match op {
                AttributeOperation::Add { attribute, value } => {
                    let mut values = HashSet::new();
                    values.insert(value.clone());
                    Mod::Add(attribute.clone(), values)
                }
                AttributeOperation::Replace { attribute, values } => {
                    Mod::Replace(attribute.clone(), values.iter().cloned().collect())
                }
                AttributeOperation::Delete { attribute } => {
                    Mod::Delete(attribute.clone(), HashSet::new())
                }
            })
            .collect()
    }

    async fn run_search(
        &self,
        ldap: &mut Ldap,
        treebase: &str,
        scope: SearchScope,
        filter_attribute: &str,
        filter_value: &str,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let filter = format!(
            "({}={})",
            filter_attribute,
            Self::escape_filter_value(filter_value)
        );
        debug!(treebase = %treebase, filter = %filter, scope = %scope, "Directory search");

        let result = ldap
            .search(treebase, Self::to_ldap_scope(scope), &filter, vec!["*"])
            .await
            .map_err(|e| DirectoryError::search(e.to_string()))?;

        let (entries, _res) = result
            .success()
            .map_err(|e| DirectoryError::search(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|e| Self::to_directory_entry(SearchEntry::construct(e)))
            .collect())
    }
}

#[async_trait]
impl DirectoryOps for LdapDirectory {
    #[instrument(skip(self))]
    async fn search(
        &self,
        treebase: &str,
        scope: SearchScope,
        filter_attribute: &str,
        filter_value: &str,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let mut ldap = self.bind().await?;
        let result = self
            .run_search(&mut ldap, treebase, scope, filter_attribute, filter_value)
            .await;
        let _ = ldap.unbind().await;
        result
    }

    #[instrument(skip(self, attributes))]
    async fn add(&self, dn: &str, attributes: &DesiredAttributes) -> DirectoryResult<()> {
        let attrs: Vec<(String, HashSet<String>)> = attributes
            .iter()
            .map(|(name, value)| {
                let values: HashSet<String> = value.trimmed().into_iter().collect();
                (name.to_string(), values)
            })
            .filter(|(_, values)| !values.is_empty())
            .collect();

        let mut ldap = self.bind().await?;
        let result = async {
            let res = ldap
                .add(dn, attrs)
                .await
                .map_err(|e| DirectoryError::add(dn, e.to_string()))?;
            res.success()
                .map_err(|e| DirectoryError::add(dn, e.to_string()))?;
            info!(dn = %dn, "Added directory entry");
            Ok(())
        }
        .await;
        let _ = ldap.unbind().await;
        result
    }

    #[instrument(skip(self, operations))]
    async fn modify(&self, dn: &str, operations: &[AttributeOperation]) -> DirectoryResult<()> {
        let mods = Self::to_mods(operations);

        let mut ldap = self.bind().await?;
        let result = async {
            let res = ldap
                .modify(dn, mods)
                .await
                .map_err(|e| DirectoryError::modify(dn, e.to_string()))?;
            res.success()
                .map_err(|e| DirectoryError::modify(dn, e.to_string()))?;
            info!(dn = %dn, operations = operations.len(), "Modified directory entry");
            Ok(())
        }
        .await;
        let _ = ldap.unbind().await;
        result
    }

    #[instrument(skip(self))]
    async fn delete(&self, dn: &str) -> DirectoryResult<()> {
        let mut ldap = self.bind().await?;
        let result = async {
            let res = ldap
                .delete(dn)
                .await
                .map_err(|e| DirectoryError::delete(dn, e.to_string()))?;
            res.success()
                .map_err(|e| DirectoryError::delete(dn, e.to_string()))?;
            info!(dn = %dn, "Deleted directory entry");
            Ok(())
        }
        .await;
        let _ = ldap.unbind().await;
        result
    }
}
