//! Attribute diffing: computing the minimal modify request that brings an
//! existing entry to its desired state.

use tracing::debug;

use vmdirsync_directory::{AttributeOperation, DesiredAttributes, DirectoryEntry};

use crate::error::{SyncError, SyncResult};

/// Computes the ordered operation list transforming an existing entry's
/// attributes into a desired attribute set.
///
/// The desired set is the iteration domain: attributes present only on
/// the existing entry are never touched. All string values are trimmed
/// before comparison and before being placed in an operation.
pub struct AttributeDiffEngine;

impl AttributeDiffEngine {
    /// Diff an existing entry against the desired attributes.
    ///
    /// Per desired attribute:
    /// - desired empty, existing present: delete
    /// - desired present, existing empty: add, one operation per value
    ///   when the desired value is a multi-element sequence (some
    ///   directory servers reject combined multi-value adds)
    /// - desired equals existing value-for-value: no operation
    /// - both present and not equal: replace with the full desired set
    pub fn diff(
        existing: &DirectoryEntry,
        desired: &DesiredAttributes,
    ) -> SyncResult<Vec<AttributeOperation>> {
        let mut operations = Vec::new();

        for (attribute, value) in desired.iter() {
            let desired_values = value.trimmed();
            let existing_values: Vec<String> = existing
                .get(attribute)
                .iter()
                .map(|v| v.trim().to_string())
                .collect();

            if desired_values.is_empty() && !existing_values.is_empty() {
                operations.push(AttributeOperation::Delete {
                    attribute: attribute.to_string(),
                });
            } else if !desired_values.is_empty() && existing_values.is_empty() {
                for value in desired_values {
                    operations.push(AttributeOperation::Add {
                        attribute: attribute.to_string(),
                        value,
                    });
                }
            } else if desired_values == existing_values {
                // Covers the both-empty case as well: nothing to do.
                debug!(
                    attribute = %attribute,
                    "No operation for attribute; existing value already equals desired value"
                );
            } else if !desired_values.is_empty() && !existing_values.is_empty() {
                operations.push(AttributeOperation::Replace {
                    attribute: attribute.to_string(),
                    values: desired_values,
                });
            } else {
                return Err(SyncError::DiffComputation {
                    attribute: attribute.to_string(),
                });
            }
        }

        Ok(operations)
    }
}
