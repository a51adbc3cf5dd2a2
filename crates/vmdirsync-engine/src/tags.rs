//! Aggregation of directory attributes into platform tags and custom
//! attributes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use vmdirsync_directory::DirectoryEntry;

use crate::inventory::VmRecord;
use crate::tagstore::to_tag_name;

/// Custom attribute recording whether the last sync succeeded.
pub const SYNC_SUCCESSFUL_ATTRIBUTE: &str = "LDAP Sync Successful";
/// Custom attribute carrying the human-readable sync status.
pub const SYNC_STATUS_ATTRIBUTE: &str = "LDAP Sync Status";
/// Custom attribute carrying the timestamp of the last sync attempt.
pub const SYNC_LAST_ATTEMPT_ATTRIBUTE: &str = "Last LDAP Sync Attempt";

/// A tag assignment value. Starts as a single tag and is promoted to a
/// list when a second distinct tag accumulates in the same category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Single(String),
    Many(Vec<String>),
}

impl TagValue {
    /// Add a tag, promoting to a list on the second distinct value.
    /// Duplicates are dropped.
    fn push(&mut self, tag: String) {
        match self {
            TagValue::Single(existing) => {
                if *existing != tag {
                    let first = std::mem::take(existing);
                    *self = TagValue::Many(vec![first, tag]);
                }
            }
            TagValue::Many(tags) => {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }
    }

    /// The tags in accumulation order.
    pub fn tags(&self) -> &[String] {
        match self {
            TagValue::Single(tag) => std::slice::from_ref(tag),
            TagValue::Many(tags) => tags,
        }
    }
}

/// The contributions of one attribute value: zero or more tags and zero
/// or more custom attribute values, both allowed at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMapping {
    /// (category, raw tag value) pairs. The value is normalized into a
    /// tag name at assignment time and need not equal the directory
    /// value.
    pub tags: Vec<(String, String)>,
    /// (display name, value) pairs.
    pub custom_attributes: Vec<(String, String)>,
}

impl AttributeMapping {
    /// A mapping contributing nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Add a tag contribution.
    pub fn with_tag(mut self, category: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((category.into(), value.into()));
        self
    }

    /// Add a custom attribute contribution.
    pub fn with_custom_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.custom_attributes.push((name.into(), value.into()));
        self
    }

    /// Check whether this mapping contributes nothing.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.custom_attributes.is_empty()
    }
}

/// Decides how each directory attribute value is mirrored onto the
/// platform. Implementations see the VM and the concrete value, so
/// policies can emit several categories for one value, rewrite the
/// value, or produce tags and custom attributes from the same pair.
pub trait AttributeClassifier: Send + Sync {
    fn classify(&self, vm: &VmRecord, attribute: &str, value: &str) -> AttributeMapping;
}

/// Classifier driven by static attribute mappings: every value of a
/// mapped attribute contributes as-is to the configured targets.
/// Unmapped attributes contribute nothing.
#[derive(Debug, Clone, Default)]
pub struct MappingClassifier {
    tag_categories: HashMap<String, Vec<String>>,
    custom_names: HashMap<String, Vec<String>>,
}

impl MappingClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an attribute to a tag category. An attribute may map to
    /// several categories and to custom attributes at the same time.
    pub fn tag(mut self, attribute: impl Into<String>, category: impl Into<String>) -> Self {
        self.tag_categories
            .entry(attribute.into())
            .or_default()
            .push(category.into());
        self
    }

    /// Map an attribute to a custom attribute display name.
    pub fn custom_attribute(
        mut self,
        attribute: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.custom_names
            .entry(attribute.into())
            .or_default()
            .push(name.into());
        self
    }
}

impl AttributeClassifier for MappingClassifier {
    fn classify(&self, _vm: &VmRecord, attribute: &str, value: &str) -> AttributeMapping {
        let mut mapping = AttributeMapping::none();
        if let Some(categories) = self.tag_categories.get(attribute) {
            for category in categories {
                mapping = mapping.with_tag(category, value);
            }
        }
        if let Some(names) = self.custom_names.get(attribute) {
            for name in names {
                mapping = mapping.with_custom_attribute(name, value);
            }
        }
        mapping
    }
}

/// Tag assignments keyed by category, in first-seen category order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAssignments {
    assignments: Vec<(String, TagValue)>,
}

impl TagAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag to a category, normalizing the raw value into a tag
    /// name first.
    pub fn add(&mut self, category: &str, raw_value: &str) {
        let tag = to_tag_name(raw_value);
        if tag.is_empty() {
            return;
        }
        match self.assignments.iter_mut().find(|(c, _)| c == category) {
            Some((_, value)) => value.push(tag),
            None => self
                .assignments
                .push((category.to_string(), TagValue::Single(tag))),
        }
    }

    /// Look up the tags assigned in a category.
    pub fn get(&self, category: &str) -> Option<&TagValue> {
        self.assignments
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.assignments.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Custom attribute assignments, in first-seen name order. A second
/// value for the same name is appended with a comma separator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAttributeAssignments {
    assignments: Vec<(String, String)>,
}

impl CustomAttributeAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value under a display name, concatenating onto any value
    /// already accumulated.
    pub fn add(&mut self, name: &str, value: &str) {
        match self.assignments.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => self
                .assignments
                .push((name.to_string(), value.to_string())),
        }
    }

    /// Set a value under a display name, replacing any accumulated value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.assignments.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.assignments.push((name.to_string(), value)),
        }
    }

    /// Look up the accumulated value for a display name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.assignments.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Outcome of a sync pass, recorded on the VM as custom attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Whether the sync succeeded.
    pub successful: bool,
    /// Human-readable status.
    pub status: String,
    /// When the sync was attempted.
    pub attempted_at: DateTime<Utc>,
}

impl Default for SyncStatus {
    /// The state recorded before any sync has completed.
    fn default() -> Self {
        Self {
            successful: false,
            status: "Unknown".to_string(),
            attempted_at: Utc::now(),
        }
    }
}

impl SyncStatus {
    /// Status for a completed sync.
    pub fn success() -> Self {
        Self {
            successful: true,
            status: "Successful".to_string(),
            attempted_at: Utc::now(),
        }
    }

    /// Status for a failed sync, carrying the diagnostic.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            successful: false,
            status: reason.into(),
            attempted_at: Utc::now(),
        }
    }
}

/// Accumulates tag and custom attribute assignments from the directory
/// entries matching a VM.
///
/// Entries are absorbed in the order given; within an entry, attributes
/// contribute in entry attribute order and values in value order. The
/// result is deterministic for a given input ordering.
pub struct TagAggregator<C: AttributeClassifier> {
    classifier: C,
    tags: TagAssignments,
    custom_attributes: CustomAttributeAssignments,
}

impl<C: AttributeClassifier> TagAggregator<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            tags: TagAssignments::new(),
            custom_attributes: CustomAttributeAssignments::new(),
        }
    }

    /// Absorb one directory entry's attributes for the given VM.
    pub fn absorb(&mut self, vm: &VmRecord, entry: &DirectoryEntry) {
        for (attribute, values) in entry.iter() {
            for value in values {
                let mapping = self.classifier.classify(vm, attribute, value);
                if mapping.is_empty() {
                    debug!(attribute = %attribute, "Value not mirrored, skipping");
                    continue;
                }
                for (category, tag_value) in &mapping.tags {
                    self.tags.add(category, tag_value);
                }
                for (name, attr_value) in &mapping.custom_attributes {
                    self.custom_attributes.add(name, attr_value);
                }
            }
        }
    }

    /// Finish aggregation, stamping the sync status onto the custom
    /// attributes.
    pub fn finalize(self, status: &SyncStatus) -> (TagAssignments, CustomAttributeAssignments) {
        let mut custom_attributes = self.custom_attributes;
        custom_attributes.set(SYNC_SUCCESSFUL_ATTRIBUTE, status.successful.to_string());
        custom_attributes.set(SYNC_STATUS_ATTRIBUTE, status.status.clone());
        custom_attributes.set(
            SYNC_LAST_ATTEMPT_ATTRIBUTE,
            status.attempted_at.to_rfc3339(),
        );
        (self.tags, custom_attributes)
    }
}
