//! Desired attribute state and modify operations.

use serde::{Deserialize, Serialize};

use crate::entry::DirectoryEntry;

/// A desired value for a single attribute: either a scalar or a sequence.
///
/// Policy code frequently produces scalars ("the hostname") and sequences
/// ("the object classes") for different attributes of the same entry, and
/// the distinction matters when operations are generated, so both shapes
/// are kept rather than normalizing to always-array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DesiredValue {
    /// A single value.
    Single(String),
    /// A sequence of values.
    Many(Vec<String>),
}

impl DesiredValue {
    /// Values with surrounding whitespace trimmed, empty values dropped.
    pub fn trimmed(&self) -> Vec<String> {
        match self {
            DesiredValue::Single(v) => {
                let t = v.trim();
                if t.is_empty() {
                    vec![]
                } else {
                    vec![t.to_string()]
                }
            }
            DesiredValue::Many(values) => values
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Check whether this value is empty after trimming.
    pub fn is_empty(&self) -> bool {
        self.trimmed().is_empty()
    }
}

impl From<&str> for DesiredValue {
    fn from(v: &str) -> Self {
        DesiredValue::Single(v.to_string())
    }
}

impl From<String> for DesiredValue {
    fn from(v: String) -> Self {
        DesiredValue::Single(v)
    }
}

impl From<Vec<String>> for DesiredValue {
    fn from(values: Vec<String>) -> Self {
        DesiredValue::Many(values)
    }
}

impl From<Vec<&str>> for DesiredValue {
    fn from(values: Vec<&str>) -> Self {
        DesiredValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// The desired attribute state for one directory entry.
///
/// Insertion order is preserved so that generated operations, and the
/// merge order of downstream consumers, are deterministic. Attributes
/// present on the remote entry but never mentioned here are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredAttributes {
    entries: Vec<(String, DesiredValue)>,
}

impl DesiredAttributes {
    /// Create an empty desired attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing entry's attributes.
    ///
    /// This is the default reconciliation policy: keep what the entry
    /// already has and let callers overlay changes on top.
    pub fn from_entry(entry: &DirectoryEntry) -> Self {
        let mut desired = Self::new();
        for (name, values) in entry.iter() {
            desired.set(name.clone(), DesiredValue::Many(values.clone()));
        }
        desired
    }

    /// Set the desired value for an attribute, replacing any previous value
    /// but keeping its original position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<DesiredValue>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Set an attribute using the builder pattern.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<DesiredValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Overlay an externally supplied override value.
    ///
    /// Multi-line values are split into a sequence, one value per line,
    /// so a single dialog field can express a multi-valued attribute.
    pub fn overlay(&mut self, name: impl Into<String>, raw: &str) {
        let lines: Vec<String> = raw.lines().map(str::to_string).collect();
        if lines.len() > 1 {
            self.set(name, DesiredValue::Many(lines));
        } else {
            self.set(name, DesiredValue::Single(raw.to_string()));
        }
    }

    /// Get the desired value for an attribute.
    pub fn get(&self, name: &str) -> Option<&DesiredValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterate over attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DesiredValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of desired attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no attributes are desired.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A single operation in a directory modify request.
///
/// Delete carries no values; Add carries exactly one trimmed value
/// (multi-valued additions are split into one Add per value); Replace
/// carries the full trimmed desired value set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AttributeOperation {
    /// Add one value to an attribute.
    Add { attribute: String, value: String },
    /// Replace all values of an attribute.
    Replace {
        attribute: String,
        values: Vec<String>,
    },
    /// Remove an attribute entirely.
    Delete { attribute: String },
}

impl AttributeOperation {
    /// The attribute this operation targets.
    pub fn attribute(&self) -> &str {
        match self {
            AttributeOperation::Add { attribute, .. }
            | AttributeOperation::Replace { attribute, .. }
            | AttributeOperation::Delete { attribute } => attribute,
        }
    }
}

impl std::fmt::Display for AttributeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeOperation::Add { attribute, value } => {
                write!(f, "add {attribute}={value}")
            }
            AttributeOperation::Replace { attribute, values } => {
                write!(f, "replace {attribute}={}", values.join(","))
            }
            AttributeOperation::Delete { attribute } => write!(f, "delete {attribute}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desired_value_trimming() {
        let v = DesiredValue::Single("  spaced  ".to_string());
        assert_eq!(v.trimmed(), vec!["spaced".to_string()]);
        assert!(!v.is_empty());

        let v = DesiredValue::Single("   ".to_string());
        assert!(v.is_empty());

        let v = DesiredValue::Many(vec![" a ".to_string(), String::new(), "b".to_string()]);
        assert_eq!(v.trimmed(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_desired_attributes_preserve_order() {
        let mut desired = DesiredAttributes::new();
        desired.set("cn", "vm1");
        desired.set("mail", "a@example.com");
        desired.set("cn", "vm1-renamed");

        let names: Vec<&str> = desired.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["cn", "mail"]);
        assert_eq!(
            desired.get("cn"),
            Some(&DesiredValue::Single("vm1-renamed".to_string()))
        );
    }

    #[test]
    fn test_from_entry_round_trip() {
        let entry = DirectoryEntry::new("cn=vm1,dc=example,dc=com")
            .with("cn", vec!["vm1".to_string()])
            .with("objectClass", vec!["top".to_string(), "nshost".to_string()]);

        let desired = DesiredAttributes::from_entry(&entry);
        assert_eq!(desired.len(), 2);
        assert_eq!(
            desired.get("objectClass").unwrap().trimmed(),
            vec!["top".to_string(), "nshost".to_string()]
        );
    }

    #[test]
    fn test_overlay_splits_multiline() {
        let mut desired = DesiredAttributes::new();
        desired.overlay("nsHardwarePlatform", "x86_64");
        desired.overlay("memberOf", "group-a\ngroup-b");

        assert_eq!(
            desired.get("nsHardwarePlatform"),
            Some(&DesiredValue::Single("x86_64".to_string()))
        );
        assert_eq!(
            desired.get("memberOf"),
            Some(&DesiredValue::Many(vec![
                "group-a".to_string(),
                "group-b".to_string()
            ]))
        );
    }

    #[test]
    fn test_operation_display() {
        let op = AttributeOperation::Replace {
            attribute: "mail".to_string(),
            values: vec!["new@example.com".to_string()],
        };
        assert_eq!(op.to_string(), "replace mail=new@example.com");
        assert_eq!(op.attribute(), "mail");
    }
}
