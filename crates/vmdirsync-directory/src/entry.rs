//! Directory entry snapshot types.

use serde::{Deserialize, Serialize};

/// A snapshot of a directory entry.
///
/// The entry itself is remote state; this struct only caches what a search
/// returned. Attributes keep the order the server returned them in, which
/// downstream aggregation relies on for deterministic merge order;
/// comparisons elsewhere treat multi-valued attributes with set semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished name identifying the entry.
    pub dn: String,

    /// Attribute name to value sequence, in arrival order.
    attributes: Vec<(String, Vec<String>)>,
}

impl DirectoryEntry {
    /// Create a new entry snapshot with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Set an attribute's value sequence, replacing any previous values
    /// but keeping the attribute's original position.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = values;
        } else {
            self.attributes.push((name, values));
        }
    }

    /// Set an attribute using the builder pattern.
    pub fn with(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.set(name, values);
        self
    }

    /// Get the values of an attribute, or an empty slice if absent.
    pub fn get(&self, name: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map_or(&[], |(_, values)| values.as_slice())
    }

    /// Get the first value of an attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).first().map(String::as_str)
    }

    /// Check whether the entry has at least one value for an attribute.
    pub fn has(&self, name: &str) -> bool {
        !self.get(name).is_empty()
    }

    /// Iterate over attribute name/values pairs in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.attributes.iter().map(|(n, v)| (n, v))
    }

    /// Number of attributes on the entry.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the entry carries no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Search scope for directory lookups.
///
/// Numeric codes follow the LDAP wire values (0 = base object,
/// 1 = single level, 2 = whole subtree); unknown codes fall back to
/// whole-subtree, which is also the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Search only the base object itself.
    Base,
    /// Search immediate children of the base object.
    OneLevel,
    /// Search the whole subtree under the base object.
    #[default]
    Subtree,
}

impl SearchScope {
    /// Resolve a scope from its numeric code.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => SearchScope::Base,
            1 => SearchScope::OneLevel,
            _ => SearchScope::Subtree,
        }
    }
}

impl std::fmt::Display for SearchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchScope::Base => write!(f, "base"),
            SearchScope::OneLevel => write!(f, "one_level"),
            SearchScope::Subtree => write!(f, "subtree"),
        }
    }
}
