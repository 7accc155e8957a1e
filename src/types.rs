//! Core, format-agnostic types for resfilter.
//! Filters parse into these; writers serialize these.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    fmt::Display,
};

use serde::{Deserialize, Serialize};

/// One translatable unit of a [`Bundle`].
///
/// Equality is structural over key, value, source value, notes and sequence number.
/// Metadata is side information and does not take part in comparisons.
#[derive(Debug, Clone, Eq, Deserialize, Serialize)]
pub struct ResourceString {
    /// Identifier, unique within a bundle.
    pub key: String,

    /// The string content, possibly empty.
    pub value: String,

    /// Original-language value, used by bilingual formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_value: Option<String>,

    /// Position in the original file. `None` means unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u32>,

    /// Comments attached to this entry, in file order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,

    /// Format-specific side information.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ResourceString {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        ResourceString {
            key: key.into(),
            value: value.into(),
            source_value: None,
            sequence_number: None,
            notes: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_source_value(mut self, source_value: impl Into<String>) -> Self {
        self.source_value = Some(source_value.into());
        self
    }

    pub fn with_sequence_number(mut self, sequence_number: u32) -> Self {
        self.sequence_number = Some(sequence_number);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_notes<I, S>(mut self, notes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.notes.extend(notes.into_iter().map(Into::into));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Total order used for deterministic output.
    ///
    /// Known sequence numbers come first in ascending order (or last when
    /// `unknown_first` is set); ties fall back to key, value, source value and notes.
    pub fn sort_cmp(&self, other: &Self, unknown_first: bool) -> Ordering {
        let by_sequence = match (self.sequence_number, other.sequence_number) {
            (Some(a), Some(b)) => a.cmp(&b),
            (None, None) => Ordering::Equal,
            (None, Some(_)) if unknown_first => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) if unknown_first => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
        };
        by_sequence
            .then_with(|| self.key.cmp(&other.key))
            .then_with(|| self.value.cmp(&other.value))
            .then_with(|| self.source_value.cmp(&other.source_value))
            .then_with(|| self.notes.cmp(&other.notes))
    }
}

impl PartialEq for ResourceString {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.value == other.value
            && self.source_value == other.source_value
            && self.notes == other.notes
            && self.sequence_number == other.sequence_number
    }
}

impl Display for ResourceString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.sequence_number {
            Some(n) => write!(f, "#{} ", n)?,
            None => write!(f, "#- ")?,
        }
        write!(f, "Key={} Value={}", self.key, self.value)?;
        if let Some(source) = &self.source_value {
            write!(f, " Source={}", source)?;
        }
        if !self.notes.is_empty() {
            write!(f, " Notes={:?}", self.notes)?;
        }
        Ok(())
    }
}

/// One language's full resource content.
///
/// Usually built with [`crate::builder::BundleBuilder`], which keeps keys unique and
/// numbers entries in file order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Bundle {
    /// All resource strings; keys are unique.
    #[serde(default)]
    pub resource_strings: Vec<ResourceString>,

    /// Bundle level comments, in file order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,

    /// Language code carried inside the file body, e.g. XLIFF `target-language`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_language_code: Option<String>,

    /// Source language code carried inside the file body, e.g. XLIFF `source-language`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_source_language_code: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Bundle {
    pub fn is_empty(&self) -> bool {
        self.resource_strings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resource_strings.len()
    }

    pub fn get(&self, key: &str) -> Option<&ResourceString> {
        self.resource_strings.iter().find(|rs| rs.key == key)
    }

    /// Resource strings in output order, unknown sequence numbers last.
    pub fn sorted_resource_strings(&self) -> Vec<&ResourceString> {
        self.sorted_resource_strings_with(false)
    }

    /// Resource strings in output order.
    pub fn sorted_resource_strings_with(&self, unknown_first: bool) -> Vec<&ResourceString> {
        let mut sorted: Vec<&ResourceString> = self.resource_strings.iter().collect();
        sorted.sort_by(|a, b| a.sort_cmp(b, unknown_first));
        sorted
    }

    /// Key to value lookup table used by merge implementations.
    pub fn value_map(&self) -> HashMap<&str, &str> {
        self.resource_strings
            .iter()
            .map(|rs| (rs.key.as_str(), rs.value.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_of(strings: Vec<ResourceString>) -> Bundle {
        Bundle {
            resource_strings: strings,
            ..Default::default()
        }
    }

    #[test]
    fn test_sorted_by_sequence_number_then_unknown_last() {
        let bundle = bundle_of(vec![
            ResourceString::new("z", "last"),
            ResourceString::new("b", "two").with_sequence_number(2),
            ResourceString::new("a", "one").with_sequence_number(1),
            ResourceString::new("y", "unknown"),
        ]);
        let keys: Vec<&str> = bundle
            .sorted_resource_strings()
            .iter()
            .map(|rs| rs.key.as_str())
            .collect();
        assert_eq!(keys, vec!["a", "b", "y", "z"]);
    }

    #[test]
    fn test_unknown_sequence_first() {
        let bundle = bundle_of(vec![
            ResourceString::new("a", "one").with_sequence_number(1),
            ResourceString::new("b", "unknown"),
        ]);
        let keys: Vec<&str> = bundle
            .sorted_resource_strings_with(true)
            .iter()
            .map(|rs| rs.key.as_str())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_ties_broken_by_key_value_source_and_notes() {
        let a = ResourceString::new("k", "v").with_sequence_number(3);
        let b = ResourceString::new("k", "w").with_sequence_number(3);
        let c = ResourceString::new("k", "w")
            .with_sequence_number(3)
            .with_source_value("s");
        let d = ResourceString::new("k", "w")
            .with_sequence_number(3)
            .with_source_value("s")
            .with_note("n");
        assert_eq!(a.sort_cmp(&b, false), Ordering::Less);
        assert_eq!(b.sort_cmp(&c, false), Ordering::Less);
        assert_eq!(c.sort_cmp(&d, false), Ordering::Less);
        assert_eq!(d.sort_cmp(&d.clone(), false), Ordering::Equal);
    }

    #[test]
    fn test_equality_ignores_metadata() {
        let a = ResourceString::new("k", "v").with_metadata("color", "red");
        let b = ResourceString::new("k", "v");
        assert_eq!(a, b);
        assert_ne!(a, b.with_note("different"));
    }

    #[test]
    fn test_value_map_and_get() {
        let bundle = bundle_of(vec![ResourceString::new("greeting", "Hello")]);
        assert_eq!(bundle.value_map().get("greeting"), Some(&"Hello"));
        assert_eq!(bundle.get("greeting").map(|rs| rs.value.as_str()), Some("Hello"));
        assert!(bundle.get("missing").is_none());
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn test_display() {
        let rs = ResourceString::new("k", "v").with_sequence_number(7);
        assert_eq!(rs.to_string(), "#7 Key=k Value=v");
    }
}
