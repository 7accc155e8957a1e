use std::collections::{BTreeMap, HashMap};

use log::warn;

use crate::{
    error::Error,
    types::{Bundle, ResourceString},
};

/// Builder for assembling a [`Bundle`] while a filter walks its input.
///
/// In auto mode every added resource string receives the next sequence number,
/// starting at 1, so the bundle remembers file order.
///
/// # Example
///
/// ```rust
/// use resfilter::builder::BundleBuilder;
///
/// let mut builder = BundleBuilder::new(true);
/// builder.add("greeting", "Hello").add("farewell", "Bye");
/// builder.note("Sample bundle");
/// let bundle = builder.build();
///
/// assert_eq!(bundle.get("farewell").unwrap().sequence_number, Some(2));
/// assert_eq!(bundle.notes, vec!["Sample bundle".to_string()]);
/// ```
#[derive(Debug)]
pub struct BundleBuilder {
    auto_sequence_numbers: bool,
    next_sequence_number: u32,
    resource_strings: Vec<ResourceString>,
    positions: HashMap<String, usize>,
    notes: Vec<String>,
    embedded_language_code: Option<String>,
    embedded_source_language_code: Option<String>,
    metadata: BTreeMap<String, String>,
}

impl BundleBuilder {
    /// Creates an empty builder.
    pub fn new(auto_sequence_numbers: bool) -> Self {
        Self {
            auto_sequence_numbers,
            next_sequence_number: 1,
            resource_strings: Vec::new(),
            positions: HashMap::new(),
            notes: Vec::new(),
            embedded_language_code: None,
            embedded_source_language_code: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Adds a plain key/value pair.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(ResourceString::new(key, value));
        self
    }

    /// Adds a fully populated resource string.
    ///
    /// In auto mode the string must not carry its own sequence number; the builder
    /// assigns one instead.
    pub fn add_resource_string(&mut self, resource_string: ResourceString) -> Result<&mut Self, Error> {
        if self.auto_sequence_numbers && resource_string.sequence_number.is_some() {
            return Err(Error::UnsupportedOperation(
                "explicit sequence numbers are not allowed in auto-sequence-number mode"
                    .to_string(),
            ));
        }
        self.push(resource_string);
        Ok(self)
    }

    fn push(&mut self, mut resource_string: ResourceString) {
        if let Some(&index) = self.positions.get(&resource_string.key) {
            // Same key again: the later value wins, the first position is kept.
            warn!("duplicate key `{}`; keeping the last value", resource_string.key);
            let existing = &mut self.resource_strings[index];
            existing.value = resource_string.value;
            if resource_string.source_value.is_some() {
                existing.source_value = resource_string.source_value;
            }
            existing.notes.append(&mut resource_string.notes);
            existing.metadata.append(&mut resource_string.metadata);
            return;
        }

        if self.auto_sequence_numbers {
            resource_string.sequence_number = Some(self.next_sequence_number);
            self.next_sequence_number += 1;
        }
        self.positions
            .insert(resource_string.key.clone(), self.resource_strings.len());
        self.resource_strings.push(resource_string);
    }

    pub fn note(&mut self, note: impl Into<String>) -> &mut Self {
        self.notes.push(note.into());
        self
    }

    pub fn notes<I, S>(&mut self, notes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.notes.extend(notes.into_iter().map(Into::into));
        self
    }

    pub fn embedded_language_code(&mut self, code: impl Into<String>) -> &mut Self {
        self.embedded_language_code = Some(code.into());
        self
    }

    pub fn embedded_source_language_code(&mut self, code: impl Into<String>) -> &mut Self {
        self.embedded_source_language_code = Some(code.into());
        self
    }

    pub fn metadata(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Bundle {
        Bundle {
            resource_strings: self.resource_strings,
            notes: self.notes,
            embedded_language_code: self.embedded_language_code,
            embedded_source_language_code: self.embedded_source_language_code,
            metadata: self.metadata,
        }
    }
}
