//! YAML resource files.
//!
//! Nested mappings are flattened with `.` between names and sequence elements
//! get an `[i]` suffix, e.g. `menu.items[0]`.

use std::io::{Read, Write};

use log::{debug, warn};
use serde_yaml::{Mapping, Value};

use crate::{
    builder::BundleBuilder,
    error::Error,
    formats::key_path::MAX_ARRAY_INDEX,
    options::{FilterOptions, unknown_sequence_first},
    text::{Fallback, read_text},
    traits::ResourceFilter,
    types::Bundle,
};

/// Filter for the `YML` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFilter;

impl ResourceFilter for YamlFilter {
    fn parse(&self, input: &mut dyn Read, _options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let text = read_text(input, Fallback::Utf8)?.text;
        let root: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(&text)?
        };

        let mut builder = BundleBuilder::new(true);
        match root {
            // an empty document
            Value::Null => {}
            Value::Mapping(map) => flatten_mapping(&map, "", &mut builder)?,
            _ => return Err(Error::format("The root YAML element is not a mapping.")),
        }
        let bundle = builder.build();
        debug!("YML: parsed {} resource strings", bundle.len());
        Ok(bundle)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let mut root = Value::Mapping(Mapping::new());
        for rs in bundle.sorted_resource_strings_with(unknown_sequence_first(options)?) {
            let path = split_key(&rs.key)?;
            insert(&mut root, &path, Value::String(rs.value.clone()), &rs.key)?;
        }
        let text = serde_yaml::to_string(&root)?;
        output.write_all(text.as_bytes())?;
        debug!("YML: wrote {} resource strings", bundle.len());
        Ok(())
    }

    fn merge(
        &self,
        _base: &mut dyn Read,
        _output: &mut dyn Write,
        _bundle: &Bundle,
        _options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        Err(Error::UnsupportedOperation(
            "Merging YML resource is not supported.".to_string(),
        ))
    }
}

fn flatten_mapping(map: &Mapping, prefix: &str, builder: &mut BundleBuilder) -> Result<(), Error> {
    for (name, value) in map {
        let name = scalar_text(name)
            .ok_or_else(|| Error::format(format!("Unsupported YAML key under `{}`", prefix)))?;
        let key = if prefix.is_empty() {
            name
        } else {
            format!("{}.{}", prefix, name)
        };
        flatten_value(value, key, builder)?;
    }
    Ok(())
}

fn flatten_value(value: &Value, key: String, builder: &mut BundleBuilder) -> Result<(), Error> {
    match value {
        Value::Mapping(map) => flatten_mapping(map, &key, builder),
        Value::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(item, format!("{}[{}]", key, index), builder)?;
            }
            Ok(())
        }
        Value::Null => {
            warn!("YML: skipping `{}` without a value", key);
            Ok(())
        }
        Value::Tagged(_) => Err(Error::format(format!(
            "The value of YAML element {} is not a string.",
            key
        ))),
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                builder.add(key, text);
            }
            Ok(())
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Name(String),
    Index(usize),
}

/// Splits `a.b[0][1]` into its names and indices.
fn split_key(key: &str) -> Result<Vec<Step>, Error> {
    let mut steps = Vec::new();
    for part in key.split('.') {
        let (name, mut indices) = match part.find('[') {
            Some(open) if part.ends_with(']') => (&part[..open], &part[open..]),
            _ => (part, ""),
        };
        steps.push(Step::Name(name.to_string()));
        while let Some(rest) = indices.strip_prefix('[') {
            let close = rest
                .find(']')
                .ok_or_else(|| Error::format(format!("Bad sequence index in key {}", key)))?;
            let index = rest[..close]
                .parse()
                .map_err(|_| Error::format(format!("Bad sequence index in key {}", key)))?;
            steps.push(Step::Index(index));
            indices = &rest[close + 1..];
        }
    }
    Ok(steps)
}

fn insert(node: &mut Value, steps: &[Step], leaf: Value, key: &str) -> Result<(), Error> {
    let conflict = || Error::format(format!("The key {} conflicts with another resource key", key));
    let Some((first, rest)) = steps.split_first() else {
        return Err(conflict());
    };
    let empty_child = || match rest.first() {
        Some(Step::Index(_)) => Value::Sequence(Vec::new()),
        _ => Value::Mapping(Mapping::new()),
    };

    let slot = match (first, node) {
        (Step::Name(name), Value::Mapping(map)) => {
            let name = Value::String(name.clone());
            if rest.is_empty() {
                if map.get(&name).is_some_and(|existing| !existing.is_string()) {
                    return Err(conflict());
                }
                map.insert(name, leaf);
                return Ok(());
            }
            if !map.contains_key(&name) {
                map.insert(name.clone(), empty_child());
            }
            map.get_mut(&name).ok_or_else(conflict)?
        }
        (Step::Index(index), Value::Sequence(items)) => {
            let len = index
                .checked_add(1)
                .filter(|_| *index <= MAX_ARRAY_INDEX)
                .ok_or_else(|| {
                    Error::format(format!("The sequence index {} in key {} is too large", index, key))
                })?;
            if items.len() < len {
                items.resize(len, Value::Null);
            }
            if rest.is_empty() {
                items[*index] = leaf;
                return Ok(());
            }
            let slot = &mut items[*index];
            if slot.is_null() {
                *slot = empty_child();
            }
            slot
        }
        _ => return Err(conflict()),
    };
    insert(slot, rest, leaf, key)
}
