//! Nested JSON resource files.
//!
//! Every string leaf becomes one resource string whose key is the leaf's
//! [key path](crate::formats::key_path). Writing rebuilds the nested structure.

use std::io::{Read, Write};

use log::debug;
use serde_json::{Map, Value};

use crate::{
    builder::BundleBuilder,
    error::Error,
    formats::key_path::{MAX_ARRAY_INDEX, PathSegment, decode_path, encode_index, encode_member},
    options::{FilterOptions, unknown_sequence_first},
    text::{Fallback, read_text},
    traits::ResourceFilter,
    types::Bundle,
};

/// Filter for the `JSON` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFilter;

impl ResourceFilter for JsonFilter {
    fn parse(&self, input: &mut dyn Read, _options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let root = read_json(input)?;
        let Value::Object(map) = root else {
            return Err(Error::format("The root JSON element is not a JSON object."));
        };

        let mut builder = BundleBuilder::new(true);
        flatten_object(&map, None, ArrayHandling::Elements, &mut builder)?;
        let bundle = builder.build();
        debug!("JSON: parsed {} resource strings", bundle.len());
        Ok(bundle)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let tree = unflatten(bundle, unknown_sequence_first(options)?)?;
        write_json(output, &Value::Object(tree))?;
        debug!("JSON: wrote {} resource strings", bundle.len());
        Ok(())
    }
}

/// How arrays found while flattening are turned into resource strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArrayHandling {
    /// Each element is its own entry with an `[i]` key.
    Elements,
    /// An array of strings is one entry, its elements joined by a space.
    JoinStrings,
}

pub(crate) fn read_json(input: &mut dyn Read) -> Result<Value, Error> {
    let text = read_text(input, Fallback::Utf8)?.text;
    Ok(serde_json::from_str(&text)?)
}

pub(crate) fn write_json(output: &mut dyn Write, value: &Value) -> Result<(), Error> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    output.write_all(text.as_bytes())?;
    Ok(())
}

/// Adds every string leaf under `map` to `builder`, in document order.
pub(crate) fn flatten_object(
    map: &Map<String, Value>,
    parent: Option<&str>,
    arrays: ArrayHandling,
    builder: &mut BundleBuilder,
) -> Result<(), Error> {
    for (name, value) in map {
        match value {
            Value::String(s) => {
                builder.add(encode_member(parent, name, true), s.as_str());
            }
            Value::Object(child) => {
                let prefix = encode_member(parent, name, false);
                flatten_object(child, Some(&prefix), arrays, builder)?;
            }
            Value::Array(items) => match arrays {
                ArrayHandling::JoinStrings => {
                    let joined = join_strings(items)?;
                    builder.add(encode_member(parent, name, true), joined);
                }
                ArrayHandling::Elements => {
                    let prefix = encode_member(parent, name, false);
                    flatten_array(items, &prefix, builder)?;
                }
            },
            _ => return Err(not_a_string(name)),
        }
    }
    Ok(())
}

fn flatten_array(items: &[Value], prefix: &str, builder: &mut BundleBuilder) -> Result<(), Error> {
    for (index, item) in items.iter().enumerate() {
        let key = encode_index(prefix, index);
        match item {
            Value::String(s) => {
                builder.add(key, s.as_str());
            }
            Value::Object(child) => flatten_object(child, Some(&key), ArrayHandling::Elements, builder)?,
            Value::Array(nested) => flatten_array(nested, &key, builder)?,
            _ => return Err(not_a_string(&key)),
        }
    }
    Ok(())
}

fn join_strings(items: &[Value]) -> Result<String, Error> {
    let parts = items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| Error::format("Arrays must contain only strings in a globalizejs resource."))
        })
        .collect::<Result<Vec<&str>, Error>>()?;
    Ok(parts.join(" "))
}

fn not_a_string(name: &str) -> Error {
    Error::format(format!("The value of JSON element {} is not a string.", name))
}

/// Rebuilds the nested object from the bundle's key paths.
///
/// Entries are inserted in output order so members keep their original order.
/// Arrays with missing elements are padded with `null`.
pub(crate) fn unflatten(bundle: &Bundle, unknown_first: bool) -> Result<Map<String, Value>, Error> {
    let mut root = Value::Object(Map::new());
    for rs in bundle.sorted_resource_strings_with(unknown_first) {
        let segments = decode_path(&rs.key);
        insert(&mut root, &segments, Value::String(rs.value.clone()), &rs.key)?;
    }
    match root {
        Value::Object(map) => Ok(map),
        _ => Err(Error::format("The root JSON element is not a JSON object.")),
    }
}

fn insert(node: &mut Value, segments: &[PathSegment], leaf: Value, key: &str) -> Result<(), Error> {
    let Some((first, rest)) = segments.split_first() else {
        return Err(conflict(key));
    };
    let empty_child = || match rest.first() {
        Some(PathSegment::Index(_)) => Value::Array(Vec::new()),
        _ => Value::Object(Map::new()),
    };

    let slot = match (first, node) {
        (PathSegment::Name(name), Value::Object(map)) => {
            if rest.is_empty() {
                if map.get(name).is_some_and(|existing| !existing.is_string()) {
                    return Err(conflict(key));
                }
                map.insert(name.clone(), leaf);
                return Ok(());
            }
            map.entry(name.clone()).or_insert_with(empty_child)
        }
        (PathSegment::Index(index), Value::Array(items)) => {
            let len = index
                .checked_add(1)
                .filter(|_| *index <= MAX_ARRAY_INDEX)
                .ok_or_else(|| index_too_large(*index, key))?;
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
        _ => return Err(conflict(key)),
    };
    insert(slot, rest, leaf, key)
}

fn conflict(key: &str) -> Error {
    Error::format(format!("The key path {} conflicts with another resource key", key))
}

fn index_too_large(index: usize, key: &str) -> Error {
    Error::format(format!("The array index {} in key path {} is too large", index, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceString;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {r#"
        {
          "bears": {
            "grizzly": {
              "brown": "Brown bear"
            }
          },
          "countries": [
            {"Europe": ["France"]},
            "Nowhere",
            {"Americas": {"S. America": ["Brazil"]}}
          ],
          "some_text": "Some text",
          "another.text": "Another text",
          "frog['2']": "Frog",
          "owl[3]": "Owl",
          "$.xxx": "Dollar path",
          "$.": "Dollar dot",
          "$abc": "Dollar abc",
          "ibm.com": {
            "g11n.pipeline.title": "Pipeline"
          }
        }
    "#};

    #[test]
    fn test_parse_key_paths() {
        let bundle = JsonFilter.parse_bytes(SAMPLE.as_bytes(), None).unwrap();
        let keys: Vec<&str> = bundle.resource_strings.iter().map(|rs| rs.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "$.bears.grizzly.brown",
                "$.countries[0].Europe[0]",
                "$.countries[1]",
                "$.countries[2].Americas['S. America'][0]",
                "some_text",
                "another.text",
                "frog['2']",
                "owl[3]",
                "$['$.xxx']",
                "$['$.']",
                "$abc",
                "$['ibm.com']['g11n.pipeline.title']",
            ]
        );
        assert_eq!(bundle.get("$.countries[1]").unwrap().value, "Nowhere");
        assert_eq!(bundle.get("owl[3]").unwrap().sequence_number, Some(8));
    }

    #[test]
    fn test_write_restores_structure() {
        let bundle = JsonFilter.parse_bytes(SAMPLE.as_bytes(), None).unwrap();
        let written = JsonFilter.write_bytes(&bundle, None).unwrap();
        let original: Value = serde_json::from_str(SAMPLE).unwrap();
        let rebuilt: Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(rebuilt, original);
        assert_eq!(JsonFilter.parse_bytes(&written, None).unwrap(), bundle);
    }

    #[test]
    fn test_write_pads_arrays() {
        let bundle = Bundle {
            resource_strings: vec![ResourceString::new("$.list[2]", "third")],
            ..Default::default()
        };
        let written = JsonFilter.write_bytes(&bundle, None).unwrap();
        let rebuilt: Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(rebuilt, serde_json::json!({"list": [null, null, "third"]}));
    }

    #[test]
    fn test_write_is_pretty_printed() {
        let mut builder = BundleBuilder::new(true);
        builder.add("$.a.b", "x");
        let written = JsonFilter.write_bytes(&builder.build(), None).unwrap();
        let expected = indoc! {r#"
            {
              "a": {
                "b": "x"
              }
            }
        "#};
        assert_eq!(String::from_utf8(written).unwrap(), expected);
    }

    #[test]
    fn test_conflicting_keys_fail() {
        let mut builder = BundleBuilder::new(true);
        builder.add("$.a", "leaf").add("$.a.b", "nested");
        assert!(JsonFilter.write_bytes(&builder.build(), None).unwrap_err().is_format_error());
    }

    #[test]
    fn test_huge_array_index_fails() {
        for key in ["$.a[18446744073709551615]", "$.a[99999999999]", "$.a[65536].b"] {
            let mut builder = BundleBuilder::new(true);
            builder.add(key, "x");
            let err = JsonFilter.write_bytes(&builder.build(), None).unwrap_err();
            assert!(err.to_string().contains("is too large"), "{}: {}", key, err);
        }
        let mut builder = BundleBuilder::new(true);
        builder.add("$.a[65535]", "x");
        let written = JsonFilter.write_bytes(&builder.build(), None).unwrap();
        let rebuilt: Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(rebuilt["a"].as_array().map(Vec::len), Some(65536));
    }

    #[test]
    fn test_non_object_root_and_non_string_values() {
        assert!(JsonFilter.parse_bytes(b"[\"a\"]", None).unwrap_err().is_format_error());
        let err = JsonFilter.parse_bytes(br#"{"count": 3}"#, None).unwrap_err();
        assert!(err.to_string().contains("The value of JSON element count is not a string"));
        assert!(JsonFilter.parse_bytes(b"{ broken", None).unwrap_err().is_format_error());
    }

    #[test]
    fn test_merge_regenerates() {
        let mut builder = BundleBuilder::new(true);
        builder.add("greeting", "Bonjour");
        let bundle = builder.build();
        let merged = JsonFilter
            .merge_bytes(br#"{"greeting": "Hello", "old": "x"}"#, &bundle, None)
            .unwrap();
        assert_eq!(merged, JsonFilter.write_bytes(&bundle, None).unwrap());
    }
}
