//! Globalize JSON bundles: `{"<language>": {...}}`.
//!
//! The single top-level member names the language; its object is read like a
//! `JSON` file except that arrays of strings form one space-joined value.

use std::io::{Read, Write};

use log::debug;
use serde_json::{Map, Value};

use crate::{
    builder::BundleBuilder,
    error::Error,
    formats::json::{ArrayHandling, flatten_object, read_json, unflatten, write_json},
    options::{FilterOptions, unknown_sequence_first},
    traits::ResourceFilter,
    types::Bundle,
};

/// Filter for the `GLOBALIZEJS` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalizeJsFilter;

impl ResourceFilter for GlobalizeJsFilter {
    fn parse(&self, input: &mut dyn Read, _options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let Value::Object(root) = read_json(input)? else {
            return Err(Error::format("The root JSON element is not a JSON object."));
        };
        if root.len() != 1 {
            return Err(Error::format(
                "Only one top level language tag element is allowed per file.",
            ));
        }
        let Some((language, Value::Object(strings))) = root.iter().next() else {
            return Err(Error::format("The top level language element is not a JSON object."));
        };

        let mut builder = BundleBuilder::new(true);
        builder.embedded_language_code(language.as_str());
        flatten_object(strings, None, ArrayHandling::JoinStrings, &mut builder)?;
        let bundle = builder.build();
        debug!("GLOBALIZEJS: parsed {} resource strings for `{}`", bundle.len(), language);
        Ok(bundle)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let language = bundle.embedded_language_code.as_deref().ok_or_else(|| {
            Error::MissingRequiredField("The language of the bundle is not specified.".to_string())
        })?;
        let strings = unflatten(bundle, unknown_sequence_first(options)?)?;
        let mut root = Map::new();
        root.insert(language.to_string(), Value::Object(strings));
        write_json(output, &Value::Object(root))?;
        debug!("GLOBALIZEJS: wrote {} resource strings for `{}`", bundle.len(), language);
        Ok(())
    }
}
