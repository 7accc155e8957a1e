//! AMD i18n bundles: `define({...})`, optionally with the messages under `root`.

use std::io::{Read, Write};

use log::{debug, trace};

use crate::{
    builder::BundleBuilder,
    error::Error,
    formats::js_literal::{JsValue, Property, first_object, quote},
    options::{FilterOptions, unknown_sequence_first},
    text::{Fallback, newline_of, read_text},
    traits::ResourceFilter,
    types::Bundle,
    wrap::{MAX_COLUMNS, WordBreaker, columns},
};

const TAB_WIDTH: usize = 4;

/// Filter for the `AMDJS` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmdJsFilter;

impl ResourceFilter for AmdJsFilter {
    fn parse(&self, input: &mut dyn Read, _options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let text = read_text(input, Fallback::Utf8)?.text;
        let properties = module_object(&text)?;

        let mut builder = BundleBuilder::new(true);
        for property in messages(&properties) {
            match &property.value {
                JsValue::String(value) => {
                    builder.add(property.key.as_str(), value.as_str());
                }
                _ => trace!("AMDJS: skipping non-string property `{}`", property.key),
            }
        }
        let bundle = builder.build();
        debug!("AMDJS: parsed {} resource strings", bundle.len());
        Ok(bundle)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let entries: Vec<String> = bundle
            .sorted_resource_strings_with(unknown_sequence_first(options)?)
            .into_iter()
            .map(|rs| format!("    {}: {}", quote(&rs.key), quote(&rs.value)))
            .collect();
        let mut out = String::from("define({\n");
        if !entries.is_empty() {
            out.push_str(&entries.join(",\n"));
            out.push('\n');
        }
        out.push_str("});\n");
        output.write_all(out.as_bytes())?;
        debug!("AMDJS: wrote {} resource strings", bundle.len());
        Ok(())
    }

    fn merge(
        &self,
        base: &mut dyn Read,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let text = read_text(base, Fallback::Utf8)?.text;
        let properties = module_object(&text)?;
        let values = bundle.value_map();
        let breaker = WordBreaker::new(options)?;
        let newline = newline_of(&text);

        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        let mut replaced = 0;
        for property in messages(&properties) {
            if !matches!(property.value, JsValue::String(_)) {
                continue;
            }
            let Some(value) = values.get(property.key.as_str()) else {
                continue;
            };
            trace!("AMDJS: replacing `{}`", property.key);
            let span = &property.value_span;
            let line_start = text[..span.start].rfind('\n').map_or(0, |i| i + 1);
            let prefix = &text[line_start..span.start];
            let layout = Layout {
                column: columns(prefix, TAB_WIDTH),
                indent: continuation_indent(prefix),
                newline,
            };
            out.push_str(&text[copied..span.start]);
            out.push_str(&layout.format(value, &breaker));
            copied = span.end;
            replaced += 1;
        }
        out.push_str(&text[copied..]);
        output.write_all(out.as_bytes())?;
        debug!("AMDJS: merged {} resource strings", replaced);
        Ok(())
    }
}

fn module_object(text: &str) -> Result<Vec<Property>, Error> {
    first_object(text)?.ok_or_else(|| Error::format("The AMD module does not define an object literal."))
}

/// The properties holding messages: those of `root` if present, otherwise the
/// module object's own.
fn messages(properties: &[Property]) -> &[Property] {
    properties
        .iter()
        .find_map(|p| match &p.value {
            JsValue::Object(inner) if p.key.eq_ignore_ascii_case("root") => Some(inner.as_slice()),
            _ => None,
        })
        .unwrap_or(properties)
}

/// Leading whitespace of the key's line plus one tab stop.
fn continuation_indent(prefix: &str) -> String {
    let base = &prefix[..prefix.len() - prefix.trim_start().len()];
    let step = if base.starts_with('\t') { "\t" } else { "    " };
    format!("{}{}", base, step)
}

struct Layout<'a> {
    /// Column at which the value starts.
    column: usize,
    indent: String,
    newline: &'a str,
}

impl Layout<'_> {
    /// The value as one string literal, or as `+`-joined literals on
    /// continuation lines when it would pass 80 columns.
    fn format(&self, value: &str, breaker: &WordBreaker) -> String {
        let single = quote(value);
        if self.column + single.chars().count() <= MAX_COLUMNS {
            return single;
        }

        // two quotes and the trailing " +"
        let overhead = 4;
        let mut width = MAX_COLUMNS.saturating_sub(self.column + overhead).max(1);
        let mut pieces: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_width = 0;
        for segment in breaker.segments(value) {
            let segment_width = quote(segment).chars().count() - 2;
            let is_space = segment.chars().all(char::is_whitespace);
            if !current.is_empty() && !is_space && current_width + segment_width > width {
                pieces.push(std::mem::take(&mut current));
                current_width = 0;
                width = MAX_COLUMNS
                    .saturating_sub(columns(&self.indent, TAB_WIDTH) + overhead)
                    .max(1);
            }
            current.push_str(segment);
            current_width += segment_width;
        }
        if !current.is_empty() {
            pieces.push(current);
        }

        let separator = format!(" +{}{}", self.newline, self.indent);
        pieces.iter().map(|piece| quote(piece)).collect::<Vec<_>>().join(&separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {r#"
        define({
            // Greeting
            "greeting": "Hello",
            "farewell": 'Bye' +
                ' now',
            other: 42,
            "long": "short",
            keep: "Same"
        });
    "#};

    fn pairs(bundle: &Bundle) -> Vec<(&str, &str)> {
        bundle
            .resource_strings
            .iter()
            .map(|rs| (rs.key.as_str(), rs.value.as_str()))
            .collect()
    }

    #[test]
    fn test_parse() {
        let bundle = AmdJsFilter.parse_bytes(SAMPLE.as_bytes(), None).unwrap();
        assert_eq!(
            pairs(&bundle),
            vec![
                ("greeting", "Hello"),
                ("farewell", "Bye now"),
                ("long", "short"),
                ("keep", "Same"),
            ]
        );
    }

    #[test]
    fn test_parse_root_bundle() {
        let input = r#"define({ "root": { "a": "A", "b": "B" }, "fr": true, "de": true });"#;
        let bundle = AmdJsFilter.parse_bytes(input.as_bytes(), None).unwrap();
        assert_eq!(pairs(&bundle), vec![("a", "A"), ("b", "B")]);
    }

    #[test]
    fn test_write() {
        let mut builder = BundleBuilder::new(true);
        builder.add("greeting", "Hello").add("quote", "Say \"hi\"");
        let written = AmdJsFilter.write_bytes(&builder.build(), None).unwrap();
        let expected = indoc! {r#"
            define({
                "greeting": "Hello",
                "quote": "Say \"hi\""
            });
        "#};
        assert_eq!(String::from_utf8(written).unwrap(), expected);
        assert_eq!(
            AmdJsFilter.write_bytes(&Bundle::default(), None).unwrap(),
            b"define({\n});\n"
        );
    }

    #[test]
    fn test_write_then_parse() {
        let bundle = AmdJsFilter.parse_bytes(SAMPLE.as_bytes(), None).unwrap();
        let written = AmdJsFilter.write_bytes(&bundle, None).unwrap();
        assert_eq!(AmdJsFilter.parse_bytes(&written, None).unwrap(), bundle);
    }

    #[test]
    fn test_merge_replaces_value_spans() {
        let mut builder = BundleBuilder::new(true);
        builder
            .add("greeting", "Bonjour")
            .add("farewell", "Au revoir")
            .add("other", "not a string in the base")
            .add("missing", "not in the base");
        let merged = AmdJsFilter.merge_bytes(SAMPLE.as_bytes(), &builder.build(), None).unwrap();
        let expected = SAMPLE
            .replace("\"Hello\"", "\"Bonjour\"")
            .replace("'Bye' +\n        ' now'", "\"Au revoir\"");
        assert_eq!(String::from_utf8(merged).unwrap(), expected);
    }

    #[test]
    fn test_merge_wraps_long_values() {
        let long = "This value is long enough that it has to be split across several lines of the module source.";
        let mut builder = BundleBuilder::new(true);
        builder.add("long", long);
        let merged = AmdJsFilter.merge_bytes(SAMPLE.as_bytes(), &builder.build(), None).unwrap();
        let merged = String::from_utf8(merged).unwrap();

        assert!(merged.contains("    \"long\": \"This value"));
        assert!(merged.contains(" +\n        \""));
        assert!(merged.lines().all(|line| line.chars().count() <= MAX_COLUMNS), "{}", merged);
        let bundle = AmdJsFilter.parse_bytes(merged.as_bytes(), None).unwrap();
        assert_eq!(bundle.get("long").unwrap().value, long);
        assert_eq!(bundle.get("keep").unwrap().value, "Same");
    }

    #[test]
    fn test_not_a_module() {
        let err = AmdJsFilter.parse_bytes(b"var x = 1;", None).unwrap_err();
        assert!(err.is_format_error());
    }
}
