//! Android `strings.xml` resources: `<string>` and `<string-array>` elements.

use std::{
    collections::HashMap,
    io::{Read, Write},
};

use lazy_static::lazy_static;
use log::{debug, trace};
use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use regex::Regex;

use crate::{
    builder::BundleBuilder,
    error::Error,
    formats::xml::{attribute, escape_text, text_content, utf8},
    options::{FilterOptions, unknown_sequence_first},
    text::{Fallback, newline_of, read_text, split_lines},
    traits::ResourceFilter,
    types::{Bundle, ResourceString},
    wrap::{MAX_COLUMNS, WordBreaker, columns},
};

lazy_static! {
    static ref ARRAY_OPEN: Regex = Regex::new(r#"^\s*<string-array\s*name=".*">"#).unwrap();
    static ref ARRAY_CLOSE: Regex = Regex::new(r"</string-array\s*>\s*$").unwrap();
    static ref STRING_OPEN: Regex = Regex::new(r#"^\s*<string\s*name=".*">"#).unwrap();
    static ref STRING_CLOSE: Regex = Regex::new(r"</string\s*>\s*$").unwrap();
    static ref NAME_ATTR: Regex = Regex::new(r#"name="([^"]*)""#).unwrap();
    static ref ITEM_BREAK: Regex = Regex::new(r"\n[ \t]+").unwrap();
}

const TAB_WIDTH: usize = 4;

/// Filter for the `ANDROID` format (`res/values/strings.xml`).
///
/// A `<string-array>` is carried as one value of the form `[a, b, c]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AndroidStringsFilter;

impl ResourceFilter for AndroidStringsFilter {
    fn parse(&self, input: &mut dyn Read, _options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let text = read_text(input, Fallback::Utf8)?.text;
        let mut reader = Reader::from_str(&text);
        let mut builder = BundleBuilder::new(true);
        let mut pending_notes: Vec<String> = Vec::new();
        let mut depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(e) if is_entry(&e) => {
                    let key = entry_name(&e)?;
                    let content = text_content(&mut reader)?;
                    let value = if e.local_name().as_ref() == b"string-array" {
                        array_value(&content)
                    } else {
                        content
                    };
                    let rs = ResourceString::new(key, value).with_notes(pending_notes.drain(..));
                    builder.add_resource_string(rs)?;
                }
                Event::Empty(e) if is_entry(&e) => {
                    let key = entry_name(&e)?;
                    let value = if e.local_name().as_ref() == b"string-array" { "[]" } else { "" };
                    let rs = ResourceString::new(key, value).with_notes(pending_notes.drain(..));
                    builder.add_resource_string(rs)?;
                }
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Comment(c) => {
                    let note = utf8(&c)?.into_owned();
                    if depth == 0 {
                        builder.note(note);
                    } else {
                        pending_notes.push(note);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        if !pending_notes.is_empty() {
            trace!("ANDROID: dropping {} trailing comments", pending_notes.len());
        }

        let bundle = builder.build();
        debug!("ANDROID: parsed {} resource strings", bundle.len());
        Ok(bundle)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let mut writer = Writer::new_with_indent(&mut *output, b' ', 4);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("no"))))?;
        for note in &bundle.notes {
            writer.write_event(Event::Comment(BytesText::from_escaped(note.as_str())))?;
        }
        writer.write_event(Event::Start(BytesStart::new("resources")))?;

        for rs in bundle.sorted_resource_strings_with(unknown_sequence_first(options)?) {
            for note in &rs.notes {
                writer.write_event(Event::Comment(BytesText::from_escaped(note.as_str())))?;
            }
            match array_items(&rs.value) {
                Some(items) => {
                    let mut array = BytesStart::new("string-array");
                    array.push_attribute(("name", rs.key.as_str()));
                    writer.write_event(Event::Start(array))?;
                    for item in items {
                        writer
                            .create_element("item")
                            .write_text_content(BytesText::from_escaped(escape_text(item)))?;
                    }
                    writer.write_event(Event::End(BytesEnd::new("string-array")))?;
                }
                None => {
                    writer
                        .create_element("string")
                        .with_attribute(("name", rs.key.as_str()))
                        .write_text_content(BytesText::from_escaped(escape_text(&rs.value)))?;
                }
            }
        }

        writer.write_event(Event::End(BytesEnd::new("resources")))?;
        output.write_all(b"\n")?;
        debug!("ANDROID: wrote {} resource strings", bundle.len());
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
        let values = bundle.value_map();
        let breaker = WordBreaker::new(options)?;
        let newline = newline_of(&text);
        let lines = split_lines(&text);

        let mut out = String::with_capacity(text.len());
        let mut replaced = 0;
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let Some(element) = match_element(line.content, &values) else {
                out.push_str(line.content);
                out.push_str(line.terminator);
                i += 1;
                continue;
            };

            let last = lines[i..]
                .iter()
                .position(|l| element.close.is_match(l.content))
                .map_or(lines.len() - 1, |offset| i + offset);
            let terminator = lines[last].terminator;
            let formatter = Formatter {
                breaker: &breaker,
                indent: element.indent,
                newline,
            };

            match element.items {
                Some(items) => {
                    trace!("ANDROID: replacing string-array `{}`", element.key);
                    let item_indent = format!("{}{}", element.indent, tab_str(element.indent));
                    let item_formatter = Formatter {
                        indent: &item_indent,
                        ..formatter
                    };
                    out.push_str(element.indent);
                    out.push_str(element.open_tag);
                    out.push_str(newline);
                    for item in items {
                        out.push_str(&item_formatter.format("<item>", item.trim(), "</item>"));
                        out.push_str(newline);
                    }
                    out.push_str(element.indent);
                    out.push_str("</string-array>");
                }
                None => {
                    trace!("ANDROID: replacing string `{}`", element.key);
                    out.push_str(&formatter.format(element.open_tag, element.value, "</string>"));
                }
            }
            out.push_str(terminator);
            replaced += 1;
            i = last + 1;
        }

        output.write_all(out.as_bytes())?;
        debug!("ANDROID: merged {} resource strings", replaced);
        Ok(())
    }
}

fn is_entry(e: &BytesStart<'_>) -> bool {
    matches!(e.local_name().as_ref(), b"string" | b"string-array")
}

fn entry_name(e: &BytesStart<'_>) -> Result<String, Error> {
    attribute(e, b"name")?.ok_or_else(|| {
        Error::format(format!(
            "<{}> element without name attribute",
            String::from_utf8_lossy(e.local_name().as_ref())
        ))
    })
}

/// `[a, b]` from the text content of a `<string-array>`.
fn array_value(content: &str) -> String {
    format!("[{}]", ITEM_BREAK.replace_all(content.trim(), ", "))
}

/// Splits an `[a, b]` value into its items, or `None` for a plain string.
fn array_items(value: &str) -> Option<Vec<&str>> {
    let inner = value.strip_prefix('[')?.strip_suffix(']')?;
    let items = inner
        .split(',')
        .enumerate()
        .map(|(index, item)| match index {
            0 => item,
            _ => item.strip_prefix(' ').unwrap_or(item),
        })
        .collect();
    Some(items)
}

fn tab_str(indent: &str) -> &'static str {
    if indent.starts_with('\t') { "\t" } else { "    " }
}

/// An element on a base line whose value is being replaced.
struct MatchedElement<'t, 'b> {
    key: &'t str,
    indent: &'t str,
    open_tag: &'t str,
    value: &'b str,
    /// Items of a `<string-array>` replacement.
    items: Option<Vec<&'b str>>,
    close: &'static Regex,
}

fn match_element<'t, 'b>(
    line: &'t str,
    values: &HashMap<&'b str, &'b str>,
) -> Option<MatchedElement<'t, 'b>> {
    let (is_array, close) = if ARRAY_OPEN.is_match(line) {
        (true, &*ARRAY_CLOSE)
    } else if STRING_OPEN.is_match(line) {
        (false, &*STRING_CLOSE)
    } else {
        return None;
    };

    let tag_start = line.find('<')?;
    let tag_end = line.find('>')? + 1;
    let open_tag = &line[tag_start..tag_end];
    let key = NAME_ATTR.captures(open_tag)?.get(1)?.as_str();
    let value = *values.get(key)?;
    let items = if is_array {
        // a plain value cannot replace an array
        Some(array_items(value)?)
    } else {
        None
    };

    Some(MatchedElement {
        key,
        indent: &line[..tag_start],
        open_tag,
        value,
        items,
        close,
    })
}

#[derive(Clone, Copy)]
struct Formatter<'a> {
    breaker: &'a WordBreaker,
    indent: &'a str,
    newline: &'a str,
}

impl Formatter<'_> {
    /// Formats `open message close` at the indentation, without a final newline.
    ///
    /// A message too long for one line goes on its own lines, one tab deeper,
    /// broken at word boundaries.
    fn format(&self, open: &str, message: &str, close: &str) -> String {
        let message = escape_text(message);
        let indent_columns = columns(self.indent, TAB_WIDTH);
        let one_line =
            indent_columns + open.chars().count() + message.chars().count() + close.chars().count();
        if one_line < MAX_COLUMNS {
            return format!("{}{}{}{}", self.indent, open, message, close);
        }

        let available = MAX_COLUMNS.saturating_sub(indent_columns + 4).max(1);
        let mut out = format!("{}{}{}", self.indent, open, self.newline);
        for line in self.breaker.fill(&message, available) {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            out.push_str(self.indent);
            out.push_str(tab_str(self.indent));
            out.push_str(line);
            out.push_str(self.newline);
        }
        out.push_str(self.indent);
        out.push_str(close);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {r#"
        <?xml version="1.0" encoding="utf-8"?>
        <!-- Strings for the main screen -->
        <resources>
            <!-- Greeting shown on start -->
            <string name="greeting">Hello</string>
            <string name="escaped">Fish &amp; Chips</string>
            <string-array name="planets">
                <item>Mercury</item>
                <item>Venus</item>
            </string-array>
            <string name="long">Short</string>
        </resources>
    "#};

    #[test]
    fn test_parse() {
        let bundle = AndroidStringsFilter.parse_bytes(SAMPLE.as_bytes(), None).unwrap();
        assert_eq!(bundle.notes, vec![" Strings for the main screen ".to_string()]);
        let pairs: Vec<(&str, &str, Option<u32>)> = bundle
            .resource_strings
            .iter()
            .map(|rs| (rs.key.as_str(), rs.value.as_str(), rs.sequence_number))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("greeting", "Hello", Some(1)),
                ("escaped", "Fish & Chips", Some(2)),
                ("planets", "[Mercury, Venus]", Some(3)),
                ("long", "Short", Some(4)),
            ]
        );
        assert_eq!(
            bundle.get("greeting").unwrap().notes,
            vec![" Greeting shown on start ".to_string()]
        );
    }

    #[test]
    fn test_write() {
        let mut builder = BundleBuilder::new(true);
        builder
            .add_resource_string(ResourceString::new("greeting", "Hello").with_note(" Greeting "))
            .unwrap();
        builder.add("planets", "[Mercury, Venus]").add("amp", "Fish & Chips");
        let written = AndroidStringsFilter.write_bytes(&builder.build(), None).unwrap();
        let expected = indoc! {r#"
            <?xml version="1.0" encoding="utf-8" standalone="no"?>
            <resources>
                <!-- Greeting -->
                <string name="greeting">Hello</string>
                <string-array name="planets">
                    <item>Mercury</item>
                    <item>Venus</item>
                </string-array>
                <string name="amp">Fish &amp; Chips</string>
            </resources>
        "#};
        assert_eq!(String::from_utf8(written).unwrap(), expected);
    }

    #[test]
    fn test_write_then_parse() {
        let bundle = AndroidStringsFilter.parse_bytes(SAMPLE.as_bytes(), None).unwrap();
        let written = AndroidStringsFilter.write_bytes(&bundle, None).unwrap();
        assert_eq!(AndroidStringsFilter.parse_bytes(&written, None).unwrap(), bundle);
    }

    #[test]
    fn test_merge() {
        let long = "This sentence is deliberately long so that it cannot possibly fit on a single line of the file.";
        let mut builder = BundleBuilder::new(true);
        builder
            .add("greeting", "Bonjour")
            .add("planets", "[Mercure, Vénus]")
            .add("long", long)
            .add("missing", "Not in base");
        let merged = AndroidStringsFilter
            .merge_bytes(SAMPLE.as_bytes(), &builder.build(), None)
            .unwrap();
        let merged = String::from_utf8(merged).unwrap();

        let head = indoc! {r#"
            <?xml version="1.0" encoding="utf-8"?>
            <!-- Strings for the main screen -->
            <resources>
                <!-- Greeting shown on start -->
                <string name="greeting">Bonjour</string>
                <string name="escaped">Fish &amp; Chips</string>
                <string-array name="planets">
                    <item>Mercure</item>
                    <item>Vénus</item>
                </string-array>
                <string name="long">
        "#};
        assert!(merged.starts_with(head), "{}", merged);
        assert!(merged.ends_with("    </string>\n</resources>\n"));
        assert!(!merged.contains("Not in base"));

        let body = &merged[head.len()..merged.len() - "    </string>\n</resources>\n".len()];
        let lines: Vec<&str> = body.lines().collect();
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.starts_with("        "));
            assert!(line.chars().count() <= MAX_COLUMNS);
        }
        let rejoined: Vec<&str> = lines.iter().map(|l| l.trim()).collect();
        assert_eq!(rejoined.join(" "), long);
    }

    #[test]
    fn test_merge_multi_line_element() {
        let base = "<resources>\n\t<string name=\"a\">first\n\t\tsecond</string>\n\t<string name=\"b\">keep</string>\n</resources>";
        let mut builder = BundleBuilder::new(true);
        builder.add("a", "x < y");
        let merged = AndroidStringsFilter.merge_bytes(base.as_bytes(), &builder.build(), None).unwrap();
        assert_eq!(
            String::from_utf8(merged).unwrap(),
            "<resources>\n\t<string name=\"a\">x &lt; y</string>\n\t<string name=\"b\">keep</string>\n</resources>"
        );
    }

    #[test]
    fn test_array_items() {
        assert_eq!(array_items("[a, b,c]"), Some(vec!["a", "b", "c"]));
        assert_eq!(array_items("[]"), Some(vec![""]));
        assert_eq!(array_items("plain"), None);
        assert_eq!(array_value("\n    a\n    b\n  "), "[a, b]");
    }

    #[test]
    fn test_missing_name() {
        let err = AndroidStringsFilter
            .parse_bytes(b"<resources><string>x</string></resources>", None)
            .unwrap_err();
        assert!(err.is_format_error());
    }
}
