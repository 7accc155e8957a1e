//! XLIFF 1.2 files.
//!
//! Parsing reads the `<source>` of every `<trans-unit>`; writing produces one
//! `<file>` with source and target for each entry. Merging fills in the
//! `<target>` of known trans-units and leaves every other byte alone.

use std::io::{Read, Write};

use lazy_static::lazy_static;
use log::{debug, trace};
use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesStart, BytesText, Event},
};
use regex::Regex;

use crate::{
    builder::BundleBuilder,
    error::Error,
    formats::xml::{attribute, escape_text, line_indent, skip_element, text_content, utf8},
    options::{FilterOptions, unknown_sequence_first},
    text::{Fallback, newline_of, read_text},
    traits::ResourceFilter,
    types::Bundle,
};

lazy_static! {
    static ref LINE_BREAK: Regex = Regex::new(r"\s*\n\s*").unwrap();
}

const XMLNS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "urn:oasis:names:tc:xliff:document:1.2 xliff-core-1.2-strict.xsd";
const DEFAULT_SOURCE_LANGUAGE: &str = "en";

/// Filter for the `XLIFF` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct XliffFilter;

impl ResourceFilter for XliffFilter {
    fn parse(&self, input: &mut dyn Read, _options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let text = read_text(input, Fallback::Utf8)?.text;
        let mut reader = Reader::from_str(&text);
        let mut builder = BundleBuilder::new(true);
        let mut unit_id: Option<String> = None;
        let mut saw_root = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"xliff" => saw_root = true,
                    b"file" => read_languages(&e, &mut builder)?,
                    b"trans-unit" => {
                        let id = attribute(&e, b"id")?
                            .ok_or_else(|| Error::format("trans-unit without id attribute"))?;
                        unit_id = Some(id);
                    }
                    b"source" => {
                        let source = text_content(&mut reader)?;
                        if let Some(id) = &unit_id {
                            builder.add(id.as_str(), LINE_BREAK.replace_all(&source, " "));
                        }
                    }
                    _ => {}
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"file" => read_languages(&e, &mut builder)?,
                    b"source" => {
                        if let Some(id) = &unit_id {
                            builder.add(id.as_str(), "");
                        }
                    }
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"trans-unit" => unit_id = None,
                Event::Eof => break,
                _ => {}
            }
        }
        if !saw_root {
            return Err(Error::format("The root element is not <xliff>."));
        }

        let bundle = builder.build();
        debug!("XLIFF: parsed {} trans-units", bundle.len());
        Ok(bundle)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let target_language = target_language(bundle)?;
        let source_language = bundle
            .embedded_source_language_code
            .as_deref()
            .unwrap_or(DEFAULT_SOURCE_LANGUAGE);

        let mut writer = Writer::new_with_indent(&mut *output, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;

        let mut xliff = BytesStart::new("xliff");
        xliff.push_attribute(("version", "1.2"));
        xliff.push_attribute(("xmlns:xsi", XMLNS_XSI));
        xliff.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
        writer.write_event(Event::Start(xliff))?;

        let mut file = BytesStart::new("file");
        file.push_attribute(("original", "g11n-pipeline"));
        file.push_attribute(("datatype", "plaintext"));
        file.push_attribute(("source-language", source_language));
        file.push_attribute(("target-language", target_language));
        writer.write_event(Event::Start(file))?;
        writer.write_event(Event::Start(BytesStart::new("body")))?;

        for rs in bundle.sorted_resource_strings_with(unknown_sequence_first(options)?) {
            let mut unit = BytesStart::new("trans-unit");
            unit.push_attribute(("id", rs.key.as_str()));
            writer.write_event(Event::Start(unit))?;
            let source = rs.source_value.as_deref().unwrap_or(&rs.value);
            writer
                .create_element("source")
                .write_text_content(BytesText::new(source))?;
            writer
                .create_element("target")
                .write_text_content(BytesText::new(&rs.value))?;
            writer.write_event(Event::End(BytesStart::new("trans-unit").to_end()))?;
        }

        writer.write_event(Event::End(BytesStart::new("body").to_end()))?;
        writer.write_event(Event::End(BytesStart::new("file").to_end()))?;
        writer.write_event(Event::End(BytesStart::new("xliff").to_end()))?;
        output.write_all(b"\n")?;

        debug!("XLIFF: wrote {} trans-units for `{}`", bundle.len(), target_language);
        Ok(())
    }

    fn merge(
        &self,
        base: &mut dyn Read,
        output: &mut dyn Write,
        bundle: &Bundle,
        _options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let text = read_text(base, Fallback::Utf8)?.text;
        let values = bundle.value_map();
        let newline = newline_of(&text);

        let mut reader = Reader::from_str(&text);
        let mut edits: Vec<(usize, usize, String)> = Vec::new();
        let mut unit: Option<UnitState> = None;

        loop {
            let before = reader.buffer_position() as usize;
            let event = reader.read_event()?;
            let after = reader.buffer_position() as usize;
            match event {
                Event::Start(e) if e.local_name().as_ref() == b"trans-unit" => {
                    unit = attribute(&e, b"id")?.map(UnitState::new);
                }
                Event::End(e) if e.local_name().as_ref() == b"trans-unit" => {
                    let Some(state) = unit.take() else {
                        continue;
                    };
                    // No <target> yet: add one after the source.
                    if let (false, Some(value), Some((end, indent))) =
                        (state.has_target, values.get(state.id.as_str()), state.source_end)
                    {
                        trace!("XLIFF: adding target to `{}`", state.id);
                        let separator = match indent {
                            Some(indent) => format!("{}{}", newline, indent),
                            None => String::new(),
                        };
                        edits.push((end, end, format!("{}<target>{}</target>", separator, escape_text(value))));
                    }
                }
                Event::Start(e) if e.local_name().as_ref() == b"source" => {
                    skip_element(&mut reader)?;
                    let end = reader.buffer_position() as usize;
                    if let Some(state) = unit.as_mut() {
                        state.source_end = Some((end, line_indent(&text, before).map(str::to_string)));
                    }
                }
                Event::Empty(e) if e.local_name().as_ref() == b"source" => {
                    if let Some(state) = unit.as_mut() {
                        state.source_end = Some((after, line_indent(&text, before).map(str::to_string)));
                    }
                }
                Event::Start(e) if e.local_name().as_ref() == b"target" => {
                    let content_end = skip_element(&mut reader)?;
                    if let Some(state) = unit.as_mut() {
                        state.has_target = true;
                        if let Some(value) = values.get(state.id.as_str()) {
                            trace!("XLIFF: replacing target of `{}`", state.id);
                            edits.push((after, content_end, escape_text(value).into_owned()));
                        }
                    }
                }
                Event::Empty(e) if e.local_name().as_ref() == b"target" => {
                    if let Some(state) = unit.as_mut() {
                        state.has_target = true;
                        if let Some(value) = values.get(state.id.as_str()) {
                            let tag = utf8(&e)?;
                            let name = utf8(e.name().as_ref())?.into_owned();
                            edits.push((before, after, format!("<{}>{}</{}>", tag, escape_text(value), name)));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        for (start, end, replacement) in &edits {
            out.push_str(&text[copied..*start]);
            out.push_str(replacement);
            copied = *end;
        }
        out.push_str(&text[copied..]);
        output.write_all(out.as_bytes())?;

        debug!("XLIFF: merged {} targets", edits.len());
        Ok(())
    }
}

struct UnitState {
    id: String,
    has_target: bool,
    /// End offset of `</source>` and the indentation of its line.
    source_end: Option<(usize, Option<String>)>,
}

impl UnitState {
    fn new(id: String) -> Self {
        Self {
            id,
            has_target: false,
            source_end: None,
        }
    }
}

fn read_languages(file: &BytesStart<'_>, builder: &mut BundleBuilder) -> Result<(), Error> {
    if let Some(target) = attribute(file, b"target-language")? {
        builder.embedded_language_code(target);
    }
    if let Some(source) = attribute(file, b"source-language")? {
        builder.embedded_source_language_code(source);
    }
    Ok(())
}

fn target_language(bundle: &Bundle) -> Result<&str, Error> {
    match bundle.embedded_language_code.as_deref() {
        Some(code) if !code.is_empty() => Ok(code),
        _ => Err(Error::MissingRequiredField(
            "Target language is not specified.".to_string(),
        )),
    }
}
