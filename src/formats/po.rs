//! GNU gettext catalogs.
//!
//! Resource keys are msgids. A PO file supplies the translations (untranslated
//! messages are skipped); a POT template yields each msgid as both key and
//! value. In a plural message `msgid` pairs with `msgstr[0]` and `msgid_plural`
//! with `msgstr[1]`. `#.` comments are carried as notes.

use std::{
    io::{Read, Write},
    ops::Range,
};

use log::{debug, trace};

use crate::{
    builder::BundleBuilder,
    error::Error,
    options::{FilterOptions, unknown_sequence_first},
    text::{Fallback, Line, newline_of, read_text, split_lines},
    traits::ResourceFilter,
    types::{Bundle, ResourceString},
    wrap::{MAX_COLUMNS, WordBreaker},
};

const MSGID: &str = "msgid ";
const MSGSTR: &str = "msgstr ";

/// Filter for the `PO` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoFilter;

/// Filter for the `POT` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct PotFilter;

impl ResourceFilter for PoFilter {
    fn parse(&self, input: &mut dyn Read, _options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let text = read_text(input, Fallback::Utf8)?.text;
        let lines = split_lines(&text);
        let mut builder = BundleBuilder::new(true);

        for message in parse_catalog(&lines)? {
            let Some(msgid) = message.msgid.filter(|id| !id.is_empty()) else {
                if let Some(language) = message.msgstr.as_deref().and_then(header_language) {
                    builder.embedded_language_code(language);
                }
                continue;
            };
            match message.msgid_plural {
                None => {
                    if let Some(value) = message.msgstr.filter(|v| !v.is_empty()) {
                        builder.add_resource_string(ResourceString::new(msgid, value).with_notes(message.notes))?;
                    }
                }
                Some(plural) => {
                    let form = |n: usize| {
                        message
                            .msgstr_plural
                            .iter()
                            .find(|(index, value)| *index == n && !value.is_empty())
                            .map(|(_, value)| value.clone())
                    };
                    if let Some(one) = form(0) {
                        builder.add_resource_string(ResourceString::new(msgid, one).with_notes(message.notes.clone()))?;
                    }
                    if let Some(other) = form(1) {
                        builder.add(plural, other);
                    }
                }
            }
        }

        let bundle = builder.build();
        debug!("PO: parsed {} resource strings", bundle.len());
        Ok(bundle)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let breaker = WordBreaker::new(options)?;
        let mut out = header(bundle.embedded_language_code.as_deref());
        for rs in bundle.sorted_resource_strings_with(unknown_sequence_first(options)?) {
            write_entry(&mut out, rs, &rs.value, &breaker);
        }
        output.write_all(out.as_bytes())?;
        debug!("PO: wrote {} resource strings", bundle.len());
        Ok(())
    }

    fn merge(
        &self,
        base: &mut dyn Read,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        merge_catalog(base, output, bundle, options)
    }
}

impl ResourceFilter for PotFilter {
    fn parse(&self, input: &mut dyn Read, _options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let text = read_text(input, Fallback::Utf8)?.text;
        let lines = split_lines(&text);
        let mut builder = BundleBuilder::new(true);

        for message in parse_catalog(&lines)? {
            let Some(msgid) = message.msgid.filter(|id| !id.is_empty()) else {
                continue;
            };
            builder.add_resource_string(ResourceString::new(msgid.as_str(), msgid.as_str()).with_notes(message.notes))?;
            if let Some(plural) = message.msgid_plural.filter(|p| !p.is_empty()) {
                builder.add(plural.as_str(), plural.as_str());
            }
        }

        let bundle = builder.build();
        debug!("POT: parsed {} resource strings", bundle.len());
        Ok(bundle)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let breaker = WordBreaker::new(options)?;
        let mut out = header(None);
        for rs in bundle.sorted_resource_strings_with(unknown_sequence_first(options)?) {
            write_entry(&mut out, rs, "", &breaker);
        }
        output.write_all(out.as_bytes())?;
        debug!("POT: wrote {} resource strings", bundle.len());
        Ok(())
    }

    fn merge(
        &self,
        base: &mut dyn Read,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        merge_catalog(base, output, bundle, options)
    }
}

/// Replaces the msgstr of every singular message whose msgid is in the bundle.
/// Plural messages are left as they are.
fn merge_catalog(
    base: &mut dyn Read,
    output: &mut dyn Write,
    bundle: &Bundle,
    options: Option<&FilterOptions>,
) -> Result<(), Error> {
    let text = read_text(base, Fallback::Utf8)?.text;
    let lines = split_lines(&text);
    let values = bundle.value_map();
    let breaker = WordBreaker::new(options)?;
    let newline = newline_of(&text);

    let mut replacements: Vec<(Range<usize>, String)> = Vec::new();
    for message in parse_catalog(&lines)? {
        let (Some(msgid), None, Some(msgstr_lines)) =
            (message.msgid.as_deref(), &message.msgid_plural, message.msgstr_lines)
        else {
            continue;
        };
        if msgid.is_empty() {
            continue;
        }
        if let Some(value) = values.get(msgid) {
            trace!("PO: replacing msgstr of `{}`", msgid);
            replacements.push((msgstr_lines, format_field(MSGSTR, value, &breaker).join(newline)));
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut next = 0;
    for (range, replacement) in &replacements {
        for line in &lines[next..range.start] {
            out.push_str(line.content);
            out.push_str(line.terminator);
        }
        out.push_str(replacement);
        out.push_str(lines[range.end - 1].terminator);
        next = range.end;
    }
    for line in &lines[next..] {
        out.push_str(line.content);
        out.push_str(line.terminator);
    }
    output.write_all(out.as_bytes())?;
    debug!("PO: merged {} messages", replacements.len());
    Ok(())
}

fn header(language: Option<&str>) -> String {
    let mut out = String::from(concat!(
        "# Translations template for PROJECT.\n",
        "# Copyright (C) YEAR ORGANIZATION\n",
        "# This file is distributed under the same license as the PROJECT project.\n",
        "# FIRST AUTHOR <EMAIL@ADDRESS>, YEAR.\n",
        "#\n",
        "#, fuzzy\n",
        "msgid \"\"\n",
        "msgstr \"\"\n",
        "\"Project-Id-Version: PROJECT VERSION\\n\"\n",
        "\"Report-Msgid-Bugs-To: EMAIL@ADDRESS\\n\"\n",
        "\"POT-Creation-Date: YEAR-MO-DA HO:MI+ZONE\\n\"\n",
        "\"PO-Revision-Date: YEAR-MO-DA HO:MI+ZONE\\n\"\n",
        "\"Last-Translator: FULL NAME <EMAIL@ADDRESS>\\n\"\n",
        "\"Language-Team: LANGUAGE <LL@li.org>\\n\"\n",
    ));
    if let Some(language) = language {
        out.push_str(&format!("\"Language: {}\\n\"\n", escape(language)));
    }
    out.push_str(concat!(
        "\"MIME-Version: 1.0\\n\"\n",
        "\"Content-Type: text/plain; charset=utf-8\\n\"\n",
        "\"Content-Transfer-Encoding: 8bit\\n\"\n",
        "\"Generated-By: resfilter\\n\"\n",
    ));
    out
}

/// The `Language` field of a header msgstr.
fn header_language(msgstr: &str) -> Option<&str> {
    msgstr
        .lines()
        .find_map(|field| field.strip_prefix("Language:"))
        .map(str::trim)
        .filter(|language| !language.is_empty())
}

fn write_entry(out: &mut String, rs: &ResourceString, msgstr: &str, breaker: &WordBreaker) {
    out.push('\n');
    for note in &rs.notes {
        for line in note.lines() {
            out.push_str(&format!("#. {}\n", line));
        }
    }
    for line in format_field(MSGID, &rs.key, breaker) {
        out.push_str(&line);
        out.push('\n');
    }
    for line in format_field(MSGSTR, msgstr, breaker) {
        out.push_str(&line);
        out.push('\n');
    }
}

/// Lines of `keyword "message"`, wrapped onto continuation strings after an
/// empty first string when the line would reach 80 columns. Widths are measured
/// on the escaped text.
fn format_field(keyword: &str, message: &str, breaker: &WordBreaker) -> Vec<String> {
    let escaped = escape(message);
    if keyword.len() + escaped.chars().count() + 2 < MAX_COLUMNS {
        return vec![format!("{}\"{}\"", keyword, escaped)];
    }
    let width = MAX_COLUMNS - 2;
    let mut lines = vec![format!("{}\"\"", keyword)];
    let mut current = String::new();
    let mut columns = 0;
    for segment in breaker.segments(message) {
        let piece = escape(segment);
        let piece_columns = piece.chars().count();
        if columns > 0 && columns + piece_columns > width {
            lines.push(format!("\"{}\"", std::mem::take(&mut current)));
            columns = 0;
        }
        current.push_str(&piece);
        columns += piece_columns;
    }
    if !current.is_empty() {
        lines.push(format!("\"{}\"", current));
    }
    lines
}

/// Escapes a message for use between double quotes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Reverses [`escape`]. Unknown escapes keep the escaped character.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[derive(Debug, Default)]
struct Message {
    notes: Vec<String>,
    msgid: Option<String>,
    msgid_plural: Option<String>,
    msgstr: Option<String>,
    msgstr_plural: Vec<(usize, String)>,
    /// Line range of the singular msgstr, continuation strings included.
    msgstr_lines: Option<Range<usize>>,
}

fn parse_catalog(lines: &[Line<'_>]) -> Result<Vec<Message>, Error> {
    let mut messages = Vec::new();
    let mut current = Message::default();
    let mut finish = |current: &mut Message| {
        let message = std::mem::take(current);
        if message.msgid.is_some() {
            messages.push(message);
        }
    };

    let mut i = 0;
    while i < lines.len() {
        let content = lines[i].content.trim();
        if content.is_empty() {
            finish(&mut current);
            i += 1;
            continue;
        }
        if let Some(comment) = content.strip_prefix("#.") {
            if current.msgid.is_some() {
                finish(&mut current);
            }
            current.notes.push(comment.trim().to_string());
            i += 1;
            continue;
        }
        if content.starts_with('#') {
            i += 1;
            continue;
        }

        let (keyword, rest) = content
            .split_once(|c: char| c.is_whitespace())
            .ok_or_else(|| Error::format(format!("Missing string after `{}` at line {}", content, i + 1)))?;
        let start = i;
        let mut value = quoted(rest.trim(), i)?;
        i += 1;
        while i < lines.len() && lines[i].content.trim_start().starts_with('"') {
            value.push_str(&quoted(lines[i].content.trim(), i)?);
            i += 1;
        }

        match keyword {
            "msgctxt" | "msgid" if current.msgid.is_some() => {
                finish(&mut current);
                if keyword == "msgid" {
                    current.msgid = Some(value);
                }
            }
            "msgctxt" => {}
            "msgid" => current.msgid = Some(value),
            "msgid_plural" => current.msgid_plural = Some(value),
            "msgstr" => {
                current.msgstr = Some(value);
                current.msgstr_lines = Some(start..i);
            }
            _ => {
                let index = keyword
                    .strip_prefix("msgstr[")
                    .and_then(|rest| rest.strip_suffix(']'))
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(|| {
                        Error::format(format!("Unknown keyword `{}` at line {}", keyword, start + 1))
                    })?;
                current.msgstr_plural.push((index, value));
            }
        }
    }
    finish(&mut current);
    Ok(messages)
}

fn quoted(s: &str, line: usize) -> Result<String, Error> {
    let inner = s
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|inner| !inner.ends_with('\\') || inner.ends_with("\\\\"))
        .ok_or_else(|| Error::format(format!("Expected a quoted string at line {}", line + 1)))?;
    Ok(unescape(inner))
}
