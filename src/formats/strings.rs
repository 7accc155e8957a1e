//! Apple `.strings` files: `"key" = "value";` statements with C-style comments.
//!
//! Comments directly before a statement become its notes. Comments at the top
//! of the file that are followed by a blank line are bundle notes.

use std::{
    io::{Read, Write},
    ops::Range,
};

use log::{debug, trace};

use crate::{
    builder::BundleBuilder,
    error::Error,
    options::{FilterOptions, unknown_sequence_first},
    text::{Fallback, read_text},
    traits::ResourceFilter,
    types::{Bundle, ResourceString},
};

/// Filter for the `IOS` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct IosStringsFilter;

impl ResourceFilter for IosStringsFilter {
    fn parse(&self, input: &mut dyn Read, _options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let text = read_text(input, Fallback::Utf8)?.text;
        let scanned = scan(&text)?;

        let mut builder = BundleBuilder::new(true);
        builder.notes(scanned.notes);
        for entry in scanned.entries {
            builder.add_resource_string(ResourceString::new(entry.key, entry.value).with_notes(entry.notes))?;
        }
        let bundle = builder.build();
        debug!("IOS: parsed {} resource strings", bundle.len());
        Ok(bundle)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let mut out = String::new();
        for note in &bundle.notes {
            out.push_str(&comment(note));
        }
        if !bundle.notes.is_empty() {
            out.push('\n');
        }
        for rs in bundle.sorted_resource_strings_with(unknown_sequence_first(options)?) {
            for note in &rs.notes {
                out.push_str(&comment(note));
            }
            out.push_str(&format!("\"{}\" = \"{}\";\n", escape(&rs.key), escape(&rs.value)));
        }
        output.write_all(out.as_bytes())?;
        debug!("IOS: wrote {} resource strings", bundle.len());
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
        let scanned = scan(&text)?;

        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        let mut replaced = 0;
        for entry in &scanned.entries {
            let Some(value) = values.get(entry.key.as_str()) else {
                continue;
            };
            trace!("IOS: replacing `{}`", entry.key);
            out.push_str(&text[copied..entry.value_span.start]);
            out.push('"');
            out.push_str(&escape(value));
            out.push('"');
            copied = entry.value_span.end;
            replaced += 1;
        }
        out.push_str(&text[copied..]);
        output.write_all(out.as_bytes())?;
        debug!("IOS: merged {} resource strings", replaced);
        Ok(())
    }
}

fn comment(note: &str) -> String {
    format!("/* {} */\n", note.replace("*/", "* /"))
}

/// Escapes a key or value for use between double quotes.
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

#[derive(Debug, Default)]
struct Scanned {
    notes: Vec<String>,
    entries: Vec<Entry>,
}

#[derive(Debug)]
struct Entry {
    key: String,
    value: String,
    notes: Vec<String>,
    /// Byte range of the quoted value, quotes included.
    value_span: Range<usize>,
}

fn scan(text: &str) -> Result<Scanned, Error> {
    let mut scanner = Scanner { text, pos: 0 };
    let mut scanned = Scanned::default();
    let mut pending: Vec<String> = Vec::new();

    loop {
        let blank_line = scanner.skip_whitespace();
        if blank_line && scanned.entries.is_empty() {
            scanned.notes.append(&mut pending);
        }
        match scanner.peek() {
            None => break,
            Some('/') => pending.push(scanner.comment()?),
            Some(_) => {
                let key = scanner.key()?;
                scanner.skip_whitespace();
                scanner.expect('=')?;
                scanner.skip_whitespace();
                let start = scanner.pos;
                let value = scanner.quoted()?;
                let value_span = start..scanner.pos;
                scanner.skip_whitespace();
                scanner.expect(';')?;
                scanned.entries.push(Entry {
                    key,
                    value,
                    notes: std::mem::take(&mut pending),
                    value_span,
                });
            }
        }
    }
    Ok(scanned)
}

struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: &str) -> Error {
        let line = self.text[..self.pos].matches('\n').count() + 1;
        Error::format(format!("{} at line {}", message, line))
    }

    /// Skips whitespace and reports whether it contained a blank line.
    fn skip_whitespace(&mut self) -> bool {
        let mut newlines = 0;
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            if c == '\n' {
                newlines += 1;
            }
            self.bump();
        }
        newlines > 1
    }

    fn expect(&mut self, expected: char) -> Result<(), Error> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(&format!("Expected '{}' but found '{}'", expected, c))),
            None => Err(self.error(&format!("Expected '{}' but reached end of file", expected))),
        }
    }

    fn comment(&mut self) -> Result<String, Error> {
        let rest = &self.text[self.pos..];
        if let Some(body) = rest.strip_prefix("/*") {
            let end = body.find("*/").ok_or_else(|| self.error("Unterminated comment"))?;
            self.pos += 2 + end + 2;
            Ok(body[..end].trim().to_string())
        } else if let Some(body) = rest.strip_prefix("//") {
            let end = body.find('\n').unwrap_or(body.len());
            self.pos += 2 + end;
            Ok(body[..end].trim().to_string())
        } else {
            Err(self.error("Unexpected character '/'"))
        }
    }

    fn key(&mut self) -> Result<String, Error> {
        if self.peek() == Some('"') {
            return self.quoted();
        }
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            self.bump();
        }
        if self.pos == start {
            let found = self.peek().unwrap_or(' ');
            return Err(self.error(&format!("Unexpected character '{}'", found)));
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn quoted(&mut self) -> Result<String, Error> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => {
                    let c = self.bump().ok_or_else(|| self.error("Unterminated string"))?;
                    match c {
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        '0' => out.push('\0'),
                        'U' | 'u' => out.push(self.unicode_escape()?),
                        other => out.push(other),
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// Reads the four hex digits after `\U`, pairing surrogates.
    fn unicode_escape(&mut self) -> Result<char, Error> {
        let high = self.hex4()?;
        if !(0xD800..0xDC00).contains(&high) {
            return char::from_u32(high).ok_or_else(|| self.error("Malformed \\UXXXX encoding."));
        }
        let rest = &self.text[self.pos..];
        if !(rest.starts_with("\\U") || rest.starts_with("\\u")) {
            return Err(self.error("Malformed \\UXXXX encoding."));
        }
        self.pos += 2;
        let low = self.hex4()?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(self.error("Malformed \\UXXXX encoding."));
        }
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(code).ok_or_else(|| self.error("Malformed \\UXXXX encoding."))
    }

    fn hex4(&mut self) -> Result<u32, Error> {
        let digits = self
            .text
            .get(self.pos..self.pos + 4)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("Malformed \\UXXXX encoding."))?;
        let value = u32::from_str_radix(digits, 16).map_err(|_| self.error("Malformed \\UXXXX encoding."))?;
        self.pos += 4;
        Ok(value)
    }
}
