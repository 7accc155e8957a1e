//! Java `.properties` files.
//!
//! `JAVA` reads ISO-8859-1 and writes everything outside printable ASCII as
//! `\uXXXX`; `JAVAUTF8` reads UTF-8 and writes non-ASCII characters as is.

use std::io::{Read, Write};

use log::{debug, trace};

use crate::{
    builder::BundleBuilder,
    error::Error,
    formats::message_pattern::{
        MessagePatternEscape, escape_message_pattern, unescape_message_pattern,
    },
    options::{FilterOptions, unknown_sequence_first},
    text::{Fallback, Line, read_text, split_lines},
    traits::ResourceFilter,
    types::{Bundle, ResourceString},
    wrap::{MAX_COLUMNS, WordBreaker},
};

const CONTINUATION_INDENT: &str = "    ";

/// Character set of a properties file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertiesEncoding {
    /// Classic `.properties`: Latin-1 bytes, `\uXXXX` for everything else.
    Iso8859_1,
    Utf8,
}

/// Filter for the `JAVA` and `JAVAUTF8` formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JavaPropertiesFilter {
    encoding: PropertiesEncoding,
}

impl JavaPropertiesFilter {
    pub fn new(encoding: PropertiesEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> PropertiesEncoding {
        self.encoding
    }

    fn is_utf8(&self) -> bool {
        self.encoding == PropertiesEncoding::Utf8
    }

    fn format_id(&self) -> &'static str {
        match self.encoding {
            PropertiesEncoding::Iso8859_1 => "JAVA",
            PropertiesEncoding::Utf8 => "JAVAUTF8",
        }
    }

    fn read(&self, input: &mut dyn Read) -> Result<String, Error> {
        let fallback = match self.encoding {
            PropertiesEncoding::Iso8859_1 => Fallback::Latin1,
            PropertiesEncoding::Utf8 => Fallback::Utf8,
        };
        Ok(read_text(input, fallback)?.text)
    }

    fn emit(&self, output: &mut dyn Write, text: &str) -> Result<(), Error> {
        match self.encoding {
            PropertiesEncoding::Utf8 => output.write_all(text.as_bytes())?,
            PropertiesEncoding::Iso8859_1 => output.write_all(&encode_latin1(text))?,
        }
        Ok(())
    }

    fn comment(&self, note: &str) -> String {
        if self.is_utf8() {
            format!("#{}", note)
        } else {
            format!("#{}", escape_only_unicode(note))
        }
    }
}

impl ResourceFilter for JavaPropertiesFilter {
    fn parse(&self, input: &mut dyn Read, options: Option<&FilterOptions>) -> Result<Bundle, Error> {
        let mode = MessagePatternEscape::from_options(options, MessagePatternEscape::Auto)?;
        let text = self.read(input)?;
        let lines = split_lines(&text);

        let mut builder = BundleBuilder::new(true);
        let mut current_notes: Vec<String> = Vec::new();
        let mut global_notes_available = true;

        let mut iter = lines.iter();
        while let Some(line) = iter.next() {
            let line = strip_leading_whitespace(line.content);
            if let Some(note) = line.strip_prefix(['#', '!']) {
                if self.is_utf8() {
                    current_notes.push(note.to_string());
                } else {
                    current_notes.push(unescape_only_unicode(note));
                }
                continue;
            }
            if line.is_empty() {
                // Comments above the first blank line describe the whole file.
                if global_notes_available && !current_notes.is_empty() {
                    builder.notes(current_notes.drain(..));
                } else {
                    current_notes.push(String::new());
                }
                global_notes_available = false;
                continue;
            }

            let mut logical = line.to_string();
            while is_continuation_line(&logical) {
                logical.pop();
                match iter.next() {
                    Some(next) => logical.push_str(strip_leading_whitespace(next.content)),
                    None => break,
                }
            }

            let def = PropDef::parse_line(&logical)?
                .ok_or_else(|| Error::format(format!("missing key in line `{}`", logical)))?;
            let value = unescape_message_pattern(&def.value, mode).into_owned();
            builder.add_resource_string(
                ResourceString::new(def.key, value).with_notes(current_notes.drain(..)),
            )?;
        }

        let bundle = builder.build();
        debug!("{}: parsed {} resource strings", self.format_id(), bundle.len());
        Ok(bundle)
    }

    fn write(
        &self,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let mode = MessagePatternEscape::from_options(options, MessagePatternEscape::Auto)?;
        let breaker = WordBreaker::new(options)?;
        let unknown_first = unknown_sequence_first(options)?;

        let mut out = String::new();
        for note in &bundle.notes {
            out.push_str(&self.comment(note));
            out.push('\n');
        }
        if !bundle.notes.is_empty() {
            out.push('\n');
        }

        for rs in bundle.sorted_resource_strings_with(unknown_first) {
            for note in &rs.notes {
                out.push_str(&self.comment(note));
                out.push('\n');
            }
            let def = PropDef::new(
                rs.key.clone(),
                escape_message_pattern(&rs.value, mode).into_owned(),
                Separator::Equal,
            );
            for line in def.format_lines(&breaker, self.is_utf8()) {
                out.push_str(&line);
                out.push('\n');
            }
        }

        debug!("{}: wrote {} resource strings", self.format_id(), bundle.len());
        self.emit(output, &out)
    }

    fn merge(
        &self,
        base: &mut dyn Read,
        output: &mut dyn Write,
        bundle: &Bundle,
        options: Option<&FilterOptions>,
    ) -> Result<(), Error> {
        let mode = MessagePatternEscape::from_options(options, MessagePatternEscape::Auto)?;
        let breaker = WordBreaker::new(options)?;
        let text = self.read(base)?;
        let values = bundle.value_map();

        let mut out = String::with_capacity(text.len());
        let mut pending: Vec<Line<'_>> = Vec::new();
        let mut logical = String::new();
        let mut replaced = 0;

        let mut flush = |pending: &mut Vec<Line<'_>>, logical: &str, out: &mut String| -> Result<(), Error> {
            let Some(first) = pending.first() else {
                return Ok(());
            };
            let replacement = match PropDef::parse_line(logical)? {
                Some(def) => values.get(def.key.as_str()).map(|value| (def, *value)),
                None => None,
            };
            match replacement {
                Some((def, value)) => {
                    trace!("{}: replacing value of `{}`", self.format_id(), def.key);
                    let indent = leading_whitespace(first.content);
                    let terminator = pending.last().map_or("", |l| l.terminator);
                    let newline = if terminator.is_empty() { "\n" } else { terminator };
                    let def = PropDef::new(
                        def.key,
                        escape_message_pattern(value, mode).into_owned(),
                        def.separator,
                    );
                    let lines = def.format_lines(&breaker, self.is_utf8());
                    let count = lines.len();
                    for (i, line) in lines.into_iter().enumerate() {
                        if i == 0 {
                            out.push_str(indent);
                        }
                        out.push_str(&line);
                        out.push_str(if i + 1 == count { terminator } else { newline });
                    }
                    replaced += 1;
                }
                None => {
                    for line in pending.iter() {
                        out.push_str(line.content);
                        out.push_str(line.terminator);
                    }
                }
            }
            pending.clear();
            Ok(())
        };

        for line in split_lines(&text) {
            let normalized = strip_leading_whitespace(line.content);
            if pending.is_empty() {
                if normalized.starts_with(['#', '!']) || normalized.is_empty() {
                    out.push_str(line.content);
                    out.push_str(line.terminator);
                    continue;
                }
                logical.clear();
            }
            pending.push(line);
            if is_continuation_line(normalized) {
                logical.push_str(&normalized[..normalized.len() - 1]);
            } else {
                logical.push_str(normalized);
                flush(&mut pending, &logical, &mut out)?;
            }
        }
        flush(&mut pending, &logical, &mut out)?;

        debug!("{}: merged {} of {} values", self.format_id(), replaced, bundle.len());
        self.emit(output, &out)
    }
}

/// How key and value are separated in a property definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Equal,
    Colon,
    /// Whitespace only, e.g. `key value`.
    Space,
}

impl Separator {
    fn as_char(&self) -> char {
        match self {
            Separator::Equal => '=',
            Separator::Colon => ':',
            Separator::Space => ' ',
        }
    }
}

/// One key/value definition of a properties file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropDef {
    pub key: String,
    pub value: String,
    pub separator: Separator,
}

impl PropDef {
    pub fn new(key: impl Into<String>, value: impl Into<String>, separator: Separator) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            separator,
        }
    }

    /// Parses one logical line, with continuations already joined.
    ///
    /// The first unescaped `=`, `:` or whitespace ends the key. Whitespace followed
    /// by `=` or `:` counts as that separator. Returns `None` when there is no key.
    pub fn parse_line(line: &str) -> Result<Option<PropDef>, Error> {
        let line = strip_leading_whitespace(line);

        let mut split = None;
        let mut escaped = false;
        for (pos, c) in line.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if c == '\\' {
                escaped = true;
                continue;
            }
            if c == '=' || c == ':' {
                let separator = if c == '=' { Separator::Equal } else { Separator::Colon };
                split = Some((pos, separator, pos + 1));
                break;
            }
            if is_whitespace(c) {
                let rest = strip_leading_whitespace(&line[pos..]);
                let rest_start = line.len() - rest.len();
                split = Some(match rest.chars().next() {
                    Some('=') => (pos, Separator::Equal, rest_start + 1),
                    Some(':') => (pos, Separator::Colon, rest_start + 1),
                    _ => (pos, Separator::Space, rest_start),
                });
                break;
            }
        }

        let (key_end, separator, value_start) = match split {
            Some(found) => found,
            // A bare key has an empty value.
            None if !line.is_empty() => (line.len(), Separator::Space, line.len()),
            None => return Ok(None),
        };
        if key_end == 0 {
            return Ok(None);
        }

        let key = unescape(&line[..key_end])?;
        let value = unescape(strip_leading_whitespace(&line[value_start..]))?;
        Ok(Some(PropDef { key, value, separator }))
    }

    /// Formats the definition as physical lines, wrapping long values at word
    /// boundaries with `\` continuations.
    pub fn format_lines(&self, breaker: &WordBreaker, utf8: bool) -> Vec<String> {
        let mut buf = escape(&self.key, EscapeSpace::All, utf8);
        match self.separator {
            Separator::Space => buf.push(' '),
            other => {
                buf.push(' ');
                buf.push(other.as_char());
                buf.push(' ');
            }
        }

        let len = self.key.chars().count() + self.value.chars().count() + 3;
        if len <= MAX_COLUMNS {
            buf.push_str(&escape(&self.value, EscapeSpace::LeadingOnly, utf8));
            return vec![buf];
        }

        let mut lines = Vec::new();
        if buf.chars().count() > MAX_COLUMNS {
            buf.push('\\');
            lines.push(std::mem::replace(&mut buf, CONTINUATION_INDENT.to_string()));
        }

        let mut emit_next = false;
        for (i, segment) in breaker.segments(&self.value).into_iter().enumerate() {
            let mode = if i == 0 { EscapeSpace::LeadingOnly } else { EscapeSpace::None };
            let escaped = escape(segment, mode, utf8);
            let buf_len = buf.chars().count();
            if emit_next || buf_len + escaped.chars().count() + 2 >= MAX_COLUMNS {
                // A continuation line must not start with whitespace, it would be
                // stripped on read.
                if !escaped.starts_with(is_whitespace) {
                    buf.push('\\');
                    lines.push(std::mem::replace(&mut buf, CONTINUATION_INDENT.to_string()));
                    emit_next = false;
                }
            }
            buf.push_str(&escaped);
            if buf.chars().count() + 2 >= MAX_COLUMNS {
                emit_next = true;
            }
        }
        if !buf.is_empty() {
            lines.push(buf);
        }
        lines
    }
}

/// Which spaces [`escape`] protects with a backslash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeSpace {
    All,
    LeadingOnly,
    None,
}

/// Escapes a key or value for a properties file.
///
/// ```rust
/// use resfilter::formats::properties::{escape, EscapeSpace};
///
/// assert_eq!(escape("a b=c", EscapeSpace::All, false), "a\\ b\\=c");
/// assert_eq!(escape("\u{3042}", EscapeSpace::LeadingOnly, false), "\\u3042");
/// assert_eq!(escape("\u{3042}", EscapeSpace::LeadingOnly, true), "\u{3042}");
/// ```
pub fn escape(s: &str, mode: EscapeSpace, utf8: bool) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut chars = s.chars().peekable();

    if mode != EscapeSpace::None {
        while let Some(&c) = chars.peek() {
            match c {
                ' ' => out.push_str("\\ "),
                '\t' => out.push_str("\\t"),
                '\u{000C}' => out.push_str("\\f"),
                _ => break,
            }
            chars.next();
        }
    }

    for c in chars {
        let code = c as u32;
        if code < 0x20 || code >= 0x7E {
            match c {
                '\t' => out.push_str("\\t"),
                '\n' => out.push_str("\\n"),
                '\u{000C}' => out.push_str("\\f"),
                '\r' => out.push_str("\\r"),
                // printable in a UTF-8 file
                _ if utf8 && (c == '~' || code >= 0xA0) => out.push(c),
                _ => push_unicode_escape(&mut out, c),
            }
            continue;
        }
        match c {
            ' ' if mode == EscapeSpace::All => out.push_str("\\ "),
            '#' | '!' | '=' | ':' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn push_unicode_escape(out: &mut String, c: char) {
    let mut units = [0u16; 2];
    for unit in c.encode_utf16(&mut units) {
        out.push_str(&format!("\\u{:04X}", unit));
    }
}

/// Reverses [`escape`]; malformed `\uXXXX` sequences are a format error.
///
/// Unknown escapes stand for the escaped character itself and a lone trailing
/// backslash is dropped.
pub fn unescape(s: &str) -> Result<String, Error> {
    let malformed = || Error::format("Malformed \\uxxxx encoding.");
    let mut out = String::with_capacity(s.len());
    let mut high_surrogate: Option<u16> = None;
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            if high_surrogate.is_some() {
                return Err(malformed());
            }
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            break;
        };
        let decoded = match escaped {
            't' => '\t',
            'n' => '\n',
            'f' => '\u{000C}',
            'r' => '\r',
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                let unit = parse_hex_unit(&hex).ok_or_else(malformed)?;
                match (high_surrogate.take(), unit) {
                    (None, 0xD800..=0xDBFF) => {
                        high_surrogate = Some(unit);
                        continue;
                    }
                    (Some(high), 0xDC00..=0xDFFF) => char::decode_utf16([high, unit])
                        .next()
                        .and_then(Result::ok)
                        .ok_or_else(malformed)?,
                    (None, _) => char::from_u32(u32::from(unit)).ok_or_else(malformed)?,
                    (Some(_), _) => return Err(malformed()),
                }
            }
            other => other,
        };
        if high_surrogate.is_some() {
            return Err(malformed());
        }
        out.push(decoded);
    }
    if high_surrogate.is_some() {
        return Err(malformed());
    }
    Ok(out)
}

fn parse_hex_unit(hex: &str) -> Option<u16> {
    if hex.len() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(hex, 16).ok()
}

/// Escapes characters above U+007F as `\uXXXX`, leaving everything else alone.
/// Used for comments in ISO-8859-1 files.
pub fn escape_only_unicode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if (c as u32) > 0x7F {
            push_unicode_escape(&mut out, c);
        } else {
            out.push(c);
        }
    }
    out
}

/// Decodes well-formed `\uXXXX` sequences and leaves everything else as is.
pub fn unescape_only_unicode(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        if chars[i + 1] == 'u' {
            if let Some((c, consumed)) = decode_unicode_at(&chars, i) {
                out.push(c);
                i += consumed;
                continue;
            }
        }
        // keep the pair so an escaped backslash is not read as an escape start
        out.push(chars[i]);
        out.push(chars[i + 1]);
        i += 2;
    }
    out
}

/// Decodes `\uXXXX` (or a surrogate pair of them) at `start`.
fn decode_unicode_at(chars: &[char], start: usize) -> Option<(char, usize)> {
    let unit_at = |pos: usize| -> Option<u16> {
        if chars.get(pos) != Some(&'\\') || chars.get(pos + 1) != Some(&'u') {
            return None;
        }
        let hex: String = chars.get(pos + 2..pos + 6)?.iter().collect();
        parse_hex_unit(&hex)
    };
    let first = unit_at(start)?;
    match first {
        0xD800..=0xDBFF => {
            let second = unit_at(start + 6)?;
            let c = char::decode_utf16([first, second]).next()?.ok()?;
            Some((c, 12))
        }
        0xDC00..=0xDFFF => None,
        _ => Some((char::from_u32(u32::from(first))?, 6)),
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{000C}')
}

fn strip_leading_whitespace(s: &str) -> &str {
    s.trim_start_matches(is_whitespace)
}

fn leading_whitespace(s: &str) -> &str {
    &s[..s.len() - strip_leading_whitespace(s).len()]
}

/// An odd number of trailing backslashes continues the line.
fn is_continuation_line(s: &str) -> bool {
    s.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Encodes text as ISO-8859-1, writing characters outside Latin-1 as `\uXXXX`.
fn encode_latin1(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(b) => bytes.push(b),
            Err(_) => {
                let mut escaped = String::new();
                push_unicode_escape(&mut escaped, c);
                bytes.extend_from_slice(escaped.as_bytes());
            }
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn java() -> JavaPropertiesFilter {
        JavaPropertiesFilter::new(PropertiesEncoding::Iso8859_1)
    }

    fn java_utf8() -> JavaPropertiesFilter {
        JavaPropertiesFilter::new(PropertiesEncoding::Utf8)
    }

    #[test]
    fn test_parse_line_separators() {
        let cases = [
            ("website = http://en.wikipedia.org/", "website", "http://en.wikipedia.org/", Separator::Equal),
            ("language English", "language", "English", Separator::Space),
            ("message:Welcome to Wikipedia!", "message", "Welcome to Wikipedia!", Separator::Colon),
            ("key\\ with\\ spaces = value", "key with spaces", "value", Separator::Equal),
            ("tab : \\u0009pick up the\\u00A5 tab", "tab", "\tpick up the\u{a5} tab", Separator::Colon),
            ("trailSPs = trailing SPs  ", "trailSPs", "trailing SPs  ", Separator::Equal),
            ("withTabs = Tab1\\tTab2\\tTab3\\t", "withTabs", "Tab1\tTab2\tTab3\t", Separator::Equal),
            ("backslashes = a\\\\b\\\\c", "backslashes", "a\\b\\c", Separator::Equal),
            ("  indented=x", "indented", "x", Separator::Equal),
            ("bare", "bare", "", Separator::Space),
        ];
        for (line, key, value, separator) in cases {
            let def = PropDef::parse_line(line).unwrap().unwrap();
            assert_eq!(def, PropDef::new(key, value, separator), "line {:?}", line);
        }
        assert_eq!(PropDef::parse_line("=value").unwrap(), None);
    }

    #[test]
    fn test_escape_key() {
        let cases = [
            ("a b c", "a\\ b\\ c"),
            (" a b ", "\\ a\\ b\\ "),
            (" \t abc \t ", "\\ \\t\\ abc\\ \\t\\ "),
            ("\u{0000}\u{0001}", "\\u0000\\u0001"),
            ("a=b=c", "a\\=b\\=c"),
            ("a:b;c", "a\\:b;c"),
            ("!#$%()*+,-./", "\\!\\#$%()*+,-./"),
            ("\u{3042}\u{3044}", "\\u3042\\u3044"),
        ];
        for (key, expected) in cases {
            assert_eq!(escape(key, EscapeSpace::All, false), expected, "key {:?}", key);
            assert_eq!(unescape(expected).unwrap(), key);
        }
    }

    #[test]
    fn test_escape_value_keeps_inner_spaces() {
        assert_eq!(escape("  two  spaces ", EscapeSpace::LeadingOnly, false), "\\ \\ two  spaces ");
        assert_eq!(escape("\u{1F600}", EscapeSpace::None, false), "\\uD83D\\uDE00");
        assert_eq!(unescape("\\uD83D\\uDE00").unwrap(), "\u{1F600}");
    }

    #[test]
    fn test_unescape_errors() {
        for bad in ["\\u12", "\\u12G4", "\\uD83Dx", "\\uDE00", "\\uD83D"] {
            let err = unescape(bad).unwrap_err();
            assert!(err.is_format_error(), "{:?}", bad);
        }
        assert_eq!(unescape("trailing\\").unwrap(), "trailing");
        assert_eq!(unescape("\\q").unwrap(), "q");
    }

    #[test]
    fn test_unescape_only_unicode_is_lenient() {
        assert_eq!(unescape_only_unicode("caf\\u00E9 \\\\u0041 \\x \\u12"), "caf\u{e9} \\\\u0041 \\x \\u12");
        assert_eq!(escape_only_unicode("caf\u{e9}"), "caf\\u00E9");
    }

    #[test]
    fn test_parse_notes_and_continuations() {
        let input = indoc! {r#"
            # Copyright
            ! All rights reserved

            # Greeting shown on start
            greeting = Hello \
                       world
            farewell : Bye

            # caf\u00E9
            escaped\ key value
        "#};
        let bundle = java().parse_bytes(input.as_bytes(), None).unwrap();
        assert_eq!(bundle.notes, vec![" Copyright", " All rights reserved"]);

        let greeting = bundle.get("greeting").unwrap();
        assert_eq!(greeting.value, "Hello world");
        assert_eq!(greeting.notes, vec![" Greeting shown on start"]);
        assert_eq!(greeting.sequence_number, Some(1));

        let escaped = bundle.get("escaped key").unwrap();
        assert_eq!(escaped.value, "value");
        assert_eq!(escaped.notes, vec!["", " caf\u{e9}"]);
    }

    #[test]
    fn test_parse_latin1_and_utf8() {
        let bundle = java().parse_bytes(b"name = caf\xE9", None).unwrap();
        assert_eq!(bundle.get("name").unwrap().value, "caf\u{e9}");

        let bundle = java_utf8().parse_bytes("name = café".as_bytes(), None).unwrap();
        assert_eq!(bundle.get("name").unwrap().value, "café");
    }

    #[test]
    fn test_parse_message_pattern_quotes() {
        let input = "a = File {0} isn''t in use.\nb = The file isn''t in use.\n";
        let bundle = java().parse_bytes(input.as_bytes(), None).unwrap();
        assert_eq!(bundle.get("a").unwrap().value, "File {0} isn't in use.");
        assert_eq!(bundle.get("b").unwrap().value, "The file isn''t in use.");
    }

    #[test]
    fn test_write_escapes_and_sorts() {
        let mut builder = BundleBuilder::new(true);
        builder.note("Generated").add("key one", "caf\u{e9}").add("two", "File {0} isn't here");
        let bundle = builder.build();

        let written = java().write_bytes(&bundle, None).unwrap();
        let expected = indoc! {r#"
            #Generated

            key\ one = caf\u00E9
            two = File {0} isn''t here
        "#};
        assert_eq!(String::from_utf8(written).unwrap(), expected);

        let written = java_utf8().write_bytes(&bundle, None).unwrap();
        assert!(String::from_utf8(written).unwrap().contains("key\\ one = caf\u{e9}\n"));
    }

    #[test]
    fn test_long_value_is_wrapped() {
        let value = "The quick brown fox jumps over the lazy dog. ".repeat(5);
        let def = PropDef::new("long", value.trim_end(), Separator::Equal);
        let breaker = WordBreaker::new(None).unwrap();
        let lines = def.format_lines(&breaker, false);
        assert!(lines.len() > 1);
        for line in &lines[..lines.len() - 1] {
            assert!(line.ends_with('\\'), "{:?}", line);
        }
        for line in &lines {
            assert!(line.chars().count() <= MAX_COLUMNS, "{:?}", line);
        }

        let mut text = lines.join("\n");
        text.push('\n');
        let bundle = java().parse_bytes(text.as_bytes(), None).unwrap();
        assert_eq!(bundle.get("long").unwrap().value, value.trim_end());
    }

    #[test]
    fn test_merge_replaces_only_known_keys() {
        let base = indoc! {r#"
            # header comment

            greeting = Hello
              indented : Old \
                  value
            untouched=Same
        "#};
        let mut builder = BundleBuilder::new(true);
        builder.add("greeting", "Bonjour").add("indented", "Nouveau").add("missing", "x");
        let merged = java().merge_bytes(base.as_bytes(), &builder.build(), None).unwrap();
        let expected = indoc! {r#"
            # header comment

            greeting = Bonjour
              indented : Nouveau
            untouched=Same
        "#};
        assert_eq!(String::from_utf8(merged).unwrap(), expected);
    }

    #[test]
    fn test_merge_keeps_crlf() {
        let base = b"a=1\r\n# note\r\nb=2\r\n";
        let mut builder = BundleBuilder::new(true);
        builder.add("b", "two");
        let merged = java().merge_bytes(base, &builder.build(), None).unwrap();
        assert_eq!(merged, b"a=1\r\n# note\r\nb = two\r\n");
    }

    #[test]
    fn test_malformed_escape_is_format_error() {
        let err = java().parse_bytes(b"key = \\u00", None).unwrap_err();
        assert!(err.is_format_error());
    }
}
