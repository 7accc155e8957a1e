//! quick-xml helpers shared by the markup filters.

use std::borrow::Cow;

use quick_xml::{
    Reader,
    escape::partial_escape,
    events::{BytesStart, Event},
};

use crate::error::Error;

/// Unescaped value of attribute `name`, if present.
pub(crate) fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, Error> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Concatenated text of the element whose start tag was just read.
///
/// Consumes events up to and including the matching end tag. Text of nested
/// elements is included, their markup is not.
pub(crate) fn text_content(reader: &mut Reader<&[u8]>) -> Result<String, Error> {
    let mut depth = 0usize;
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(data) => text.push_str(&utf8(&data)?),
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(text),
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(Error::format("unexpected end of XML document")),
            _ => {}
        }
    }
}

/// Skips to the matching end tag of the element whose start tag was just read.
///
/// Returns the byte offset where the end tag begins.
pub(crate) fn skip_element(reader: &mut Reader<&[u8]>) -> Result<usize, Error> {
    let mut depth = 0usize;
    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(before),
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(Error::format("unexpected end of XML document")),
            _ => {}
        }
    }
}

pub(crate) fn utf8(bytes: &[u8]) -> Result<Cow<'_, str>, Error> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|e| Error::format_with_source("invalid UTF-8 in XML content", e))
}

/// Escapes `&`, `<` and `>` for element content.
pub(crate) fn escape_text(text: &str) -> Cow<'_, str> {
    partial_escape(text)
}

/// Leading whitespace of the line containing `pos`, or `None` if the line has
/// other content before `pos`.
pub(crate) fn line_indent(text: &str, pos: usize) -> Option<&str> {
    let line_start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &text[line_start..pos];
    prefix.chars().all(char::is_whitespace).then_some(prefix)
}
