//! Byte-order-mark detection and text decoding shared by all filters.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use std::io::Read;

use crate::error::Error;

/// Unicode signature found at the start of a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bom {
    Utf8,
    Utf16Be,
    Utf16Le,
    Utf32Be,
    Utf32Le,
}

impl Bom {
    /// Detects a byte-order mark at the start of `bytes`.
    ///
    /// UTF-32LE is checked before UTF-16LE since its signature starts with the
    /// UTF-16LE one.
    pub fn detect(bytes: &[u8]) -> Option<Bom> {
        [Bom::Utf8, Bom::Utf32Be, Bom::Utf32Le, Bom::Utf16Be, Bom::Utf16Le]
            .into_iter()
            .find(|bom| bytes.starts_with(bom.signature()))
    }

    pub fn signature(&self) -> &'static [u8] {
        match self {
            Bom::Utf8 => &[0xEF, 0xBB, 0xBF],
            Bom::Utf16Be => &[0xFE, 0xFF],
            Bom::Utf16Le => &[0xFF, 0xFE],
            Bom::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
            Bom::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
        }
    }

    pub fn len(&self) -> usize {
        self.signature().len()
    }

    /// Name of the encoding the signature announces.
    pub fn encoding_name(&self) -> &'static str {
        match self {
            Bom::Utf8 => "UTF-8",
            Bom::Utf16Be => "UTF-16BE",
            Bom::Utf16Le => "UTF-16LE",
            Bom::Utf32Be => "UTF-32BE",
            Bom::Utf32Le => "UTF-32LE",
        }
    }
}

/// Encoding assumed when the input carries no byte-order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Utf8,
    /// Every byte maps to the code point of the same value.
    Latin1,
}

/// Text decoded from a byte stream, with the signature that was stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub bom: Option<Bom>,
}

/// Reads the whole stream and decodes it.
pub fn read_text(input: &mut dyn Read, fallback: Fallback) -> Result<DecodedText, Error> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    decode_text(&bytes, fallback)
}

/// Strips a byte-order mark, if any, and decodes the rest.
///
/// Malformed byte sequences are a format error; nothing is replaced silently.
pub fn decode_text(bytes: &[u8], fallback: Fallback) -> Result<DecodedText, Error> {
    let bom = Bom::detect(bytes);
    let body = &bytes[bom.map_or(0, |b| b.len())..];
    let text = match (bom, fallback) {
        (Some(Bom::Utf8), _) | (None, Fallback::Utf8) => decode_with(UTF_8, body)?,
        (Some(Bom::Utf16Be), _) => decode_with(UTF_16BE, body)?,
        (Some(Bom::Utf16Le), _) => decode_with(UTF_16LE, body)?,
        (Some(Bom::Utf32Be), _) => decode_utf32(body, u32::from_be_bytes)?,
        (Some(Bom::Utf32Le), _) => decode_utf32(body, u32::from_le_bytes)?,
        (None, Fallback::Latin1) => body.iter().map(|&b| char::from(b)).collect(),
    };
    Ok(DecodedText { text, bom })
}

fn decode_with(encoding: &'static Encoding, body: &[u8]) -> Result<String, Error> {
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|cow| cow.into_owned())
        .ok_or_else(|| Error::format(format!("malformed {} byte sequence", encoding.name())))
}

fn decode_utf32(body: &[u8], to_u32: fn([u8; 4]) -> u32) -> Result<String, Error> {
    if body.len() % 4 != 0 {
        return Err(Error::format("truncated UTF-32 byte sequence"));
    }
    body.chunks_exact(4)
        .map(|chunk| {
            let unit = to_u32([chunk[0], chunk[1], chunk[2], chunk[3]]);
            char::from_u32(unit)
                .ok_or_else(|| Error::format(format!("invalid UTF-32 code point {:#x}", unit)))
        })
        .collect()
}

/// A physical line and its terminator (`"\n"`, `"\r\n"` or empty at end of input).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub content: &'a str,
    pub terminator: &'a str,
}

/// Splits text into physical lines, keeping the exact terminators so merges can
/// reproduce untouched lines byte for byte.
pub fn split_lines(text: &str) -> Vec<Line<'_>> {
    text.split_inclusive('\n')
        .map(|raw| {
            let without_lf = raw.strip_suffix('\n');
            match without_lf {
                Some(rest) => match rest.strip_suffix('\r') {
                    Some(content) => Line {
                        content,
                        terminator: &raw[content.len()..],
                    },
                    None => Line {
                        content: rest,
                        terminator: "\n",
                    },
                },
                None => Line {
                    content: raw,
                    terminator: "",
                },
            }
        })
        .collect()
}

/// `"\r\n"` if the text uses it, otherwise `"\n"`.
pub fn newline_of(text: &str) -> &'static str {
    if text.contains("\r\n") { "\r\n" } else { "\n" }
}
