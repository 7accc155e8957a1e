//! Flattened key paths for nested documents.
//!
//! `$` is the root, `.name` an object member, `[n]` an array index and `['name']`
//! a member whose name would otherwise be ambiguous. Plain top-level string
//! members keep their bare name, so flat files get readable keys.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Keys that must be read as a path instead of a literal name.
    static ref PATH_PREFIX: Regex = Regex::new(r"^\$[.\[]").unwrap();
    static ref RESERVED: Regex = Regex::new(r"[.'\[\]]").unwrap();
}

const QUOTE_ESCAPE: &str = "\\u0027";

/// Largest array index a writer will materialize. Missing elements before it
/// are padded, so larger indices are rejected.
pub const MAX_ARRAY_INDEX: usize = 0xFFFF;

/// One step of a decoded key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Name(String),
    Index(usize),
}

/// Returns true if `key` is a path expression rather than a literal name.
pub fn is_path(key: &str) -> bool {
    PATH_PREFIX.is_match(key)
}

/// Encodes the member `name` below `parent`.
///
/// `parent` is `None` for members of the root object. `is_leaf` tells whether the
/// member holds a string (a finished key) or nested content (a prefix).
///
/// ```rust
/// use resfilter::formats::key_path::encode_member;
///
/// assert_eq!(encode_member(None, "title", true), "title");
/// assert_eq!(encode_member(None, "bears", false), "$.bears");
/// assert_eq!(encode_member(Some("$.bears"), "grizzly", true), "$.bears.grizzly");
/// assert_eq!(encode_member(None, "ibm.com", false), "$['ibm.com']");
/// ```
pub fn encode_member(parent: Option<&str>, name: &str, is_leaf: bool) -> String {
    match parent {
        None if is_leaf && !is_path(name) => name.to_string(),
        None => {
            let mut key = String::from("$");
            push_member(&mut key, name);
            key
        }
        Some(parent) => {
            let mut key = parent.to_string();
            push_member(&mut key, name);
            key
        }
    }
}

/// Encodes array element `index` below `parent`.
pub fn encode_index(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

fn push_member(buf: &mut String, name: &str) {
    if needs_brackets(name) {
        buf.push_str("['");
        buf.push_str(&name.replace('\'', QUOTE_ESCAPE));
        buf.push_str("']");
    } else {
        if !buf.is_empty() {
            buf.push('.');
        }
        buf.push_str(name);
    }
}

fn needs_brackets(name: &str) -> bool {
    // all-digit names would read back as array indices
    name.is_empty() || RESERVED.is_match(name) || name.chars().all(|c| c.is_ascii_digit())
}

/// Encodes a full path from the root.
pub fn encode_path(segments: &[PathSegment]) -> String {
    let mut key: Option<String> = None;
    for (i, segment) in segments.iter().enumerate() {
        let is_leaf = i + 1 == segments.len();
        key = Some(match segment {
            PathSegment::Name(name) => encode_member(key.as_deref(), name, is_leaf),
            PathSegment::Index(index) => encode_index(key.as_deref().unwrap_or("$"), *index),
        });
    }
    key.unwrap_or_default()
}

/// Splits a key into its path segments.
///
/// Keys that do not start with `$.` or `$[` are a single member name.
///
/// ```rust
/// use resfilter::formats::key_path::{decode_path, PathSegment};
///
/// assert_eq!(
///     decode_path("$.countries[2].Americas['S. America'][0]"),
///     vec![
///         PathSegment::Name("countries".into()),
///         PathSegment::Index(2),
///         PathSegment::Name("Americas".into()),
///         PathSegment::Name("S. America".into()),
///         PathSegment::Index(0),
///     ]
/// );
/// assert_eq!(decode_path("another.text"), vec![PathSegment::Name("another.text".into())]);
/// ```
pub fn decode_path(key: &str) -> Vec<PathSegment> {
    if !is_path(key) {
        return vec![PathSegment::Name(key.to_string())];
    }

    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in key[1..].chars() {
        match c {
            '\'' => {
                quoted = !quoted;
                current.push(c);
            }
            '.' | '[' | ']' if !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
        .into_iter()
        .map(|token| {
            if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
                PathSegment::Name(token[1..token.len() - 1].replace(QUOTE_ESCAPE, "'"))
            } else if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
                token
                    .parse()
                    .map(PathSegment::Index)
                    .unwrap_or(PathSegment::Name(token))
            } else {
                PathSegment::Name(token)
            }
        })
        .collect()
}
