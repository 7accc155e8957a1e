//! Just enough JavaScript to read object literals out of a module.
//!
//! Property values made of string literals joined with `+` are decoded; every
//! other value is skipped as an opaque expression. All values keep the byte
//! range they occupy in the source so they can be replaced in place.

use std::ops::Range;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum JsValue {
    /// A string literal or a `+` concatenation of string literals.
    String(String),
    Object(Vec<Property>),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Property {
    pub key: String,
    pub value: JsValue,
    pub value_span: Range<usize>,
}

/// Parses the first object literal found in expression position, e.g. the
/// argument of `define({...})` or the operand of `return {...}`.
pub(crate) fn first_object(source: &str) -> Result<Option<Vec<Property>>, Error> {
    let mut lexer = Lexer::new(source);
    let mut expression_position = true;
    loop {
        lexer.skip_trivia()?;
        let Some(c) = lexer.peek() else {
            return Ok(None);
        };
        match c {
            '{' if expression_position => return lexer.object().map(Some),
            '(' | ',' | '=' | ':' | '[' | '?' => {
                lexer.bump();
                expression_position = true;
            }
            '"' | '\'' => {
                lexer.string()?;
                expression_position = false;
            }
            '`' => {
                lexer.template()?;
                expression_position = false;
            }
            c if is_ident_start(c) => {
                let word = lexer.identifier();
                expression_position = word == "return";
            }
            _ => {
                lexer.bump();
                expression_position = false;
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: &str) -> Error {
        let line = self.source[..self.pos].matches('\n').count() + 1;
        Error::format(format!("{} at line {}", message, line))
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), Error> {
        loop {
            let rest = &self.source[self.pos..];
            if let Some(c) = rest.chars().next().filter(|c| c.is_whitespace()) {
                self.pos += c.len_utf8();
            } else if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if let Some(body) = rest.strip_prefix("/*") {
                let end = body.find("*/").ok_or_else(|| self.error("Unterminated comment"))?;
                self.pos += 2 + end + 2;
            } else {
                return Ok(());
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), Error> {
        self.skip_trivia()?;
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(&format!("Expected '{}' but found '{}'", expected, c))),
            None => Err(self.error(&format!("Expected '{}' but reached end of file", expected))),
        }
    }

    fn identifier(&mut self) -> &'a str {
        let source = self.source;
        let start = self.pos;
        while self.peek().is_some_and(is_ident_part) {
            self.bump();
        }
        &source[start..self.pos]
    }

    fn object(&mut self) -> Result<Vec<Property>, Error> {
        self.expect('{')?;
        let mut properties = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(properties);
                }
                Some(',') if !properties.is_empty() => {
                    self.bump();
                    continue;
                }
                None => return Err(self.error("Unterminated object literal")),
                _ => {}
            }

            let key = self.property_key()?;
            self.expect(':')?;
            self.skip_trivia()?;
            let start = self.pos;
            let value = self.value()?;
            properties.push(Property {
                key,
                value,
                value_span: start..self.pos,
            });

            self.skip_trivia()?;
            match self.peek() {
                Some(',') | Some('}') => {}
                Some(c) => return Err(self.error(&format!("Unexpected character '{}'", c))),
                None => return Err(self.error("Unterminated object literal")),
            }
        }
    }

    fn property_key(&mut self) -> Result<String, Error> {
        match self.peek() {
            Some('"') | Some('\'') => self.string(),
            Some(c) if is_ident_part(c) => Ok(self.identifier().to_string()),
            Some(c) => Err(self.error(&format!("Unexpected character '{}'", c))),
            None => Err(self.error("Unterminated object literal")),
        }
    }

    /// Parses one property value, leaving the position right after it.
    fn value(&mut self) -> Result<JsValue, Error> {
        if self.peek() == Some('{') {
            return self.object().map(JsValue::Object);
        }
        let start = self.pos;
        if let Some(text) = self.concatenation()? {
            let end = self.pos;
            self.skip_trivia()?;
            if matches!(self.peek(), Some(',') | Some('}') | None) {
                self.pos = end;
                return Ok(JsValue::String(text));
            }
        }
        self.pos = start;
        self.skip_expression()?;
        Ok(JsValue::Other)
    }

    /// `"a" + ("b" + 'c')`, or `None` if the expression has other operands.
    fn concatenation(&mut self) -> Result<Option<String>, Error> {
        let Some(mut text) = self.string_term()? else {
            return Ok(None);
        };
        loop {
            let before = self.pos;
            self.skip_trivia()?;
            if self.peek() != Some('+') {
                self.pos = before;
                return Ok(Some(text));
            }
            self.bump();
            self.skip_trivia()?;
            match self.string_term()? {
                Some(more) => text.push_str(&more),
                None => return Ok(None),
            }
        }
    }

    fn string_term(&mut self) -> Result<Option<String>, Error> {
        match self.peek() {
            Some('"') | Some('\'') => self.string().map(Some),
            Some('(') => {
                self.bump();
                self.skip_trivia()?;
                let inner = self.concatenation()?;
                if inner.is_some() {
                    self.expect(')')?;
                }
                Ok(inner)
            }
            _ => Ok(None),
        }
    }

    /// Skips an arbitrary expression up to a `,` or `}` at nesting depth zero.
    fn skip_expression(&mut self) -> Result<(), Error> {
        let mut depth = 0usize;
        let mut end = self.pos;
        loop {
            self.skip_trivia()?;
            match self.peek() {
                None if depth == 0 => break,
                None => return Err(self.error("Unbalanced brackets")),
                Some(',') | Some('}') | Some(')') | Some(']') if depth == 0 => break,
                Some('{') | Some('(') | Some('[') => {
                    depth += 1;
                    self.bump();
                }
                Some('}') | Some(')') | Some(']') => {
                    depth -= 1;
                    self.bump();
                }
                Some('"') | Some('\'') => {
                    self.string()?;
                }
                Some('`') => self.template()?,
                Some(_) => {
                    self.bump();
                }
            }
            end = self.pos;
        }
        self.pos = end;
        Ok(())
    }

    /// Skips a template literal; `${...}` substitutions are not interpreted.
    fn template(&mut self) -> Result<(), Error> {
        self.bump();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated template literal")),
                Some('\\') => {
                    self.bump();
                }
                Some('`') => return Ok(()),
                Some(_) => {}
            }
        }
    }

    fn string(&mut self) -> Result<String, Error> {
        let quote = self.bump().ok_or_else(|| self.error("Expected a string literal"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("Unterminated string literal")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), Error> {
        let c = self.bump().ok_or_else(|| self.error("Unterminated string literal"))?;
        match c {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            // line continuation
            '\n' => {}
            '\r' => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            'x' => {
                let code = self.hex(2)?;
                out.push(char::from_u32(code).ok_or_else(|| self.error("Malformed \\x escape"))?);
            }
            'u' => {
                let code = if self.peek() == Some('{') {
                    self.bump();
                    let source = self.source;
                    let start = self.pos;
                    while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.bump();
                    }
                    let digits = &source[start..self.pos];
                    self.expect('}')?;
                    u32::from_str_radix(digits, 16).map_err(|_| self.error("Malformed \\u escape"))?
                } else {
                    let high = self.hex(4)?;
                    if (0xD800..0xDC00).contains(&high) && self.source[self.pos..].starts_with("\\u") {
                        self.pos += 2;
                        let low = self.hex(4)?;
                        if !(0xDC00..0xE000).contains(&low) {
                            return Err(self.error("Malformed \\u escape"));
                        }
                        0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                    } else {
                        high
                    }
                };
                out.push(char::from_u32(code).ok_or_else(|| self.error("Malformed \\u escape"))?);
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn hex(&mut self, len: usize) -> Result<u32, Error> {
        let digits = self
            .source
            .get(self.pos..self.pos + len)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("Malformed hex escape"))?;
        let value = u32::from_str_radix(digits, 16).map_err(|_| self.error("Malformed hex escape"))?;
        self.pos += len;
        Ok(value)
    }
}

/// Writes `s` as a double-quoted JavaScript string literal.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(properties: &[Property]) -> Vec<(&str, Option<&str>)> {
        properties
            .iter()
            .map(|p| {
                let value = match &p.value {
                    JsValue::String(s) => Some(s.as_str()),
                    _ => None,
                };
                (p.key.as_str(), value)
            })
            .collect()
    }

    #[test]
    fn test_define_object() {
        let source = r#"// header
define({
    "plain": "Hello",
    'single': 'It\'s',
    bare: "a" + ('b' + "c"),
    /* comment */ "num": 42,
    "call": f(1, {x: 2}),
    "escapes": "tab\tunicodeé\x41\u{1F600}",
});"#;
        let properties = first_object(source).unwrap().unwrap();
        assert_eq!(
            strings(&properties),
            vec![
                ("plain", Some("Hello")),
                ("single", Some("It's")),
                ("bare", Some("abc")),
                ("num", None),
                ("call", None),
                ("escapes", Some("tab\tunicodeéA😀")),
            ]
        );
        let bare = &properties[2];
        assert_eq!(&source[bare.value_span.clone()], r#""a" + ('b' + "c")"#);
        assert_eq!(&source[properties[3].value_span.clone()], "42");
        assert_eq!(&source[properties[4].value_span.clone()], "f(1, {x: 2})");
    }

    #[test]
    fn test_nested_and_function_forms() {
        let nested = first_object(r#"define({root: {"a": "A"}, "fr": true});"#).unwrap().unwrap();
        assert_eq!(nested[0].key, "root");
        let JsValue::Object(inner) = &nested[0].value else {
            panic!("expected object");
        };
        assert_eq!(strings(inner), vec![("a", Some("A"))]);

        let function = first_object("define(function () { return { \"k\": \"v\" }; });")
            .unwrap()
            .unwrap();
        assert_eq!(strings(&function), vec![("k", Some("v"))]);

        let mixed = first_object(r#"define({"a": "x" + y});"#).unwrap().unwrap();
        assert_eq!(strings(&mixed), vec![("a", None)]);
    }

    #[test]
    fn test_errors() {
        assert!(first_object("define({\"a\": \"unterminated})").is_err());
        assert!(first_object("define({\"a\" \"b\"})").is_err());
        assert!(first_object("define({\"a\": \"b\"").is_err());
        assert_eq!(first_object("var x = 1;").unwrap(), None);
    }

    #[test]
    fn test_surrogate_pairs() {
        let pair = first_object(r#"define({"k": "\uD83D\uDE00"});"#).unwrap().unwrap();
        assert_eq!(strings(&pair), vec![("k", Some("😀"))]);
        let err = first_object(r#"define({"k": "\uD800\u0041"});"#).unwrap_err();
        assert!(err.to_string().contains("Malformed \\u escape"), "{}", err);
        assert!(first_object(r#"define({"k": "\uD800"});"#).is_err());
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("say \"hi\"\n\\"), r#""say \"hi\"\n\\""#);
        assert_eq!(quote("\u{1}"), r#""\u0001""#);
    }
}
