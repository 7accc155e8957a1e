//! Single quote handling for message-format pattern values.
//!
//! Message patterns use `''` for a literal apostrophe, and a quote right before `{`
//! or `}` starts quoted literal text. Values that are message patterns with numbered
//! arguments are stored in bundles without the doubled quotes; this module adds and
//! removes them.

use std::{borrow::Cow, str::FromStr};

use crate::{
    error::Error,
    options::{FilterOptions, MESSAGE_PATTERN_ESCAPE},
};

/// Which values are treated as message patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessagePatternEscape {
    /// Only parseable patterns with at least one numbered argument such as `{0}`.
    #[default]
    Auto,
    /// Every parseable pattern, e.g. `You aren't` is written as `You aren''t`.
    All,
}

impl FromStr for MessagePatternEscape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(MessagePatternEscape::Auto),
            "ALL" => Ok(MessagePatternEscape::All),
            other => Err(Error::InvalidOptions(format!(
                "`{}` expects AUTO or ALL, got `{}`",
                MESSAGE_PATTERN_ESCAPE, other
            ))),
        }
    }
}

impl MessagePatternEscape {
    /// Reads the mode from the custom parameters, falling back to `default`.
    pub fn from_options(options: Option<&FilterOptions>, default: Self) -> Result<Self, Error> {
        match options.and_then(|o| o.custom_param(MESSAGE_PATTERN_ESCAPE)) {
            Some(value) => value.parse(),
            None => Ok(default),
        }
    }
}

/// Doubles literal single quotes for output.
///
/// ```rust
/// use resfilter::formats::message_pattern::{escape_message_pattern, MessagePatternEscape};
///
/// let escaped = escape_message_pattern("File {0} isn't in use.", MessagePatternEscape::Auto);
/// assert_eq!(escaped, "File {0} isn''t in use.");
/// ```
pub fn escape_message_pattern(input: &str, mode: MessagePatternEscape) -> Cow<'_, str> {
    if !input.contains('\'') || !should_convert(input, mode) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(convert_quotes(input, QuoteDirection::Double))
}

/// Turns doubled single quotes back into literal ones after parsing.
pub fn unescape_message_pattern(input: &str, mode: MessagePatternEscape) -> Cow<'_, str> {
    if !input.contains("''") || !should_convert(input, mode) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(convert_quotes(input, QuoteDirection::Single))
}

fn should_convert(input: &str, mode: MessagePatternEscape) -> bool {
    match analyze(input) {
        None => false,
        Some(summary) => mode == MessagePatternEscape::All || summary.has_numbered_argument,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuoteDirection {
    Double,
    Single,
}

fn convert_quotes(input: &str, direction: QuoteDirection) -> String {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut out = String::with_capacity(len + 8);
    // `'{` or `'}` opened quoted literal text that is not closed yet
    let mut keep_quote = false;
    let mut copied = 0;
    let mut pos = 0;

    while pos < len {
        let Some(offset) = input[pos..].find('\'') else {
            break;
        };
        let idx = pos + offset;
        let next = bytes.get(idx + 1).copied();

        if !keep_quote && matches!(next, Some(b'{') | Some(b'}')) {
            keep_quote = true;
            pos = idx + 2;
        } else if keep_quote {
            if next == Some(b'\'') {
                pos = idx + 2;
            } else {
                keep_quote = false;
                pos = idx + 1;
            }
        } else {
            match direction {
                QuoteDirection::Double => {
                    out.push_str(&input[copied..idx]);
                    out.push_str("''");
                    pos = idx + 1;
                    copied = pos;
                }
                QuoteDirection::Single if next == Some(b'\'') => {
                    out.push_str(&input[copied..idx]);
                    out.push('\'');
                    pos = idx + 2;
                    copied = pos;
                }
                QuoteDirection::Single => pos = idx + 1,
            }
        }
    }
    out.push_str(&input[copied..]);
    out
}

/// What a successful pattern parse found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternSummary {
    pub has_numbered_argument: bool,
    pub has_named_argument: bool,
}

/// Parses `input` as a message pattern; `None` if it is not one.
///
/// Follows the "double optional" apostrophe rules: `''` is a literal quote, a quote
/// before `{`, `}` (or `#` inside plural sub-messages) starts quoted text that runs
/// to the next lone quote or to the end, any other quote is literal.
pub fn analyze(input: &str) -> Option<PatternSummary> {
    let mut parser = PatternParser {
        chars: input.chars().collect(),
        pos: 0,
        summary: PatternSummary::default(),
    };
    parser.message(0, false)?;
    Some(parser.summary)
}

struct PatternParser {
    chars: Vec<char>,
    pos: usize,
    summary: PatternSummary,
}

impl PatternParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Parses message text up to the closing `}` of a nested message or the end.
    fn message(&mut self, depth: usize, in_plural: bool) -> Option<()> {
        while let Some(c) = self.peek() {
            match c {
                '\'' => self.apostrophe(in_plural)?,
                '{' => {
                    self.pos += 1;
                    self.argument(depth + 1)?;
                }
                '}' if depth > 0 => return Some(()),
                _ => self.pos += 1,
            }
        }
        // Running out of input inside a nested message means an unmatched `{`.
        if depth > 0 { None } else { Some(()) }
    }

    fn apostrophe(&mut self, in_plural: bool) -> Option<()> {
        match self.peek_at(1) {
            Some('\'') => self.pos += 2,
            Some('{') | Some('}') => self.quoted_literal(),
            Some('#') if in_plural => self.quoted_literal(),
            _ => self.pos += 1,
        }
        Some(())
    }

    fn quoted_literal(&mut self) {
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c == '\'' {
                if self.peek_at(1) == Some('\'') {
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                return;
            }
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && !is_pattern_syntax(c))
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Parses an argument after its opening `{` up to and including the closing `}`.
    fn argument(&mut self, depth: usize) -> Option<()> {
        self.skip_whitespace();
        let name = self.identifier();
        if name.is_empty() {
            return None;
        }
        if name.chars().all(|c| c.is_ascii_digit()) {
            if name.len() > 1 && name.starts_with('0') {
                return None;
            }
            self.summary.has_numbered_argument = true;
        } else if name.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        } else {
            self.summary.has_named_argument = true;
        }
        self.skip_whitespace();

        match self.peek()? {
            '}' => {
                self.pos += 1;
                Some(())
            }
            ',' => {
                self.pos += 1;
                self.skip_whitespace();
                let arg_type = self.identifier();
                if arg_type.is_empty() {
                    return None;
                }
                self.skip_whitespace();
                match self.peek()? {
                    '}' => {
                        self.pos += 1;
                        Some(())
                    }
                    ',' => {
                        self.pos += 1;
                        match arg_type.to_ascii_lowercase().as_str() {
                            "plural" | "selectordinal" => self.sub_messages(depth, true),
                            "select" => self.sub_messages(depth, false),
                            _ => self.simple_style(),
                        }
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Style text of a simple argument such as `{0,number,#,##0.0}`.
    fn simple_style(&mut self) -> Option<()> {
        let mut nesting = 0usize;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\'' => {
                    // quoted style text must be terminated
                    let close = self.chars[self.pos..].iter().position(|&c| c == '\'')?;
                    self.pos += close + 1;
                }
                '{' => nesting += 1,
                '}' if nesting == 0 => return Some(()),
                '}' => nesting -= 1,
                _ => {}
            }
        }
        None
    }

    /// `selector {message} selector {message} ...}` of plural and select arguments.
    fn sub_messages(&mut self, depth: usize, in_plural: bool) -> Option<()> {
        let mut count = 0;
        loop {
            self.skip_whitespace();
            match self.peek()? {
                '}' => {
                    self.pos += 1;
                    return if count > 0 { Some(()) } else { None };
                }
                '{' => return None,
                _ => {}
            }
            let selector = self.selector();
            if selector.is_empty() {
                return None;
            }
            if in_plural && selector.starts_with("offset:") {
                continue;
            }
            self.skip_whitespace();
            if self.peek()? != '{' {
                return None;
            }
            self.pos += 1;
            self.message(depth, in_plural)?;
            // closing brace of the sub-message
            self.pos += 1;
            count += 1;
        }
    }

    fn selector(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && c != '{' && c != '}')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}

fn is_pattern_syntax(c: char) -> bool {
    c.is_ascii_punctuation() && c != '_' && c != '-'
}
