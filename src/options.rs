//! Per-call configuration for filter operations.

use std::collections::BTreeMap;

use unic_langid::LanguageIdentifier;

use crate::error::Error;

/// Custom parameter selecting how JAVA filters treat single quotes.
pub const MESSAGE_PATTERN_ESCAPE: &str = "messagePatternEscape";

/// Custom parameter placing entries without a sequence number first on write.
pub const UNKNOWN_SEQUENCE_FIRST: &str = "unknownSequenceFirst";

/// Options passed to `parse`, `write` and `merge`.
///
/// Absent options mean defaults everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterOptions {
    /// BCP-47 tag of the content language; selects word-boundary rules for wrapping.
    pub content_locale: Option<String>,
    /// Codec-defined parameters.
    pub custom_params: BTreeMap<String, String>,
}

impl FilterOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for content in the given language.
    pub fn for_locale(locale: impl Into<String>) -> Self {
        Self::new().with_content_locale(Some(locale.into()))
    }

    /// Sets the content locale.
    pub fn with_content_locale(mut self, content_locale: Option<String>) -> Self {
        self.content_locale = content_locale;
        self
    }

    /// Adds or replaces one custom parameter.
    pub fn with_custom_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_params.insert(key.into(), value.into());
        self
    }

    pub fn custom_param(&self, key: &str) -> Option<&str> {
        self.custom_params.get(key).map(String::as_str)
    }

    /// Parses the content locale, if any.
    pub fn language_identifier(&self) -> Result<Option<LanguageIdentifier>, Error> {
        match &self.content_locale {
            None => Ok(None),
            Some(tag) => tag
                .parse::<LanguageIdentifier>()
                .map(Some)
                .map_err(|e| Error::InvalidOptions(format!("bad content locale `{}`: {}", tag, e))),
        }
    }

    /// Reads a boolean custom parameter; missing means `false`.
    pub fn flag(&self, key: &str) -> Result<bool, Error> {
        match self.custom_param(key) {
            None => Ok(false),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(v) => Err(Error::InvalidOptions(format!(
                "`{}` expects true or false, got `{}`",
                key, v
            ))),
        }
    }
}

/// Whether entries without a sequence number are written first.
pub(crate) fn unknown_sequence_first(options: Option<&FilterOptions>) -> Result<bool, Error> {
    options.map_or(Ok(false), |o| o.flag(UNKNOWN_SEQUENCE_FIRST))
}
