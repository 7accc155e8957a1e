//! All built-in resource file formats for resfilter.
//!
//! This module re-exports the filter type of each format and provides the
//! [`FormatId`] enum naming the formats registered by default.

pub mod amdjs;
pub mod android_strings;
pub mod csv;
pub mod globalize;
pub mod json;
pub mod key_path;
pub mod message_pattern;
pub mod po;
pub mod properties;
pub mod strings;
pub mod xliff;
pub mod yaml;

mod js_literal;
mod xml;

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
    sync::Arc,
};

// Reexporting the filters for easier access
pub use amdjs::AmdJsFilter;
pub use android_strings::AndroidStringsFilter;
pub use self::csv::{CsvFilter, CsvFilterProvider, MultiBundleCsvFilter};
pub use globalize::GlobalizeJsFilter;
pub use json::JsonFilter;
pub use po::{PoFilter, PotFilter};
pub use properties::{JavaPropertiesFilter, PropertiesEncoding};
pub use strings::IosStringsFilter;
pub use xliff::XliffFilter;
pub use yaml::YamlFilter;

use crate::{Error, traits::ResourceFilter};

/// Identifiers of the built-in single-bundle formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormatId {
    AmdJs,
    Android,
    GlobalizeJs,
    Ios,
    Java,
    JavaUtf8,
    Json,
    Po,
    Pot,
    Xliff,
    Yml,
}

impl FormatId {
    pub const ALL: [FormatId; 11] = [
        FormatId::AmdJs,
        FormatId::Android,
        FormatId::GlobalizeJs,
        FormatId::Ios,
        FormatId::Java,
        FormatId::JavaUtf8,
        FormatId::Json,
        FormatId::Po,
        FormatId::Pot,
        FormatId::Xliff,
        FormatId::Yml,
    ];

    /// The registry id, always upper case.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatId::AmdJs => "AMDJS",
            FormatId::Android => "ANDROID",
            FormatId::GlobalizeJs => "GLOBALIZEJS",
            FormatId::Ios => "IOS",
            FormatId::Java => "JAVA",
            FormatId::JavaUtf8 => "JAVAUTF8",
            FormatId::Json => "JSON",
            FormatId::Po => "PO",
            FormatId::Pot => "POT",
            FormatId::Xliff => "XLIFF",
            FormatId::Yml => "YML",
        }
    }

    /// Creates a fresh filter for this format.
    pub fn filter(&self) -> Arc<dyn ResourceFilter> {
        match self {
            FormatId::AmdJs => Arc::new(AmdJsFilter),
            FormatId::Android => Arc::new(AndroidStringsFilter),
            FormatId::GlobalizeJs => Arc::new(GlobalizeJsFilter),
            FormatId::Ios => Arc::new(IosStringsFilter),
            FormatId::Java => Arc::new(JavaPropertiesFilter::new(PropertiesEncoding::Iso8859_1)),
            FormatId::JavaUtf8 => Arc::new(JavaPropertiesFilter::new(PropertiesEncoding::Utf8)),
            FormatId::Json => Arc::new(JsonFilter),
            FormatId::Po => Arc::new(PoFilter),
            FormatId::Pot => Arc::new(PotFilter),
            FormatId::Xliff => Arc::new(XliffFilter),
            FormatId::Yml => Arc::new(YamlFilter),
        }
    }
}

/// Implements [`std::fmt::Display`] for [`FormatId`].
///
/// # Example
/// ```rust
/// use resfilter::formats::FormatId;
/// assert_eq!(FormatId::JavaUtf8.to_string(), "JAVAUTF8");
/// assert_eq!(FormatId::Xliff.to_string(), "XLIFF");
/// ```
impl Display for FormatId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Implements [`std::str::FromStr`] for [`FormatId`].
///
/// Matching is case-insensitive; unknown ids give [`Error::UnknownFormat`].
///
/// # Example
/// ```rust
/// use resfilter::formats::FormatId;
/// use std::str::FromStr;
/// assert_eq!(FormatId::from_str("json").unwrap(), FormatId::Json);
/// assert_eq!(FormatId::from_str(" Android ").unwrap(), FormatId::Android);
/// assert!(FormatId::from_str("bogus").is_err());
/// ```
impl FromStr for FormatId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_uppercase();
        FormatId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or(Error::UnknownFormat(s))
    }
}
