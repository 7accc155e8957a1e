#![forbid(unsafe_code)]
//! Resource filters for localization files.
//!
//! Every supported file format is handled by a filter that converts between the raw
//! file and a normalized, language-neutral [`Bundle`]:
//!
//! - `parse(bytes) -> Bundle`
//! - `write(Bundle) -> bytes`
//! - `merge(base bytes, Bundle) -> bytes`, re-injecting translated values into an
//!   existing file while leaving everything else byte-identical.
//!
//! # Quick Start
//!
//! ```rust
//! use resfilter::default_registry;
//!
//! let json = default_registry().get_single_filter("JSON").unwrap();
//! let bundle = json.parse_bytes(br#"{"a": {"b": "x"}}"#, None)?;
//! assert_eq!(bundle.resource_strings[0].key, "$.a.b");
//!
//! let written = json.write_bytes(&bundle, None)?;
//! assert_eq!(json.parse_bytes(&written, None)?, bundle);
//! # Ok::<(), resfilter::Error>(())
//! ```
//!
//! # Supported Formats
//!
//! - **AMDJS**: AMD `define({...})` JavaScript modules
//! - **ANDROID**: Android `strings.xml`
//! - **GLOBALIZEJS**: Globalize JSON bundles keyed by language
//! - **IOS**: Apple `.strings`
//! - **JAVA** / **JAVAUTF8**: Java `.properties`, ISO-8859-1 or UTF-8
//! - **JSON**: nested JSON objects flattened to key paths
//! - **PO** / **POT**: gettext catalogs and templates
//! - **XLIFF**: XLIFF 1.2
//! - **YML**: YAML mappings
//!
//! CSV filters (`CSV`, `CSV-MULTI`) are available through
//! [`formats::CsvFilterProvider`].

pub mod builder;
pub mod error;
pub mod formats;
pub mod options;
pub mod registry;
pub mod text;
pub mod traits;
pub mod types;
pub mod wrap;

// Re-export most used types for easy consumption
pub use crate::{
    builder::BundleBuilder,
    error::Error,
    formats::FormatId,
    options::FilterOptions,
    registry::{FilterInfo, FilterKind, FilterProvider, FilterRegistry, default_registry},
    traits::{MultiBundleResourceFilter, ResourceFilter},
    types::{Bundle, ResourceString},
};
