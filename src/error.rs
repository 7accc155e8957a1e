//! All error types for the resfilter crate.
//!
//! These are returned from every fallible operation (parsing, writing, merging and
//! registry lookups). Grammar violations always surface as [`Error::Format`]; stream
//! failures are passed through as [`Error::Io`] without being wrapped.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown format `{0}`")]
    UnknownFormat(String),

    #[error("illegal resource format: {message}")]
    Format {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid filter options: {0}")]
    InvalidOptions(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Creates a format error without an underlying cause.
    pub fn format(message: impl Into<String>) -> Self {
        Error::Format {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a format error caused by a lower level parser error.
    pub fn format_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Format {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true for errors caused by non-conforming input.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::Format { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::Io(io::Error::from(e))
        } else {
            Error::format_with_source("malformed JSON content", e)
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::format_with_source("malformed YAML content", e)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        match e {
            quick_xml::Error::Io(inner) => Error::Io(io::Error::new(inner.kind(), inner.to_string())),
            other => Error::format_with_source("malformed XML content", other),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::format_with_source("malformed XML attribute", e)
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            match e.into_kind() {
                csv::ErrorKind::Io(inner) => Error::Io(inner),
                other => Error::format(format!("{:?}", other)),
            }
        } else {
            Error::format_with_source("malformed CSV content", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_error() {
        let error = Error::UnknownFormat("bogus".to_string());
        assert_eq!(error.to_string(), "unknown format `bogus`");
    }

    #[test]
    fn test_format_error() {
        let error = Error::format("Malformed \\uxxxx encoding.");
        assert_eq!(
            error.to_string(),
            "illegal resource format: Malformed \\uxxxx encoding."
        );
        assert!(error.is_format_error());
    }

    #[test]
    fn test_format_error_keeps_source() {
        let json_error = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let error = Error::from(json_error);
        assert!(error.is_format_error());
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_io_error_is_not_wrapped() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::from(io_error);
        assert!(matches!(error, Error::Io(_)));
        assert!(!error.is_format_error());
        assert!(error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_missing_required_field_error() {
        let error = Error::MissingRequiredField("Target language is not specified.".to_string());
        assert_eq!(
            error.to_string(),
            "missing required field: Target language is not specified."
        );
    }

    #[test]
    fn test_unsupported_operation_error() {
        let error =
            Error::UnsupportedOperation("Merging YML resource is not supported.".to_string());
        assert_eq!(
            error.to_string(),
            "unsupported operation: Merging YML resource is not supported."
        );
    }

    #[test]
    fn test_error_debug() {
        let error = Error::UnknownFormat("test".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("UnknownFormat"));
        assert!(debug.contains("test"));
    }
}
