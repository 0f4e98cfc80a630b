//! Unified error handling for calforge
//!
//! Every fallible operation across the decoders, the assembler and the
//! loader reports one of these variants. A wrong magic signature is *not*
//! an error at decode time (decoders answer `Ok(None)`); `FormatMismatch`
//! exists for callers that want to turn that answer into a hard failure.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all calforge operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Decode Errors ====================

    /// Truncated or corrupt stream
    #[error("Unexpected end of data at offset {offset} (needed {requested} more bytes)")]
    UnexpectedEndOfData {
        offset: u64,
        requested: usize,
    },

    /// File did not carry the expected magic signature
    #[error("{path:?} is not a {expected} file")]
    FormatMismatch {
        path: PathBuf,
        expected: String,
    },

    /// Structurally invalid field value
    #[error("Invalid data: {message}")]
    InvalidData {
        message: String,
    },

    /// Markup could not be tokenized
    #[error("Invalid markup: {message}")]
    InvalidMarkup {
        message: String,
    },

    /// Malformed character manifest
    #[error("Invalid manifest at line {line}: {message}")]
    InvalidManifest {
        line: usize,
        message: String,
    },

    // ==================== Assembly Errors ====================

    /// An index reference points outside its target list
    #[error("Asset integrity violation in {owner}: {reference} {index} out of range (0..{len})")]
    AssetIntegrity {
        owner: String,
        reference: String,
        index: i64,
        len: usize,
    },

    /// Bone parent/child graph is not a single consistent tree
    #[error("Invalid bone hierarchy: {message}")]
    InvalidHierarchy {
        message: String,
    },

    // ==================== General Errors ====================

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData {
            message: message.into(),
        }
    }

    /// Create an invalid hierarchy error
    pub fn invalid_hierarchy(message: impl Into<String>) -> Self {
        Error::InvalidHierarchy {
            message: message.into(),
        }
    }

    /// Create an out-of-range reference error
    pub fn integrity(
        owner: impl Into<String>,
        reference: impl Into<String>,
        index: i64,
        len: usize,
    ) -> Self {
        Error::AssetIntegrity {
            owner: owner.into(),
            reference: reference.into(),
            index,
            len,
        }
    }

    /// Strip any context wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::WithContext { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Check if this is a decode/format error
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::UnexpectedEndOfData { .. }
                | Error::FormatMismatch { .. }
                | Error::InvalidData { .. }
                | Error::InvalidMarkup { .. }
                | Error::InvalidManifest { .. }
        )
    }

    /// Check if this is an assembly integrity error
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::AssetIntegrity { .. } | Error::InvalidHierarchy { .. }
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::UnexpectedEndOfData { offset: 12, requested: 4 };
        let contextualized = err.with_context("while decoding skeleton");

        assert!(contextualized.to_string().contains("while decoding skeleton"));
        assert!(contextualized.is_parse_error());
    }

    #[test]
    fn test_is_integrity_error() {
        assert!(Error::integrity("submesh 0", "material id", 3, 2).is_integrity_error());
        assert!(Error::invalid_hierarchy("two roots").is_integrity_error());
        assert!(!Error::invalid_data("bad").is_integrity_error());
    }

    #[test]
    fn test_integrity_message() {
        let err = Error::integrity("track 1", "bone id", 7, 3);
        assert_eq!(
            err.to_string(),
            "Asset integrity violation in track 1: bone id 7 out of range (0..3)"
        );
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::invalid_data("negative count"));
        let with_context = result.context("loading mesh");

        assert!(with_context.is_err());
        let err = with_context.unwrap_err();
        assert!(err.to_string().contains("loading mesh"));
        assert!(matches!(err.root_cause(), Error::InvalidData { .. }));
    }
}
