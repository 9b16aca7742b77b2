//! Error types for the assembly pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Category of a failed language-model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCallKind {
    /// The call did not complete within the configured deadline
    Timeout,
    /// Transport-level failure (DNS, connection reset, TLS)
    Network,
    /// The provider rejected the call for rate or quota reasons
    Quota,
    /// The provider answered with a non-success status
    Upstream,
    /// The provider answered, but not with anything usable
    MalformedPayload,
}

impl fmt::Display for ModelCallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModelCallKind::Timeout => "timeout",
            ModelCallKind::Network => "network",
            ModelCallKind::Quota => "quota",
            ModelCallKind::Upstream => "upstream",
            ModelCallKind::MalformedPayload => "malformed payload",
        };
        f.write_str(label)
    }
}

/// Comprehensive error type for all pipeline operations.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The model response had a malformed top-level structure
    #[error("Protocol parse error: {reason}")]
    ProtocolParse { reason: String },
    /// A step referenced an empty or malformed path
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    /// The execution sandbox cannot be reached or cannot be booted
    #[error("Sandbox unavailable: {reason}")]
    SandboxUnavailable { reason: String },
    /// A sandbox process could not be started or did not finish cleanly
    #[error("Command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },
    /// The language-model call failed
    #[error("Model call failed ({kind}): {message}")]
    ModelCall { kind: ModelCallKind, message: String },
    /// Writing the export archive failed
    #[error("Archive write error: {message}")]
    ArchiveWrite {
        message: String,
        #[source]
        source: zip::result::ZipError,
    },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Builder for creating path validation errors.
pub struct InvalidPathBuilder {
    path: String,
}

impl InvalidPathBuilder {
    /// Create a new invalid path error builder for a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> BuildError {
        BuildError::InvalidPath {
            path: self.path,
            reason: reason.into(),
        }
    }
}

/// Builder for creating model call errors.
pub struct ModelCallBuilder {
    kind: ModelCallKind,
}

impl ModelCallBuilder {
    /// Create a new model call error builder of the given kind.
    pub fn new(kind: ModelCallKind) -> Self {
        Self { kind }
    }

    /// Build the error with the given message.
    pub fn with_message(self, message: impl Into<String>) -> BuildError {
        BuildError::ModelCall {
            kind: self.kind,
            message: message.into(),
        }
    }
}

impl BuildError {
    /// Creates a builder for path validation errors.
    pub fn invalid_path(path: impl Into<String>) -> InvalidPathBuilder {
        InvalidPathBuilder::new(path)
    }

    /// Creates a builder for model call errors.
    pub fn model_call(kind: ModelCallKind) -> ModelCallBuilder {
        ModelCallBuilder::new(kind)
    }

    /// Creates a sandbox unavailability error.
    pub fn sandbox_unavailable(reason: impl Into<String>) -> Self {
        Self::SandboxUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a command failure error.
    pub fn command_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Creates a file system error for the given path.
    pub fn file_system(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// Whether the caller may retry the request that produced this error.
    /// Only model call failures are retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BuildError::ModelCall { .. })
    }
}

/// Specialized extension trait for archive-related Results.
pub trait ArchiveResultExt<T> {
    /// Map zip errors with a message.
    fn archive_context(self, message: &str) -> Result<T>;
}

impl<T> ArchiveResultExt<T> for std::result::Result<T, zip::result::ZipError> {
    fn archive_context(self, message: &str) -> Result<T> {
        self.map_err(|source| BuildError::ArchiveWrite {
            message: message.to_string(),
            source,
        })
    }
}

impl<T> ArchiveResultExt<T> for std::result::Result<T, std::io::Error> {
    fn archive_context(self, message: &str) -> Result<T> {
        self.map_err(|e| BuildError::ArchiveWrite {
            message: message.to_string(),
            source: zip::result::ZipError::Io(e),
        })
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_builder() {
        let err = BuildError::invalid_path("a//b").with_reason("empty segment");
        assert_eq!(err.to_string(), "Invalid path 'a//b': empty segment");
    }

    #[test]
    fn test_model_call_is_retryable() {
        let err = BuildError::model_call(ModelCallKind::Timeout).with_message("no answer in 120s");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("timeout"));

        let err = BuildError::model_call(ModelCallKind::MalformedPayload)
            .with_message("reply had no text parts");
        assert!(err.is_retryable());

        let err = BuildError::sandbox_unavailable("no isolation");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_archive_context_wraps_io() {
        let io: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        let err = io.archive_context("Failed to write entry").unwrap_err();
        assert!(matches!(err, BuildError::ArchiveWrite { .. }));
        assert!(err.to_string().contains("Failed to write entry"));
    }
}
