use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by module resolution strategies.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Descriptor does not exist: {}", .path.display())]
    DescriptorNotFound { path: PathBuf },

    #[error("Invalid descriptor {}: {reason}", .path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },

    #[error("External build tool failed for {}: {reason}", .path.display())]
    ExternalToolFailure { path: PathBuf, reason: String },

    #[error("External build tool timed out after {seconds}s for {}", .path.display())]
    Timeout { path: PathBuf, seconds: u64 },

    #[error("IO error while reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ResolveError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when retrying with the built-in descriptor parser is meaningful.
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            ResolveError::ExternalToolFailure { .. } | ResolveError::Timeout { .. }
        )
    }
}
