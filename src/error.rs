// Error types for the generation pipeline

use std::fmt;
use std::path::PathBuf;

use crate::fetch::FetchError;
use crate::request::ValidationError;

/// The pipeline stage an [`Error`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Rewrite,
    Validate,
    Generate,
    Write,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Rewrite => "rewrite",
            Stage::Validate => "validate",
            Stage::Generate => "generate",
            Stage::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while turning a dataset into a generated source file.
///
/// Every variant is terminal: the pipeline never retries and never cleans up
/// directories it already created.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The catalog could not deliver the dataset descriptor.
    #[error("failed to get dataset {slug}: {source}")]
    Fetch {
        slug: String,
        #[source]
        source: FetchError,
    },

    /// The fetched descriptor does not have the single file / single message shape.
    #[error("malformed dataset descriptor: {0}")]
    Precondition(String),

    /// The synthesized request breaks the plugin protocol's structural rules.
    #[error("failed to validate request: {0}")]
    Validation(#[from] ValidationError),

    /// The backend reported a failure; the message is passed through verbatim.
    #[error("failed to generate code: {0}")]
    Generation(String),

    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::Fetch { .. } => Stage::Fetch,
            Error::Precondition(_) => Stage::Rewrite,
            Error::Validation(_) => Stage::Validate,
            Error::Generation(_) => Stage::Generate,
            Error::CreateDir { .. } | Error::Write { .. } => Stage::Write,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
