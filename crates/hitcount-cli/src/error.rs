//! Errors raised while loading the host's files.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reading or writing the work item and options files.
#[derive(Error, Debug)]
pub enum CliError {
    /// The file could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: io::Error,
    },

    /// The work item file is not valid JSON of the expected shape.
    #[error("{}: invalid work item: {source}", path.display())]
    WorkItem {
        /// The work item file.
        path: PathBuf,
        /// The parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// The options file is not valid TOML of the expected shape.
    #[error("{}: invalid options: {source}", path.display())]
    Options {
        /// The options file.
        path: PathBuf,
        /// The parse failure.
        #[source]
        source: toml::de::Error,
    },
}

impl CliError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A specialized [`Result`] type for host file operations.
pub type Result<T> = std::result::Result<T, CliError>;
