//! Error definitions for the mapping module

use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or writing a mapping profile
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The profile file could not be read or written
    #[error("Profile file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid profile document
    #[error("Profile is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// The profile could not be rendered to JSON
    #[error("Profile could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),
}
