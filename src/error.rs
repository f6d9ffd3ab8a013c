//! Error taxonomy for artifact loading and segment prediction

use std::path::{Path, PathBuf};
use thiserror::Error;

fn location(path: &Option<PathBuf>) -> String {
    path.as_deref()
        .map(Path::display)
        .map(|p| format!(" at '{}'", p))
        .unwrap_or_default()
}

#[derive(Error, Debug)]
pub enum SegmentError {
    /// An artifact file is absent or could not be opened. Fatal at startup.
    #[error("{artifact} artifact not found at '{}': {source}", path.display())]
    ArtifactNotFound {
        artifact: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An artifact file was read but its contents are unusable. Fatal at startup.
    #[error("{artifact} artifact{} is invalid: {reason}", location(path))]
    ArtifactInvalid {
        artifact: &'static str,
        /// Unset when the artifact was built in memory
        path: Option<PathBuf>,
        reason: String,
    },

    #[error("failed to write artifact '{}': {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The feature schema fed to the scaler differs from the one it was fitted on.
    #[error(
        "feature schema mismatch: scaler expects [{}], got [{}]",
        expected.join(", "),
        found.join(", ")
    )]
    TransformMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("prediction failed: {0}")]
    Prediction(String),

    #[error("{field} must be between {min} and {max}, got {value}")]
    InvalidInput {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}
