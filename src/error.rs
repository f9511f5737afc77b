//! Error types.
//!
//! Tokenizing, parsing and evaluating never fail: unrecognized input is
//! dropped and undetermined leaves evaluate to `false`. The types here cover
//! the edges of the crate: malformed course identifiers, the legacy bucket
//! format, and loading data files.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CourseCodeError {
    /// Not 2-4 letters followed by exactly 3 digits.
    #[error("Malformed course code: {0:?}")]
    Malformed(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BucketError {
    /// An entry string that is neither a course requirement nor `"."`.
    #[error("Malformed bucket entry: {0:?}")]
    MalformedEntry(String),

    /// A `"."` separator without an operand on both sides.
    #[error("OR separator without an operand on both sides")]
    DanglingSeparator,

    /// A node with no representation in the bucket format.
    #[error("Cannot encode {0} as a bucket entry")]
    Unrepresentable(String),
}

/// Failure to locate or read external data. Surfaced to the caller as-is;
/// nothing is retried.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not locate course {0}")]
    CourseNotFound(String),

    #[error("Could not locate prerequisites for {0}")]
    MissingPrerequisites(String),

    #[error("Invalid prerequisite bucket for {course}: {source}")]
    Bucket {
        course: String,
        #[source]
        source: BucketError,
    },

    #[error(transparent)]
    CourseCode(#[from] CourseCodeError),
}

impl DataLoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn messages() {
        let error = DataLoadError::CourseNotFound("ECEN_999".to_string());
        assert_eq!(error.to_string(), "Could not locate course ECEN_999");

        let error = DataLoadError::io("history.json", IoError::new(ErrorKind::NotFound, "gone"));
        assert_eq!(error.to_string(), "Failed to read history.json: gone");

        let error = DataLoadError::Bucket {
            course: "FINC_428".to_string(),
            source: BucketError::DanglingSeparator,
        };
        assert_eq!(
            error.to_string(),
            "Invalid prerequisite bucket for FINC_428: OR separator without an operand on both sides"
        );
    }

    #[test]
    fn bucket_error_source_is_kept() {
        use std::error::Error as _;

        let error = DataLoadError::Bucket {
            course: "CSCE_421".to_string(),
            source: BucketError::MalformedEntry("CSCE".to_string()),
        };
        let source = error.source().unwrap();
        assert_eq!(source.to_string(), "Malformed bucket entry: \"CSCE\"");
    }
}
