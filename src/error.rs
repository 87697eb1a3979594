//! Error type shared by every acoustic-model subsystem.
//!
//! Parsing, folder resolution, model mutation and serialization all report
//! through [`AcModelError`].  Each variant's `Display` text is meant to be
//! shown to an end user as-is: it names the failing folder, file, line or
//! HMM.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// AcModelError
// ---------------------------------------------------------------------------

/// All errors that can arise while reading, editing or writing models.
#[derive(Debug, Error)]
pub enum AcModelError {
    /// The HTK-ASCII grammar rejected the input.
    #[error("{file}:{line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    /// A tied-list line holds neither one nor two tokens.
    #[error("tied-list format error at line {line}: {content:?}")]
    TiedListFormat { line: usize, content: String },

    /// A phone replacement line holds a single token.
    #[error("phone mapping format error at line {line}: {content:?}")]
    MappingFormat { line: usize, content: String },

    /// The folder does not contain any recognised acoustic model.
    #[error("no acoustic model found in folder {}", .0.display())]
    Folder(PathBuf),

    /// A required file is missing, empty or unreadable.
    #[error("file error {}: {reason}", path.display())]
    File { path: PathBuf, reason: String },

    /// The requested output format is not registered.
    #[error("unknown acoustic model format: {0}")]
    FileFormat(String),

    /// The file content is not valid UTF-8.
    #[error("invalid character encoding in {}", .0.display())]
    Encoding(PathBuf),

    /// A value of the wrong shape was handed to a setter.
    #[error("unexpected data type: {0}")]
    DataType(String),

    #[error("HMM not found: {0}")]
    HmmNotFound(String),

    #[error("an HMM named {0:?} already exists")]
    DuplicateHmm(String),

    /// The HMM has neither states nor a transition.
    #[error("HMM {0:?} has no definition (states and transition missing)")]
    IncompleteHmm(String),

    #[error("interpolation coefficient must be within [0, 1], got {0}")]
    InvalidGamma(f64),

    /// Two models were trained on different MFCC parameter kinds.
    #[error("parameter kinds differ: {left:?} vs {right:?}")]
    ParameterKindMismatch { left: String, right: String },

    /// `fill_hmms` could not find the named macros.
    #[error("HMM {hmm:?}: unresolved macro references {names:?}")]
    UnresolvedMacros { hmm: String, names: Vec<String> },

    /// The structure is recognised but cannot be handled (yet).
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AcModelError {
    pub(crate) fn file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AcModelError::File {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_implemented(feature: impl Into<String>) -> Self {
        AcModelError::NotImplemented(feature.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AcModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_file_and_line() {
        let err = AcModelError::Parse {
            file: "hmmdefs".into(),
            line: 12,
            message: "expected <EndHMM>".into(),
        };
        assert_eq!(err.to_string(), "hmmdefs:12: expected <EndHMM>");
    }

    #[test]
    fn folder_error_names_folder() {
        let err = AcModelError::Folder(PathBuf::from("/tmp/nothing"));
        assert!(err.to_string().contains("/tmp/nothing"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AcModelError = io.into();
        assert!(matches!(err, AcModelError::Io(_)));
    }
}
