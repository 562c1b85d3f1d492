//! Result of an artifact acquisition attempt.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What an acquisition attempt produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outcome {
    /// A full-text PDF was saved
    Pdf { path: PathBuf },

    /// An abstract was saved as plain text
    Abstract { path: PathBuf },

    /// Nothing usable could be saved
    Error { message: String },
}

impl Outcome {
    pub fn error(message: impl Into<String>) -> Self {
        Outcome::Error {
            message: message.into(),
        }
    }

    /// Short status label (`pdf`, `abstract`, `error`)
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Pdf { .. } => "pdf",
            Outcome::Abstract { .. } => "abstract",
            Outcome::Error { .. } => "error",
        }
    }

    /// Path of the saved artifact, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Outcome::Pdf { path } | Outcome::Abstract { path } => Some(path),
            Outcome::Error { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Error { .. })
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Pdf { path } => write!(f, "PDF saved to {}", path.display()),
            Outcome::Abstract { path } => write!(f, "abstract saved to {}", path.display()),
            Outcome::Error { message } => write!(f, "acquisition failed: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_with_type_tag() {
        let outcome = Outcome::Pdf {
            path: PathBuf::from("downloads/x.pdf"),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["type"], "pdf");
        assert_eq!(json["path"], "downloads/x.pdf");

        let err = Outcome::error("no abstract");
        assert_eq!(err.kind(), "error");
        assert!(!err.is_success());
        assert!(err.path().is_none());
    }
}
