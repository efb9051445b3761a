//! Extraction errors.

use thiserror::Error;

/// Origin label used when the caller supplies text without a path.
pub const ANONYMOUS_ORIGIN: &str = "<source>";

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The source does not parse; no partial document is produced.
    #[error("{origin}:{line}:{column}: syntax error near `{snippet}`")]
    Syntax {
        origin: String,
        line: usize,
        column: usize,
        snippet: String,
    },

    #[error("failed to load configuration language grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("{origin}: parser produced no syntax tree")]
    NoTree { origin: String },
}

impl ExtractError {
    /// Replace the origin label, e.g. with the path of the file being read.
    pub fn with_origin(self, new_origin: &str) -> Self {
        match self {
            ExtractError::Syntax {
                line,
                column,
                snippet,
                ..
            } => ExtractError::Syntax {
                origin: new_origin.to_string(),
                line,
                column,
                snippet,
            },
            ExtractError::NoTree { .. } => ExtractError::NoTree {
                origin: new_origin.to_string(),
            },
            other => other,
        }
    }
}
