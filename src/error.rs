//! Error taxonomy for dictionary I/O and conversion setup

use thiserror::Error;

/// Errors raised by dictionary load/dump and configuration parsing.
///
/// Lookup misses and empty mappings are not errors: they take the literal
/// passthrough path and produce identity output.
#[derive(Error, Debug)]
pub enum HanconvError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unparseable dictionary content. Names the offending source.
    #[error("malformed input in {source_name}: {detail}")]
    MalformedInput { source_name: String, detail: String },

    /// A key or value contains the record/field separator under a strict
    /// dump request. Nothing is partially written.
    #[error("record separator in entry {key:?}: cannot dump safely")]
    InvalidRecord { key: String },

    #[error("unsupported dictionary format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported composition mode: {0}")]
    UnsupportedMode(String),
}

pub type Result<T> = std::result::Result<T, HanconvError>;

impl HanconvError {
    pub(crate) fn malformed(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        HanconvError::MalformedInput {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HanconvError::malformed("dict.list", "line 3: bad field");
        assert_eq!(
            "malformed input in dict.list: line 3: bad field",
            err.to_string()
        );

        let err = HanconvError::InvalidRecord { key: "干\t姜".into() };
        assert!(err.to_string().contains("cannot dump safely"));
    }
}
