use thiserror::Error;

/// Reasons a record file is rejected by [`crate::io::csv::read_record_csv`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("wrong column count (expected {expected}, found {found})")]
    WrongColumnCount { expected: usize, found: usize },
    #[error("column {column} is not numeric: {value:?}")]
    NotNumeric { column: usize, value: String },
    #[error("file contains no rows")]
    Empty,
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("format error: {0}")]
    Format(#[from] FormatError),
    #[error("model load error: {0}")]
    ModelLoad(String),
    #[error("inference error: {0}")]
    Inference(String),
}

impl PipelineError {
    pub fn model_unavailable() -> Self {
        PipelineError::Inference("model unavailable".into())
    }

    pub fn is_format(&self) -> bool {
        matches!(self, PipelineError::Format(_))
    }

    pub fn is_inference(&self) -> bool {
        matches!(self, PipelineError::Inference(_))
    }

    /// User-facing status line for a failed load or prediction.
    pub fn status_message(&self) -> String {
        format!("Error: {}", self)
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_mentions_column_count() {
        let err = PipelineError::from(FormatError::WrongColumnCount {
            expected: 188,
            found: 150,
        });
        assert!(err.is_format());
        assert_eq!(
            err.status_message(),
            "Error: format error: wrong column count (expected 188, found 150)"
        );
    }

    #[test]
    fn unavailable_model_is_an_inference_error() {
        let err = PipelineError::model_unavailable();
        assert!(err.is_inference());
        assert!(err.to_string().contains("model unavailable"));
    }
}
