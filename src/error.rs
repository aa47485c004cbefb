use thiserror::Error;

/// Main error type for RAGBench
#[derive(Error, Debug)]
pub enum RagbenchError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular (CSV) read/write errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Structured (JSON) encode/decode errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No dataset matched a method, category or date
    #[error("Dataset not found: {0}")]
    MissingDataset(String),

    /// A single field of a single record could not be parsed
    #[error("Field parse error in '{field}': {message}")]
    FieldParse { field: String, message: String },

    /// A whole row or line could not be parsed as a record
    #[error("Record parse error at {location}: {message}")]
    RecordParse { location: String, message: String },

    /// An analysis step cannot run on the data it was given
    #[error("Missing capability: {0}")]
    MissingCapability(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using RagbenchError
pub type Result<T> = std::result::Result<T, RagbenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RagbenchError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_field_parse_display() {
        let err = RagbenchError::FieldParse {
            field: "mrr".to_string(),
            message: "invalid float literal".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Field parse error in 'mrr': invalid float literal"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RagbenchError = io_err.into();
        assert!(matches!(err, RagbenchError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: RagbenchError = json_err.into();
        assert!(matches!(err, RagbenchError::Json(_)));
    }
}
