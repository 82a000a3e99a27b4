//! Error types for the retention analysis

use thiserror::Error;

/// Result type alias for retention analysis operations
pub type Result<T> = std::result::Result<T, RetentionError>;

/// Main error type for the retention analysis
#[derive(Error, Debug)]
pub enum RetentionError {
    // Load errors
    #[error("Load error at row {row}, column '{column}': {message}")]
    Load {
        row: usize,
        column: String,
        message: String,
    },

    #[error("Required column missing: {0}")]
    MissingColumn(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // Integrity errors
    #[error("Duplicate employee id: {0}")]
    DuplicateEmployee(i64),

    #[error("Negative tenure for employee {employee_id}: {days} days")]
    NegativeTenure { employee_id: i64, days: i64 },

    // Modeling errors
    #[error("Feature table is empty")]
    EmptyFeatureTable,

    #[error("Degenerate label: every record has quit = {0}")]
    DegenerateLabel(u8),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    #[error("Render error: {0}")]
    Render(String),
}

impl RetentionError {
    /// Build a load error for a 1-based data row and column
    pub fn load(row: usize, column: &str, message: impl Into<String>) -> Self {
        RetentionError::Load {
            row,
            column: column.to_string(),
            message: message.into(),
        }
    }
}

impl From<polars::error::PolarsError> for RetentionError {
    fn from(err: polars::error::PolarsError) -> Self {
        RetentionError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for RetentionError {
    fn from(err: serde_json::Error) -> Self {
        RetentionError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RetentionError {
    fn from(err: ndarray::ShapeError) -> Self {
        RetentionError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<std::fmt::Error> for RetentionError {
    fn from(err: std::fmt::Error) -> Self {
        RetentionError::Render(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RetentionError::load(3, "join_date", "invalid date 'x'");
        assert_eq!(
            err.to_string(),
            "Load error at row 3, column 'join_date': invalid date 'x'"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RetentionError = io_err.into();
        assert!(matches!(err, RetentionError::IoError(_)));
    }

    #[test]
    fn test_integrity_error_names_employee() {
        let err = RetentionError::NegativeTenure { employee_id: 42, days: -3 };
        assert!(err.to_string().contains("42"));
    }
}
