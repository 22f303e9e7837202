use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabuladorError {
    #[error("required column '{column}' not found in the input table")]
    SchemaError { column: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("classification service returned HTTP {status}: {body}")]
    ServiceError { status: u16, body: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, TabuladorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TabuladorError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TabuladorError::IoError(_) => ErrorSeverity::Critical,
            TabuladorError::ApiError(_) | TabuladorError::ServiceError { .. } => {
                ErrorSeverity::Medium
            }
            _ => ErrorSeverity::High,
        }
    }

    /// Exit code for the invocation surface, keyed on severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            TabuladorError::SchemaError { column } => {
                format!("The input table does not have a '{column}' column.")
            }
            TabuladorError::IoError(e) => format!("Could not read or write a file: {e}"),
            TabuladorError::CsvError(e) => format!("The input table could not be parsed: {e}"),
            TabuladorError::ApiError(e) => format!("The classification service is unreachable: {e}"),
            TabuladorError::ServiceError { status, .. } => {
                format!("The classification service rejected the request (HTTP {status}).")
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            TabuladorError::SchemaError { .. } => {
                "Export the table again with the clinical note column named 'obs'."
            }
            TabuladorError::IoError(_) => {
                "Check that the input file exists and the output folder is writable."
            }
            TabuladorError::CsvError(_) => "Check that the input file is a valid CSV.",
            TabuladorError::ApiError(_) | TabuladorError::ServiceError { .. } => {
                "Check your network connection and the configured API endpoint and key."
            }
            TabuladorError::InvalidConfigValueError { .. }
            | TabuladorError::MissingConfigError { .. }
            | TabuladorError::ConfigError { .. } => {
                "Review the command-line flags and the settings file."
            }
            _ => "Re-run with --verbose for details.",
        }
    }
}
