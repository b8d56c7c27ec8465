use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Internal(String),
    ConfigError(String),
    TransportError(String),
    ParseError(String),
    IoError(String),
    ExportError(String),
}

impl AppError {
    /// Whether the failure belongs to the model endpoint rather than to local input.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::TransportError(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::TransportError(msg) => write!(f, "Transport error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::ExportError(msg) => write!(f, "Export error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::TransportError(format!("Request timed out: {}", err))
        } else {
            AppError::TransportError(format!("Request failed: {}", err))
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes_variant() {
        let err = AppError::ConfigError("retry_attempts must be >= 1".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: retry_attempts must be >= 1"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.yaml");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::IoError(msg) if msg.contains("missing.yaml")));
    }

    #[test]
    fn test_is_transport() {
        assert!(AppError::TransportError("boom".into()).is_transport());
        assert!(!AppError::ParseError("boom".into()).is_transport());
    }
}
