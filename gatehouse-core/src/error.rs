use serde::Serialize;
use thiserror::Error;

/// Coarse classification of an [`AppError`].
///
/// Retry logic and callers switch on this tag instead of inspecting
/// error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Cancelled,
    Transport,
    Server,
    Unauthorized,
    Storage,
    Configuration,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    StorageError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => ErrorKind::Validation,
            AppError::Cancelled(_) => ErrorKind::Cancelled,
            AppError::Transport(_) => ErrorKind::Transport,
            AppError::Server { .. } => ErrorKind::Server,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::StorageError(_) => ErrorKind::Storage,
            AppError::ConfigError(_) => ErrorKind::Configuration,
            AppError::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Server { status, .. } => Some(*status),
            AppError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    /// Build an error from a non-2xx response.
    ///
    /// Uses the `message` field of a JSON body when there is one, else
    /// `HTTP <status>: <reason>`.
    pub fn from_response(status: u16, reason: &str, body: &[u8]) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_slice(body).ok();

        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}: {}", status, reason));

        if status == 401 {
            return AppError::Unauthorized(message);
        }

        let data = parsed.and_then(|v| v.get("data").cloned());

        AppError::Server {
            status,
            message,
            data,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(anyhow::Error::new(err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_is_preferred() {
        let body = br#"{"code":400,"message":"Failed to create record.","data":{"name":{"code":"validation_required"}}}"#;
        let err = AppError::from_response(400, "Bad Request", body);

        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "Failed to create record.");
        match err {
            AppError::Server { data, .. } => assert!(data.unwrap().get("name").is_some()),
            _ => panic!("Expected Server error"),
        }
    }

    #[test]
    fn test_status_text_fallback() {
        let err = AppError::from_response(502, "Bad Gateway", b"<html>upstream down</html>");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_unauthorized_classification() {
        let err = AppError::from_response(401, "Unauthorized", b"{}");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_cancelled_kind() {
        let err = AppError::Cancelled("superseded by a newer request".to_string());
        assert!(err.is_cancelled());
        assert!(!AppError::Transport("connection reset".to_string()).is_cancelled());
    }
}
