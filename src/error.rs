use std::fmt;
use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
    Network,
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Unauthorized => "unauthorized",
            ErrorCategory::Forbidden => "forbidden",
            ErrorCategory::NotFound => "not-found",
            ErrorCategory::ServerError => "server-error",
            ErrorCategory::Network => "network",
            ErrorCategory::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    /// 401. The session has already been cleared when this is returned.
    #[error("Unauthorized. Please log in again.")]
    Unauthorized,

    #[error("Forbidden access{}", suffix(.message))]
    Forbidden { message: Option<String> },

    #[error("Resource not found{}", suffix(.message))]
    NotFound { message: Option<String> },

    #[error("Server error ({status}){}", suffix(.message))]
    Server { status: u16, message: Option<String> },

    #[error("Request failed with status {status}{}", suffix(.message))]
    Http { status: u16, message: Option<String> },

    #[error("Network error. Please check your connection.")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Invalid API URL '{0}'")]
    InvalidUrl(String),

    #[error("{0} is already in progress")]
    Busy(&'static str),
}

fn suffix(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {}", message),
        None => String::new(),
    }
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Validation(_) | ApiError::Busy(_) => ErrorCategory::Validation,
            ApiError::Unauthorized => ErrorCategory::Unauthorized,
            ApiError::Forbidden { .. } => ErrorCategory::Forbidden,
            ApiError::NotFound { .. } => ErrorCategory::NotFound,
            ApiError::Server { .. } => ErrorCategory::ServerError,
            ApiError::Network(_) => ErrorCategory::Network,
            ApiError::Http { .. }
            | ApiError::Decode(_)
            | ApiError::Encode(_)
            | ApiError::InvalidUrl(_) => ErrorCategory::Other,
        }
    }

    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::Forbidden { message }
            | ApiError::NotFound { message }
            | ApiError::Server { message, .. }
            | ApiError::Http { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
    #[source]
    pub source: Option<ApiError>,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Session storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}
