use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("PERSISTENCE_FAILURE: {0}")]
    Persistence(String),
    #[error("VALIDATION_FAILED: {0}")]
    Validation(String),
    #[error("INCONSISTENT_STATE: {0}")]
    Inconsistent(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Inconsistent(_) => "INCONSISTENT_STATE",
            Self::Io(_) => "IO_FAILURE",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
