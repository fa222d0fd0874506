use std::error::Error;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CoreErrorKind {
    #[error("Truncated TLS record")]
    TruncatedRecord,
    #[error("I/O error from Tokio")]
    IoError,
    #[error("Timeout Error")]
    TimeoutError,
}

#[derive(Debug, Clone)]
pub struct CoreError {
    pub error_kind: CoreErrorKind,
    pub message: String,
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Core Error: {}: {}", self.error_kind, self.message)
    }
}

impl Error for CoreError {}

impl CoreError {
    pub fn new(error_kind: CoreErrorKind, message: &str) -> Self {
        Self {
            error_kind,
            message: message.to_owned(),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(value: std::io::Error) -> Self {
        Self::new(CoreErrorKind::IoError, value.to_string().as_str())
    }
}
