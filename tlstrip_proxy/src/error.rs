use std::error::Error;
use std::fmt::{Display, Formatter};
use thiserror::Error;
use tlstrip_core::error::CoreError;

#[derive(Debug, Clone, Error)]
pub enum ProxyErrorKind {
    #[error("{0}")]
    CoreError(CoreError),
    #[error("Invalid arguments")]
    ArgumentError,
    #[error("I/O error from Tokio")]
    IoError,
    #[error("Timed out waiting for attack preparation")]
    PreparationTimeout,
    #[error("Exhausted the port-probe deadline")]
    ProbeDeadlineExceeded,
    #[error("No unarmed target configured")]
    UnarmedTargetMissing,
}

#[derive(Debug, Clone)]
pub struct ProxyError {
    pub error_kind: ProxyErrorKind,
    pub message: String,
}

impl Display for ProxyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProxyError: {}: {}", self.error_kind, self.message)
    }
}

impl Error for ProxyError {}

impl ProxyError {
    pub fn new(error_kind: ProxyErrorKind, message: &str) -> Self {
        Self {
            error_kind,
            message: message.to_owned(),
        }
    }
}

impl From<CoreError> for ProxyError {
    fn from(value: CoreError) -> Self {
        Self::new(ProxyErrorKind::CoreError(value), "")
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(value: std::io::Error) -> Self {
        Self::new(ProxyErrorKind::IoError, value.to_string().as_str())
    }
}
