use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;
use tlstrip_core::error::CoreError;
use tlstrip_proxy::error::ProxyError;

#[derive(Error, Debug, Clone)]
pub enum AppErrorKind {
    #[error("{0}")]
    CoreError(#[from] CoreError),
    #[error("{0}")]
    ProxyError(#[from] ProxyError),
}

#[derive(Error, Clone)]
pub struct AppError {
    pub error_kind: AppErrorKind,
    pub message: String,
}

impl Debug for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AppError -> {}: {}", self.error_kind, self.message)
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AppError -> {}: {}", self.error_kind, self.message)
    }
}

impl AppError {
    pub fn new(error_kind: AppErrorKind, message: &str) -> Self {
        Self {
            error_kind,
            message: message.to_owned(),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(value: CoreError) -> Self {
        Self::new(AppErrorKind::CoreError(value), "")
    }
}

impl From<ProxyError> for AppError {
    fn from(value: ProxyError) -> Self {
        Self::new(AppErrorKind::ProxyError(value), "")
    }
}
