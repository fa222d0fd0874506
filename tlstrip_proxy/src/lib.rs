use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::listen::listen;
use tokio_util::sync::CancellationToken;

pub mod config;
pub mod error;
pub mod handler;
pub mod listen;
pub mod protocol;

pub async fn proxy_init(config: ProxyConfig) -> Result<(), ProxyError> {
    listen(config, CancellationToken::new()).await
}
