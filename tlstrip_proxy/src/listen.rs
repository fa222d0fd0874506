use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::handler::AttackHandler;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Accepts connections on the attacker-facing address, classifies each one as
/// armed or unarmed by its source IP, and dispatches it to the attack handler
/// on its own task. One connection's failure never affects another.
pub async fn listen(
    config: ProxyConfig,
    cancellation_token: CancellationToken,
) -> Result<(), ProxyError> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        "Listening on {} for {} traffic towards {}",
        config.bind_addr,
        config.protocol,
        config.control_addr()
    );
    let handler = Arc::new(AttackHandler::new(config));

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Listener shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, addr) = accepted?;
                let armed = handler.config.is_armed(addr.ip());
                debug!("Connection from {addr} (armed: {armed})");
                let handler_local = handler.clone();
                tokio::spawn(async move {
                    if let Err(e) = handler_local.handle_connection(addr.ip(), stream, armed).await {
                        error!("Connection from {addr} failed: {e}");
                    }
                });
            }
        }
    }
}
