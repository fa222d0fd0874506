use crate::error::CoreError;
use log::debug;
use tokio::io::{AsyncRead, AsyncWrite, copy_bidirectional};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOutcome {
    pub client_to_target: u64,
    pub target_to_client: u64,
}

/// Relays bytes between two connected streams in both directions at once,
/// without interpreting them. EOF on one side is propagated as a shutdown to
/// the other; the relay returns once both directions are drained or either
/// side errors.
pub async fn relay<A, B>(client: &mut A, target: &mut B) -> Result<RelayOutcome, CoreError>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (client_to_target, target_to_client) = copy_bidirectional(client, target).await?;
    debug!("Relay finished: {client_to_target} bytes forward, {target_to_client} bytes back");
    Ok(RelayOutcome {
        client_to_target,
        target_to_client,
    })
}
