use crate::error::{ProxyError, ProxyErrorKind};
use crate::protocol::Protocol;
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Timing knobs of the attack. Defaults match the behavior of a live lab run;
/// tests shrink them.
#[derive(Debug, Clone)]
pub struct AttackTimeouts {
    /// Per-read timeout for the banner and the upgrade acknowledgement.
    pub control_read: Duration,
    /// How long a leak connection waits for the peer to become `Prepared`.
    pub prepare_wait: Duration,
    /// Grace period between capturing the ClientHello and the first probe
    /// pass, so the server has time to open its auxiliary listening port.
    pub settle_delay: Duration,
    /// Overall budget for the probing loop.
    pub probe_deadline: Duration,
    /// Pause between passes over the candidate port set.
    pub probe_interval: Duration,
    /// Connect/read timeout for a single probe attempt.
    pub probe_connect: Duration,
}

impl Default for AttackTimeouts {
    fn default() -> Self {
        Self {
            control_read: Duration::from_secs(10),
            prepare_wait: Duration::from_secs(60),
            settle_delay: Duration::from_secs(5),
            probe_deadline: Duration::from_secs(60),
            probe_interval: Duration::from_millis(750),
            probe_connect: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bind_addr: SocketAddr,
    pub target_ip: IpAddr,
    pub target_port: u16,
    pub unarmed_addr: Option<SocketAddr>,
    pub protocol: Protocol,
    /// Candidate auxiliary ports on the target, probed in order each pass.
    pub probe_ports: Vec<u16>,
    /// Peers routed through the attack path; an empty set arms everyone.
    pub armed_peers: HashSet<IpAddr>,
    pub timeouts: AttackTimeouts,
}

impl ProxyConfig {
    pub fn control_addr(&self) -> SocketAddr {
        SocketAddr::new(self.target_ip, self.target_port)
    }

    pub fn auxiliary_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.target_ip, port)
    }

    pub fn is_armed(&self, peer: IpAddr) -> bool {
        self.armed_peers.is_empty() || self.armed_peers.contains(&peer)
    }
}

/// Parses a candidate port set: single ports, inclusive ranges (`N-M`), and
/// comma-separated combinations of both.
pub fn parse_port_set(input: &str) -> Result<Vec<u16>, ProxyError> {
    let mut ports = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_port(start.trim(), part)?;
                let end = parse_port(end.trim(), part)?;
                if start > end {
                    return Err(ProxyError::new(
                        ProxyErrorKind::ArgumentError,
                        format!("Descending port range: {part}").as_str(),
                    ));
                }
                ports.extend(start..=end);
            }
            None => ports.push(parse_port(part, part)?),
        }
    }
    if ports.is_empty() {
        return Err(ProxyError::new(
            ProxyErrorKind::ArgumentError,
            "Empty port set",
        ));
    }
    Ok(ports)
}

fn parse_port(value: &str, context: &str) -> Result<u16, ProxyError> {
    value.parse().map_err(|_| {
        ProxyError::new(
            ProxyErrorKind::ArgumentError,
            format!("Invalid port in {context}").as_str(),
        )
    })
}
