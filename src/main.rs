//! Main entry point for the tlstrip binary.
//!
//! tlstrip is a research MITM proxy for protocols that upgrade a plaintext
//! control channel to TLS on demand (FTP AUTH TLS, POP3/IMAP/SMTP STARTTLS).
//! The upgrade secures the control channel only; auxiliary channels opened
//! afterwards (an FTP passive-mode data connection) are not bound to it and
//! can be hijacked on-path. This module parses arguments, sets up logging,
//! assembles the proxy configuration, and runs the dispatcher.

use crate::error::AppError;
use clap::Parser;
use log::info;
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tlstrip_proxy::config::{AttackTimeouts, ProxyConfig, parse_port_set};
use tlstrip_proxy::protocol::Protocol;
use tlstrip_proxy::proxy_init;
use tracing_subscriber::EnvFilter;

mod error;

// The full `Cli` would reject a command line whose required arguments only
// arrive through the env file, so the file path is extracted first with a
// lenient pre-parse that skips every other argument.
#[derive(Debug, Parser, Default)]
#[clap(ignore_errors = true)]
struct PreCli {
    /// Optional `.env` file path for loading environment variables.
    #[clap(short, long, value_name = "ENV_FILE")]
    env_file: Option<String>,
}

#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// IP of the armed target (the real server, e.g. the FTP server).
    #[clap(short = 't', long, value_name = "TARGET_HOST", env = "TLSTRIP_TARGET_HOST")]
    target_host: IpAddr,

    /// Control port of the armed target.
    #[clap(
        short = 'p',
        long,
        value_name = "TARGET_PORT",
        env = "TLSTRIP_TARGET_PORT",
        default_value = "21"
    )]
    target_port: u16,

    /// Attacker-facing bind address.
    #[clap(
        long,
        value_name = "BIND_IP",
        env = "TLSTRIP_BIND_IP",
        default_value = "127.0.0.2"
    )]
    bind_ip: IpAddr,

    /// Attacker-facing bind port.
    #[clap(
        long,
        value_name = "BIND_PORT",
        env = "TLSTRIP_BIND_PORT",
        default_value = "443"
    )]
    bind_port: u16,

    /// Optional forward target for unarmed (non-victim) traffic.
    #[clap(long, value_name = "UNARMED_HOST", env = "TLSTRIP_UNARMED_HOST")]
    unarmed_host: Option<IpAddr>,

    /// Port of the unarmed forward target.
    #[clap(
        long,
        value_name = "UNARMED_PORT",
        env = "TLSTRIP_UNARMED_PORT",
        default_value = "443"
    )]
    unarmed_port: u16,

    /// Protocol spoken on the armed path.
    #[clap(
        long,
        value_enum,
        value_name = "PROTOCOL",
        env = "TLSTRIP_PROTOCOL",
        default_value = "ftp"
    )]
    protocol: Protocol,

    /// Candidate auxiliary ports on the target: `10100`, `10100-10110`, or a
    /// comma-separated mix.
    #[clap(
        long,
        value_name = "PROBE_PORTS",
        env = "TLSTRIP_PROBE_PORTS",
        default_value = "10100"
    )]
    probe_ports: String,

    /// Peers routed through the attack path; everyone when empty.
    #[clap(
        long,
        value_name = "ARMED_PEERS",
        env = "TLSTRIP_ARMED_PEERS",
        value_delimiter = ','
    )]
    armed_peers: Vec<IpAddr>,

    /// Seconds to wait after capturing the ClientHello before probing.
    #[clap(
        long,
        value_name = "SETTLE_DELAY",
        env = "TLSTRIP_SETTLE_DELAY",
        default_value = "5"
    )]
    settle_delay: u64,

    /// Overall probing budget in seconds.
    #[clap(
        long,
        value_name = "PROBE_DEADLINE",
        env = "TLSTRIP_PROBE_DEADLINE",
        default_value = "60"
    )]
    probe_deadline: u64,

    /// Optional log level.
    #[clap(
        short = 'l',
        long,
        value_name = "LOG_LEVEL",
        env = "TLSTRIP_LOG_LEVEL",
        default_value = "info"
    )]
    log_level: String,

    /// Optional `.env` file path for loading environment variables.
    #[clap(short, long, value_name = "ENV_FILE")]
    env_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let pre = PreCli::try_parse().unwrap_or_default();

    if let Some(env_file) = pre.env_file {
        dotenvy::from_filename(env_file).expect("failed to load .env file");
    } else {
        dotenvy::dotenv().ok();
    }

    let cli = Cli::parse();

    let env = EnvFilter::new(format!(
        "tlstrip={0},tlstrip_core={0},tlstrip_proxy={0},info",
        cli.log_level
    ));
    let timer = tracing_subscriber::fmt::time::LocalTime::rfc_3339();
    tracing_subscriber::fmt()
        .with_timer(timer)
        .with_target(true)
        .with_env_filter(env)
        .init();

    let timeouts = AttackTimeouts {
        settle_delay: Duration::from_secs(cli.settle_delay),
        probe_deadline: Duration::from_secs(cli.probe_deadline),
        ..AttackTimeouts::default()
    };

    let config = ProxyConfig {
        bind_addr: SocketAddr::new(cli.bind_ip, cli.bind_port),
        target_ip: cli.target_host,
        target_port: cli.target_port,
        unarmed_addr: cli
            .unarmed_host
            .map(|host| SocketAddr::new(host, cli.unarmed_port)),
        protocol: cli.protocol,
        probe_ports: parse_port_set(&cli.probe_ports)?,
        armed_peers: cli.armed_peers.into_iter().collect::<HashSet<_>>(),
        timeouts,
    };

    info!(
        "Starting {} proxy redirecting from {} to {}",
        config.protocol,
        config.bind_addr,
        config.control_addr()
    );

    proxy_init(config).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_file_is_picked_out_of_a_full_command_line() {
        let pre = PreCli::try_parse_from([
            "tlstrip",
            "-t",
            "10.0.0.1",
            "--probe-ports",
            "10100-10110",
            "-e",
            "lab.env",
        ])
        .unwrap_or_default();
        assert_eq!(pre.env_file.as_deref(), Some("lab.env"));
    }

    #[test]
    fn pre_parse_without_an_env_file_yields_none() {
        let pre = PreCli::try_parse_from(["tlstrip", "-t", "10.0.0.1"]).unwrap_or_default();
        assert_eq!(pre.env_file, None);
    }
}
