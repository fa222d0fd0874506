use clap::ValueEnum;
use std::fmt::{Display, Formatter};

/// Protocols that upgrade a plaintext control channel to TLS on demand. Each
/// variant contributes its upgrade command; only FTP opens an auxiliary
/// channel (the passive-mode data connection) worth hijacking.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Ftp,
    Pop3,
    Imap,
    Smtp,
}

impl Protocol {
    /// The command that requests the TLS upgrade on the open control
    /// connection. The server answers with a single acknowledgement line.
    pub fn upgrade_command(&self) -> &'static [u8] {
        match self {
            Protocol::Ftp => b"AUTH TLS\r\n",
            Protocol::Pop3 => b"STLS\r\n",
            Protocol::Imap => b"a001 STARTTLS\r\n",
            Protocol::Smtp => b"STARTTLS\r\n",
        }
    }

    pub fn has_auxiliary_channel(&self) -> bool {
        matches!(self, Protocol::Ftp)
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Ftp => write!(f, "FTP"),
            Protocol::Pop3 => write!(f, "POP3"),
            Protocol::Imap => write!(f, "IMAP"),
            Protocol::Smtp => write!(f, "SMTP"),
        }
    }
}
