//! Error taxonomy for the relay.
//!
//! Transport faults observed while relaying are deliberately *not*
//! represented here — per the error-handling policy they are swallowed
//! locally at the pump/supervisor boundary and never bubble up.

use std::{fmt, io};

/// Failure causes that stop a connection before any bytes are relayed, or
/// abort the process at startup.
#[derive(Debug)]
pub enum RelayError {
    /// The 64-byte preamble read was short, or no configured user's magic
    /// matched.
    HandshakeRejected,
    /// The datacenter index was out of range, or the TCP connect to the
    /// chosen datacenter failed.
    UpstreamUnreachable,
    /// Malformed or missing configuration; fatal at startup.
    Configuration(String),
    /// Any other I/O failure surfaced before the connection is established.
    Io(io::Error),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandshakeRejected => write!(f, "handshake rejected"),
            Self::UpstreamUnreachable => write!(f, "upstream datacenter unreachable"),
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<io::Error> for RelayError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<getrandom::Error> for RelayError {
    fn from(_: getrandom::Error) -> Self {
        Self::Io(io::Error::new(io::ErrorKind::Other, "getrandom failed"))
    }
}
