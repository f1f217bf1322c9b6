use std::{io, net::SocketAddr, time::Duration};

use hermes_regbus::BusError;
use thiserror::Error;

/// Errors encoding a datagram into a request frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("empty packet")]
    EmptyPacket,

    #[error("datagram length {len} is not a multiple of 4 bytes")]
    MalformedDatagramLength { len: usize },

    #[error("datagram of {len} bytes exceeds the {max}-byte receive limit")]
    DatagramTooLong { len: usize, max: usize },

    #[error("packet of {words} words does not fit the 16-bit length field")]
    PacketTooLong { words: usize },
}

/// Failure of one bridge transaction.
///
/// [`BridgeError::is_fatal`] separates errors that only cost the current datagram from errors
/// after which the page index can no longer be trusted.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to receive datagram: {0}")]
    ReceiveFailure(#[source] io::Error),

    #[error("rejected datagram: {0}")]
    Frame(#[from] FrameError),

    #[error("failed to send reply to {peer}: {source}")]
    SendFailure {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error(
        "timed out after {elapsed:?} waiting for a reply (reply counter stuck at {baseline}, {polls} polls)"
    )]
    ReplyTimeout {
        elapsed: Duration,
        baseline: u32,
        polls: u64,
    },

    #[error("register bus error: {0}")]
    Bus(#[from] BusError),
}

impl BridgeError {
    /// Fatal errors stop the bridge loop; the process must restart to resynchronise with the
    /// transactor's page index.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::ReplyTimeout { .. } | BridgeError::Bus(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_and_bus_errors_are_fatal() {
        assert!(BridgeError::ReplyTimeout {
            elapsed: Duration::from_secs(1),
            baseline: 0,
            polls: 1000,
        }
        .is_fatal());
        assert!(BridgeError::Bus(BusError::NotMapped).is_fatal());

        assert!(!BridgeError::ReceiveFailure(io::ErrorKind::ConnectionReset.into()).is_fatal());
        assert!(!BridgeError::Frame(FrameError::EmptyPacket).is_fatal());
        assert!(!BridgeError::Frame(FrameError::DatagramTooLong { len: 10241, max: 10240 }).is_fatal());
        assert!(!BridgeError::SendFailure {
            peer: SocketAddr::from(([127, 0, 0, 1], 9)),
            source: io::ErrorKind::PermissionDenied.into(),
        }
        .is_fatal());
    }
}
