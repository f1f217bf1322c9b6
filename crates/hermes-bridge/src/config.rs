use std::net::SocketAddr;
use std::time::Duration;

/// UDP port the bridge listens on by default.
pub const DEFAULT_UDP_PORT: u16 = 50001;

/// Largest datagram the bridge accepts; longer ones are rejected whole.
pub const DEFAULT_MAX_DATAGRAM_BYTES: usize = 10 * 1024;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(1);

/// What to do with a datagram whose length is not a whole number of words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialWordPolicy {
    /// Skip the datagram with [`crate::FrameError::MalformedDatagramLength`].
    #[default]
    Reject,
    /// Drop the trailing 1-3 bytes and forward the whole words.
    Truncate,
}

/// Which socket replies are sent from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplySocket {
    /// A fresh socket on an ephemeral port, closed after the send.
    #[default]
    Ephemeral,
    /// The socket the request arrived on, so the reply comes from the well-known port.
    Listener,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bind_addr: SocketAddr,
    /// Sleep between two status polls while waiting for a reply.
    pub poll_interval: Duration,
    /// Wall-clock budget for the transactor to post a reply.
    pub reply_timeout: Duration,
    /// Accept the first poll without waiting for the reply counter to move.
    ///
    /// For transactor firmware that does not reliably bump the counter.
    pub skip_reply_count_check: bool,
    pub partial_word_policy: PartialWordPolicy,
    pub max_datagram_bytes: usize,
    pub reply_socket: ReplySocket,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_UDP_PORT)),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            skip_reply_count_check: false,
            partial_word_policy: PartialWordPolicy::default(),
            max_datagram_bytes: DEFAULT_MAX_DATAGRAM_BYTES,
            reply_socket: ReplySocket::default(),
        }
    }
}
