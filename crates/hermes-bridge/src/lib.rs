//! UDP bridge between register-access clients and a memory-mapped bus transactor.
//!
//! Each datagram is written, wrapped in a one-word header, into the page the transactor
//! announces in its status block. The bridge then polls the status block until the reply
//! counter moves and returns the reply posted in the same page to the sender.

mod bridge;
pub mod cli;
mod config;
mod error;
pub mod frame;
mod status;
mod transport;

pub use bridge::{Bridge, BridgeStats};
pub use config::{
    BridgeConfig, PartialWordPolicy, ReplySocket, DEFAULT_MAX_DATAGRAM_BYTES,
    DEFAULT_POLL_INTERVAL, DEFAULT_REPLY_TIMEOUT, DEFAULT_UDP_PORT,
};
pub use error::{BridgeError, FrameError};
pub use status::{StatusSnapshot, STATUS_BLOCK_OFFSET, STATUS_BLOCK_WORDS};
pub use transport::{Transport, UdpTransport};
