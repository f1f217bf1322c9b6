//! Framing between client datagrams and the transactor's page buffer.
//!
//! ```text
//! request header : bits[31:16] = HEADER_WORD_COUNT, bits[15:0] = packet words - 1
//! request payload: the whole datagram as native-endian words
//! reply header   : bits[31:16] + bits[15:0] = reply words
//! reply payload  : reply words, returned to the client verbatim
//! ```
//!
//! The request header sits at the page base; the reply header sits [`REPLY_HEADER_OFFSET`]
//! words into the same page. Both conventions belong to the transactor firmware.

use crate::config::PartialWordPolicy;
use crate::error::FrameError;

/// Length, in words, of the local wrapper header.
pub const HEADER_WORD_COUNT: u32 = 1;

/// Offset of the reply header from the request base, independent of the page size.
pub const REPLY_HEADER_OFFSET: usize = 4;

/// Largest packet whose `len - 1` still fits the 16-bit length field.
pub const MAX_PACKET_WORDS: usize = 0x1_0000;

/// A request ready to be written to a page: header word followed by the packet words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFrame<'a> {
    pub header: u32,
    pub payload: &'a [u32],
}

/// Wraps `packet` in the local request header.
pub fn encode_request(packet: &[u32]) -> Result<RequestFrame<'_>, FrameError> {
    if packet.is_empty() {
        return Err(FrameError::EmptyPacket);
    }
    if packet.len() > MAX_PACKET_WORDS {
        return Err(FrameError::PacketTooLong {
            words: packet.len(),
        });
    }
    let size_field = (packet.len() - 1) as u32;
    Ok(RequestFrame {
        header: (HEADER_WORD_COUNT << 16) | size_field,
        payload: packet,
    })
}

/// Number of payload words announced by a reply header.
pub fn decode_reply_length(header: u32) -> usize {
    (((header >> 16) & 0xFFFF) + (header & 0xFFFF)) as usize
}

/// Word offset of the reply header paired with a request placed at `request_base`.
pub fn reply_base(request_base: usize) -> usize {
    request_base.saturating_add(REPLY_HEADER_OFFSET)
}

/// Reinterprets a datagram as native-endian 32-bit words.
///
/// A trailing partial word is either rejected or dropped, depending on `policy`.
pub fn datagram_to_words(
    datagram: &[u8],
    policy: PartialWordPolicy,
) -> Result<Vec<u32>, FrameError> {
    if datagram.len() % 4 != 0 && policy == PartialWordPolicy::Reject {
        return Err(FrameError::MalformedDatagramLength {
            len: datagram.len(),
        });
    }
    Ok(datagram
        .chunks_exact(4)
        .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Flattens reply words back into native-endian bytes.
pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_ne_bytes()).collect()
}
