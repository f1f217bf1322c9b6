use std::fmt;

use hermes_regbus::{BusError, RegisterBus, RegisterWindow};

/// Word offset of the transactor status block.
pub const STATUS_BLOCK_OFFSET: usize = 0;
/// Number of words in the status block.
pub const STATUS_BLOCK_WORDS: usize = 4;

/// One reading of the transactor status block.
///
/// `next_request_page` and `reply_counter` are advanced by the hardware at any time, so a
/// snapshot is only valid for the decision it was read for. Never reuse one across steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub buffer_count: u32,
    pub words_per_page: u32,
    pub next_request_page: u32,
    pub reply_counter: u32,
}

impl StatusSnapshot {
    /// Reads the status block fresh from the bus.
    pub fn read<W: RegisterWindow>(bus: &RegisterBus<W>) -> Result<Self, BusError> {
        let words = bus.read_block(STATUS_BLOCK_OFFSET, STATUS_BLOCK_WORDS)?;
        Ok(Self::from_words([words[0], words[1], words[2], words[3]]))
    }

    pub const fn from_words(words: [u32; STATUS_BLOCK_WORDS]) -> Self {
        Self {
            buffer_count: words[0],
            words_per_page: words[1],
            next_request_page: words[2],
            reply_counter: words[3],
        }
    }

    pub const fn to_words(self) -> [u32; STATUS_BLOCK_WORDS] {
        [
            self.buffer_count,
            self.words_per_page,
            self.next_request_page,
            self.reply_counter,
        ]
    }

    /// Word offset of the page the next request must be written to.
    ///
    /// Saturates instead of wrapping, so a nonsensical geometry fails the bus bounds check.
    pub fn request_base(&self) -> usize {
        (self.words_per_page as usize).saturating_mul(self.next_request_page as usize)
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "num_bufs={} words_per_page={} next_req_page={} num_replies={}",
            self.buffer_count, self.words_per_page, self.next_request_page, self.reply_counter
        )
    }
}
