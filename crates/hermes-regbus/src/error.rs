use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BusError>;

/// Errors surfaced by [`crate::RegisterBus`] and its window backends.
#[derive(Debug, Error)]
pub enum BusError {
    /// The memory device could not be opened, or the kernel rejected the mapping request.
    #[error(
        "failed to map {} at base=0x{base_address:x} len_words=0x{length_words:x}: {source}",
        .path.display()
    )]
    MappingFailure {
        path: PathBuf,
        base_address: u64,
        length_words: usize,
        #[source]
        source: std::io::Error,
    },

    /// The bus has no live window (it was never mapped, or has been unmapped).
    #[error("register window is not mapped")]
    NotMapped,

    /// A word access fell (partially or fully) outside the mapped window.
    #[error("register access out of range: offset=0x{offset:x} count={count} len_words=0x{len_words:x}")]
    OutOfRange {
        offset: usize,
        count: usize,
        len_words: usize,
    },
}

impl BusError {
    pub(crate) fn check_range(offset: usize, count: usize, len_words: usize) -> Result<()> {
        let end = offset.checked_add(count).ok_or(BusError::OutOfRange {
            offset,
            count,
            len_words,
        })?;
        if end > len_words {
            return Err(BusError::OutOfRange {
                offset,
                count,
                len_words,
            });
        }
        Ok(())
    }
}
