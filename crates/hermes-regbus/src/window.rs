use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{BusError, Result};

/// Word-addressed backing storage for a [`crate::RegisterBus`].
///
/// Offsets are word indices (byte offset = index * 4). Implementations must bounds-check every
/// access against [`RegisterWindow::len_words`].
pub trait RegisterWindow {
    fn len_words(&self) -> usize;

    fn load(&self, offset: usize) -> Result<u32>;

    fn store(&mut self, offset: usize, value: u32) -> Result<()>;

    /// Reads `dst.len()` consecutive words starting at `offset`.
    ///
    /// The whole range is validated before the first word is read.
    fn load_block(&self, offset: usize, dst: &mut [u32]) -> Result<()> {
        BusError::check_range(offset, dst.len(), self.len_words())?;
        for (i, slot) in dst.iter_mut().enumerate() {
            *slot = self.load(offset + i)?;
        }
        Ok(())
    }

    /// Writes `src` to consecutive words starting at `offset`, in order.
    ///
    /// The whole range is validated before the first word is written.
    fn store_block(&mut self, offset: usize, src: &[u32]) -> Result<()> {
        BusError::check_range(offset, src.len(), self.len_words())?;
        for (i, &value) in src.iter().enumerate() {
            self.store(offset + i, value)?;
        }
        Ok(())
    }
}

impl<W: RegisterWindow + ?Sized> RegisterWindow for Box<W> {
    fn len_words(&self) -> usize {
        (**self).len_words()
    }

    fn load(&self, offset: usize) -> Result<u32> {
        (**self).load(offset)
    }

    fn store(&mut self, offset: usize, value: u32) -> Result<()> {
        (**self).store(offset, value)
    }

    fn load_block(&self, offset: usize, dst: &mut [u32]) -> Result<()> {
        (**self).load_block(offset, dst)
    }

    fn store_block(&mut self, offset: usize, src: &[u32]) -> Result<()> {
        (**self).store_block(offset, src)
    }
}

/// A heap-backed register window.
///
/// Clones share the same storage, so one handle can be given to a [`crate::RegisterBus`] while
/// another plays the part of the hardware on the far side of the window (advancing counters,
/// posting replies).
#[derive(Debug, Clone)]
pub struct MemoryWindow {
    words: Arc<Mutex<Vec<u32>>>,
}

impl MemoryWindow {
    /// Creates a zero-filled window of `len_words` words.
    pub fn new(len_words: usize) -> Self {
        Self {
            words: Arc::new(Mutex::new(vec![0; len_words])),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u32>> {
        // A panicking test thread must not wedge the simulated hardware.
        self.words.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn read_word(&self, offset: usize) -> Result<u32> {
        let words = self.lock();
        BusError::check_range(offset, 1, words.len())?;
        Ok(words[offset])
    }

    pub fn write_word(&self, offset: usize, value: u32) -> Result<()> {
        let mut words = self.lock();
        BusError::check_range(offset, 1, words.len())?;
        words[offset] = value;
        Ok(())
    }

    pub fn read_words(&self, offset: usize, count: usize) -> Result<Vec<u32>> {
        let words = self.lock();
        BusError::check_range(offset, count, words.len())?;
        Ok(words[offset..offset + count].to_vec())
    }

    pub fn write_words(&self, offset: usize, src: &[u32]) -> Result<()> {
        let mut words = self.lock();
        BusError::check_range(offset, src.len(), words.len())?;
        words[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }
}

impl RegisterWindow for MemoryWindow {
    fn len_words(&self) -> usize {
        self.lock().len()
    }

    fn load(&self, offset: usize) -> Result<u32> {
        self.read_word(offset)
    }

    fn store(&mut self, offset: usize, value: u32) -> Result<()> {
        self.write_word(offset, value)
    }

    fn load_block(&self, offset: usize, dst: &mut [u32]) -> Result<()> {
        let words = self.lock();
        BusError::check_range(offset, dst.len(), words.len())?;
        dst.copy_from_slice(&words[offset..offset + dst.len()]);
        Ok(())
    }

    fn store_block(&mut self, offset: usize, src: &[u32]) -> Result<()> {
        self.write_words(offset, src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage() {
        let a = MemoryWindow::new(8);
        let mut b = a.clone();
        b.store(3, 0xCAFE_F00D).unwrap();
        assert_eq!(a.read_word(3).unwrap(), 0xCAFE_F00D);
    }

    #[test]
    fn block_access_is_checked_before_touching_words() {
        let mut w = MemoryWindow::new(4);
        let err = w.store_block(2, &[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            BusError::OutOfRange {
                offset: 2,
                count: 3,
                len_words: 4
            }
        ));
        // Nothing was written, not even the in-range prefix.
        assert_eq!(w.read_words(0, 4).unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn offset_overflow_is_out_of_range() {
        let w = MemoryWindow::new(4);
        let mut dst = [0u32; 2];
        assert!(matches!(
            w.load_block(usize::MAX, &mut dst),
            Err(BusError::OutOfRange { .. })
        ));
    }
}
