use crate::error::{BusError, Result};
use crate::mask::{extract_field, insert_field, FULL_MASK};
use crate::window::RegisterWindow;

#[cfg(unix)]
use crate::{devmem::DevMemWindow, device::DeviceProfile};
#[cfg(unix)]
use std::path::Path;

/// Masked scalar and block access to a window of 32-bit registers.
///
/// The bus owns its window. Once [`RegisterBus::unmap`] has been called (or for a bus built with
/// [`RegisterBus::unmapped`]) every access fails with [`BusError::NotMapped`].
///
/// Masked writes are a read followed by a write; nothing stops the hardware (or another process)
/// from changing the register in between.
#[derive(Debug)]
pub struct RegisterBus<W> {
    window: Option<W>,
}

impl<W: RegisterWindow> RegisterBus<W> {
    pub fn new(window: W) -> Self {
        Self {
            window: Some(window),
        }
    }

    pub fn unmapped() -> Self {
        Self { window: None }
    }

    pub fn is_mapped(&self) -> bool {
        self.window.is_some()
    }

    /// Releases the window; returns it so the caller decides when it is dropped.
    pub fn unmap(&mut self) -> Option<W> {
        let window = self.window.take();
        if window.is_some() {
            tracing::debug!("register window unmapped");
        }
        window
    }

    pub fn window(&self) -> Result<&W> {
        self.window.as_ref().ok_or(BusError::NotMapped)
    }

    fn window_mut(&mut self) -> Result<&mut W> {
        self.window.as_mut().ok_or(BusError::NotMapped)
    }

    pub fn len_words(&self) -> Result<usize> {
        Ok(self.window()?.len_words())
    }

    /// Reads the field selected by `mask` from the word at `offset`, right-aligned.
    ///
    /// With [`FULL_MASK`] the raw word is returned.
    pub fn read_scalar(&self, offset: usize, mask: u32) -> Result<u32> {
        let word = self.window()?.load(offset)?;
        Ok(extract_field(word, mask))
    }

    /// Writes `value` into the field selected by `mask` of the word at `offset`.
    ///
    /// With [`FULL_MASK`] the word is overwritten without being read first.
    pub fn write_scalar(&mut self, offset: usize, mask: u32, value: u32) -> Result<()> {
        let window = self.window_mut()?;
        if mask == FULL_MASK {
            return window.store(offset, value);
        }
        let current = window.load(offset)?;
        window.store(offset, insert_field(current, mask, value))
    }

    pub fn read_word(&self, offset: usize) -> Result<u32> {
        self.window()?.load(offset)
    }

    pub fn write_word(&mut self, offset: usize, value: u32) -> Result<()> {
        self.window_mut()?.store(offset, value)
    }

    pub fn read_block(&self, offset: usize, count: usize) -> Result<Vec<u32>> {
        let window = self.window()?;
        BusError::check_range(offset, count, window.len_words())?;
        let mut words = vec![0; count];
        window.load_block(offset, &mut words)?;
        Ok(words)
    }

    pub fn write_block(&mut self, offset: usize, words: &[u32]) -> Result<()> {
        self.window_mut()?.store_block(offset, words)
    }
}

#[cfg(unix)]
impl RegisterBus<DevMemWindow> {
    /// Maps the register window of `device` through `/dev/mem`.
    pub fn map_device(device: &DeviceProfile) -> Result<Self> {
        DevMemWindow::open(device.base_address, device.length_words).map(Self::new)
    }

    /// Maps the register window of `device` through the memory device at `path`.
    pub fn map_device_at(path: impl AsRef<Path>, device: &DeviceProfile) -> Result<Self> {
        DevMemWindow::open_path(path, device.base_address, device.length_words).map(Self::new)
    }
}
