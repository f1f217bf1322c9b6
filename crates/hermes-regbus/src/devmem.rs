//! Physical register window mapped through a memory device (normally `/dev/mem`).

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use crate::error::{BusError, Result};
use crate::window::RegisterWindow;

/// Default memory device used to reach physical addresses.
pub const DEFAULT_MEM_DEVICE: &str = "/dev/mem";

/// A `MAP_SHARED` mapping of `length_words` 32-bit registers starting at a physical address.
///
/// Every access is a volatile load/store of one aligned word. The mapping is released and the
/// device closed when the window is dropped.
#[derive(Debug)]
pub struct DevMemWindow {
    ptr: NonNull<u32>,
    len_words: usize,
    base_address: u64,
    path: PathBuf,
    // Keeps the descriptor open for the lifetime of the mapping.
    _file: File,
}

// SAFETY: the mapping is owned exclusively by this value and is only reached through `&self` /
// `&mut self` methods that perform single volatile word accesses.
unsafe impl Send for DevMemWindow {}

impl DevMemWindow {
    /// Maps `length_words` words at physical `base_address` through [`DEFAULT_MEM_DEVICE`].
    pub fn open(base_address: u64, length_words: usize) -> Result<Self> {
        Self::open_path(DEFAULT_MEM_DEVICE, base_address, length_words)
    }

    /// Maps `length_words` words at byte offset `base_address` of the file at `path`.
    ///
    /// `base_address` must be page aligned.
    pub fn open_path(
        path: impl AsRef<Path>,
        base_address: u64,
        length_words: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let fail = |source: io::Error| BusError::MappingFailure {
            path: path.clone(),
            base_address,
            length_words,
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(&path)
            .map_err(fail)?;

        let len_bytes = length_words
            .checked_mul(4)
            .filter(|&len| len != 0)
            .ok_or_else(|| {
                fail(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "window length must be non-zero and fit in usize bytes",
                ))
            })?;

        let ptr = map_shared(&file, len_bytes, base_address).map_err(fail)?;

        tracing::debug!(
            path = %path.display(),
            base_address = format_args!("0x{base_address:x}"),
            length_words,
            "mapped register window"
        );

        Ok(Self {
            ptr,
            len_words: length_words,
            base_address,
            path,
            _file: file,
        })
    }

    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn map_shared(file: &File, len_bytes: usize, offset: u64) -> io::Result<NonNull<u32>> {
    // 32-bit targets need the 64-bit offset variant to reach addresses above 2 GiB.
    let offset = libc::off64_t::try_from(offset)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "base address overflows off64_t"))?;
    // SAFETY: a fresh mapping is requested (null hint); the result is checked for MAP_FAILED.
    let ptr = unsafe {
        libc::mmap64(
            std::ptr::null_mut(),
            len_bytes,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            file.as_raw_fd(),
            offset,
        )
    };
    checked_mapping(ptr)
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn map_shared(file: &File, len_bytes: usize, offset: u64) -> io::Result<NonNull<u32>> {
    let offset = libc::off_t::try_from(offset)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "base address overflows off_t"))?;
    // SAFETY: a fresh mapping is requested (null hint); the result is checked for MAP_FAILED.
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len_bytes,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            file.as_raw_fd(),
            offset,
        )
    };
    checked_mapping(ptr)
}

fn checked_mapping(ptr: *mut libc::c_void) -> io::Result<NonNull<u32>> {
    if ptr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    NonNull::new(ptr.cast::<u32>())
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned a null mapping"))
}

impl RegisterWindow for DevMemWindow {
    fn len_words(&self) -> usize {
        self.len_words
    }

    fn load(&self, offset: usize) -> Result<u32> {
        BusError::check_range(offset, 1, self.len_words)?;
        // SAFETY: `offset` is within the mapping and mmap returns page-aligned memory.
        Ok(unsafe { self.ptr.as_ptr().add(offset).read_volatile() })
    }

    fn store(&mut self, offset: usize, value: u32) -> Result<()> {
        BusError::check_range(offset, 1, self.len_words)?;
        // SAFETY: as for `load`.
        unsafe { self.ptr.as_ptr().add(offset).write_volatile(value) };
        Ok(())
    }
}

impl Drop for DevMemWindow {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len_words` describe the mapping created in `open_path`, unmapped once.
        let rc = unsafe { libc::munmap(self.ptr.as_ptr().cast(), self.len_words * 4) };
        if rc != 0 {
            tracing::warn!(
                path = %self.path.display(),
                "munmap failed: {}",
                io::Error::last_os_error()
            );
        }
    }
}
