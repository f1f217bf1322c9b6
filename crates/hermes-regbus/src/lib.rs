//! Masked register access over a memory-mapped window of 32-bit hardware registers.
//!
//! [`RegisterBus`] owns a [`RegisterWindow`]: either a physical mapping through `/dev/mem`
//! ([`DevMemWindow`]) or a heap-backed [`MemoryWindow`] used to simulate the hardware.
//! All offsets are word indices.

mod bus;
#[cfg(unix)]
mod devmem;
mod device;
mod error;
pub mod mask;
pub mod num;
mod window;

pub use bus::RegisterBus;
#[cfg(unix)]
pub use devmem::{DevMemWindow, DEFAULT_MEM_DEVICE};
pub use device::{DeviceError, DeviceProfile, DEFAULT_LENGTH_WORDS, KNOWN_DEVICES};
pub use error::{BusError, Result};
pub use mask::{bit_shift, FULL_MASK};
pub use window::{MemoryWindow, RegisterWindow};
