//! Bit-field helpers for masked register access.
//!
//! A mask selects a (normally contiguous) field inside a 32-bit register. Field values are
//! right-aligned: the mask's lowest set bit becomes bit 0 of the value.

/// Mask value that selects the whole register and bypasses field extraction.
pub const FULL_MASK: u32 = 0xFFFF_FFFF;

/// Returns the index of the lowest set bit of `mask`, or 32 when `mask` is zero.
///
/// A shift of 32 makes every derived field mask zero, so masked accesses with a zero mask read as
/// 0 and write nothing.
#[inline]
pub const fn bit_shift(mask: u32) -> u32 {
    mask.trailing_zeros()
}

/// Extracts the field selected by `mask` from `word`, right-aligned.
#[inline]
pub fn extract_field(word: u32, mask: u32) -> u32 {
    if mask == FULL_MASK {
        return word;
    }
    (word & mask).checked_shr(bit_shift(mask)).unwrap_or(0)
}

/// Returns `word` with the field selected by `mask` replaced by `value`.
///
/// `value` is truncated to the field width; bits outside `mask` are preserved.
#[inline]
pub fn insert_field(word: u32, mask: u32, value: u32) -> u32 {
    if mask == FULL_MASK {
        return value;
    }
    let shift = bit_shift(mask);
    let field = mask.checked_shr(shift).unwrap_or(0);
    let bits = (value & field).checked_shl(shift).unwrap_or(0);
    (word & !mask) | bits
}
