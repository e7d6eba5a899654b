//! Power-of-two alignment helpers for binary file layouts.
//!
//! All functions taking an `alignment` reject values that are zero or not a
//! power of two with [`FoundationError::Validation`].

use std::io::Write;

use crate::errors::{FoundationError, Result};

/// Default alignment for packed file sections.
pub const DEFAULT_ALIGNMENT: u64 = 16;
/// Typical CPU cache line size.
pub const CACHE_LINE_SIZE: u64 = 64;
/// Typical memory page size.
pub const PAGE_SIZE: u64 = 4096;
/// Classic disk sector size.
pub const SECTOR_SIZE: u64 = 512;

/// Zero bytes used by [`write_padding`]; larger paddings are written in chunks.
const ZEROS: [u8; 512] = [0; 512];

/// Returns true if `n` is a power of two. Zero is not.
#[must_use]
pub fn is_power_of_two(n: u64) -> bool {
    n != 0 && n & (n - 1) == 0
}

fn check_alignment(alignment: u64) -> Result<()> {
    if is_power_of_two(alignment) {
        Ok(())
    } else {
        Err(FoundationError::Validation(format!(
            "alignment must be a power of 2, got {alignment}"
        )))
    }
}

/// Round `offset` up to the next multiple of `alignment`.
pub fn align_offset(offset: u64, alignment: u64) -> Result<u64> {
    check_alignment(alignment)?;
    let mask = alignment - 1;
    offset
        .checked_add(mask)
        .map(|v| v & !mask)
        .ok_or_else(|| {
            FoundationError::Validation(format!(
                "offset {offset} cannot be aligned to {alignment} without overflow"
            ))
        })
}

/// Same as [`align_offset`]; reads better when aligning sizes.
pub fn align_to(value: u64, alignment: u64) -> Result<u64> {
    align_offset(value, alignment)
}

/// Size of a block of `size` bytes once padded to `alignment`.
pub fn get_aligned_size(size: u64, alignment: u64) -> Result<u64> {
    align_offset(size, alignment)
}

pub fn is_aligned(offset: u64, alignment: u64) -> Result<bool> {
    check_alignment(alignment)?;
    Ok(offset & (alignment - 1) == 0)
}

/// Number of padding bytes needed after `offset` to reach `alignment`.
pub fn calculate_padding(offset: u64, alignment: u64) -> Result<u64> {
    Ok(align_offset(offset, alignment)? - offset)
}

/// Smallest power of two >= `n`. Returns 1 for 0 and saturates at 2^63.
#[must_use]
pub fn next_power_of_two(n: u64) -> u64 {
    n.checked_next_power_of_two().unwrap_or(1 << 63)
}

/// Largest power of two <= `n`. Returns 0 for 0.
#[must_use]
pub fn prev_power_of_two(n: u64) -> u64 {
    if n == 0 {
        0
    } else {
        1 << (63 - n.leading_zeros())
    }
}

/// Write zero bytes to `writer` so that a stream currently at `offset`
/// ends on an `alignment` boundary.
///
/// Returns the number of bytes written.
pub fn write_padding<W: Write>(writer: &mut W, offset: u64, alignment: u64) -> Result<u64> {
    let padding = calculate_padding(offset, alignment)?;
    let mut remaining = padding;
    while remaining > 0 {
        let chunk = remaining.min(ZEROS.len() as u64) as usize;
        writer.write_all(&ZEROS[..chunk])?;
        remaining -= chunk as u64;
    }
    Ok(padding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_power_of_two() {
        assert!(!is_power_of_two(0));
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(4096));
        assert!(!is_power_of_two(12));
    }

    #[test]
    fn test_align_offset_basic() {
        assert_eq!(align_offset(0, 16).unwrap(), 0);
        assert_eq!(align_offset(1, 16).unwrap(), 16);
        assert_eq!(align_offset(16, 16).unwrap(), 16);
        assert_eq!(align_offset(17, 16).unwrap(), 32);
        assert_eq!(align_offset(4097, PAGE_SIZE).unwrap(), 8192);
    }

    #[test]
    fn test_align_offset_rejects_bad_alignment() {
        assert!(matches!(
            align_offset(10, 0),
            Err(FoundationError::Validation(_))
        ));
        assert!(matches!(
            align_offset(10, 24),
            Err(FoundationError::Validation(_))
        ));
        assert!(is_aligned(10, 3).is_err());
    }

    #[test]
    fn test_align_offset_overflow() {
        assert!(align_offset(u64::MAX, 16).is_err());
        assert_eq!(align_offset(u64::MAX, 1).unwrap(), u64::MAX);
    }

    #[test]
    fn test_align_offset_is_idempotent() {
        for alignment in [1, 2, 8, DEFAULT_ALIGNMENT, CACHE_LINE_SIZE, PAGE_SIZE] {
            for offset in [0, 1, 7, 15, 63, 100, 4095, 123_456] {
                let once = align_offset(offset, alignment).unwrap();
                assert_eq!(align_offset(once, alignment).unwrap(), once);
                assert!(is_aligned(once, alignment).unwrap());
                assert_eq!(
                    calculate_padding(offset, alignment).unwrap(),
                    once - offset
                );
            }
        }
    }

    #[test]
    fn test_power_of_two_neighbours() {
        assert_eq!(next_power_of_two(0), 1);
        assert_eq!(next_power_of_two(5), 8);
        assert_eq!(next_power_of_two(64), 64);
        assert_eq!(prev_power_of_two(0), 0);
        assert_eq!(prev_power_of_two(5), 4);
        assert_eq!(prev_power_of_two(64), 64);
        assert_eq!(prev_power_of_two(u64::MAX), 1 << 63);
    }

    #[test]
    fn test_write_padding() {
        let mut buf = vec![1u8; 5];
        let written = write_padding(&mut buf, 5, 16).unwrap();
        assert_eq!(written, 11);
        assert_eq!(buf.len(), 16);
        assert!(buf[5..].iter().all(|b| *b == 0));

        let written = write_padding(&mut buf, 16, 16).unwrap();
        assert_eq!(written, 0);

        let mut big = Vec::new();
        assert_eq!(write_padding(&mut big, 1, PAGE_SIZE).unwrap(), 4095);
        assert_eq!(big.len(), 4095);
    }
}
