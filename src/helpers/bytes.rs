//! Little-endian integer and float decoding for the binary workbook formats.
//!
//! Callers slice the buffer to the exact width before decoding, so every
//! function here only panics on a programming error, never on file content.

/// Decodes a `u16` from the first two bytes.
#[inline]
pub(crate) fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Decodes a `u32` from the first four bytes.
#[inline]
pub(crate) fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decodes a `u32` from the first four bytes and widens it to `usize`.
#[inline]
pub(crate) fn le_usize(bytes: &[u8]) -> usize {
    le_u32(bytes) as usize
}

/// Decodes a `u64` from the first eight bytes.
#[inline]
pub(crate) fn le_u64(bytes: &[u8]) -> u64 {
    let mut buffer = [0u8; 8];
    buffer.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buffer)
}

/// Decodes an IEEE 754 double from the first eight bytes.
#[inline]
pub(crate) fn le_f64(bytes: &[u8]) -> f64 {
    f64::from_bits(le_u64(bytes))
}

/// Splits a buffer into consecutive `u32` sector ids.
/// A trailing partial chunk is ignored.
pub(crate) fn sector_ids(bytes: &[u8]) -> impl Iterator<Item = usize> + '_ {
    bytes.chunks_exact(4).map(le_usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_values() {
        assert_eq!(le_u16(&[0x34, 0x12]), 0x1234);
        assert_eq!(le_u32(&[0x78, 0x56, 0x34, 0x12]), 0x1234_5678);
        assert_eq!(le_f64(&1.5f64.to_le_bytes()), 1.5);
    }

    #[test]
    fn sector_ids_ignore_partial_tail() {
        let bytes = [1, 0, 0, 0, 2, 0, 0, 0, 9];
        assert_eq!(sector_ids(&bytes).collect::<Vec<_>>(), vec![1, 2]);
    }
}
