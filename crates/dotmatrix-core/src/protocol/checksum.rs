//! CRC-16 checksum used to protect every packet payload.
//!
//! The variant is the one commonly listed as CRC-16/CCITT-FALSE: polynomial
//! `0x1021`, initial register `0xFFFF`, bytes fed MSB-first, no reflection and
//! no final XOR.  The display firmware computes the same value over the
//! payload it receives and answers `ChecksumMismatch` when the two differ.
//!
//! # How the shift register works
//!
//! Each input byte is XOR-ed into the *top* eight bits of a 16-bit register.
//! The register is then shifted left one bit at a time, eight times.  Whenever
//! the bit falling off the top was set, the polynomial is XOR-ed back in.

/// Generator polynomial (x^16 + x^12 + x^5 + 1).
pub const CRC16_POLYNOMIAL: u16 = 0x1021;

/// Register value before the first byte is processed.
pub const CRC16_INITIAL: u16 = 0xFFFF;

/// Computes the 16-bit CRC of `bytes`.
///
/// Pure and deterministic; an empty slice yields [`CRC16_INITIAL`].
///
/// # Examples
///
/// ```rust
/// use dotmatrix_core::checksum16;
///
/// assert_eq!(checksum16(b"123456789"), 0x29B1);
/// ```
pub fn checksum16(bytes: &[u8]) -> u16 {
    let mut crc = CRC16_INITIAL;
    for &byte in bytes {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ CRC16_POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

// ── Tests ─────────────────────────────────────────────────────────────────────
