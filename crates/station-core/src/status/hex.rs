//! ASCII hex helpers shared by the status encoder and decoder.

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Map the low nibble of `value` to its uppercase ASCII hex digit.
///
/// Only the low four bits are used, so `0xBA` maps to `b'A'`.
#[inline]
pub const fn nibble_to_hex(value: u8) -> u8 {
    HEX_DIGITS[(value & 0x0F) as usize]
}

/// Inverse of [`nibble_to_hex`]. Lowercase digits are accepted.
#[inline]
pub const fn hex_to_nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}

/// High nibble first, e.g. `0xFC` becomes `*b"FC"`.
#[inline]
pub const fn byte_to_hex(value: u8) -> [u8; 2] {
    [nibble_to_hex(value >> 4), nibble_to_hex(value)]
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHABET: &str = "0123456789ABCDEF";

    #[test]
    fn test_every_byte_matches_standard_alphabet() {
        let alphabet = ALPHABET.as_bytes();
        for value in 0..=255u8 {
            let [high, low] = byte_to_hex(value);
            assert_eq!(high, alphabet[(value / 16) as usize], "high nibble of {value:#04x}");
            assert_eq!(low, alphabet[(value % 16) as usize], "low nibble of {value:#04x}");
        }
    }

    #[test]
    fn test_nibble_ignores_high_bits() {
        assert_eq!(nibble_to_hex(0xBA), b'A');
        assert_eq!(nibble_to_hex(0x09), b'9');
        assert_eq!(nibble_to_hex(0xF0), b'0');
    }

    #[test]
    fn test_hex_to_nibble_round_trip() {
        for nibble in 0..16u8 {
            assert_eq!(hex_to_nibble(nibble_to_hex(nibble)), Some(nibble));
        }
        assert_eq!(hex_to_nibble(b'c'), Some(12));
        assert_eq!(hex_to_nibble(b'G'), None);
        assert_eq!(hex_to_nibble(b'_'), None);
    }
}
