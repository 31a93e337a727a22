//! Hex codec for hashes at the API boundary.
//!
//! Hashes travel as raw bytes inside the index; the CLI and most callers
//! hold them as hex strings.

use crate::error::{HmError, Result};

/// Parse an even-length, case-insensitive hex string into hash bytes.
///
/// # Errors
///
/// Returns [`HmError::InvalidInput`] for odd-length input or any
/// non-hex character.
pub fn parse_hex(hexhash: &str) -> Result<Vec<u8>> {
    hex::decode(hexhash).map_err(|e| HmError::InvalidInput(format!("bad hash {hexhash:?}: {e}")))
}

/// Format hash bytes as lowercase hex, no separators.
#[must_use]
pub fn format_hex(hash: &[u8]) -> String {
    hex::encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let hash = vec![0x00, 0xab, 0xff, 0x10];
        assert_eq!(parse_hex(&format_hex(&hash)).unwrap(), hash);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(parse_hex("AbCd").unwrap(), vec![0xab, 0xcd]);
    }

    #[test]
    fn rejects_odd_length_and_junk() {
        assert!(matches!(parse_hex("abc"), Err(HmError::InvalidInput(_))));
        assert!(matches!(parse_hex("zz"), Err(HmError::InvalidInput(_))));
    }

    #[test]
    fn empty_is_valid() {
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
    }
}
