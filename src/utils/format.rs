//! Formatting utilities for display values.

use crate::config::address_display::{MIN_SHORTEN_LEN, PREFIX_LEN, SEPARATOR, SUFFIX_LEN};

/// Format a wallet address for display (0x1234...5678).
///
/// Addresses shorter than [`MIN_SHORTEN_LEN`] characters are returned
/// unchanged, since shortening them would duplicate or drop characters.
/// Slicing is done on characters, so malformed non-ASCII input cannot panic.
pub fn format_address(address: &str) -> String {
    let len = address.chars().count();
    if len < MIN_SHORTEN_LEN {
        return address.to_string();
    }

    let prefix: String = address.chars().take(PREFIX_LEN).collect();
    let suffix: String = address.chars().skip(len - SUFFIX_LEN).collect();
    format!("{}{}{}", prefix, SEPARATOR, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_address() {
        let addr = "0xABCDEF1234567890000000000000000000000001";
        assert_eq!(format_address(addr), "0xABCD...0001");

        let lower = "0x1234567890abcdef1234567890abcdef12345678";
        assert_eq!(format_address(lower), "0x1234...5678");
    }

    #[test]
    fn test_format_address_any_length() {
        assert_eq!(format_address("0x12345678"), "0x1234...5678");
        assert_eq!(format_address("0x123456789"), "0x1234...6789");
    }

    #[test]
    fn test_format_short_address() {
        assert_eq!(format_address("0x1234"), "0x1234");
        assert_eq!(format_address("0x1234567"), "0x1234567");
        assert_eq!(format_address(""), "");
    }

    #[test]
    fn test_format_non_ascii() {
        assert_eq!(format_address("ääääääääääää"), "ääääää...ääää");
    }
}
