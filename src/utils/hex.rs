use alloy::primitives::{Address, U256};

/// Strip surrounding whitespace and a leading `0x`/`0X`.
pub fn clean_hex(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decimal or `0x`-prefixed hex.
pub fn to_u256(s: &str) -> Option<U256> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.starts_with("0x") || s.starts_with("0X") {
        let digits = clean_hex(s);
        if digits.is_empty() {
            return None;
        }
        return U256::from_str_radix(digits, 16).ok();
    }
    if s.chars().all(|c| c.is_ascii_digit() || c == '_') {
        return U256::from_str_radix(&s.replace('_', ""), 10).ok();
    }
    None
}

pub fn parse_address(s: &str) -> Option<Address> {
    let digits = clean_hex(s);
    if digits.len() != 40 {
        return None;
    }
    format!("0x{digits}").parse::<Address>().ok()
}

/// 32 bytes of hex, with or without the prefix.
pub fn is_private_key_hex(s: &str) -> bool {
    let digits = clean_hex(s);
    digits.len() == 64 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_u256_accepts_decimal_and_hex() {
        assert_eq!(to_u256("5000000000000000"), Some(U256::from(5_000_000_000_000_000u64)));
        assert_eq!(to_u256("5_000"), Some(U256::from(5_000u64)));
        assert_eq!(to_u256(" 0xff "), Some(U256::from(255u64)));
        assert_eq!(to_u256("0x"), None);
        assert_eq!(to_u256("1e18"), None);
        assert_eq!(to_u256(""), None);
    }

    #[test]
    fn test_parse_address_requires_twenty_bytes() {
        assert_eq!(
            parse_address("0x00000000000000000000000000000000000000aa"),
            Some(Address::with_last_byte(0xaa))
        );
        assert_eq!(parse_address("0xaa"), None);
    }

    #[test]
    fn test_private_key_shape() {
        assert!(is_private_key_hex(&format!("0x{}", "ab".repeat(32))));
        assert!(!is_private_key_hex("0x1234"));
        assert!(!is_private_key_hex(&"zz".repeat(32)));
    }
}
