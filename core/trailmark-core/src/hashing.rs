//! One-way hashing of visitor identifiers.

/// Lowercase hex encoding, two digits per byte.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// MD5 of the UTF-8 bytes, hex encoded. Empty ids are treated as absent.
pub fn hash_visitor_id(id: &str) -> Option<String> {
    if id.is_empty() {
        return None;
    }
    Some(to_hex(&md5::compute(id.as_bytes()).0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_hex_pads_each_byte() {
        assert_eq!(to_hex(&[0x12, 0x0a, 0xbc, 0xde, 0xf0]), "120abcdef0");
    }

    #[test]
    fn test_to_hex_empty() {
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn test_hash_known_digest() {
        assert_eq!(
            hash_visitor_id("Hello world!").as_deref(),
            Some("86fb269d190d2c85f6e0468ceca42a20")
        );
    }

    #[test]
    fn test_hash_matches_md5_lower_hex() {
        let id = "visitor-42";
        assert_eq!(
            hash_visitor_id(id).unwrap(),
            format!("{:x}", md5::compute(id))
        );
    }

    #[test]
    fn test_hash_empty_is_none() {
        assert!(hash_visitor_id("").is_none());
    }
}
