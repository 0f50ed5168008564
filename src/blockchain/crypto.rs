use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use std::fmt;

/// Identifier of a ledger participant.
///
/// Addresses are plain names; nothing in the ledger ties them to keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    /// Creates an address from anything string-like
    pub fn new(name: impl Into<String>) -> Self {
        Address(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(name: &str) -> Self {
        Address(name.to_string())
    }
}

impl From<String> for Address {
    fn from(name: String) -> Self {
        Address(name)
    }
}

/// Hashes a JSON value with SHA-256
///
/// `serde_json` keeps object keys sorted, so the rendered string is a
/// canonical form: the same attributes always produce the same digest no
/// matter the order they were inserted in.
///
/// # Returns
///
/// The digest as a 64 character lowercase hexadecimal string
pub fn sha256_hex(value: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Counts the leading `'0'` characters of a hexadecimal hash.
pub fn leading_zero_digits(hash: &str) -> usize {
    hash.bytes().take_while(|b| *b == b'0').count()
}

/// Checks whether a hash satisfies a proof-of-work target of `difficulty`
/// leading zero hex digits.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    leading_zero_digits(hash) >= difficulty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_is_canonical() {
        let a = serde_json::json!({ "b": 1, "a": "x" });
        let mut map = serde_json::Map::new();
        map.insert("a".to_string(), serde_json::json!("x"));
        map.insert("b".to_string(), serde_json::json!(1));
        let b = serde_json::Value::Object(map);

        assert_eq!(sha256_hex(&a), sha256_hex(&b));
        assert_eq!(sha256_hex(&a).len(), 64);
    }

    #[test]
    fn test_sha256_hex_known_digest() {
        // sha256("{}")
        assert_eq!(
            sha256_hex(&serde_json::json!({})),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_leading_zero_digits() {
        assert_eq!(leading_zero_digits("abc"), 0);
        assert_eq!(leading_zero_digits("0abc"), 1);
        assert_eq!(leading_zero_digits("000f"), 3);
        assert_eq!(leading_zero_digits("0000"), 4);
        assert_eq!(leading_zero_digits(""), 0);
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("00ab", 0));
        assert!(meets_difficulty("00ab", 2));
        assert!(!meets_difficulty("00ab", 3));
        assert!(!meets_difficulty("a0ab", 1));
    }

    #[test]
    fn test_address_display() {
        let address = Address::from("Alice");
        assert_eq!(address.to_string(), "Alice");
        assert_eq!(address.as_str(), "Alice");
        assert_eq!(Address::new(String::from("Alice")), address);
    }
}
