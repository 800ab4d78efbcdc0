//! Idempotency token attached to payment and deposit submissions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::{Uuid, Variant};

use super::result::{Error, Result};

/// Length of the hyphenated textual form
pub const TOKEN_LEN: usize = 36;

/// A random UUID-v4 identifying one submission attempt.
///
/// The ledger uses it to process a given attempt at most once. A new token
/// is minted every time a modal is refreshed, so a corrected resubmission
/// never collides with the failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdempotencyToken(Uuid);

impl IdempotencyToken {
    /// Generate a fresh random token
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Generate a token guaranteed to differ from `previous`
    pub fn regenerate(previous: &Self) -> Self {
        loop {
            let next = Self::generate();
            if next != *previous {
                return next;
            }
        }
    }

    /// Parse the 36-character hyphenated form, accepting only version 4
    pub fn parse(value: &str) -> Result<Self> {
        if value.len() != TOKEN_LEN {
            return Err(Error::validation(format!(
                "idempotency token must be {} characters",
                TOKEN_LEN
            )));
        }
        let uuid = Uuid::parse_str(value)
            .map_err(|e| Error::validation(format!("malformed idempotency token: {}", e)))?;
        if uuid.get_version_num() != 4 || uuid.get_variant() != Variant::RFC4122 {
            return Err(Error::validation("idempotency token is not a v4 uuid"));
        }
        Ok(Self(uuid))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for IdempotencyToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for IdempotencyToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IdempotencyToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        let token = IdempotencyToken::generate().to_string();
        assert_eq!(token.len(), TOKEN_LEN);
        assert_eq!(&token[14..15], "4");
        assert!(matches!(&token[19..20], "8" | "9" | "a" | "b"));
        assert!(IdempotencyToken::parse(&token).is_ok());
    }

    #[test]
    fn test_regenerate_differs() {
        let first = IdempotencyToken::generate();
        let second = IdempotencyToken::regenerate(&first);
        assert_ne!(first, second);
    }

    #[test]
    fn test_parse_rejects_non_v4() {
        assert!(IdempotencyToken::parse("11111111-1111-1111-1111-111111111111").is_err());
        assert!(IdempotencyToken::parse("not-a-token").is_err());
        assert!(IdempotencyToken::parse("").is_err());
        // simple (unhyphenated) form is 32 characters
        assert!(IdempotencyToken::parse("5f0c6a2e9b7d4c1e8a3f2b1c0d9e8f7a").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let token = IdempotencyToken::parse("5f0c6a2e-9b7d-4c1e-8a3f-2b1c0d9e8f7a").unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"5f0c6a2e-9b7d-4c1e-8a3f-2b1c0d9e8f7a\"");
        let back: IdempotencyToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }
}
