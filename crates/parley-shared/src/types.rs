use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{ACCOUNT_ID_LEN, ACCOUNT_ID_MAX, ACCOUNT_ID_MIN};
use crate::error::IdentifierError;

// Account identity = 8 decimal digits, the user-facing handle for adding contacts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Parse an identifier. The input must be exactly eight ASCII digits;
    /// padding is rejected like any other character.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let actual = s.chars().count();
        if actual != ACCOUNT_ID_LEN {
            return Err(IdentifierError::InvalidLength {
                expected: ACCOUNT_ID_LEN,
                actual,
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdentifierError::NonDigit);
        }
        Ok(Self(s.to_string()))
    }

    /// Draw a fresh identifier uniformly at random. Uniqueness is the
    /// caller's job.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(ACCOUNT_ID_MIN..=ACCOUNT_ID_MAX).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_eight_digits() {
        let id = AccountId::parse("12345678").unwrap();
        assert_eq!(id.as_str(), "12345678");
    }

    #[test]
    fn parse_rejects_padding() {
        assert!(AccountId::parse(" 12345678 ").is_err());
        assert!(AccountId::parse("12345678\n").is_err());
        assert_eq!(AccountId::parse(" 1234567"), Err(IdentifierError::NonDigit));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert_eq!(
            AccountId::parse("1234567"),
            Err(IdentifierError::InvalidLength {
                expected: 8,
                actual: 7
            })
        );
        assert!(AccountId::parse("123456789").is_err());
        assert!(AccountId::parse("").is_err());
    }

    #[test]
    fn parse_rejects_non_digits() {
        assert_eq!(AccountId::parse("1234abcd"), Err(IdentifierError::NonDigit));
    }

    #[test]
    fn random_ids_are_eight_digits() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let id = AccountId::random(&mut rng);
            assert!(AccountId::parse(id.as_str()).is_ok(), "bad id {id}");
        }
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = AccountId::parse("87654321").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"87654321\"");
    }
}
