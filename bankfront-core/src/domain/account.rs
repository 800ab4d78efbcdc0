//! Account, routing number and contact value objects

use std::fmt;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

pub const ACCOUNT_NUM_LEN: usize = 10;
pub const ROUTING_NUM_LEN: usize = 9;
pub const LABEL_MAX_LEN: usize = 30;

fn all_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// A 10-digit bank account number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn parse(value: &str) -> Result<Self> {
        if all_digits(value, ACCOUNT_NUM_LEN) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::validation("invalid account number"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A 9-digit routing number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoutingNumber(String);

impl RoutingNumber {
    pub fn parse(value: &str) -> Result<Self> {
        if all_digits(value, ROUTING_NUM_LEN) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::validation("invalid routing number"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A contact's display label: 1-30 characters of letters, digits and
/// spaces, not starting with a space
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContactLabel(String);

impl ContactLabel {
    pub fn parse(value: &str) -> Result<Self> {
        let mut chars = value.chars();
        let valid = match chars.next() {
            Some(first) if first.is_ascii_alphanumeric() => {
                value.chars().count() <= LABEL_MAX_LEN
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == ' ')
            }
            _ => false,
        };
        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::validation("invalid account label"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_newtype_impls {
    ($($ty:ident),*) => {$(
        impl TryFrom<String> for $ty {
            type Error = Error;
            fn try_from(value: String) -> Result<Self> {
                Self::parse(&value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> String {
                value.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    )*};
}

string_newtype_impls!(AccountNumber, RoutingNumber, ContactLabel);

/// An account at another bank, as offered by the deposit modal.
///
/// Serialized as `{"account_num": "...", "routing_num": "..."}`, which is
/// also the value carried by the deposit selector's existing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccount {
    pub account_num: AccountNumber,
    pub routing_num: RoutingNumber,
}

impl ExternalAccount {
    pub fn new(account_num: AccountNumber, routing_num: RoutingNumber) -> Self {
        Self {
            account_num,
            routing_num,
        }
    }

    /// Parse the JSON selector value
    pub fn from_selector_value(value: &str) -> Result<Self> {
        serde_json::from_str(value).map_err(|_| Error::validation("invalid account details"))
    }

    /// Render as the JSON selector value
    pub fn to_selector_value(&self) -> String {
        format!(
            r#"{{"account_num": "{}", "routing_num": "{}"}}"#,
            self.account_num, self.routing_num
        )
    }
}

/// An entry in the user's address book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub label: ContactLabel,
    pub account_num: AccountNumber,
    pub routing_num: RoutingNumber,
    pub is_external: bool,
}

impl Contact {
    pub fn external_account(&self) -> ExternalAccount {
        ExternalAccount::new(self.account_num.clone(), self.routing_num.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_and_routing_numbers() {
        assert!(AccountNumber::parse("1234567890").is_ok());
        assert!(AccountNumber::parse("123456789").is_err());
        assert!(AccountNumber::parse("12345678901").is_err());
        assert!(AccountNumber::parse("12345678a0").is_err());
        assert!(RoutingNumber::parse("123456789").is_ok());
        assert!(RoutingNumber::parse("1234567890").is_err());
    }

    #[test]
    fn test_contact_label() {
        assert!(ContactLabel::parse("Alice").is_ok());
        assert!(ContactLabel::parse("rent 2024").is_ok());
        assert!(ContactLabel::parse(" leading").is_err());
        assert!(ContactLabel::parse("").is_err());
        assert!(ContactLabel::parse("bad-char").is_err());
        assert!(ContactLabel::parse(&"a".repeat(30)).is_ok());
        assert!(ContactLabel::parse(&"a".repeat(31)).is_err());
    }

    #[test]
    fn test_external_account_selector_value() {
        let acct = ExternalAccount::new(
            AccountNumber::parse("9099791699").unwrap(),
            RoutingNumber::parse("808889588").unwrap(),
        );
        let value = acct.to_selector_value();
        assert_eq!(ExternalAccount::from_selector_value(&value).unwrap(), acct);
        assert!(ExternalAccount::from_selector_value("add").is_err());
        assert!(ExternalAccount::from_selector_value(
            r#"{"account_num": "1", "routing_num": "808889588"}"#
        )
        .is_err());
    }
}
