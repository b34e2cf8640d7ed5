//! Account phone numbers.
//!
//! Clients send phone numbers either as JSON numbers (`555`) or strings
//! (`"+1 (555) 010-2030"`). Both forms normalize to a digit string with an
//! optional leading `+`, which is what uniqueness is checked against.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number cannot be empty")]
    Empty,
    #[error("phone number may only contain digits, spaces, dashes, dots, parentheses and a leading +")]
    InvalidCharacter,
    #[error("phone number must have at most {max} digits")]
    TooLong { max: usize },
}

/// A normalized phone number.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(into = "String")]
pub struct Phone(String);

impl Phone {
    /// E.164 allows at most 15 digits.
    pub const MAX_DIGITS: usize = 15;

    /// Validate and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] if no digits remain, a disallowed character is
    /// present, or there are more than [`Phone::MAX_DIGITS`] digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let trimmed = s.trim();
        let (plus, rest) = trimmed
            .strip_prefix('+')
            .map_or((false, trimmed), |rest| (true, rest));

        let mut digits = String::with_capacity(rest.len() + 1);
        if plus {
            digits.push('+');
        }
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(PhoneError::InvalidCharacter),
            }
        }

        let count = digits.chars().filter(char::is_ascii_digit).count();
        if count == 0 {
            return Err(PhoneError::Empty);
        }
        if count > Self::MAX_DIGITS {
            return Err(PhoneError::TooLong {
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(digits))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

impl<'de> Deserialize<'de> for Phone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        let raw = Raw::deserialize(deserializer)?;
        let text = match raw {
            Raw::Number(n) => n.to_string(),
            Raw::Text(s) => s,
        };
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Phone {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Phone {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Phone {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting() {
        assert_eq!(Phone::parse("+1 (555) 010-2030").unwrap().as_str(), "+15550102030");
        assert_eq!(Phone::parse("555.0100").unwrap().as_str(), "5550100");
    }

    #[test]
    fn rejects_letters_and_empty_input() {
        assert_eq!(Phone::parse("555-CALL"), Err(PhoneError::InvalidCharacter));
        assert_eq!(Phone::parse(" - "), Err(PhoneError::Empty));
        assert_eq!(Phone::parse("+"), Err(PhoneError::Empty));
        assert!(matches!(
            Phone::parse("1234567890123456"),
            Err(PhoneError::TooLong { .. })
        ));
    }

    #[test]
    fn json_number_and_string_agree() {
        let from_number: Phone = serde_json::from_str("555").unwrap();
        let from_text: Phone = serde_json::from_str("\"555\"").unwrap();
        assert_eq!(from_number, from_text);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"555\"");
    }
}
