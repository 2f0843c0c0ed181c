//! Caller-chosen codes for medicines and lots.
//!
//! A medicine is identified by the code staff give it in the master list
//! (e.g. `DRUG009`); a lot by the code printed on the delivery. Both are
//! trimmed, non-empty and free of control characters. Lot codes are only
//! unique within a medicine.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`MedicineId`] or [`LotCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The input is empty after trimming.
    #[error("{label} cannot be empty")]
    Empty {
        /// Which kind of code was being parsed.
        label: &'static str,
    },
    /// The input is too long.
    #[error("{label} must be at most {max} characters")]
    TooLong {
        /// Which kind of code was being parsed.
        label: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a control character.
    #[error("{label} cannot contain control characters")]
    ControlCharacter {
        /// Which kind of code was being parsed.
        label: &'static str,
    },
}

macro_rules! define_code {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Maximum length in characters.
            pub const MAX_LENGTH: usize = 64;

            /// Parse from a string, trimming surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns an error if the trimmed input is empty, longer than
            /// [`Self::MAX_LENGTH`] characters, or contains control characters.
            pub fn parse(s: &str) -> Result<Self, CodeError> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(CodeError::Empty { label: $label });
                }
                if trimmed.chars().count() > Self::MAX_LENGTH {
                    return Err(CodeError::TooLong {
                        label: $label,
                        max: Self::MAX_LENGTH,
                    });
                }
                if trimmed.chars().any(char::is_control) {
                    return Err(CodeError::ControlCharacter { label: $label });
                }
                Ok(Self(trimmed.to_owned()))
            }

            /// Returns the code as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the code and returns its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = CodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = CodeError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<$name> for String {
            fn from(code: $name) -> Self {
                code.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                // Database values are assumed valid
                Ok(Self(s))
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_code!(
    /// Master-data code of a medicine or supply item (e.g. `DRUG009`).
    MedicineId,
    "medicine id"
);

define_code!(
    /// Lot (batch) code of a delivery, unique only within one medicine.
    ///
    /// Ordering is lexical; FEFO uses it to break ties between lots that
    /// expire on the same day.
    LotCode,
    "lot code"
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let id = MedicineId::parse("  DRUG009 ").unwrap();
        assert_eq!(id.as_str(), "DRUG009");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(
            LotCode::parse("   "),
            Err(CodeError::Empty { label: "lot code" })
        );
    }

    #[test]
    fn test_parse_too_long() {
        let long = "L".repeat(LotCode::MAX_LENGTH + 1);
        assert!(matches!(
            LotCode::parse(&long),
            Err(CodeError::TooLong { max: 64, .. })
        ));
    }

    #[test]
    fn test_parse_control_character() {
        assert!(matches!(
            MedicineId::parse("DRUG\n01"),
            Err(CodeError::ControlCharacter { .. })
        ));
    }

    #[test]
    fn test_lot_codes_order_lexically() {
        let a = LotCode::parse("A100").unwrap();
        let b = LotCode::parse("B001").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_serde_validates_on_input() {
        let id: MedicineId = serde_json::from_str("\"PARA500\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"PARA500\"");
        assert!(serde_json::from_str::<MedicineId>("\"\"").is_err());
    }
}
