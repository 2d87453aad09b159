use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("enrollment number must be 12 characters, got {len}")]
    InvalidLength { len: usize },

    #[error("enrollment number must be 4 digits, 2 letters and 6 digits: {raw}")]
    InvalidFormat { raw: String },
}

/// Validated student enrollment number (e.g. `0801CS221001`).
///
/// Layout is four digits, two ASCII letters, six digits. Letters are kept as
/// given; the store treats the value as an opaque, non-unique index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnrollmentNo(String);

impl EnrollmentNo {
    const LEN: usize = 12;

    /// Parse and validate an enrollment number.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError` if the value does not match the expected layout.
    pub fn parse(value: impl Into<String>) -> Result<Self, EnrollmentError> {
        let raw = value.into();
        let trimmed = raw.trim();
        let bytes = trimmed.as_bytes();
        if bytes.len() != Self::LEN {
            return Err(EnrollmentError::InvalidLength { len: trimmed.len() });
        }

        let valid = bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[4..6].iter().all(u8::is_ascii_alphabetic)
            && bytes[6..].iter().all(u8::is_ascii_digit);
        if !valid {
            return Err(EnrollmentError::InvalidFormat {
                raw: trimmed.to_string(),
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EnrollmentNo {
    type Error = EnrollmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EnrollmentNo> for String {
    fn from(value: EnrollmentNo) -> Self {
        value.0
    }
}

impl std::fmt::Display for EnrollmentNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_digit_letter_digit_layout() {
        let no = EnrollmentNo::parse(" 0801cs221001 ").unwrap();
        assert_eq!(no.as_str(), "0801cs221001");
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            EnrollmentNo::parse("0801CS2210"),
            Err(EnrollmentError::InvalidLength { len: 10 })
        );
    }

    #[test]
    fn rejects_letters_in_numeric_positions() {
        assert!(matches!(
            EnrollmentNo::parse("08A1CS221001"),
            Err(EnrollmentError::InvalidFormat { .. })
        ));
        assert!(matches!(
            EnrollmentNo::parse("080112221001"),
            Err(EnrollmentError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn rejects_multibyte_input_without_panicking() {
        assert!(EnrollmentNo::parse("0801ÇS22100").is_err());
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: EnrollmentNo = serde_json::from_str("\"0801CS221001\"").unwrap();
        assert_eq!(ok.as_str(), "0801CS221001");
        assert!(serde_json::from_str::<EnrollmentNo>("\"nope\"").is_err());
    }
}
