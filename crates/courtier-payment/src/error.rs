//! Payment reference error types.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Why an IBAN was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IbanError {
    #[error("IBAN is required")]
    Required,

    #[error("IBAN too short")]
    TooShort,

    #[error("Unknown country code: {0}")]
    UnknownCountry(String),

    #[error("Invalid IBAN length for {country}: expected {expected}, got {actual}")]
    InvalidLength {
        country: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid IBAN checksum")]
    InvalidChecksum,
}

/// Serialized as its message, the form shown next to the input field.
impl Serialize for IbanError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Why a QR reference was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QrReferenceError {
    #[error("QR reference must have 27 digits, got {0}")]
    InvalidLength(usize),

    #[error("QR reference must contain only digits")]
    NonNumeric,

    #[error("QR reference check digit mismatch: expected {expected}, found {found}")]
    CheckDigitMismatch { expected: u8, found: u8 },
}
