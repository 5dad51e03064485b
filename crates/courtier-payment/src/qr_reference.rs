//! Swiss QR-bill references.
//!
//! A QR reference (QRR) is 26 payload digits followed by one mod-10
//! recursive check digit. It may only be used together with a QR-IBAN.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::QrReferenceError;
use crate::iban::{IbanValidator, group, is_qr_iban};

pub const QR_REFERENCE_LENGTH: usize = 27;
const PAYLOAD_LENGTH: usize = QR_REFERENCE_LENGTH - 1;

/// Mod-10 recursive carry table.
const MOD10_TABLE: [u8; 10] = [0, 9, 4, 6, 8, 2, 7, 1, 3, 5];

/// Reference scheme of a QR-bill.
///
/// `Scor` (ISO 11649 creditor reference) exists for completeness of the
/// payload vocabulary but is never produced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QrReferenceType {
    #[serde(rename = "QRR")]
    Qrr,
    #[serde(rename = "SCOR")]
    Scor,
    #[serde(rename = "NON")]
    Non,
}

impl QrReferenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            QrReferenceType::Qrr => "QRR",
            QrReferenceType::Scor => "SCOR",
            QrReferenceType::Non => "NON",
        }
    }
}

impl fmt::Display for QrReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Qrr` for a QR-IBAN, `Non` otherwise.
pub fn get_qr_reference_type(iban: &str) -> QrReferenceType {
    let for_qr = IbanValidator::default().iban_for_qr(iban);
    if is_qr_iban(&for_qr) {
        QrReferenceType::Qrr
    } else {
        QrReferenceType::Non
    }
}

/// Mod-10 recursive check digit over the digits of `digits`. Other
/// characters are ignored.
pub fn qr_check_digit(digits: &str) -> u8 {
    let carry = digits
        .bytes()
        .filter(u8::is_ascii_digit)
        .fold(0u8, |carry, b| {
            MOD10_TABLE[usize::from((carry + (b - b'0')) % 10)]
        });
    (10 - carry) % 10
}

/// Derive a QR reference from an invoice number.
///
/// Only the digits of the invoice number are kept, left-padded with zeros
/// to 26; longer inputs keep their last 26 digits. The check digit is
/// appended, so the result is always 27 digits.
pub fn generate_qr_reference(invoice_number: &str) -> String {
    let digits: String = invoice_number
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let payload = match digits.len().checked_sub(PAYLOAD_LENGTH) {
        Some(excess) => digits[excess..].to_string(),
        None => format!("{digits:0>width$}", width = PAYLOAD_LENGTH),
    };
    let check = qr_check_digit(&payload);
    format!("{payload}{check}")
}

/// Group by five for display: `21000 00000 03139 47143 00090 17`.
pub fn format_qr_reference(reference: &str) -> String {
    group(reference.trim(), 5)
}

/// Check a QR reference typed or pasted by a user. Whitespace is ignored;
/// returns the compact reference.
pub fn validate_qr_reference(input: &str) -> Result<String, QrReferenceError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();

    if !compact.chars().all(|c| c.is_ascii_digit()) {
        return Err(QrReferenceError::NonNumeric);
    }
    if compact.len() != QR_REFERENCE_LENGTH {
        return Err(QrReferenceError::InvalidLength(compact.len()));
    }

    let (payload, check) = compact.split_at(PAYLOAD_LENGTH);
    let expected = qr_check_digit(payload);
    let found = check.as_bytes()[0] - b'0';
    if expected != found {
        return Err(QrReferenceError::CheckDigitMismatch { expected, found });
    }

    Ok(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Published QR-bill sample reference.
    const SAMPLE: &str = "210000000003139471430009017";

    #[test]
    fn check_digit_of_sample() {
        assert_eq!(qr_check_digit(&SAMPLE[..26]), 7);
        assert_eq!(qr_check_digit("00000000000000000000000000"), 0);
        assert_eq!(qr_check_digit(""), 0);
    }

    #[test]
    fn generate_from_invoice_number() {
        let reference = generate_qr_reference("2024-0001");
        assert_eq!(reference, "000000000000000000202400017");
        assert_eq!(reference.len(), 27);
        assert!(reference.bytes().all(|b| b.is_ascii_digit()));

        let check = qr_check_digit(&reference[..26]);
        assert_eq!(reference.as_bytes()[26] - b'0', check);
    }

    #[test]
    fn generate_is_deterministic() {
        assert_eq!(
            generate_qr_reference("INV/2024/42"),
            generate_qr_reference("INV/2024/42")
        );
    }

    #[test]
    fn generate_keeps_last_26_digits() {
        let reference = generate_qr_reference("9921000000000313947143000901");
        assert_eq!(reference, SAMPLE);
    }

    #[test]
    fn generate_without_digits_is_all_zero() {
        assert_eq!(generate_qr_reference("ABC"), "0".repeat(27));
    }

    #[test]
    fn format_in_groups_of_five() {
        let formatted = format_qr_reference(SAMPLE);
        assert_eq!(formatted, "21000 00000 03139 47143 00090 17");
        assert_eq!(formatted.matches(' ').count(), 5);
    }

    #[test]
    fn format_groups_characters_not_bytes() {
        let formatted = format_qr_reference("ÄÄÄÄÄÄ");
        assert_eq!(formatted, "ÄÄÄÄÄ Ä");
        assert!(!formatted.contains('\u{FFFD}'));
        assert_eq!(format_qr_reference(" 123 "), "123");
    }

    #[test]
    fn validate_accepts_spaced_reference() {
        assert_eq!(
            validate_qr_reference("21000 00000 03139 47143 00090 17").unwrap(),
            SAMPLE
        );
    }

    #[test]
    fn validate_detects_single_digit_change() {
        let tampered = "210000000003139471430009117";
        assert!(matches!(
            validate_qr_reference(tampered),
            Err(QrReferenceError::CheckDigitMismatch { found: 7, .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_shape() {
        assert_eq!(
            validate_qr_reference("12345"),
            Err(QrReferenceError::InvalidLength(5))
        );
        assert_eq!(
            validate_qr_reference("RF18539007547034"),
            Err(QrReferenceError::NonNumeric)
        );
    }

    #[test]
    fn reference_type_follows_iban() {
        assert_eq!(
            get_qr_reference_type("CH44 3199 9123 0008 8901 2"),
            QrReferenceType::Qrr
        );
        assert_eq!(
            get_qr_reference_type("CH9300762011623852957"),
            QrReferenceType::Non
        );
        assert_eq!(
            get_qr_reference_type("DE89370400440532013000"),
            QrReferenceType::Non
        );
        assert_eq!(QrReferenceType::Qrr.to_string(), "QRR");
        assert_eq!(
            serde_json::to_string(&QrReferenceType::Non).unwrap(),
            "\"NON\""
        );
    }
}
