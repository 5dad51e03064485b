//! Courtier Payment: IBAN validation and Swiss QR-bill references.
//!
//! Everything here is pure and synchronous. [`validate_iban`] checks an
//! IBAN against the ISO 13616 country registry and the mod-97 checksum,
//! with the Swiss leniencies described on [`ChecksumPolicy`].
//! [`generate_qr_reference`] derives the 27-digit QR reference (QRR)
//! embedded in a QR-bill next to a QR-IBAN.

pub mod countries;
pub mod error;
pub mod iban;
pub mod policy;
pub mod qr_reference;

pub use error::{IbanError, QrReferenceError};
pub use iban::{
    IbanValidation, IbanValidator, clean_iban, format_iban, get_iban_for_qr, is_qr_iban,
    is_valid_iban, validate_iban,
};
pub use policy::ChecksumPolicy;
pub use qr_reference::{
    QrReferenceType, format_qr_reference, generate_qr_reference, get_qr_reference_type,
    qr_check_digit, validate_qr_reference,
};
