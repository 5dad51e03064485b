//! IBAN cleaning, formatting and validation (ISO 13616).

use serde::Serialize;
use tracing::{debug, warn};

use crate::countries::iban_length;
use crate::error::IbanError;
use crate::policy::ChecksumPolicy;

/// Registered length of Swiss and Liechtenstein IBANs, and the length a
/// QR-bill payload requires.
const SWISS_IBAN_LENGTH: usize = 21;

/// Longest digit run appended to the running remainder in one step.
const CHECKSUM_CHUNK: usize = 7;

/// Bank clearing numbers reserved for QR-IBANs.
const QR_IID_RANGE: std::ops::RangeInclusive<u8> = 30..=31;

/// Keep ASCII letters and digits, uppercased.
pub fn clean_iban(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Clean, then group by four: `CH93 0076 2011 6238 5295 7`.
pub fn format_iban(input: &str) -> String {
    group(&clean_iban(input), 4)
}

/// Space-separated runs of `size` characters (not bytes).
pub(crate) fn group(compact: &str, size: usize) -> String {
    compact
        .chars()
        .collect::<Vec<char>>()
        .chunks(size)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// ISO 13616 mod-97 remainder of a cleaned IBAN. A valid IBAN yields 1.
///
/// The first four characters move to the end and letters expand to two
/// digits (`A` = 10 to `Z` = 35). The resulting numeral is reduced in
/// chunks so it never has to fit in an integer.
pub(crate) fn calculate_checksum(iban: &str) -> u32 {
    let split = iban.len().min(4);
    let (head, tail) = iban.split_at(split);

    let mut numeral = String::with_capacity(iban.len() * 2);
    for value in tail.chars().chain(head.chars()).filter_map(|c| c.to_digit(36)) {
        numeral.push_str(&value.to_string());
    }

    let mut remainder: u32 = 0;
    for chunk in numeral.as_bytes().chunks(CHECKSUM_CHUNK) {
        let mut block = remainder.to_string();
        block.push_str(&String::from_utf8_lossy(chunk));
        // At most 2 + 7 digits, so the parse cannot overflow.
        remainder = block.parse::<u64>().map(|n| (n % 97) as u32).unwrap_or(0);
    }
    remainder
}

/// Whether the IBAN is a Swiss or Liechtenstein QR-IBAN, i.e. its
/// institution id (characters 5 and 6) is 30 or 31.
pub fn is_qr_iban(iban: &str) -> bool {
    let cleaned = clean_iban(iban);
    if !(cleaned.starts_with("CH") || cleaned.starts_with("LI")) {
        return false;
    }
    cleaned
        .get(4..6)
        .and_then(|iid| iid.parse::<u8>().ok())
        .is_some_and(|iid| QR_IID_RANGE.contains(&iid))
}

/// Outcome of [`validate_iban`]. Always carries the cleaned and formatted
/// input so callers can echo it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IbanValidation {
    pub is_valid: bool,
    pub cleaned_iban: String,
    pub formatted_iban: String,
    /// Empty when the input is too short to carry one.
    pub country_code: String,
    pub is_qr_iban: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<IbanError>,
}

impl IbanValidation {
    fn invalid(cleaned: String, country_code: String, error: IbanError) -> Self {
        Self {
            is_valid: false,
            formatted_iban: group(&cleaned, 4),
            cleaned_iban: cleaned,
            country_code,
            is_qr_iban: false,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<String, IbanError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.cleaned_iban),
        }
    }
}

/// IBAN validation under a [`ChecksumPolicy`].
#[derive(Debug, Clone, Default)]
pub struct IbanValidator {
    policy: ChecksumPolicy,
}

impl IbanValidator {
    pub fn new(policy: ChecksumPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ChecksumPolicy {
        &self.policy
    }

    pub fn validate(&self, input: &str) -> IbanValidation {
        let cleaned = clean_iban(input);

        if cleaned.is_empty() {
            return IbanValidation::invalid(cleaned, String::new(), IbanError::Required);
        }
        if cleaned.len() < 5 {
            return IbanValidation::invalid(cleaned, String::new(), IbanError::TooShort);
        }

        let country = cleaned[..2].to_string();
        let swiss_suffix = self.has_swiss_bank_suffix(&cleaned);
        if swiss_suffix {
            debug!(iban = %cleaned, "Accepting Swiss IBAN with bank suffix");
        }

        let Some(registered) = iban_length(&country) else {
            return IbanValidation::invalid(
                cleaned,
                country.clone(),
                IbanError::UnknownCountry(country),
            );
        };

        let expected = if swiss_suffix {
            SWISS_IBAN_LENGTH + 1
        } else {
            registered
        };
        if cleaned.len() != expected {
            let actual = cleaned.len();
            return IbanValidation::invalid(
                cleaned,
                country.clone(),
                IbanError::InvalidLength {
                    country,
                    expected,
                    actual,
                },
            );
        }

        let checked = if swiss_suffix {
            &cleaned[..SWISS_IBAN_LENGTH]
        } else {
            cleaned.as_str()
        };
        if calculate_checksum(checked) != 1 {
            if self.policy.is_lenient(&country) {
                warn!(iban = %cleaned, country = %country, "Accepting IBAN with invalid checksum");
            } else {
                return IbanValidation::invalid(cleaned, country, IbanError::InvalidChecksum);
            }
        }

        IbanValidation {
            is_valid: true,
            formatted_iban: group(&cleaned, 4),
            is_qr_iban: is_qr_iban(&cleaned),
            cleaned_iban: cleaned,
            country_code: country,
            error: None,
        }
    }

    /// The IBAN to embed in a QR-bill: the cleaned IBAN, cut to 21
    /// characters when it carries a Swiss bank suffix.
    pub fn iban_for_qr(&self, iban: &str) -> String {
        let mut cleaned = clean_iban(iban);
        if self.has_swiss_bank_suffix(&cleaned) {
            cleaned.truncate(SWISS_IBAN_LENGTH);
        }
        cleaned
    }

    fn has_swiss_bank_suffix(&self, cleaned: &str) -> bool {
        self.policy.allow_swiss_bank_suffix
            && cleaned.starts_with("CH")
            && cleaned.len() == SWISS_IBAN_LENGTH + 1
    }
}

/// Validate under the default policy (CH and LI checksum leniency).
pub fn validate_iban(input: &str) -> IbanValidation {
    IbanValidator::default().validate(input)
}

pub fn is_valid_iban(input: &str) -> bool {
    validate_iban(input).is_valid
}

/// See [`IbanValidator::iban_for_qr`].
pub fn get_iban_for_qr(iban: &str) -> String {
    IbanValidator::default().iban_for_qr(iban)
}
