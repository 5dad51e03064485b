//! Per-country IBAN acceptance rules.

/// Which countries accept an IBAN whose mod-97 checksum fails, and whether
/// the Swiss 22-character bank-suffix form is tolerated.
///
/// Some Swiss and Liechtenstein IBANs in circulation fail the strict
/// checksum because of bank-specific formatting, so the default accepts
/// them with a warning. Every other country is strict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumPolicy {
    /// Country codes whose checksum failures are accepted.
    pub lenient_countries: Vec<String>,
    /// Accept `CH` IBANs one character longer than registered, validating
    /// the first 21 characters only.
    pub allow_swiss_bank_suffix: bool,
}

impl ChecksumPolicy {
    /// Reject every checksum failure; keep the Swiss suffix tolerance.
    pub fn strict() -> Self {
        Self {
            lenient_countries: Vec::new(),
            allow_swiss_bank_suffix: true,
        }
    }

    pub fn is_lenient(&self, country_code: &str) -> bool {
        self.lenient_countries.iter().any(|c| c == country_code)
    }
}

impl Default for ChecksumPolicy {
    fn default() -> Self {
        Self {
            lenient_countries: vec!["CH".into(), "LI".into()],
            allow_swiss_bank_suffix: true,
        }
    }
}
