//! Phone number canonicalization for the mobile-money gateway.
//!
//! The gateway only accepts MSISDNs: country code followed by the subscriber
//! number, no leading `+`. Users type anything ("0712...", "+254712...",
//! "712...") so every phone number crosses through [`normalize`] before it
//! reaches the gateway.

/// Default country code prefix (Kenya).
pub const DEFAULT_COUNTRY_CODE: &str = "254";

/// Minimum length of a bare national number without the leading zero.
const BARE_NATIONAL_MIN_LEN: usize = 9;

/// Converts arbitrary user phone input into MSISDN form.
///
/// Rules, applied in order: trim whitespace; strip a leading `+`; a leading
/// `0` is replaced with the country code; a bare national number (leading
/// mobile prefix digit, at least nine digits) gets the country code
/// prepended; anything else is returned unchanged.
///
/// Total and idempotent: never fails, and canonical input passes through
/// untouched. Note that the fallback means malformed input is *not*
/// rejected here; callers must not assume the result is a dialable
/// subscriber number.
pub fn normalize(input: &str, country_code: &str) -> String {
    let trimmed = input.trim();
    let stripped = trimmed.strip_prefix('+').unwrap_or(trimmed);

    if let Some(rest) = stripped.strip_prefix('0') {
        return format!("{}{}", country_code, rest);
    }

    if is_bare_national(stripped) {
        return format!("{}{}", country_code, stripped);
    }

    stripped.to_string()
}

/// A national subscriber number with the leading zero already dropped:
/// starts with a mobile prefix digit (`7` or `1`), all digits, long enough
/// to be a full subscriber number.
fn is_bare_national(value: &str) -> bool {
    (value.starts_with('7') || value.starts_with('1'))
        && value.len() >= BARE_NATIONAL_MIN_LEN
        && value.chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(input: &str) -> String {
        normalize(input, DEFAULT_COUNTRY_CODE)
    }

    #[test]
    fn replaces_leading_zero_with_country_code() {
        assert_eq!(canon("0712345678"), "254712345678");
    }

    #[test]
    fn strips_plus_prefix() {
        assert_eq!(canon("+254712345678"), "254712345678");
    }

    #[test]
    fn prepends_country_code_to_bare_national_number() {
        assert_eq!(canon("712345678"), "254712345678");
        assert_eq!(canon("110345678"), "254110345678");
    }

    #[test]
    fn canonical_input_passes_through() {
        assert_eq!(canon("254712345678"), "254712345678");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(canon("  0712345678 "), "254712345678");
    }

    #[test]
    fn malformed_input_is_returned_unchanged() {
        assert_eq!(canon("not-a-phone"), "not-a-phone");
        assert_eq!(canon("7123"), "7123");
        assert_eq!(canon(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "0712345678",
            "+254712345678",
            "712345678",
            "254712345678",
            "not-a-phone",
            "  0110345678",
            "",
            "+1",
        ];
        for input in inputs {
            let once = canon(input);
            assert_eq!(canon(&once), once, "not idempotent for {:?}", input);
        }
    }
}
