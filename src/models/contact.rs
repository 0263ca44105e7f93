//! Schema-layer contact field hygiene.
//!
//! Both helpers are idempotent: feeding their output back in returns the
//! same value, so repeated validation passes cannot mangle stored data.

/// Normalize a US phone number to `(XXX) XXX-XXXX`.
///
/// Strips all non-digit characters first (so already-normalized input is a
/// fixed point), drops a leading country code `1` from 11-digit numbers,
/// and leaves anything that is not 10 digits untouched.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let digits = match digits.len() {
        11 if digits.starts_with('1') => &digits[1..],
        _ => digits.as_str(),
    };

    if digits.len() != 10 {
        return raw.trim().to_string();
    }

    format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..10])
}

/// Validate a US zip code: 5 digits, optionally `-` + 4 digits.
pub fn validate_zip(zip: &str) -> bool {
    let bytes = zip.as_bytes();
    match bytes.len() {
        5 => bytes.iter().all(u8::is_ascii_digit),
        10 => {
            bytes[..5].iter().all(u8::is_ascii_digit)
                && bytes[5] == b'-'
                && bytes[6..].iter().all(u8::is_ascii_digit)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_formats() {
        assert_eq!(normalize_phone("6125551234"), "(612) 555-1234");
        assert_eq!(normalize_phone("612-555-1234"), "(612) 555-1234");
        assert_eq!(normalize_phone("+1 612 555 1234"), "(612) 555-1234");
        assert_eq!(normalize_phone("(612) 555-1234"), "(612) 555-1234");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_phone("1-612-555-1234");
        assert_eq!(normalize_phone(&once), once);

        // Non-conforming input is also a fixed point.
        let odd = normalize_phone("555-12");
        assert_eq!(normalize_phone(&odd), odd);
    }

    #[test]
    fn zip_validation() {
        assert!(validate_zip("55401"));
        assert!(validate_zip("55401-1234"));
        assert!(!validate_zip("5540"));
        assert!(!validate_zip("55401-12"));
        assert!(!validate_zip("5540a"));
        assert!(!validate_zip("55401 1234"));
    }
}
