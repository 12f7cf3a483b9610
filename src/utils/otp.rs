/// OTP generation and input validation helpers shared by the auth flow.
use chrono::{NaiveDate, Utc};
use rand::Rng;

pub const OTP_LENGTH: usize = 6;

/// Generates a random numeric OTP (6 digits, no leading zero).
pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    code.to_string()
}

/// Normalizes an Indian mobile number to its bare 10-digit form.
///
/// Accepts "+91XXXXXXXXXX", "91XXXXXXXXXX", "0XXXXXXXXXX" and plain
/// 10-digit input, with spaces and dashes tolerated. Returns None when
/// the result is not a valid Indian mobile (10 digits starting 6-9).
pub fn normalize_mobile(input: &str) -> Option<String> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let digits = if let Some(rest) = cleaned.strip_prefix("+91") {
        rest.to_string()
    } else if cleaned.len() == 12 && cleaned.starts_with("91") {
        cleaned[2..].to_string()
    } else if cleaned.len() == 11 && cleaned.starts_with('0') {
        cleaned[1..].to_string()
    } else {
        cleaned
    };

    if digits.len() != 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // Indian mobile numbers start with 6, 7, 8 or 9
    if !matches!(digits.as_bytes()[0], b'6'..=b'9') {
        return None;
    }
    Some(digits)
}

/// Masks a mobile number for log output (keeps first and last 2 digits).
pub fn mask_mobile(mobile: &str) -> String {
    let chars: Vec<char> = mobile.chars().collect();
    if chars.len() >= 4 {
        let head: String = chars[..2].iter().collect();
        let tail: String = chars[chars.len() - 2..].iter().collect();
        format!("{}******{}", head, tail)
    } else {
        "***".to_string()
    }
}

/// PIN must be 4 to 6 numeric digits.
pub fn validate_pin(pin: &str) -> bool {
    (4..=6).contains(&pin.len()) && pin.chars().all(|c| c.is_ascii_digit())
}

/// Aadhaar IDs are exactly 12 numeric digits.
pub fn validate_aadhaar(aadhaar: &str) -> bool {
    aadhaar.len() == 12 && aadhaar.chars().all(|c| c.is_ascii_digit())
}

/// Gender is matched case-insensitively; storage normalizes to lowercase.
pub fn validate_gender(gender: &str) -> bool {
    ["male", "female", "other"]
        .iter()
        .any(|v| gender.eq_ignore_ascii_case(v))
}

/// Date of birth must be a valid YYYY-MM-DD date that is not in the future.
pub fn validate_dob(dob: &str) -> bool {
    match NaiveDate::parse_from_str(dob, "%Y-%m-%d") {
        Ok(date) => date <= Utc::now().date_naive(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_otp_is_six_digits() {
        for _ in 0..50 {
            let otp = generate_otp();
            assert_eq!(otp.len(), OTP_LENGTH);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(otp.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn test_normalize_mobile_variants() {
        assert_eq!(normalize_mobile("9876543210"), Some("9876543210".to_string()));
        assert_eq!(normalize_mobile("+91 98765 43210"), Some("9876543210".to_string()));
        assert_eq!(normalize_mobile("919876543210"), Some("9876543210".to_string()));
        assert_eq!(normalize_mobile("09876543210"), Some("9876543210".to_string()));
        assert_eq!(normalize_mobile("98765-43210"), Some("9876543210".to_string()));
    }

    #[test]
    fn test_normalize_mobile_rejects_invalid() {
        assert_eq!(normalize_mobile("12345"), None);
        assert_eq!(normalize_mobile("5876543210"), None); // starts below 6
        assert_eq!(normalize_mobile("98765432101"), None); // 11 digits, no 0 prefix
        assert_eq!(normalize_mobile("98765abcde"), None);
        assert_eq!(normalize_mobile(""), None);
    }

    #[test]
    fn test_mask_mobile() {
        assert_eq!(mask_mobile("9876543210"), "98******10");
        assert_eq!(mask_mobile("91"), "***");
    }

    #[test]
    fn test_validate_pin() {
        assert!(validate_pin("1234"));
        assert!(validate_pin("123456"));
        assert!(!validate_pin("123"));
        assert!(!validate_pin("1234567"));
        assert!(!validate_pin("12a4"));
    }

    #[test]
    fn test_validate_aadhaar() {
        assert!(validate_aadhaar("123456789012"));
        assert!(!validate_aadhaar("12345678901"));
        assert!(!validate_aadhaar("12345678901a"));
    }

    #[test]
    fn test_validate_dob() {
        assert!(validate_dob("1990-05-17"));
        assert!(!validate_dob("1990-13-01"));
        assert!(!validate_dob("17-05-1990"));
        assert!(!validate_dob("2990-01-01")); // future
    }

    #[test]
    fn test_validate_gender_ignores_case() {
        assert!(validate_gender("male"));
        assert!(validate_gender("Male"));
        assert!(validate_gender("FEMALE"));
        assert!(validate_gender("Other"));
        assert!(!validate_gender("unknown"));
        assert!(!validate_gender(""));
    }
}
