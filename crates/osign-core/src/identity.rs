//! Identity claim validation.
//!
//! A signature is only accepted when the claim passes all three checks:
//! a full name of at least two tokens, a national id (CPF) whose two check
//! digits verify, and a real birth date that is neither in the future nor
//! earlier than the configured minimum year.

use chrono::{Datelike, NaiveDate};

use osign_contracts::{
    error::{OsignError, OsignResult},
    signer::IdentityClaim,
};

const NATIONAL_ID_LEN: usize = 11;

/// An identity claim after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIdentity {
    /// Tokens joined by single spaces.
    pub full_name: String,
    /// Exactly 11 digits.
    pub national_id: String,
    pub birth_date: NaiveDate,
}

/// Validate every field of `claim` against `today`.
pub fn validate_identity(
    claim: &IdentityClaim,
    today: NaiveDate,
    min_birth_year: i32,
) -> OsignResult<ValidatedIdentity> {
    let full_name = validate_full_name(&claim.full_name)?;
    let national_id = validate_national_id(&claim.national_id)?;
    validate_birth_date(claim.birth_date, today, min_birth_year)?;
    Ok(ValidatedIdentity {
        full_name,
        national_id,
        birth_date: claim.birth_date,
    })
}

/// At least two whitespace-separated tokens.
pub fn validate_full_name(raw: &str) -> OsignResult<String> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(invalid("full name must contain at least first and last name"));
    }
    Ok(tokens.join(" "))
}

/// Strip `.`, `-`, `/` and spaces; anything else that is not a digit makes
/// the value unusable. Returns `None` unless exactly 11 digits remain.
pub fn normalize_national_id(raw: &str) -> Option<String> {
    let mut digits = String::with_capacity(NATIONAL_ID_LEN);
    for c in raw.trim().chars() {
        match c {
            '0'..='9' => digits.push(c),
            '.' | '-' | '/' | ' ' => {}
            _ => return None,
        }
    }
    (digits.len() == NATIONAL_ID_LEN).then_some(digits)
}

/// Two-pass weighted modulo-11 check over an 11-digit CPF.
///
/// Returns the normalized digits on success.
pub fn validate_national_id(raw: &str) -> OsignResult<String> {
    let digits = normalize_national_id(raw)
        .ok_or_else(|| invalid("national id must have exactly 11 digits"))?;
    let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();

    if values.iter().all(|d| *d == values[0]) {
        return Err(invalid("national id with all digits identical is not valid"));
    }

    let first = check_digit(&values[..9]);
    let second = check_digit(&values[..10]);
    if values[9] != first || values[10] != second {
        return Err(invalid("national id check digits do not match"));
    }
    Ok(digits)
}

/// Weights run from `len + 1` down to 2; a remainder of 10 becomes 0.
fn check_digit(prefix: &[u32]) -> u32 {
    let top = prefix.len() as u32 + 1;
    let sum: u32 = prefix
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top - i as u32))
        .sum();
    match (sum * 10) % 11 {
        10 => 0,
        r => r,
    }
}

/// Not after `today` and not before January 1st of `min_birth_year`.
pub fn validate_birth_date(date: NaiveDate, today: NaiveDate, min_birth_year: i32) -> OsignResult<()> {
    if date > today {
        return Err(invalid("birth date cannot be in the future"));
    }
    if date.year() < min_birth_year {
        return Err(invalid(&format!("birth date cannot be before {}", min_birth_year)));
    }
    Ok(())
}

/// `52998224725` → `529.982.247-25`. Other input is returned unchanged.
pub fn format_national_id(digits: &str) -> String {
    if digits.len() != NATIONAL_ID_LEN || !digits.chars().all(|c| c.is_ascii_digit()) {
        return digits.to_string();
    }
    format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    )
}

/// Keep the first three digits only, for audit metadata.
pub fn redact_national_id(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).take(3).collect();
    format!("{}***", digits)
}

fn invalid(reason: &str) -> OsignError {
    OsignError::InvalidIdentity { reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    // ── National id ──────────────────────────────────────────────────────────

    #[test]
    fn accepts_known_valid_numbers() {
        assert_eq!(validate_national_id("529.982.247-25").unwrap(), "52998224725");
        assert_eq!(validate_national_id("11144477735").unwrap(), "11144477735");
        assert_eq!(validate_national_id("123.456.789-09").unwrap(), "12345678909");
    }

    #[test]
    fn rejects_repeated_digits() {
        for raw in ["11111111111", "000.000.000-00", "99999999999"] {
            let err = validate_national_id(raw).unwrap_err();
            assert!(err.to_string().contains("identical"), "{raw}: {err}");
        }
    }

    #[test]
    fn rejects_wrong_check_digits() {
        assert!(validate_national_id("52998224724").is_err());
        assert!(validate_national_id("52998224715").is_err());
    }

    #[test]
    fn rejects_wrong_length_or_letters() {
        assert!(validate_national_id("5299822472").is_err());
        assert!(validate_national_id("529982247250").is_err());
        assert!(validate_national_id("529.982.247-2X").is_err());
        assert!(validate_national_id("").is_err());
    }

    #[test]
    fn first_check_digit_remainder_ten_becomes_zero() {
        // 123456789 weighs to 210; (210 * 10) % 11 == 10.
        assert_eq!(check_digit(&[1, 2, 3, 4, 5, 6, 7, 8, 9]), 0);
        assert!(validate_national_id("00000000191").is_ok());
    }

    #[test]
    fn formatting_and_redaction() {
        assert_eq!(format_national_id("52998224725"), "529.982.247-25");
        assert_eq!(format_national_id("123"), "123");
        assert_eq!(redact_national_id("529.982.247-25"), "529***");
    }

    // ── Name ─────────────────────────────────────────────────────────────────

    #[test]
    fn full_name_needs_two_tokens() {
        assert!(validate_full_name("Maria").is_err());
        assert!(validate_full_name("   ").is_err());
        assert_eq!(validate_full_name("  Maria   da  Silva ").unwrap(), "Maria da Silva");
    }

    // ── Birth date ───────────────────────────────────────────────────────────

    #[test]
    fn birth_date_bounds() {
        let ok = NaiveDate::from_ymd_opt(1990, 1, 31).unwrap();
        assert!(validate_birth_date(ok, today(), 1900).is_ok());

        let future = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert!(validate_birth_date(future, today(), 1900).is_err());

        let ancient = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
        assert!(validate_birth_date(ancient, today(), 1900).is_err());

        assert!(validate_birth_date(today(), today(), 1900).is_ok());
    }

    // ── Whole claim ──────────────────────────────────────────────────────────

    #[test]
    fn validate_identity_normalizes() {
        let claim = IdentityClaim {
            full_name: "Maria  da Silva".to_string(),
            national_id: "529.982.247-25".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1988, 4, 12).unwrap(),
        };
        let identity = validate_identity(&claim, today(), 1900).unwrap();
        assert_eq!(identity.full_name, "Maria da Silva");
        assert_eq!(identity.national_id, "52998224725");
    }

    #[test]
    fn validate_identity_reports_first_failure() {
        let claim = IdentityClaim {
            full_name: "Maria da Silva".to_string(),
            national_id: "11111111111".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1988, 4, 12).unwrap(),
        };
        match validate_identity(&claim, today(), 1900) {
            Err(OsignError::InvalidIdentity { reason }) => assert!(reason.contains("national id")),
            other => panic!("expected InvalidIdentity, got {:?}", other),
        }
    }
}
