//! Password Handling and Strength Scoring
//!
//! - Zeroization of clear text passwords in memory
//! - Unicode NFKC normalization before any measurement
//! - Deterministic strength scoring with corrective feedback
//!
//! ## Scoring
//! | Rule                                   | Score |
//! |----------------------------------------|-------|
//! | length >= 8 (else feedback)            | +1    |
//! | length >= 12                           | +1    |
//! | uppercase / lowercase / digit / symbol | +1 each (else feedback) |
//! | contains a denylisted substring        | -2 (and feedback) |
//!
//! `strong` at score >= 5, `medium` at >= 3, otherwise `weak`. A password is
//! valid only with no feedback **and** a score of at least 3.

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Constants
// ============================================================================

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Length that earns the extra length bonus
pub const LONG_PASSWORD_LENGTH: usize = 12;

/// Score at which a password is `strong`
const STRONG_SCORE: i32 = 5;

/// Score at which a password is `medium` (and the minimum for validity)
const MEDIUM_SCORE: i32 = 3;

/// Common substrings that are penalized (matched case-insensitively)
const DENYLIST: &[&str] = &["password", "12345", "qwerty", "abc123"];

// ============================================================================
// Strength report
// ============================================================================

/// Password strength bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    fn from_score(score: i32) -> Self {
        if score >= STRONG_SCORE {
            PasswordStrength::Strong
        } else if score >= MEDIUM_SCORE {
            PasswordStrength::Medium
        } else {
            PasswordStrength::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordStrength::Weak => "weak",
            PasswordStrength::Medium => "medium",
            PasswordStrength::Strong => "strong",
        }
    }
}

impl fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`validate_password_strength`]
///
/// Returned as data, never as an error, so forms can render every complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStrengthReport {
    pub is_valid: bool,
    pub strength: PasswordStrength,
    pub score: i32,
    pub feedback: Vec<String>,
}

/// Score a candidate password
///
/// The length check and the score threshold are independent: a password can
/// have no individual complaint yet still be invalid.
pub fn validate_password_strength(candidate: &str) -> PasswordStrengthReport {
    let normalized: String = candidate.nfkc().collect();
    let length = normalized.chars().count();

    let mut score = 0i32;
    let mut feedback = Vec::new();

    if length < MIN_PASSWORD_LENGTH {
        feedback.push(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    } else {
        score += 1;
        if length >= LONG_PASSWORD_LENGTH {
            score += 1;
        }
    }

    let classes: [(fn(char) -> bool, &str); 4] = [
        (char::is_uppercase, "Add at least one uppercase letter"),
        (char::is_lowercase, "Add at least one lowercase letter"),
        (|c| c.is_ascii_digit(), "Add at least one number"),
        (is_special, "Add at least one special character"),
    ];
    for (present, advice) in classes {
        if normalized.chars().any(present) {
            score += 1;
        } else {
            feedback.push(advice.to_string());
        }
    }

    let lower = normalized.to_lowercase();
    if DENYLIST.iter().any(|pattern| lower.contains(pattern)) {
        score -= 2;
        feedback.push("Avoid common words and sequences".to_string());
    }

    PasswordStrengthReport {
        is_valid: feedback.is_empty() && score >= MEDIUM_SCORE,
        strength: PasswordStrength::from_score(score),
        score,
        feedback,
    }
}

fn is_special(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// ## Security
/// - Implements `Zeroize` and `ZeroizeOnDrop`
/// - Does not implement `Clone` to prevent accidental copies
/// - Debug output is redacted
///
/// No policy is applied here: sign-in must accept whatever the user typed.
/// Use [`ClearTextPassword::strength`] on sign-up and password change.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Wrap user input, normalized with NFKC
    pub fn new(raw: String) -> Self {
        let mut raw = raw;
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        Self(normalized)
    }

    /// Borrow the secret for sending it to the login backend
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn strength(&self) -> PasswordStrengthReport {
        validate_password_strength(&self.0)
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_password_is_weak_and_invalid() {
        let report = validate_password_strength("abc");
        assert!(!report.is_valid);
        assert_eq!(report.strength, PasswordStrength::Weak);
        assert!(report.feedback[0].contains("at least 8"));
    }

    #[test]
    fn test_denylisted_password_is_penalized() {
        let report = validate_password_strength("Password123!");
        // 2 (length) + 4 (classes) - 2 (denylist)
        assert_eq!(report.score, 4);
        assert_eq!(report.strength, PasswordStrength::Medium);
        assert!(!report.is_valid);
        assert!(
            report
                .feedback
                .iter()
                .any(|f| f.contains("common words"))
        );
    }

    #[test]
    fn test_strong_password() {
        let report = validate_password_strength("Xq7!mK9#Lp2$");
        assert!(report.is_valid);
        assert_eq!(report.strength, PasswordStrength::Strong);
        assert_eq!(report.score, 6);
        assert!(report.feedback.is_empty());
    }

    #[test]
    fn test_eight_chars_all_classes() {
        let report = validate_password_strength("Ab1!cdEf");
        assert_eq!(report.score, 5);
        assert!(report.is_valid);
        assert_eq!(report.strength, PasswordStrength::Strong);
    }

    #[test]
    fn test_missing_classes_produce_feedback() {
        let report = validate_password_strength("lowercaseonly");
        assert!(!report.is_valid);
        assert_eq!(report.feedback.len(), 3);
        // 2 (length) + 1 (lowercase)
        assert_eq!(report.score, 3);
        assert_eq!(report.strength, PasswordStrength::Medium);
    }

    #[test]
    fn test_denylist_is_case_insensitive() {
        let report = validate_password_strength("xxQWERTYxx9!Z");
        assert!(report.feedback.iter().any(|f| f.contains("common")));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 8 multi-byte characters
        let report = validate_password_strength("ÄÖÜäöü1!");
        assert!(!report.feedback.iter().any(|f| f.contains("at least 8")));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let json = serde_json::to_value(validate_password_strength("abc")).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["strength"], "weak");
    }

    #[test]
    fn test_debug_redaction() {
        let password = ClearTextPassword::new("secret".to_string());
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret"));
    }

    #[test]
    fn test_clear_text_normalizes() {
        // Fullwidth "Ａ" normalizes to ASCII "A" under NFKC
        let password = ClearTextPassword::new("Ａbc".to_string());
        assert_eq!(password.expose_secret(), "Abc");
        assert!(!password.is_empty());
        assert!(ClearTextPassword::new("   ".to_string()).is_empty());
    }
}
