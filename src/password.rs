//! Password hashing and the complexity contract.
//!
//! Account passwords and reset tokens are both stored as salted argon2 PHC
//! strings. The salt is load-bearing for reset tokens: because two hashes of
//! the same token differ, redeeming a token has to scan candidate records
//! and verify each, which is exactly the lookup-cost-for-secrecy tradeoff
//! the reset flow wants.

use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};

/// Special characters accepted by the complexity contract.
pub const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>-_";

/// Minimum password length in characters.
pub const MIN_LENGTH: usize = 8;

/// A single failed rule of the password complexity contract.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PolicyRule {
    /// Shorter than [MIN_LENGTH] characters
    MinLength,
    /// No lowercase letter
    Lowercase,
    /// No uppercase letter
    Uppercase,
    /// No digit
    Digit,
    /// No character from [SPECIAL_CHARS]
    Special,
    /// Confirmation does not match the password
    Confirmation,
}

impl PolicyRule {
    /// Stable machine-readable rule name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyRule::MinLength => "min_length",
            PolicyRule::Lowercase => "lowercase",
            PolicyRule::Uppercase => "uppercase",
            PolicyRule::Digit => "digit",
            PolicyRule::Special => "special",
            PolicyRule::Confirmation => "confirmation",
        }
    }

    /// Human-readable hint for this rule.
    pub fn hint(&self) -> &'static str {
        match self {
            PolicyRule::MinLength => "Password must be at least 8 characters long.",
            PolicyRule::Lowercase => "Password must contain at least one lowercase letter.",
            PolicyRule::Uppercase => "Password must contain at least one uppercase letter.",
            PolicyRule::Digit => "Password must contain at least one digit.",
            PolicyRule::Special => {
                "Password must contain at least one special character (!@#$%^&*(),.?\":{}|<>-_)."
            }
            PolicyRule::Confirmation => "Passwords do not match.",
        }
    }
}

/// Check a password (and its confirmation) against the complexity contract.
///
/// Returns every failed rule, not just the first one.
pub fn check_policy(password: &str, confirmation: &str) -> Result<(), Vec<PolicyRule>> {
    let mut failed = Vec::new();

    if password.chars().count() < MIN_LENGTH {
        failed.push(PolicyRule::MinLength);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        failed.push(PolicyRule::Lowercase);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        failed.push(PolicyRule::Uppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        failed.push(PolicyRule::Digit);
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        failed.push(PolicyRule::Special);
    }
    if password != confirmation {
        failed.push(PolicyRule::Confirmation);
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(failed)
    }
}

/// Hash a secret into a salted argon2 PHC string.
pub fn hash(secret: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Ok(Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow!("Could not hash password: {e}"))?
        .to_string())
}

/// Verify a secret against a stored PHC string.
///
/// An unparseable stored hash counts as a failed verification.
pub fn verify(secret: &str, phc: &str) -> bool {
    PasswordHash::new(phc)
        .map(|parsed| {
            Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
