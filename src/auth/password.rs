use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Symbols accepted by the password policy.
const PASSWORD_SYMBOLS: &str = "!@#$%&*._";

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Policy: 8-25 characters, at least one uppercase letter, one lowercase
/// letter, one digit, one symbol from `!@#$%&*._`, and no whitespace.
pub fn is_valid_password(password: &str) -> bool {
    let len = password.chars().count();
    (8..=25).contains(&len)
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
        && !password.chars().any(char::is_whitespace)
}

/// Rule text surfaced as the validation detail when the policy fails.
pub fn password_rule_message() -> &'static str {
    "The password must have 8 to 25 characters, 1 uppercase letter, 1 lowercase letter, \
     1 number, 1 special character (! @ # $ % & * . _), and must not contain spaces."
}
