//! Passwords for accounts created at checkout.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{OrderError, OrderResult};

pub const GENERATED_PASSWORD_LEN: usize = 12;

const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!#$%&*+-=?@";

/// Random ASCII password with at least one lowercase letter, one uppercase
/// letter, one digit and one symbol.
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    let classes = [LOWER, UPPER, DIGITS, SYMBOLS];

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();

    while chars.len() < GENERATED_PASSWORD_LEN {
        let class = classes[rng.gen_range(0..classes.len())];
        chars.push(class[rng.gen_range(0..class.len())]);
    }

    chars.shuffle(&mut rng);
    chars.into_iter().map(char::from).collect()
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> OrderResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| OrderError::infrastructure(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{PasswordHash, PasswordVerifier};

    #[test]
    fn test_generated_password_shape() {
        for _ in 0..200 {
            let password = generate_password();
            assert_eq!(password.len(), GENERATED_PASSWORD_LEN);
            assert!(password.is_ascii());
            assert!(password.bytes().any(|b| LOWER.contains(&b)));
            assert!(password.bytes().any(|b| UPPER.contains(&b)));
            assert!(password.bytes().any(|b| DIGITS.contains(&b)));
            assert!(password.bytes().any(|b| SYMBOLS.contains(&b)));
        }
    }

    #[test]
    fn test_passwords_differ() {
        assert_ne!(generate_password(), generate_password());
    }

    #[test]
    fn test_hash_verifies() {
        let hash = hash_password("Hemligt#42ab").unwrap();
        assert!(hash.starts_with("$argon2id$"));

        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default()
            .verify_password(b"Hemligt#42ab", &parsed)
            .is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }
}
