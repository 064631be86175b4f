//! Password hashing with argon2.
//!
//! Plaintext passwords exist only on this boundary: signup hashes before
//! any store operation, login verifies against the stored PHC string.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Hash a raw password into a PHC-format string.
pub fn hash(raw: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(raw.as_bytes(), &salt)?
        .to_string())
}

/// Verify a raw password against a stored PHC hash.
/// An unparseable hash verifies as false rather than erroring, so a
/// corrupt row cannot be distinguished from a wrong password by a caller.
pub fn verify(raw: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash("hunter2-long-enough").unwrap();
        assert_ne!(hashed, "hunter2-long-enough");
        assert!(hashed.starts_with("$argon2"));
        assert!(verify("hunter2-long-enough", &hashed));
        assert!(!verify("wrong-password", &hashed));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash("same-password").unwrap();
        let b = hash("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify("anything", "not-a-phc-string"));
        assert!(!verify("anything", ""));
    }
}
