//! Member PIN storage.
//!
//! A member's PIN is kept only as an argon2 PHC string. Salt and cost
//! parameters live inside the string, so verification needs nothing else.

use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to hash PIN: {0}")]
pub struct CredentialError(password_hash::Error);

/// One-way hash of a member PIN.
#[derive(Clone, PartialEq, Eq)]
pub struct PinHash(String);

impl PinHash {
    /// Hash `pin` under a freshly generated salt.
    pub fn new(pin: &str) -> Result<Self, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(pin.as_bytes(), &salt)
            .map_err(CredentialError)?;
        Ok(PinHash(hash.to_string()))
    }

    pub fn verify(&self, pin: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.0) else {
            return false;
        };
        Argon2::default()
            .verify_password(pin.as_bytes(), &parsed)
            .is_ok()
    }
}

// Never print the hash, even in debug output.
impl fmt::Debug for PinHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinHash(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_matching_pin() {
        let hash = PinHash::new("1234").unwrap();
        assert!(hash.verify("1234"));
    }

    #[test]
    fn rejects_other_pins() {
        let hash = PinHash::new("1234").unwrap();
        assert!(!hash.verify("4321"));
        assert!(!hash.verify(""));
        assert!(!hash.verify("12345"));
    }

    #[test]
    fn stored_as_argon2_phc_string() {
        let hash = PinHash::new("1234").unwrap();
        assert!(hash.0.starts_with("$argon2id$"));
    }

    #[test]
    fn same_pin_hashes_differently() {
        let a = PinHash::new("1234").unwrap();
        let b = PinHash::new("1234").unwrap();
        assert_ne!(a, b);
        assert!(a.verify("1234") && b.verify("1234"));
    }

    #[test]
    fn debug_hides_hash() {
        let hash = PinHash::new("1234").unwrap();
        let printed = format!("{hash:?}");
        assert_eq!(printed, "PinHash(<redacted>)");
        assert!(!printed.contains("argon2"));
    }

    #[test]
    fn corrupted_hash_never_verifies() {
        let hash = PinHash("not a phc string".to_string());
        assert!(!hash.verify("1234"));
    }
}
