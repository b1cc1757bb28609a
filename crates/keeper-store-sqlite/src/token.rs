//! Opaque bearer tokens and password hashes.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// 32 random bytes, hex-encoded.
pub fn generate() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// What is stored in place of a token.
pub fn digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}

/// Check `password` against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .is_ok_and(|hash| Argon2::default().verify_password(password.as_bytes(), &hash).is_ok())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokens_are_unique_hex() {
    let (a, b) = (generate(), generate());
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
  }

  #[test]
  fn digest_is_stable_and_hides_the_token() {
    let token = generate();
    assert_eq!(digest(&token), digest(&token));
    assert_ne!(digest(&token), token);
  }

  #[test]
  fn password_round_trip() {
    let phc = hash_password("password123").unwrap();
    assert!(phc.starts_with("$argon2"));
    assert!(verify_password("password123", &phc));
    assert!(!verify_password("password124", &phc));
    assert!(!verify_password("password123", "not-a-hash"));
  }
}
