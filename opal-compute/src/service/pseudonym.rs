//! Salted one-way pseudonyms

use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 6;

/// Random alphanumeric salt for one fetch
pub fn generate_salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

/// Lowercase hex SHA-256 of `raw` followed by `salt`
pub fn pseudonymize(raw: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_shape() {
        let salt = generate_salt();
        assert_eq!(salt.len(), SALT_LEN);
        assert!(salt.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_pseudonym_is_deterministic_per_salt() {
        assert_eq!(pseudonymize("22507123456", "aB3xY9"), pseudonymize("22507123456", "aB3xY9"));
        assert_ne!(pseudonymize("22507123456", "aB3xY9"), pseudonymize("22507123456", "aB3xY8"));
        assert_ne!(pseudonymize("22507123456", "aB3xY9"), pseudonymize("22507123457", "aB3xY9"));
    }

    #[test]
    fn test_pseudonym_hashes_concatenation() {
        // sha256("abc")
        assert_eq!(
            pseudonymize("a", "bc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
