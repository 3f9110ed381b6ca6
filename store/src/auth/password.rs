//! Salted PBKDF2-HMAC-SHA256 password hashes.
//!
//! Stored format: `hex(salt):hex(derived_key)` with a 32-byte random salt,
//! a 32-byte key and 100 000 iterations.

use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 32;
const KEY_LEN: usize = 32;

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt);
    let key = derive(password, &salt);
    format!("{}:{}", hex::encode(salt), hex::encode(key))
}

/// Check `password` against a stored hash.
///
/// The full derivation always runs and the digests are compared in constant
/// time. A malformed stored hash never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, key_hex)) = stored.split_once(':') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(key_hex)) else {
        return false;
    };
    let actual = derive(password, &salt);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

fn derive(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ITERATIONS, &mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_has_salt_and_key() {
        let stored = hash_password("admin123");
        let (salt, key) = stored.split_once(':').unwrap();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert_eq!(key.len(), KEY_LEN * 2);
    }

    #[test]
    fn verifies_only_the_right_password() {
        let stored = hash_password("s3cret");
        assert!(verify_password("s3cret", &stored));
        assert!(!verify_password("S3cret", &stored));
        assert!(!verify_password("", &stored));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "nocolon"));
        assert!(!verify_password("x", "zz:zz"));
        assert!(!verify_password("x", "abcd:"));
    }

    #[test]
    fn known_vector() {
        // PBKDF2-HMAC-SHA256("password", "salt", 100000)
        let stored = format!(
            "{}:{}",
            hex::encode(b"salt"),
            "0394a2ede332c9a13eb82e9b24631604c31df978b4e2f0fbd2c549944f9d79a5"
        );
        assert!(verify_password("password", &stored));
    }
}
