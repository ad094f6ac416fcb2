use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// One-way salted credential: base64(SHA-256(password ++ salt)).
/// Deterministic for a given (password, salt) pair.
pub fn derive_hash(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Fresh per-user salt, generated at signup time.
pub fn generate_salt() -> String {
    random_hex(16)
}

/// Opaque bearer token, regenerated on every successful login.
pub fn generate_token() -> String {
    random_hex(64)
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
