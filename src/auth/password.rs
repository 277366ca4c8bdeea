use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

/// Hashes a password with a per-call random salt. Never reversible; the cost
/// factor follows the argon2 defaults.
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

/// Verifies a password against a stored hash. The hash may arrive as text or
/// raw bytes depending on how the row was written; both are accepted. Any
/// parse failure counts as a mismatch rather than an error, so a corrupt row
/// can never log a user in.
pub fn verify_password(plain: &str, hash: impl AsRef<[u8]>) -> bool {
    let hash = match std::str::from_utf8(hash.as_ref()) {
        Ok(s) => s,
        Err(_) => {
            warn!("stored password hash is not valid utf-8");
            return false;
        }
    };
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}
