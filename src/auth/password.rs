//! Salted password hashing — PBKDF2-SHA256 with per-user random salt.
//!
//! Stored format: `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`.
//! Verification derives with the stored parameters and compares in
//! constant time.

use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
const KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;
const SCHEME: &str = "pbkdf2-sha256";

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = generate_salt();
    let hash = derive(password, &salt, PBKDF2_ITERATIONS);
    format!(
        "{SCHEME}${PBKDF2_ITERATIONS}${}${}",
        B64.encode(salt),
        B64.encode(hash)
    )
}

/// Verify a plaintext password against a stored hash string.
///
/// Unparseable stored values verify as false rather than erroring — a
/// corrupt hash denies login, it does not 500.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME || parts.next().is_some() {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (B64.decode(salt), B64.decode(hash)) else {
        return false;
    };

    let derived = derive(password, &salt, iterations);
    derived.ct_eq(&expected).into()
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LENGTH] {
    let mut out = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
