use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

/// Entropy behind every generated token and session key.
pub const OPAQUE_KEY_BYTES: usize = 32;

/// Generate an opaque, URL-safe bearer value from the OS CSPRNG.
///
/// 32 random bytes encode to 43 characters without padding.
pub fn generate_opaque_key() -> String {
    let mut bytes = [0u8; OPAQUE_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Leading characters of a secret, safe to put in logs.
pub fn key_prefix(key: &str) -> &str {
    key.get(..8).unwrap_or(key)
}
